//! Segment boundaries: the algorithmic rule that locates where a segment
//! begins or ends in the input.

use bitflags::bitflags;

bitflags! {
    /// Per-boundary flags carried alongside a [`StartBoundary`]/[`EndBoundary`]
    /// pair on a segment.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BoundaryFlags: u8 {
        const INCLUDE_MATCHING_TEXT_IN_VARIABLE = 0b0000_0001;
        const IS_ENDING = 0b0000_0010;
        const IS_OPTIONAL = 0b0000_0100;
    }
}

/// Where a segment's capture begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartBoundary {
    /// Starts immediately at the current cursor; never scans ahead.
    StartsNow,
    /// Scans forward for the first occurrence of a byte.
    AtChar(u8),
    /// Scans forward for the first occurrence of a literal string.
    AtString(String),
    /// Same as `AtString` but case-insensitive.
    AtStringIgnoreCase(String),
    /// The segment's entire remaining span must equal one exact byte at
    /// the cursor; start and end are the same decision.
    EqualsChar(u8),
    /// The segment's entire span must equal this literal, ordinally.
    EqualsOrdinal(String),
    /// Same as `EqualsOrdinal` but case-insensitive.
    EqualsOrdinalIgnoreCase(String),
    /// The segment's entire span must equal one of several literals
    /// (the `equals(a,b,c)` boundary condition).
    EqualsAny(Vec<String>),
    /// Same as `EqualsAny` but case-insensitive.
    EqualsAnyIgnoreCase(Vec<String>),
    /// The start is exactly `n` bytes ahead of the cursor, unconditionally.
    FixedLength(usize),
}

impl StartBoundary {
    /// Whether this boundary can be located by scanning forward from the
    /// cursor. `StartsNow`, `FixedLength`, and `EqualsAny*` (multiple
    /// alternatives, no single needle to scan for) must be resolved
    /// immediately at the cursor. A single-literal `Equals*` boundary is
    /// scannable too: it is how a literal run between two groups gives an
    /// inherited-end segment somewhere to stop.
    pub fn is_scannable(&self) -> bool {
        matches!(
            self,
            StartBoundary::AtChar(_)
                | StartBoundary::AtString(_)
                | StartBoundary::AtStringIgnoreCase(_)
                | StartBoundary::EqualsChar(_)
                | StartBoundary::EqualsOrdinal(_)
                | StartBoundary::EqualsOrdinalIgnoreCase(_)
        )
    }

    pub fn is_equals(&self) -> bool {
        matches!(
            self,
            StartBoundary::EqualsChar(_)
                | StartBoundary::EqualsOrdinal(_)
                | StartBoundary::EqualsOrdinalIgnoreCase(_)
                | StartBoundary::EqualsAny(_)
                | StartBoundary::EqualsAnyIgnoreCase(_)
        )
    }
}

/// Where a segment's capture ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndBoundary {
    /// Defers to the following segment's start boundary: this segment
    /// closes exactly where the next one opens.
    InheritFromNextSegment,
    /// The end coincides with the start (an `Equals*` start boundary
    /// already determined the whole span).
    SegmentFullyMatchedByStartBoundary,
    AtChar(u8),
    AtString(String),
    FixedLength(usize),
}
