//! Template output safety checks: a rendered
//! path must not escape its intended root via traversal, drive letters, or
//! control characters smuggled through percent-encoding.

use super::error::{RoutingError, RoutingParseResult};

/// Validates a fully rendered path segment before it is handed back to a
/// caller. Percent-decodes first (bounded — malformed escapes are left
/// as-is) so a caller can't smuggle `..` or a null byte past the raw
/// scan.
pub fn validate_rendered_path(rendered: &str) -> RoutingParseResult<()> {
    let decoded = percent_decode_lossy(rendered);

    if decoded.bytes().any(|b| b == 0 || (b < 0x20 && b != b'\t')) {
        return Err(RoutingError::SafetyViolation("control character in rendered path".to_string()));
    }
    if decoded.len() >= 2 && decoded.as_bytes()[1] == b':' && decoded.as_bytes()[0].is_ascii_alphabetic() {
        return Err(RoutingError::SafetyViolation("drive letter in rendered path".to_string()));
    }
    for segment in decoded.split(['/', '\\']) {
        if segment == ".." {
            return Err(RoutingError::SafetyViolation("path traversal segment in rendered path".to_string()));
        }
    }
    Ok(())
}

fn percent_decode_lossy(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
