//! `cascade-route`: a multi-tier cache cascade and a linear-time routing
//! expression engine, extracted from image-serving infrastructure.
//!
//! The two subsystems are independent and can be used separately:
//!
//! - [`cache`] implements the tiered read-through/write-behind cache
//!   cascade: bloom-gated remote tiers, request coalescing, and a
//!   byte-bounded asynchronous upload queue.
//! - [`routing`] implements the non-backtracking URL matcher and template
//!   rewriter compiled from a compact DSL.
//!
//! Neither module talks to an HTTP stack, a concrete storage backend, or a
//! configuration file format directly; callers wire those in through the
//! narrow collaborator traits each module exposes.

pub mod cache;
pub mod config;
pub mod routing;
pub mod telemetry;
