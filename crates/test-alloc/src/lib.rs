//! Support crate for exercising `memtrack` end to end.
//!
//! [`Arena`] is a tiny allocator that reports its blocks through any [`memtrack::Backend`],
//! and [`Recorder`] is a backend that logs every call and shadows per-byte access state so
//! tests can check what a real memory checker would have been told.

mod arena;
mod recorder;

pub use arena::{Arena, GRANULE};
pub use recorder::{Event, Recorder, Violation};
