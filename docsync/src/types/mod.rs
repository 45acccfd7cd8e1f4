//! Common types used throughout the transform engine.
//!
//! Re-exports the logical clock, document, mutation event, and action record
//! types shared across the merge and projection stages.

mod action;
mod clock;
mod document;
mod event;

pub use action::*;
pub use clock::*;
pub use document::*;
pub use event::*;
