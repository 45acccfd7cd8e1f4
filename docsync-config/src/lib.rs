//! Shared configuration types for docsync tasks.
//!
//! Provides the serde-deserializable configuration structures consumed by the
//! transform engine, together with a hierarchical loader that merges a base
//! file, an environment-specific file, and `APP_`-prefixed environment
//! variable overrides.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{LoadConfigError, load_config};
