//! Shared configuration types for docsync tasks.

mod batch;
mod transform;

pub use batch::BatchConfig;
pub use transform::{MappingEntryConfig, TransformConfig, ValidationError};
