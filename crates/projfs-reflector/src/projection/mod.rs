//! Placeholder metadata and file-data hydration.

pub mod alignment;
mod hydration;
pub mod types;

pub use alignment::{AlignedRange, MAX_CHUNK_SIZE};
pub use hydration::HydrationPipeline;
pub use types::{FileDataRequest, PlaceholderDescriptor, PLACEHOLDER_ID_LENGTH};
