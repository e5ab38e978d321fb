pub mod chunking;
pub mod extraction;
pub mod pipeline;

pub use pipeline::IngestionPipeline;
