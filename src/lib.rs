pub mod config;
pub mod dataset;
pub mod eval;
pub mod gallery;
pub mod report;
pub mod score;

// Re-export vision types for convenience
pub use faceval_vision::{embed_path, face, Embedder, Embedding, Pipeline, PipelineOptions};
