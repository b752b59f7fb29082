pub mod align;
pub mod detect;
pub mod encode;
pub mod face;
pub mod model;
pub mod pipeline;
pub mod yunet;

// Re-export commonly used types
pub use face::{Detection, Embedding, FaceSelection};
pub use pipeline::{embed_path, Embedder, Pipeline, PipelineOptions};
