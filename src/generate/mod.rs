// Text generation behind `/mistral/query/`.

pub mod huggingface;
pub mod traits;

pub use huggingface::HuggingFaceGenerator;
pub use traits::{NoopGenerator, TextGenerator};
