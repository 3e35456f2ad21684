// Trained artifacts: storage, the three model families, and the start-up
// bootstrap that trains whatever is missing.

pub mod bootstrap;
pub mod classifier;
pub mod doc2vec;
pub mod lda;
pub mod store;
pub mod traits;

pub use store::{ArtifactKind, ArtifactStore};
pub use traits::{Trainer, TrainingReport};
