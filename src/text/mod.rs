// Text processing: the shared cleaning step and string similarity metrics.
//
// Every model in the crate consumes token sequences produced by
// `normalize::normalize`, so a document is always cleaned the same way
// whether it is being trained on or classified.

pub mod lemma;
pub mod normalize;
pub mod similarity;

pub use normalize::{is_stopword, normalize, normalize_with, NormalizeMethod};
