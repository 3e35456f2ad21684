// Topic grouping: sentence embeddings, density clustering and LDA labels.

pub mod dbscan;
pub mod grouping;

pub use dbscan::ClusterLabel;
pub use grouping::{GroupingResult, TopicGrouper};
