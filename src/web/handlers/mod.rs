pub mod api;
pub mod classification;
pub mod mistral;
pub mod similarity;
