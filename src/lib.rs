// Quill: a small NLP service.
//
// This is the library root. Each module corresponds to one subsystem: text
// cleaning and similarity, training corpora, the trained models and their
// bootstrap, topic grouping, score prediction, text generation, and the
// HTTP layer that ties them together.

pub mod config;
pub mod corpus;
pub mod generate;
pub mod models;
pub mod output;
pub mod predict;
pub mod text;
pub mod topics;
pub mod web;
