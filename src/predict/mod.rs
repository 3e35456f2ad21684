// Score prediction for `/predict`: a local ONNX sentiment model when one is
// installed, otherwise the trained classifier's positive-class probability.

pub mod download;
pub mod onnx;
pub mod sentiment;
pub mod traits;

pub use traits::Predictor;
