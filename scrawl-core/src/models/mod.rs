pub mod trocr;

pub use candle_core;
pub use candle_core::Tensor;
pub use candle_core::{DType, Device};
