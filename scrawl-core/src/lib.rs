//! # scrawl-core
//!
//! Core inference library for Scrawl: handwritten-text recognition in Rust
//! on top of the [Candle](https://github.com/huggingface/candle) framework.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |---|---|
//! | [`models`] | TrOCR vision-encoder-decoder wrapper (hub/local loading, recognition) |
//! | [`processor`] | `preprocessor_config.json`-driven image-to-tensor preprocessing |
//! | [`generation`] | Token generation (config, decoding loop, streaming seam) |
//! | [`utils`] | Device selection, image/tokenizer helpers, incremental decoding |
//!
//! ## Feature flags
//!
//! | Flag | Effect |
//! |---|---|
//! | `cuda` | Enable the CUDA device (requires CUDA toolkit) |
//! | `metal` | Enable the Metal device on macOS |
//! | `accelerate` | Link against Apple Accelerate for CPU BLAS |
//! | `mkl` | Link against Intel MKL for CPU BLAS |

#[cfg(feature = "mkl")]
extern crate intel_mkl_src;

#[cfg(feature = "accelerate")]
extern crate accelerate_src;

pub mod generation;
pub mod models;
pub mod processor;
pub mod utils;
