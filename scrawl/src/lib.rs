//! # scrawl
//!
//! SDK surface over [`scrawl_core`]: a configuration struct, a typed error,
//! and an [`ocr::OcrClient`] that recognizes handwritten text in images.
//!
//! ```no_run
//! use scrawl::prelude::*;
//!
//! fn main() -> ScrawlResult<()> {
//!     let mut client = OcrClient::new(CommonConfig::default())?;
//!     let text = client.extract_text_from_image("note.png", &GenerationConfig::default())?;
//!     println!("{text}");
//!     Ok(())
//! }
//! ```

pub mod common;
pub mod ocr;
pub mod prelude;
