pub use crate::common::config::{CommonConfig, DataType, DeviceConfig};
pub use crate::common::{ScrawlError, ScrawlResult};
pub use crate::ocr::OcrClient;

pub use scrawl_core::generation::GenerationConfig;
pub use scrawl_core::models::trocr::{OcrResult, DEFAULT_MODEL_ID};
