use crate::common::{
    config::{CommonConfig, DataType, DeviceConfig},
    ScrawlError, ScrawlResult,
};
use scrawl_core::generation::based::ModelForVision2Seq;
use scrawl_core::generation::streamer::{AsyncTextStreamer, StreamerMessage, TokenStreamer};
use scrawl_core::generation::GenerationConfig;
use scrawl_core::models::trocr;
use scrawl_core::utils::token_output_stream::TokenOutputStream;
use std::path::Path;

/// Handwritten-text recognition client
pub struct OcrClient {
    config: CommonConfig,
    model: trocr::Model,
}

impl OcrClient {
    /// Create a new OCR client with the given configuration
    pub fn new(config: CommonConfig) -> ScrawlResult<Self> {
        let device = match &config.device {
            DeviceConfig::Cpu => scrawl_core::models::Device::Cpu,
            DeviceConfig::Cuda(gpu_id) => {
                scrawl_core::models::Device::cuda_if_available(*gpu_id as usize)
                    .map_err(|e| ScrawlError::ModelError(e.to_string()))?
            }
            DeviceConfig::Metal => {
                #[cfg(target_os = "macos")]
                {
                    scrawl_core::models::Device::new_metal(0)
                        .map_err(|e| ScrawlError::ModelError(e.to_string()))?
                }
                #[cfg(not(target_os = "macos"))]
                {
                    return Err(ScrawlError::ConfigError(
                        "Metal device not available on this platform".to_string(),
                    ));
                }
            }
        };

        let dtype = match (&config.device, &config.dtype) {
            (DeviceConfig::Cpu, _) => scrawl_core::models::DType::F32,
            (_, DataType::F16) => scrawl_core::models::DType::F16,
            (_, DataType::F32) => scrawl_core::models::DType::F32,
            (_, DataType::BF16) => scrawl_core::models::DType::BF16,
        };

        let model = trocr::Model::from_pretrained(
            &config.model_id,
            config.revision.as_deref(),
            &device,
            &dtype,
        )
        .map_err(|e| ScrawlError::ModelError(e.to_string()))?;

        tracing::info!(
            "model {} ready on {} ({})",
            config.model_id,
            config.device,
            config.dtype
        );

        Ok(Self { config, model })
    }

    pub fn config(&self) -> &CommonConfig {
        &self.config
    }

    /// Recognize the text in an image file
    pub fn extract_text_from_image<P: AsRef<Path>>(
        &mut self,
        image_path: P,
        gen_config: &GenerationConfig,
    ) -> ScrawlResult<String> {
        Ok(self.recognize(image_path, gen_config)?.text)
    }

    /// Recognize with timing and token statistics
    pub fn recognize<P: AsRef<Path>>(
        &mut self,
        image_path: P,
        gen_config: &GenerationConfig,
    ) -> ScrawlResult<trocr::OcrResult> {
        self.model
            .recognize(image_path.as_ref(), gen_config)
            .map_err(|e| ScrawlError::ModelError(e.to_string()))
    }

    /// Recognize with streaming: `callback` receives each decoded text piece
    /// as the model emits it. Returns the full recognized text.
    pub fn extract_text_from_image_stream<P, F>(
        &mut self,
        image_path: P,
        gen_config: &GenerationConfig,
        callback: F,
    ) -> ScrawlResult<String>
    where
        P: AsRef<Path>,
        F: Fn(&str) + Send,
    {
        let mut piece_stream = TokenOutputStream::new(self.model.tokenizer.tokenizer().clone());
        let (mut streamer, receiver) =
            AsyncTextStreamer::new(Box::new(move |token_id| piece_stream.next_token(token_id)));

        let pixel_values = self
            .model
            .preprocess(image_path.as_ref())
            .map_err(|e| ScrawlError::ImageError(e.to_string()))?;

        let gen_result = std::thread::scope(|scope| {
            let consumer = scope.spawn(move || {
                while let Ok(message) = receiver.recv() {
                    match message {
                        StreamerMessage::Token(piece) => callback(&piece),
                        StreamerMessage::End => break,
                    }
                }
            });

            let result = self
                .model
                .generate(&pixel_values, gen_config, Some(&mut streamer));
            // End is sent exactly once; this unblocks the consumer when
            // generation bailed out before finalizing.
            let _ = streamer.finalize();
            let _ = consumer.join();
            result
        });

        let tokens = gen_result.map_err(|e| ScrawlError::ModelError(e.to_string()))?;
        self.model
            .decode_generated(&tokens)
            .map_err(|e| ScrawlError::TokenizationError(e.to_string()))
    }
}
