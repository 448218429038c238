use anyhow::{Context, Error as E, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::{trocr, vit};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::path::Path;
use std::time::Instant;
use tokenizers::Tokenizer;

use crate::generation::based::ModelForVision2Seq;
use crate::generation::GenerationConfig;
use crate::processor::ImageProcessor;
use crate::utils::token_output_stream::TokenOutputStream;
use crate::utils::{tokenizer_utils, utils};

/// Checkpoint used when the caller does not name one.
pub const DEFAULT_MODEL_ID: &str = "microsoft/trocr-base-handwritten";

/// `config.json` of a VisionEncoderDecoder checkpoint: a ViT encoder and a
/// TrOCR decoder section.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ModelConfig {
    pub encoder: vit::Config,
    pub decoder: trocr::TrOCRConfig,
}

/// A loaded TrOCR checkpoint: vision encoder, autoregressive text decoder,
/// tokenizer, and the image processor the checkpoint was trained with.
pub struct Model {
    pub tokenizer: TokenOutputStream,
    pub processor: ImageProcessor,
    pub device: Device,
    pub dtype: DType,
    config: ModelConfig,
    inner: trocr::TrOCRModel,
}

#[derive(Debug, Clone)]
pub struct OcrResult {
    pub text: String,
    pub tokens_generated: usize,
    pub duration_secs: f32,
}

impl Model {
    /// Loads a checkpoint by hub identifier, or from a local directory when
    /// the identifier names one.
    pub fn from_pretrained(
        model_id: &str,
        revision: Option<&str>,
        device: &Device,
        dtype: &DType,
    ) -> Result<Self> {
        let try_path = Path::new(model_id);
        if try_path.is_dir() {
            return Self::from_local(try_path, device, dtype);
        }

        tracing::info!(
            "loading {model_id} @ {} from the Hugging Face hub",
            revision.unwrap_or("main")
        );

        let api = Api::new()?;
        let repo = api.repo(Repo::with_revision(
            model_id.to_string(),
            RepoType::Model,
            revision.unwrap_or("main").to_string(),
        ));

        let config_path = repo.get("config.json")?;
        let config: ModelConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let processor = ImageProcessor::from_file(repo.get("preprocessor_config.json")?)?;

        // TrOCR checkpoints ship vocab.json + merges.txt rather than a
        // tokenizer.json; fetch whichever layout the repo has into the
        // snapshot directory and load from there.
        let tokenizer = match repo.get("tokenizer.json") {
            Ok(tokenizer_json) => Tokenizer::from_file(&tokenizer_json).map_err(E::msg)?,
            Err(_) => {
                let vocab = repo.get("vocab.json")?;
                repo.get("merges.txt")?;
                let _ = repo.get("tokenizer_config.json");
                let snapshot_dir = vocab
                    .parent()
                    .ok_or_else(|| anyhow::anyhow!("vocab.json has no parent directory"))?;
                tokenizer_utils::load_tokenizer_from_model_dir(snapshot_dir)?
            }
        };

        let model_file = repo
            .get("model.safetensors")
            .or_else(|_| repo.get("pytorch_model.bin"))?;

        Self::load(config, processor, tokenizer, &model_file, device, dtype)
    }

    /// Loads a checkpoint from a local directory laid out the way hub
    /// snapshots are.
    pub fn from_local(path: impl AsRef<Path>, device: &Device, dtype: &DType) -> Result<Self> {
        let base = path.as_ref();
        if !base.is_dir() {
            anyhow::bail!("Not a directory: {}", base.display());
        }

        let config_path = base.join("config.json");
        let config: ModelConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        let processor = ImageProcessor::from_file(base.join("preprocessor_config.json"))?;
        let tokenizer = tokenizer_utils::load_tokenizer_from_model_dir(base)?;

        let safetensors = base.join("model.safetensors");
        let pth = base.join("pytorch_model.bin");
        let model_file = if safetensors.exists() {
            safetensors
        } else if pth.exists() {
            pth
        } else if let Ok(shards) = utils::get_safetensors_files(base) {
            // sharded checkpoints: load every shard
            return Self::load_sharded(config, processor, tokenizer, &shards, device, dtype);
        } else {
            anyhow::bail!(
                "Neither model.safetensors nor pytorch_model.bin found in {}",
                base.display()
            );
        };

        Self::load(config, processor, tokenizer, &model_file, device, dtype)
    }

    fn load(
        config: ModelConfig,
        processor: ImageProcessor,
        tokenizer: Tokenizer,
        model_file: &Path,
        device: &Device,
        dtype: &DType,
    ) -> Result<Self> {
        tracing::info!("loading weights from {}", model_file.display());

        let vb = if model_file.extension().is_some_and(|ext| ext == "bin") {
            VarBuilder::from_pth(model_file, *dtype, device)?
        } else {
            unsafe { VarBuilder::from_mmaped_safetensors(&[model_file], *dtype, device)? }
        };

        let inner = trocr::TrOCRModel::new(&config.encoder, &config.decoder, vb)?;

        Ok(Self {
            tokenizer: TokenOutputStream::new(tokenizer),
            processor,
            device: device.clone(),
            dtype: *dtype,
            config,
            inner,
        })
    }

    fn load_sharded(
        config: ModelConfig,
        processor: ImageProcessor,
        tokenizer: Tokenizer,
        shards: &[std::path::PathBuf],
        device: &Device,
        dtype: &DType,
    ) -> Result<Self> {
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(shards, *dtype, device)? };
        let inner = trocr::TrOCRModel::new(&config.encoder, &config.decoder, vb)?;
        Ok(Self {
            tokenizer: TokenOutputStream::new(tokenizer),
            processor,
            device: device.clone(),
            dtype: *dtype,
            config,
            inner,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Image file → pixel tensor on the model's device and dtype.
    pub fn preprocess(&self, image_path: &Path) -> Result<Tensor> {
        let pixel_values = self.processor.preprocess(image_path, &self.device)?;
        Ok(pixel_values.to_dtype(self.dtype)?)
    }

    /// Strips the seed token and everything from EOS on, then decodes.
    pub fn decode_generated(&self, tokens: &[u32]) -> Result<String> {
        let eos = self.config.decoder.eos_token_id as u32;
        let generated: Vec<u32> = tokens
            .iter()
            .skip(1)
            .copied()
            .take_while(|&t| t != eos)
            .collect();
        let text = self
            .tokenizer
            .tokenizer()
            .decode(&generated, true)
            .map_err(|e| anyhow::anyhow!("Tokenizer decode failed: {}", e))?;
        Ok(text.trim().to_string())
    }

    /// End-to-end recognition of one image file.
    pub fn recognize(
        &mut self,
        image_path: impl AsRef<Path>,
        config: &GenerationConfig,
    ) -> Result<OcrResult> {
        let start = Instant::now();

        let pixel_values = self.preprocess(image_path.as_ref())?;
        let tokens = self.generate(&pixel_values, config, None)?;
        let text = self.decode_generated(&tokens)?;

        Ok(OcrResult {
            text,
            tokens_generated: tokens.len().saturating_sub(1),
            duration_secs: start.elapsed().as_secs_f32(),
        })
    }
}

impl ModelForVision2Seq for Model {
    fn device(&self) -> &Device {
        &self.device
    }

    fn decoder_start_token_id(&self) -> u32 {
        self.config.decoder.decoder_start_token_id as u32
    }

    fn eos_token_id(&self) -> u32 {
        self.config.decoder.eos_token_id as u32
    }

    fn encode(&mut self, pixel_values: &Tensor) -> Result<Tensor> {
        Ok(self.inner.encoder().forward(pixel_values)?)
    }

    fn decode_step(
        &mut self,
        input_ids: &[u32],
        encoder_xs: &Tensor,
        start_pos: usize,
    ) -> Result<Tensor> {
        let input = Tensor::new(input_ids, &self.device)?.unsqueeze(0)?;
        let logits = self.inner.decode(&input, encoder_xs, start_pos)?;
        let logits = logits.squeeze(0)?;
        let last = logits.get(logits.dim(0)? - 1)?;
        Ok(last)
    }

    fn reset_state(&mut self) {
        self.inner.reset_kv_cache();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Abridged from the microsoft/trocr-base-handwritten checkpoint.
    const CONFIG_JSON: &str = r#"{
        "architectures": ["VisionEncoderDecoderModel"],
        "decoder": {
            "activation_dropout": 0.0,
            "activation_function": "gelu",
            "add_cross_attention": true,
            "attention_dropout": 0.0,
            "bos_token_id": 0,
            "classifier_dropout": 0.0,
            "cross_attention_hidden_size": 768,
            "d_model": 1024,
            "decoder_attention_heads": 16,
            "decoder_ffn_dim": 4096,
            "decoder_layerdrop": 0.0,
            "decoder_layers": 12,
            "decoder_start_token_id": 2,
            "dropout": 0.1,
            "eos_token_id": 2,
            "init_std": 0.02,
            "is_decoder": true,
            "layernorm_embedding": true,
            "max_position_embeddings": 512,
            "model_type": "trocr",
            "pad_token_id": 1,
            "scale_embedding": false,
            "use_cache": false,
            "use_learned_position_embeddings": true,
            "vocab_size": 50265
        },
        "encoder": {
            "attention_probs_dropout_prob": 0.0,
            "encoder_stride": 16,
            "hidden_act": "gelu",
            "hidden_dropout_prob": 0.0,
            "hidden_size": 768,
            "image_size": 384,
            "initializer_range": 0.02,
            "intermediate_size": 3072,
            "layer_norm_eps": 1e-12,
            "model_type": "vit",
            "num_attention_heads": 12,
            "num_channels": 3,
            "num_hidden_layers": 12,
            "patch_size": 16,
            "qkv_bias": false
        },
        "model_type": "vision-encoder-decoder",
        "tie_word_embeddings": false
    }"#;

    #[test]
    fn checkpoint_config_parses() {
        let config: ModelConfig = serde_json::from_str(CONFIG_JSON).unwrap();
        assert_eq!(config.decoder.decoder_start_token_id as u32, 2);
        assert_eq!(config.decoder.eos_token_id as u32, 2);
        assert_eq!(config.decoder.vocab_size, 50265);
        assert_eq!(config.encoder.image_size, 384);
        assert_eq!(config.encoder.num_hidden_layers, 12);
    }
}
