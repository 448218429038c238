use crate::generation::{streamer::TokenStreamer, GenerationConfig};
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::LogitsProcessor;

/// An image-conditioned sequence generator: a vision encoder feeding an
/// autoregressive text decoder with a KV cache.
///
/// Implementors supply the encoder pass and a single decoder step; the
/// decoding loop itself is provided. The loop feeds the full seed context on
/// the first step and a single token afterwards, relying on the decoder's
/// cache for the rest.
pub trait ModelForVision2Seq {
    fn device(&self) -> &Device;

    /// Token the decoder is seeded with.
    fn decoder_start_token_id(&self) -> u32;

    /// Token that terminates generation.
    fn eos_token_id(&self) -> u32;

    /// Encode preprocessed pixel values into encoder hidden states.
    fn encode(&mut self, pixel_values: &Tensor) -> Result<Tensor>;

    /// One decoder step. Returns the logits for the last position as a 1-D
    /// vocabulary tensor.
    fn decode_step(
        &mut self,
        input_ids: &[u32],
        encoder_xs: &Tensor,
        start_pos: usize,
    ) -> Result<Tensor>;

    /// Clear decoder state (KV caches) before a fresh sequence.
    fn reset_state(&mut self) {}

    fn generate(
        &mut self,
        pixel_values: &Tensor,
        config: &GenerationConfig,
        mut streamer: Option<&mut dyn TokenStreamer>,
    ) -> Result<Vec<u32>> {
        self.reset_state();
        let encoder_xs = self.encode(pixel_values)?;

        let eos_token = config.eos_token_id.unwrap_or_else(|| self.eos_token_id());
        let mut logits_processor =
            LogitsProcessor::new(config.seed, config.temperature, config.top_p);

        let mut tokens = vec![self.decoder_start_token_id()];
        let mut generated_tokens = 0usize;
        let mut streamer_finalized = false;

        let start_gen = std::time::Instant::now();
        for index in 0..config.max_new_tokens {
            let context_size = if index > 0 { 1 } else { tokens.len() };
            let start_pos = tokens.len().saturating_sub(context_size);

            let logits = self.decode_step(&tokens[start_pos..], &encoder_xs, start_pos)?;
            let logits = logits.to_dtype(DType::F32)?;
            let logits = if config.repetition_penalty == 1. {
                logits
            } else {
                let start_at = tokens.len().saturating_sub(config.repeat_last_n);
                candle_transformers::utils::apply_repeat_penalty(
                    &logits,
                    config.repetition_penalty,
                    &tokens[start_at..],
                )?
            };

            let next_token = logits_processor.sample(&logits)?;
            tokens.push(next_token);
            generated_tokens += 1;

            if next_token == eos_token {
                if let Some(ref mut s) = streamer {
                    s.finalize()?;
                }
                streamer_finalized = true;
                break;
            }

            if let Some(ref mut s) = streamer {
                s.append(next_token)?;
            }
        }
        let dt = start_gen.elapsed();
        if let Some(ref mut s) = streamer {
            if !streamer_finalized {
                s.finalize()?;
            }
        }

        if config.report_speed {
            tracing::info!(
                "{generated_tokens} tokens generated ({:.2} token/s)",
                generated_tokens as f64 / dt.as_secs_f64(),
            );
        }

        Ok(tokens)
    }
}
