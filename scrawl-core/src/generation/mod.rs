pub mod based;
pub mod streamer;

/// Parameters for the autoregressive decoding loop.
///
/// The defaults reproduce plain greedy decoding: no temperature, no nucleus
/// sampling, no repeat penalty.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Hard cap on generated tokens per sequence.
    pub max_new_tokens: usize,
    /// Sampling temperature. `None` selects argmax decoding.
    pub temperature: Option<f64>,
    /// Nucleus sampling probability mass.
    pub top_p: Option<f64>,
    /// Penalty applied to recently generated tokens. 1.0 disables it.
    pub repetition_penalty: f32,
    /// Window of trailing tokens the penalty looks at.
    pub repeat_last_n: usize,
    /// Overrides the model's own end-of-sequence token when set.
    pub eos_token_id: Option<u32>,
    /// Seed for the sampling RNG.
    pub seed: u64,
    /// Log tokens/s after generation finishes.
    pub report_speed: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 256,
            temperature: None,
            top_p: None,
            repetition_penalty: 1.0,
            repeat_last_n: 64,
            eos_token_id: None,
            seed: 299792458,
            report_speed: false,
        }
    }
}

impl GenerationConfig {
    pub fn with_max_tokens(max_new_tokens: usize) -> Self {
        Self {
            max_new_tokens,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_greedy() {
        let config = GenerationConfig::default();
        assert!(config.temperature.is_none());
        assert!(config.top_p.is_none());
        assert_eq!(config.repetition_penalty, 1.0);
        assert!(config.eos_token_id.is_none());
    }

    #[test]
    fn with_max_tokens_overrides_only_the_cap() {
        let config = GenerationConfig::with_max_tokens(7);
        assert_eq!(config.max_new_tokens, 7);
        assert!(config.temperature.is_none());
    }
}
