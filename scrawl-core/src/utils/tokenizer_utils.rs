use anyhow::{Context, Result};
use std::path::Path;
use tokenizers::models::bpe::BPE;
use tokenizers::pre_tokenizers::byte_level::ByteLevel as ByteLevelPreTokenizer;
use tokenizers::{AddedToken, Tokenizer};

#[derive(Debug, serde::Deserialize)]
struct TokenSpec {
    content: String,
    #[serde(default)]
    lstrip: bool,
    #[serde(default)]
    rstrip: bool,
    #[serde(default)]
    normalized: bool,
    #[serde(default)]
    single_word: bool,
    #[serde(default)]
    special: bool,
}

/// Special tokens appear either as bare strings or as AddedToken objects,
/// depending on the transformers version that exported the checkpoint.
#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
enum MaybeToken {
    Str(String),
    Spec(TokenSpec),
}

#[derive(Debug, serde::Deserialize, Default)]
struct TokenizerConfigLike {
    #[serde(default)]
    added_tokens_decoder: std::collections::HashMap<String, TokenSpec>,
    #[serde(default)]
    bos_token: Option<MaybeToken>,
    #[serde(default)]
    eos_token: Option<MaybeToken>,
    #[serde(default)]
    sep_token: Option<MaybeToken>,
    #[serde(default)]
    cls_token: Option<MaybeToken>,
    #[serde(default)]
    mask_token: Option<MaybeToken>,
    #[serde(default)]
    pad_token: Option<MaybeToken>,
    #[serde(default)]
    unk_token: Option<MaybeToken>,
}

fn as_added_token(tok: &TokenSpec) -> AddedToken {
    AddedToken::from(tok.content.clone(), tok.special)
        .lstrip(tok.lstrip)
        .rstrip(tok.rstrip)
        .normalized(tok.normalized)
        .single_word(tok.single_word)
}

fn maybe_token_to_spec(tok: &MaybeToken) -> TokenSpec {
    match tok {
        MaybeToken::Str(s) => TokenSpec {
            content: s.clone(),
            lstrip: false,
            rstrip: false,
            normalized: true,
            single_word: false,
            special: true,
        },
        MaybeToken::Spec(o) => TokenSpec {
            content: o.content.clone(),
            lstrip: o.lstrip,
            rstrip: o.rstrip,
            normalized: o.normalized,
            single_word: o.single_word,
            special: true,
        },
    }
}

/// Builds a byte-level BPE tokenizer from vocab.json + merges.txt, the layout
/// TrOCR checkpoints ship in place of tokenizer.json.
fn load_bpe_tokenizer(dir: &Path) -> Result<Tokenizer> {
    let vocab = dir.join("vocab.json");
    let merges = dir.join("merges.txt");
    if !vocab.exists() || !merges.exists() {
        anyhow::bail!(
            "No supported tokenizer files in {}. Need tokenizer.json or vocab.json + merges.txt",
            dir.display()
        );
    }

    let vocab_str = vocab
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 path: {}", vocab.display()))?;
    let merges_str = merges
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 path: {}", merges.display()))?;

    let mut bpe_builder = BPE::from_file(vocab_str, merges_str);

    let config = read_tokenizer_config(dir)?;
    if let Some(config) = &config {
        if let Some(unk) = &config.unk_token {
            bpe_builder = bpe_builder.unk_token(maybe_token_to_spec(unk).content);
        }
    }

    let model = bpe_builder
        .build()
        .map_err(anyhow::Error::msg)
        .context("Failed to build BPE tokenizer from vocab.json/merges.txt")?;
    let mut tokenizer = Tokenizer::new(model);

    tokenizer.with_pre_tokenizer(Some(ByteLevelPreTokenizer::default()));
    tokenizer.with_decoder(Some(tokenizers::decoders::byte_level::ByteLevel::default()));

    // Register special tokens so that decode(skip_special_tokens) drops them.
    if let Some(config) = config {
        let mut tokens: Vec<AddedToken> = config
            .added_tokens_decoder
            .values()
            .map(as_added_token)
            .collect();

        for maybe in [
            config.bos_token,
            config.eos_token,
            config.sep_token,
            config.cls_token,
            config.mask_token,
            config.pad_token,
            config.unk_token,
        ]
        .into_iter()
        .flatten()
        {
            tokens.push(as_added_token(&maybe_token_to_spec(&maybe)));
        }

        if !tokens.is_empty() {
            tokenizer.add_special_tokens(&tokens);
        }
    }

    Ok(tokenizer)
}

fn read_tokenizer_config(dir: &Path) -> Result<Option<TokenizerConfigLike>> {
    let path = dir.join("tokenizer_config.json");
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(serde_json::from_str(&data).ok())
}

/// Loads the tokenizer from a checkpoint directory: tokenizer.json when
/// present, otherwise the vocab.json + merges.txt BPE layout.
pub fn load_tokenizer_from_model_dir<P: AsRef<Path>>(model_dir: P) -> Result<Tokenizer> {
    let model_dir = model_dir.as_ref();
    let tokenizer_json = model_dir.join("tokenizer.json");

    if tokenizer_json.exists() {
        return Tokenizer::from_file(&tokenizer_json)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Failed to load {}", tokenizer_json.display()));
    }

    load_bpe_tokenizer(model_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_token_becomes_special() {
        let spec = maybe_token_to_spec(&MaybeToken::Str("</s>".to_string()));
        assert_eq!(spec.content, "</s>");
        assert!(spec.special);
    }

    #[test]
    fn added_token_style_config_parses() {
        let json = r#"{
            "bos_token": {"__type": "AddedToken", "content": "<s>", "lstrip": false,
                          "normalized": true, "rstrip": false, "single_word": false},
            "eos_token": "</s>",
            "model_max_length": 512
        }"#;
        let config: TokenizerConfigLike = serde_json::from_str(json).unwrap();
        assert_eq!(
            maybe_token_to_spec(config.bos_token.as_ref().unwrap()).content,
            "<s>"
        );
        assert_eq!(
            maybe_token_to_spec(config.eos_token.as_ref().unwrap()).content,
            "</s>"
        );
    }

    #[test]
    fn empty_dir_is_an_error() {
        let dir = std::env::temp_dir().join(format!("scrawl-tok-{}-empty", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let result = load_tokenizer_from_model_dir(&dir);
        std::fs::remove_dir_all(&dir).ok();
        assert!(result.is_err());
    }
}
