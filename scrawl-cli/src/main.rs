use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use scrawl::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "scrawl",
    about = "Recognize handwritten text in an image with a TrOCR checkpoint"
)]
struct Args {
    /// Path to the image to recognize
    image: PathBuf,

    /// Checkpoint: a Hugging Face hub id or a local directory
    #[arg(long, default_value = DEFAULT_MODEL_ID)]
    model_id: String,

    /// Hub revision to pull the checkpoint from
    #[arg(long)]
    revision: Option<String>,

    /// Use CPU even if a GPU is available
    #[arg(long)]
    cpu: bool,

    /// Cap on generated tokens
    #[arg(long, default_value_t = 256)]
    max_new_tokens: usize,

    /// Sampling temperature (argmax decoding when absent)
    #[arg(long)]
    temperature: Option<f64>,

    /// Nucleus sampling probability mass
    #[arg(long)]
    top_p: Option<f64>,

    /// Seed for the sampling RNG
    #[arg(long, default_value_t = 299792458)]
    seed: u64,

    /// Print token pieces as they are generated
    #[arg(long)]
    stream: bool,

    /// Log generation speed when done
    #[arg(long)]
    report_speed: bool,
}

fn main() -> Result<()> {
    // Diagnostics go to stderr; stdout carries only the recognized text.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = CommonConfig {
        model_id: args.model_id,
        revision: args.revision,
        device: if args.cpu {
            DeviceConfig::Cpu
        } else {
            DeviceConfig::Cuda(0)
        },
        dtype: DataType::F32,
    };

    let gen_config = GenerationConfig {
        max_new_tokens: args.max_new_tokens,
        temperature: args.temperature,
        top_p: args.top_p,
        seed: args.seed,
        report_speed: args.report_speed,
        ..GenerationConfig::default()
    };

    let mut client = OcrClient::new(config)?;

    info!("recognizing {}", args.image.display());

    if args.stream {
        client.extract_text_from_image_stream(&args.image, &gen_config, |piece| {
            print!("{piece}");
            let _ = std::io::stdout().flush();
        })?;
        println!();
    } else {
        let result = client.recognize(&args.image, &gen_config)?;
        info!(
            "{} tokens in {:.2}s",
            result.tokens_generated, result.duration_secs
        );
        println!("{}", result.text);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_surface_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn image_argument_is_required() {
        let result = Args::try_parse_from(["scrawl"]);
        assert!(result.is_err());
    }

    #[test]
    fn defaults_match_the_handwritten_checkpoint() {
        let args = Args::try_parse_from(["scrawl", "note.png"]).unwrap();
        assert_eq!(args.model_id, "microsoft/trocr-base-handwritten");
        assert!(!args.cpu);
        assert_eq!(args.max_new_tokens, 256);
        assert!(args.temperature.is_none());
    }
}
