use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Collects the safetensors shards of a checkpoint directory, sorted so that
/// multi-shard checkpoints load in a stable order.
pub fn get_safetensors_files(model_path: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let model_path = model_path.as_ref();
    let entries = std::fs::read_dir(model_path)
        .with_context(|| format!("Cannot read model directory {}", model_path.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "safetensors"))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No .safetensors files found in {}", model_path.display());
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_and_sorts_shards() -> Result<()> {
        let dir = std::env::temp_dir().join(format!("scrawl-st-{}-shards", std::process::id()));
        std::fs::create_dir_all(&dir)?;
        for name in ["model-00002.safetensors", "model-00001.safetensors", "config.json"] {
            std::fs::write(dir.join(name), b"")?;
        }

        let files = get_safetensors_files(&dir)?;
        std::fs::remove_dir_all(&dir).ok();

        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["model-00001.safetensors", "model-00002.safetensors"]);
        Ok(())
    }

    #[test]
    fn empty_dir_is_an_error() {
        let dir = std::env::temp_dir().join(format!("scrawl-st-{}-none", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let result = get_safetensors_files(&dir);
        std::fs::remove_dir_all(&dir).ok();
        assert!(result.is_err());
    }
}
