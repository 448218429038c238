use serde::{Deserialize, Serialize};

/// Common configuration for the Scrawl SDK
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommonConfig {
    /// Checkpoint to load: a Hugging Face hub id or a local directory
    pub model_id: String,

    /// Hub revision to pull the checkpoint from (defaults to `main`)
    pub revision: Option<String>,

    /// Device to run the model on (CPU/GPU)
    pub device: DeviceConfig,

    /// Data type for computations
    pub dtype: DataType,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            model_id: scrawl_core::models::trocr::DEFAULT_MODEL_ID.to_string(),
            revision: None,
            device: DeviceConfig::Cpu,
            dtype: DataType::F32,
        }
    }
}

/// Device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeviceConfig {
    Cpu,
    Cuda(u32), // GPU ID
    Metal,
}

impl std::fmt::Display for DeviceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceConfig::Cpu => write!(f, "Cpu"),
            DeviceConfig::Cuda(gpu_id) => write!(f, "Cuda({})", gpu_id),
            DeviceConfig::Metal => write!(f, "Metal"),
        }
    }
}

/// Data type configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DataType {
    F16,
    F32,
    BF16,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::F16 => write!(f, "F16"),
            DataType::F32 => write!(f, "F32"),
            DataType::BF16 => write!(f, "BF16"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_targets_the_handwritten_checkpoint_on_cpu() {
        let config = CommonConfig::default();
        assert_eq!(config.model_id, "microsoft/trocr-base-handwritten");
        assert!(config.revision.is_none());
        assert_eq!(config.device.to_string(), "Cpu");
        assert_eq!(config.dtype.to_string(), "F32");
    }

    #[test]
    fn device_display() {
        assert_eq!(DeviceConfig::Cuda(1).to_string(), "Cuda(1)");
        assert_eq!(DeviceConfig::Metal.to_string(), "Metal");
    }
}
