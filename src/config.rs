//! Configuration for mixed-precision training
//!
//! ```yaml
//! precision: fp16
//! legacy_sharded: false
//! scaler:
//!   init_scale: 65536.0
//!   growth_interval: 2000
//! ```

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PrecisionError, Result};
use crate::precision::{precision_to_dtype, Dtype, Precision};
use crate::scaler::{select_grad_scaler_with, GradScalerKind, ScalerOptions};

/// Mixed-precision section of a training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixedPrecisionConfig {
    /// Precision name: fp16, bf16 or fp32
    pub precision: String,
    /// Whether the model is wrapped by first-generation sharded data parallelism
    #[serde(default)]
    pub legacy_sharded: bool,
    /// Loss-scaling hyper-parameters, used only when a scaler is selected
    #[serde(default)]
    pub scaler: ScalerOptions,
}

impl MixedPrecisionConfig {
    /// Config for a given precision with default scaler options
    pub fn new(precision: Precision) -> Self {
        Self {
            precision: precision.name().to_string(),
            legacy_sharded: false,
            scaler: ScalerOptions::default(),
        }
    }

    /// Create fp32 config (no mixed precision)
    pub fn fp32() -> Self {
        Self::new(Precision::Fp32)
    }

    /// Create fp16 mixed-precision config
    pub fn fp16() -> Self {
        Self::new(Precision::Fp16)
    }

    /// Create bf16 mixed-precision config
    pub fn bf16() -> Self {
        Self::new(Precision::Bf16)
    }

    /// Mark the model as legacy-sharded
    pub fn with_legacy_sharded(mut self, legacy_sharded: bool) -> Self {
        self.legacy_sharded = legacy_sharded;
        self
    }

    /// Replace the scaler options
    pub fn with_scaler(mut self, scaler: ScalerOptions) -> Self {
        self.scaler = scaler;
        self
    }

    /// Parse from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| PrecisionError::ConfigParsing(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .map_err(|e| PrecisionError::io(format!("reading {}", path.display()), e))?;
        debug!("loaded mixed-precision config from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    /// Parsed precision
    pub fn precision(&self) -> Result<Precision> {
        self.precision.parse()
    }

    /// Reduced-precision descriptor for autocast, `None` for fp32
    pub fn dtype(&self) -> Result<Option<Dtype>> {
        precision_to_dtype(&self.precision)
    }

    /// Whether mixed precision is enabled
    pub fn is_mixed(&self) -> Result<bool> {
        Ok(self.dtype()?.is_some())
    }

    /// Check the precision name, and the scaler options when a scaler will be used
    pub fn validate(&self) -> Result<()> {
        if self.dtype()?.is_some_and(|dtype| dtype.needs_loss_scaling()) {
            self.scaler.validate()?;
        }
        Ok(())
    }

    /// Build the gradient scaler for this configuration, if any
    pub fn build_scaler(&self) -> Result<Option<GradScalerKind>> {
        select_grad_scaler_with(self.dtype()?, self.legacy_sharded, &self.scaler)
    }
}

impl Default for MixedPrecisionConfig {
    fn default() -> Self {
        Self::fp32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_presets() {
        assert!(!MixedPrecisionConfig::fp32().is_mixed().unwrap());
        assert!(MixedPrecisionConfig::fp16().is_mixed().unwrap());
        assert_eq!(MixedPrecisionConfig::bf16().precision().unwrap(), Precision::Bf16);
        assert_eq!(MixedPrecisionConfig::default(), MixedPrecisionConfig::fp32());
    }

    #[test]
    fn test_minimal_yaml() {
        let config = MixedPrecisionConfig::from_yaml_str("precision: fp16").unwrap();
        assert_eq!(config.dtype().unwrap(), Some(Dtype::Float16));
        assert!(!config.legacy_sharded);
        assert_eq!(config.scaler, ScalerOptions::default());
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
precision: fp16
legacy_sharded: true
scaler:
  init_scale: 1024.0
  growth_factor: 4.0
  backoff_factor: 0.25
  growth_interval: 100
"#;
        let config = MixedPrecisionConfig::from_yaml_str(yaml).unwrap();
        assert!(config.legacy_sharded);
        assert_eq!(config.scaler.growth_interval, 100);

        let scaler = config.build_scaler().unwrap().unwrap();
        assert!(scaler.is_sharded());
        assert_eq!(scaler.scale(), 1024.0);
    }

    #[test]
    fn test_unknown_precision_rejected() {
        let err = MixedPrecisionConfig::from_yaml_str("precision: fp8").unwrap_err();
        assert!(matches!(err, PrecisionError::UnsupportedPrecision { .. }));
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        let err = MixedPrecisionConfig::from_yaml_str("precision: [fp16").unwrap_err();
        assert!(matches!(err, PrecisionError::ConfigParsing(_)));
        let err = MixedPrecisionConfig::from_yaml_str("legacy_sharded: true").unwrap_err();
        assert!(matches!(err, PrecisionError::ConfigParsing(_)));
    }

    #[test]
    fn test_scaler_options_ignored_without_fp16() {
        let yaml = "precision: bf16\nscaler:\n  init_scale: -5.0\n";
        let config = MixedPrecisionConfig::from_yaml_str(yaml).unwrap();
        assert!(config.build_scaler().unwrap().is_none());

        let yaml = "precision: fp16\nscaler:\n  init_scale: -5.0\n";
        let err = MixedPrecisionConfig::from_yaml_str(yaml).unwrap_err();
        assert!(matches!(err, PrecisionError::InvalidScalerOption { field: "init_scale", .. }));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "precision: fp16\nlegacy_sharded: false").unwrap();
        let config = MixedPrecisionConfig::from_yaml_file(file.path()).unwrap();
        let scaler = config.build_scaler().unwrap().unwrap();
        assert!(!scaler.is_sharded());
    }

    #[test]
    fn test_from_missing_file() {
        let err = MixedPrecisionConfig::from_yaml_file("/nonexistent/amp.yaml").unwrap_err();
        assert!(matches!(err, PrecisionError::Io { .. }));
    }

    #[test]
    fn test_yaml_roundtrip_through_builders() {
        let config = MixedPrecisionConfig::fp16()
            .with_legacy_sharded(true)
            .with_scaler(ScalerOptions::default().with_growth_interval(50));
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert_eq!(MixedPrecisionConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
