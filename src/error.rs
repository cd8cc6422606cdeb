//! Error types for precision resolution and gradient scaling.

use thiserror::Error;

/// Errors raised by precision lookups, scaler construction and scaler steps
#[derive(Debug, Error)]
pub enum PrecisionError {
    #[error("Precision {name} not supported. Please use one of [{}]", quoted(.valid))]
    UnsupportedPrecision { name: String, valid: Vec<&'static str> },

    #[error("Invalid device: {0} (expected cpu, cuda or cuda:N)")]
    InvalidDevice(String),

    #[error("Invalid scaler option '{field}': {message}")]
    InvalidScalerOption { field: &'static str, message: String },

    #[error("unscale() has already been called on this scaler since the last update()")]
    AlreadyUnscaled,

    #[error("No inf checks were recorded before update(); call unscale() or step() first")]
    NoInfChecks,

    #[error("Collective operation failed: {0}")]
    Collective(String),

    #[error("Failed to parse mixed-precision config: {0}")]
    ConfigParsing(String),

    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

fn quoted(names: &[&str]) -> String {
    names.iter().map(|name| format!("'{name}'")).collect::<Vec<_>>().join(", ")
}

impl PrecisionError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Whether the error stems from user configuration rather than a runtime failure.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPrecision { .. }
                | Self::InvalidDevice(_)
                | Self::InvalidScalerOption { .. }
                | Self::ConfigParsing(_)
        )
    }
}

/// Result type for mixed-precision operations
pub type Result<T> = std::result::Result<T, PrecisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_precision_lists_valid_names() {
        let err = PrecisionError::UnsupportedPrecision {
            name: "fp8".to_string(),
            valid: vec!["fp16", "bf16", "fp32"],
        };
        assert_eq!(
            err.to_string(),
            "Precision fp8 not supported. Please use one of ['fp16', 'bf16', 'fp32']"
        );
    }

    #[test]
    fn test_is_config_error() {
        assert!(PrecisionError::InvalidDevice("tpu".into()).is_config_error());
        assert!(!PrecisionError::AlreadyUnscaled.is_config_error());
        assert!(!PrecisionError::Collective("timeout".into()).is_config_error());
    }

    #[test]
    fn test_io_error_keeps_context() {
        let err = PrecisionError::io(
            "reading amp.yaml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        let msg = err.to_string();
        assert!(msg.contains("reading amp.yaml"));
        assert!(msg.contains("missing"));
    }
}
