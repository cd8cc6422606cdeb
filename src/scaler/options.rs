//! Hyper-parameters and serialized state for dynamic loss scaling.

use serde::{Deserialize, Serialize};

use crate::error::{PrecisionError, Result};

/// Initial loss scale, 2^16
pub const DEFAULT_INIT_SCALE: f32 = 65536.0;

/// Default number of successful steps before the loss scale is increased
pub const DEFAULT_GROWTH_INTERVAL: usize = 2000;

/// Dynamic loss-scaling hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerOptions {
    /// Initial loss scale factor
    pub init_scale: f32,
    /// Factor to increase scale by after `growth_interval` clean steps
    pub growth_factor: f32,
    /// Factor to decrease scale by on overflow
    pub backoff_factor: f32,
    /// Number of consecutive clean steps before increasing scale
    pub growth_interval: usize,
    /// Disabled scalers pass losses and gradients through untouched
    pub enabled: bool,
}

impl ScalerOptions {
    /// Set initial loss scale
    pub fn with_init_scale(mut self, scale: f32) -> Self {
        self.init_scale = scale;
        self
    }

    /// Set growth interval
    pub fn with_growth_interval(mut self, interval: usize) -> Self {
        self.growth_interval = interval;
        self
    }

    /// Enable/disable scaling
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check every hyper-parameter is in range
    pub fn validate(&self) -> Result<()> {
        if !(self.init_scale.is_finite() && self.init_scale > 0.0) {
            return Err(invalid("init_scale", format!("{} (must be finite and > 0.0)", self.init_scale)));
        }
        if !(self.growth_factor.is_finite() && self.growth_factor > 1.0) {
            return Err(invalid("growth_factor", format!("{} (must be > 1.0)", self.growth_factor)));
        }
        if !(self.backoff_factor > 0.0 && self.backoff_factor < 1.0) {
            return Err(invalid(
                "backoff_factor",
                format!("{} (must be in (0.0, 1.0))", self.backoff_factor),
            ));
        }
        if self.growth_interval == 0 {
            return Err(invalid("growth_interval", "0 (must be > 0)".to_string()));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, message: String) -> PrecisionError {
    PrecisionError::InvalidScalerOption { field, message }
}

impl Default for ScalerOptions {
    fn default() -> Self {
        Self {
            init_scale: DEFAULT_INIT_SCALE,
            growth_factor: 2.0,
            backoff_factor: 0.5,
            growth_interval: DEFAULT_GROWTH_INTERVAL,
            enabled: true,
        }
    }
}

/// Checkpointable scaler state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    /// Current loss scale
    pub scale: f32,
    /// Growth factor
    pub growth_factor: f32,
    /// Backoff factor
    pub backoff_factor: f32,
    /// Growth interval
    pub growth_interval: usize,
    /// Consecutive clean steps since the last scale change
    pub growth_tracker: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_valid() {
        let options = ScalerOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.init_scale, 65536.0);
        assert_eq!(options.growth_interval, 2000);
        assert!(options.enabled);
    }

    #[test]
    fn test_invalid_options() {
        let cases = [
            (ScalerOptions::default().with_init_scale(0.0), "init_scale"),
            (ScalerOptions::default().with_init_scale(f32::INFINITY), "init_scale"),
            (ScalerOptions { growth_factor: 1.0, ..Default::default() }, "growth_factor"),
            (ScalerOptions { backoff_factor: 1.0, ..Default::default() }, "backoff_factor"),
            (ScalerOptions { backoff_factor: 0.0, ..Default::default() }, "backoff_factor"),
            (ScalerOptions::default().with_growth_interval(0), "growth_interval"),
        ];
        for (options, expected) in cases {
            match options.validate() {
                Err(PrecisionError::InvalidScalerOption { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected {expected} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_options_partial_yaml() {
        let options: ScalerOptions = serde_yaml::from_str("growth_interval: 10").unwrap();
        assert_eq!(options.growth_interval, 10);
        assert_eq!(options.init_scale, DEFAULT_INIT_SCALE);
    }
}
