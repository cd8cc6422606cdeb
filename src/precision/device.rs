//! Accelerator device a scaler is bound to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PrecisionError;

/// Device whose kernels run the scaled backward pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    /// Host CPU
    Cpu,
    /// CUDA device by ordinal
    Cuda(usize),
}

impl Device {
    /// Default accelerator, `cuda:0`
    pub fn cuda() -> Self {
        Device::Cuda(0)
    }

    /// Whether this device is an accelerator
    pub fn is_accelerator(&self) -> bool {
        matches!(self, Device::Cuda(_))
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::cuda()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}

impl FromStr for Device {
    type Err = PrecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::cuda()),
            _ => s
                .strip_prefix("cuda:")
                .and_then(|ordinal| ordinal.parse().ok())
                .map(Device::Cuda)
                .ok_or_else(|| PrecisionError::InvalidDevice(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_parse() {
        assert_eq!("cpu".parse::<Device>().unwrap(), Device::Cpu);
        assert_eq!("cuda".parse::<Device>().unwrap(), Device::Cuda(0));
        assert_eq!("cuda:3".parse::<Device>().unwrap(), Device::Cuda(3));
    }

    #[test]
    fn test_device_parse_invalid() {
        for bad in ["", "gpu", "cuda:", "cuda:x", "CUDA"] {
            assert!(matches!(bad.parse::<Device>(), Err(PrecisionError::InvalidDevice(_))));
        }
    }

    #[test]
    fn test_device_display_roundtrip() {
        let device = Device::Cuda(1);
        assert_eq!(device.to_string().parse::<Device>().unwrap(), device);
        assert_eq!(Device::Cpu.to_string(), "cpu");
    }

    #[test]
    fn test_device_default_is_accelerator() {
        assert!(Device::default().is_accelerator());
        assert!(!Device::Cpu.is_accelerator());
    }
}
