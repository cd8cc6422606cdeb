//! Precision type definitions for mixed-precision training.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PrecisionError;

/// Training precision as named in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// 16-bit floating point (IEEE half precision)
    Fp16,
    /// 16-bit brain floating point (truncated mantissa)
    Bf16,
    /// 32-bit floating point (default)
    #[default]
    Fp32,
}

impl Precision {
    /// Every accepted precision, in lookup-table order
    pub const ALL: [Precision; 3] = [Precision::Fp16, Precision::Bf16, Precision::Fp32];

    /// Configuration token
    pub fn name(&self) -> &'static str {
        match self {
            Precision::Fp16 => "fp16",
            Precision::Bf16 => "bf16",
            Precision::Fp32 => "fp32",
        }
    }

    /// Accepted configuration tokens
    pub fn valid_names() -> Vec<&'static str> {
        Self::ALL.iter().map(Precision::name).collect()
    }

    /// Reduced-precision descriptor, `None` for full precision
    pub fn dtype(self) -> Option<Dtype> {
        match self {
            Precision::Fp16 => Some(Dtype::Float16),
            Precision::Bf16 => Some(Dtype::BFloat16),
            Precision::Fp32 => None,
        }
    }

    /// Whether this is a reduced precision type
    pub fn is_reduced(&self) -> bool {
        self.dtype().is_some()
    }

    /// Size in bytes of one element
    pub fn size_bytes(&self) -> usize {
        self.dtype().map_or(4, |dtype| dtype.size_bytes())
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Precision {
    type Err = PrecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fp16" => Ok(Precision::Fp16),
            "bf16" => Ok(Precision::Bf16),
            "fp32" => Ok(Precision::Fp32),
            _ => Err(PrecisionError::UnsupportedPrecision {
                name: s.to_string(),
                valid: Self::valid_names(),
            }),
        }
    }
}

impl From<Option<Dtype>> for Precision {
    fn from(dtype: Option<Dtype>) -> Self {
        match dtype {
            Some(Dtype::Float16) => Precision::Fp16,
            Some(Dtype::BFloat16) => Precision::Bf16,
            None => Precision::Fp32,
        }
    }
}

/// Reduced-precision numeric descriptor
///
/// Full precision has no descriptor and is represented as `Option::None`
/// wherever a `Dtype` is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dtype {
    /// IEEE 754 binary16: 5 exponent bits, 10 mantissa bits
    Float16,
    /// bfloat16: 8 exponent bits, 7 mantissa bits
    BFloat16,
}

impl Dtype {
    /// Size in bytes of one element
    pub fn size_bytes(&self) -> usize {
        2
    }

    /// Largest finite value representable in this dtype
    pub fn max_finite(&self) -> f32 {
        match self {
            Dtype::Float16 => half::f16::MAX.to_f32(),
            Dtype::BFloat16 => half::bf16::MAX.to_f32(),
        }
    }

    /// Whether gradients in this dtype need loss scaling to avoid underflow.
    ///
    /// bf16 shares the f32 exponent range, so only fp16 is scaled.
    pub fn needs_loss_scaling(&self) -> bool {
        matches!(self, Dtype::Float16)
    }

    /// Round an f32 to this dtype and return the raw bits
    pub fn encode(&self, value: f32) -> u16 {
        match self {
            Dtype::Float16 => half::f16::from_f32(value).to_bits(),
            Dtype::BFloat16 => half::bf16::from_f32(value).to_bits(),
        }
    }

    /// Widen raw bits of this dtype back to f32
    pub fn decode(&self, bits: u16) -> f32 {
        match self {
            Dtype::Float16 => half::f16::from_bits(bits).to_f32(),
            Dtype::BFloat16 => half::bf16::from_bits(bits).to_f32(),
        }
    }

    /// Round-trip an f32 through this dtype
    pub fn round(&self, value: f32) -> f32 {
        self.decode(self.encode(value))
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dtype::Float16 => write!(f, "float16"),
            Dtype::BFloat16 => write!(f, "bfloat16"),
        }
    }
}
