//! Precision names, numeric descriptors and devices
//!
//! A training configuration names its precision with a short token
//! (`"fp16"`, `"bf16"` or `"fp32"`). [`precision_to_dtype`] turns that token
//! into the reduced-precision [`Dtype`] used for autocast, or `None` when the
//! loop runs in full precision.
//!
//! ## Example
//!
//! ```
//! use mixprec::precision::{precision_to_dtype, Dtype};
//!
//! assert_eq!(precision_to_dtype("bf16").unwrap(), Some(Dtype::BFloat16));
//! assert_eq!(precision_to_dtype("fp32").unwrap(), None);
//! assert!(precision_to_dtype("fp8").is_err());
//! ```

mod device;
mod memory;
mod precision_types;


pub use memory::estimate_memory_savings;
pub use device::Device;
pub use precision_types::{Dtype, Precision};

use crate::error::Result;

/// Convert a precision name into its reduced-precision descriptor.
///
/// `"fp16"` maps to [`Dtype::Float16`], `"bf16"` to [`Dtype::BFloat16`] and
/// `"fp32"` to `None`. Matching is exact and case-sensitive.
///
/// # Errors
///
/// Returns [`PrecisionError::UnsupportedPrecision`](crate::PrecisionError::UnsupportedPrecision)
/// listing the accepted names when `name` is not one of them.
pub fn precision_to_dtype(name: &str) -> Result<Option<Dtype>> {
    name.parse::<Precision>().map(Precision::dtype)
}
