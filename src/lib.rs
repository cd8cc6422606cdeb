//! Mixed-precision helpers for training loops
//!
//! Resolves textual precision names into numeric descriptors and selects the
//! gradient scaler a training loop should use for that precision.
//!
//! ## Example
//!
//! ```
//! use mixprec::{precision_to_dtype, select_grad_scaler, Dtype, GradScalerKind};
//!
//! let dtype = precision_to_dtype("fp16")?;
//! assert_eq!(dtype, Some(Dtype::Float16));
//!
//! match select_grad_scaler(dtype, false) {
//!     Some(GradScalerKind::Standard(scaler)) => assert_eq!(scaler.scale(), 65536.0),
//!     other => panic!("unexpected scaler: {other:?}"),
//! }
//! # Ok::<(), mixprec::PrecisionError>(())
//! ```

pub mod config;
pub mod distributed;
pub mod error;
pub mod precision;
pub mod scaler;

pub use config::MixedPrecisionConfig;
pub use distributed::{LocalGroup, ProcessGroup};
pub use error::{PrecisionError, Result};
pub use precision::{precision_to_dtype, Device, Dtype, Precision};
pub use scaler::{
    default_grad_scaler, select_grad_scaler, select_grad_scaler_with, GradScaler, GradScalerKind,
    ScalerOptions, ScalerState, ShardedGradScaler,
};
