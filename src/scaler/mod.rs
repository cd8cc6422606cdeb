//! Gradient scalers for mixed-precision training
//!
//! fp16 has a narrow exponent range, so small gradients flush to zero unless
//! the loss is multiplied by a large factor before backward. The scalers here
//! track that factor dynamically, unscale gradients before the optimizer
//! step, and skip steps whose gradients overflowed.
//!
//! ## Example
//!
//! ```
//! use mixprec::{select_grad_scaler, Dtype};
//!
//! let mut scaler = select_grad_scaler(Some(Dtype::Float16), true).unwrap();
//! assert!(scaler.is_sharded());
//!
//! let mut grads = vec![scaler.scale_loss(1.0), f32::INFINITY];
//! assert_eq!(scaler.step(&mut grads, |_| ())?, None);
//! scaler.update()?;
//! assert_eq!(scaler.scale(), 32768.0);
//! # Ok::<(), mixprec::PrecisionError>(())
//! ```

mod grad_scaler;
mod options;
mod select;
mod sharded;


pub use grad_scaler::GradScaler;
pub use options::{ScalerOptions, ScalerState, DEFAULT_GROWTH_INTERVAL, DEFAULT_INIT_SCALE};
pub use select::{default_grad_scaler, select_grad_scaler, select_grad_scaler_with, GradScalerKind};
pub use sharded::ShardedGradScaler;
