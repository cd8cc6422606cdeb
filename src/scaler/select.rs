//! Choosing the gradient scaler for a precision.

use log::debug;

use super::{GradScaler, ScalerOptions, ScalerState, ShardedGradScaler};
use crate::error::Result;
use crate::precision::{Device, Dtype};

/// Gradient scaler selected for a training loop
#[derive(Debug, Clone)]
pub enum GradScalerKind {
    /// Single-device or second-generation sharded training
    Standard(GradScaler),
    /// First-generation sharded training
    Sharded(ShardedGradScaler),
}

impl GradScalerKind {
    /// Whether this is the sharded variant
    pub fn is_sharded(&self) -> bool {
        matches!(self, GradScalerKind::Sharded(_))
    }

    /// Current scale
    pub fn scale(&self) -> f32 {
        match self {
            GradScalerKind::Standard(scaler) => scaler.scale(),
            GradScalerKind::Sharded(scaler) => scaler.scale(),
        }
    }

    /// Scale a loss value
    pub fn scale_loss(&self, loss: f32) -> f32 {
        match self {
            GradScalerKind::Standard(scaler) => scaler.scale_loss(loss),
            GradScalerKind::Sharded(scaler) => scaler.scale_loss(loss),
        }
    }

    /// Unscale gradients and record overflow
    pub fn unscale(&mut self, grads: &mut [f32]) -> Result<bool> {
        match self {
            GradScalerKind::Standard(scaler) => scaler.unscale(grads),
            GradScalerKind::Sharded(scaler) => scaler.unscale(grads),
        }
    }

    /// Run `optimizer_step` unless the gradients overflowed
    pub fn step<R>(
        &mut self,
        grads: &mut [f32],
        optimizer_step: impl FnOnce(&mut [f32]) -> R,
    ) -> Result<Option<R>> {
        match self {
            GradScalerKind::Standard(scaler) => scaler.step(grads, optimizer_step),
            GradScalerKind::Sharded(scaler) => scaler.step(grads, optimizer_step),
        }
    }

    /// Adjust the scale for the next iteration
    pub fn update(&mut self) -> Result<()> {
        match self {
            GradScalerKind::Standard(scaler) => scaler.update(),
            GradScalerKind::Sharded(scaler) => scaler.update(),
        }
    }

    /// Replace the scale explicitly
    pub fn update_with_scale(&mut self, new_scale: f32) -> Result<()> {
        match self {
            GradScalerKind::Standard(scaler) => scaler.update_with_scale(new_scale),
            GradScalerKind::Sharded(scaler) => scaler.update_with_scale(new_scale),
        }
    }

    /// Snapshot for checkpointing
    pub fn state(&self) -> ScalerState {
        match self {
            GradScalerKind::Standard(scaler) => scaler.state(),
            GradScalerKind::Sharded(scaler) => scaler.state(),
        }
    }

    /// Restore from a checkpoint snapshot
    pub fn load_state(&mut self, state: &ScalerState) -> Result<()> {
        match self {
            GradScalerKind::Standard(scaler) => scaler.load_state(state),
            GradScalerKind::Sharded(scaler) => scaler.load_state(state),
        }
    }

    /// Get overflow count
    pub fn overflow_count(&self) -> usize {
        match self {
            GradScalerKind::Standard(scaler) => scaler.overflow_count(),
            GradScalerKind::Sharded(scaler) => scaler.overflow_count(),
        }
    }

    /// Get successful step count
    pub fn successful_steps(&self) -> usize {
        match self {
            GradScalerKind::Standard(scaler) => scaler.successful_steps(),
            GradScalerKind::Sharded(scaler) => scaler.successful_steps(),
        }
    }
}

/// Select the gradient scaler for `dtype`
///
/// | dtype | `is_legacy_sharded` | result |
/// |---|---|---|
/// | `Float16` | `true` | [`ShardedGradScaler`] |
/// | `Float16` | `false` | [`GradScaler`] on `cuda:0` |
/// | `BFloat16` / `None` | any | `None` |
///
/// Every call builds a fresh scaler owned by the caller.
pub fn select_grad_scaler(dtype: Option<Dtype>, is_legacy_sharded: bool) -> Option<GradScalerKind> {
    match dtype {
        Some(Dtype::Float16) if is_legacy_sharded => {
            debug!("selected sharded grad scaler for {}", Dtype::Float16);
            Some(GradScalerKind::Sharded(ShardedGradScaler::new()))
        }
        Some(Dtype::Float16) => {
            debug!("selected grad scaler on {} for {}", Device::cuda(), Dtype::Float16);
            Some(GradScalerKind::Standard(GradScaler::new(Device::cuda())))
        }
        _ => None,
    }
}

/// [`select_grad_scaler`] for a module that is not legacy-sharded
pub fn default_grad_scaler(dtype: Option<Dtype>) -> Option<GradScalerKind> {
    select_grad_scaler(dtype, false)
}

/// [`select_grad_scaler`] with caller-supplied hyper-parameters
///
/// # Errors
///
/// Returns [`PrecisionError::InvalidScalerOption`](crate::PrecisionError::InvalidScalerOption)
/// when a scaler is selected and `options` fail validation.
pub fn select_grad_scaler_with(
    dtype: Option<Dtype>,
    is_legacy_sharded: bool,
    options: &ScalerOptions,
) -> Result<Option<GradScalerKind>> {
    let scaler = match dtype {
        Some(Dtype::Float16) if is_legacy_sharded => {
            GradScalerKind::Sharded(ShardedGradScaler::with_options(options)?)
        }
        Some(Dtype::Float16) => {
            GradScalerKind::Standard(GradScaler::with_options(Device::cuda(), options)?)
        }
        _ => return Ok(None),
    };
    Ok(Some(scaler))
}
