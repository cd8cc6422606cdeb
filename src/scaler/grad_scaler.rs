//! Gradient scaler for mixed-precision training.

use log::{debug, trace, warn};

use super::{ScalerOptions, ScalerState};
use crate::error::{PrecisionError, Result};
use crate::precision::Device;

/// Scale bookkeeping shared by the standard and sharded scalers
#[derive(Debug, Clone)]
pub(crate) struct DynamicLossScale {
    /// Current loss scale
    scale: f32,
    growth_factor: f32,
    backoff_factor: f32,
    growth_interval: usize,
    /// Consecutive clean steps since the last scale change
    growth_tracker: usize,
    enabled: bool,
    /// Overflow result of the current iteration, set by unscale
    found_inf: Option<bool>,
    /// Local overflow flag of gradients already unscaled but not yet reduced
    pending_local: Option<bool>,
    overflow_count: usize,
    successful_steps: usize,
}

impl DynamicLossScale {
    pub(crate) fn new(options: &ScalerOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::from_valid(options))
    }

    fn from_valid(options: &ScalerOptions) -> Self {
        Self {
            scale: options.init_scale,
            growth_factor: options.growth_factor,
            backoff_factor: options.backoff_factor,
            growth_interval: options.growth_interval,
            growth_tracker: 0,
            enabled: options.enabled,
            found_inf: None,
            pending_local: None,
            overflow_count: 0,
            successful_steps: 0,
        }
    }

    pub(crate) fn defaults() -> Self {
        Self::from_valid(&ScalerOptions::default())
    }

    pub(crate) fn scale(&self) -> f32 {
        if self.enabled {
            self.scale
        } else {
            1.0
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn scale_loss(&self, loss: f32) -> f32 {
        loss * self.scale()
    }

    /// Divide gradients by the scale in place; returns whether any is inf/NaN.
    pub(crate) fn unscale_local(&self, grads: &mut [f32]) -> Result<bool> {
        if self.found_inf.is_some() {
            return Err(PrecisionError::AlreadyUnscaled);
        }
        let inv_scale = 1.0 / self.scale;
        let mut found_inf = false;
        for grad in grads.iter_mut() {
            *grad *= inv_scale;
            if !grad.is_finite() {
                found_inf = true;
            }
        }
        Ok(found_inf)
    }

    pub(crate) fn record(&mut self, found_inf: bool) {
        self.pending_local = None;
        self.found_inf = Some(found_inf);
    }

    /// Keep the local flag of unscaled gradients whose reduction failed
    pub(crate) fn defer(&mut self, local: bool) {
        self.pending_local = Some(local);
    }

    pub(crate) fn take_pending(&mut self) -> Option<bool> {
        self.pending_local.take()
    }

    pub(crate) fn found_inf(&self) -> Option<bool> {
        self.found_inf
    }

    pub(crate) fn update(&mut self) -> Result<()> {
        self.pending_local = None;
        if !self.enabled {
            return Ok(());
        }
        let found_inf = self.found_inf.take().ok_or(PrecisionError::NoInfChecks)?;

        if found_inf {
            self.overflow_count += 1;
            self.growth_tracker = 0;
            // Ensure scale doesn't go too low
            self.scale = (self.scale * self.backoff_factor).max(1.0);
            warn!("gradient overflow, reducing loss scale to {}", self.scale);
        } else {
            self.successful_steps += 1;
            self.growth_tracker += 1;
            if self.growth_tracker >= self.growth_interval {
                let grown = self.scale * self.growth_factor;
                if grown.is_finite() {
                    self.scale = grown;
                }
                self.growth_tracker = 0;
                trace!("{} clean steps, loss scale now {}", self.growth_interval, self.scale);
            }
        }
        Ok(())
    }

    pub(crate) fn set_scale(&mut self, new_scale: f32) -> Result<()> {
        if !(new_scale.is_finite() && new_scale > 0.0) {
            return Err(PrecisionError::InvalidScalerOption {
                field: "scale",
                message: format!("{new_scale} (must be finite and > 0.0)"),
            });
        }
        self.scale = new_scale;
        self.growth_tracker = 0;
        self.found_inf = None;
        self.pending_local = None;
        Ok(())
    }

    pub(crate) fn state(&self) -> ScalerState {
        ScalerState {
            scale: self.scale,
            growth_factor: self.growth_factor,
            backoff_factor: self.backoff_factor,
            growth_interval: self.growth_interval,
            growth_tracker: self.growth_tracker,
        }
    }

    pub(crate) fn load_state(&mut self, state: &ScalerState) -> Result<()> {
        ScalerOptions {
            init_scale: state.scale,
            growth_factor: state.growth_factor,
            backoff_factor: state.backoff_factor,
            growth_interval: state.growth_interval,
            enabled: self.enabled,
        }
        .validate()?;
        self.scale = state.scale;
        self.growth_factor = state.growth_factor;
        self.backoff_factor = state.backoff_factor;
        self.growth_interval = state.growth_interval;
        self.growth_tracker = state.growth_tracker;
        self.found_inf = None;
        self.pending_local = None;
        Ok(())
    }

    pub(crate) fn overflow_count(&self) -> usize {
        self.overflow_count
    }

    pub(crate) fn successful_steps(&self) -> usize {
        self.successful_steps
    }
}

/// Gradient scaler for mixed-precision training
///
/// Multiplies the loss by a dynamic factor so small fp16 gradients do not
/// flush to zero, then divides the gradients back before the optimizer
/// step. Steps whose gradients contain inf/NaN are skipped and the scale
/// backs off; after `growth_interval` clean steps the scale grows.
///
/// ```
/// use mixprec::GradScaler;
///
/// let mut scaler = GradScaler::default();
/// let scaled = scaler.scale_loss(0.5);
/// let mut grads = vec![scaled, -scaled];
/// let stepped = scaler.step(&mut grads, |g| g[0])?;
/// assert_eq!(stepped, Some(0.5));
/// scaler.update()?;
/// # Ok::<(), mixprec::PrecisionError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GradScaler {
    device: Device,
    inner: DynamicLossScale,
}

impl GradScaler {
    /// Create a scaler on `device` with default hyper-parameters
    pub fn new(device: Device) -> Self {
        Self { device, inner: DynamicLossScale::defaults() }
    }

    /// Create from options
    pub fn with_options(device: Device, options: &ScalerOptions) -> Result<Self> {
        let inner = DynamicLossScale::new(options)?;
        debug!("created grad scaler on {device} with init_scale {}", options.init_scale);
        Ok(Self { device, inner })
    }

    /// Device the scaler is bound to
    pub fn device(&self) -> Device {
        self.device
    }

    /// Current scale (1.0 when disabled)
    pub fn scale(&self) -> f32 {
        self.inner.scale()
    }

    /// Whether scaling is enabled
    pub fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    /// Scale a loss value
    pub fn scale_loss(&self, loss: f32) -> f32 {
        self.inner.scale_loss(loss)
    }

    /// Unscale gradients in place and record whether any overflowed
    ///
    /// Returns `true` if an inf/NaN was found. May be called once per
    /// iteration, before [`step`](Self::step), e.g. to clip gradient norms.
    pub fn unscale(&mut self, grads: &mut [f32]) -> Result<bool> {
        if !self.inner.is_enabled() {
            return Ok(false);
        }
        let found_inf = self.inner.unscale_local(grads)?;
        self.inner.record(found_inf);
        Ok(found_inf)
    }

    /// Run `optimizer_step` unless the gradients overflowed
    ///
    /// Unscales first if [`unscale`](Self::unscale) was not called this
    /// iteration. Returns `None` when the step was skipped.
    pub fn step<R>(
        &mut self,
        grads: &mut [f32],
        optimizer_step: impl FnOnce(&mut [f32]) -> R,
    ) -> Result<Option<R>> {
        if !self.inner.is_enabled() {
            return Ok(Some(optimizer_step(grads)));
        }
        let found_inf = match self.inner.found_inf() {
            Some(found_inf) => found_inf,
            None => self.unscale(grads)?,
        };
        if found_inf {
            debug!("skipping optimizer step: inf/NaN gradients at scale {}", self.inner.scale());
            return Ok(None);
        }
        Ok(Some(optimizer_step(grads)))
    }

    /// Adjust the scale from this iteration's overflow result
    pub fn update(&mut self) -> Result<()> {
        self.inner.update()
    }

    /// Replace the scale explicitly
    pub fn update_with_scale(&mut self, new_scale: f32) -> Result<()> {
        self.inner.set_scale(new_scale)
    }

    /// Snapshot for checkpointing
    pub fn state(&self) -> ScalerState {
        self.inner.state()
    }

    /// Restore from a checkpoint snapshot
    pub fn load_state(&mut self, state: &ScalerState) -> Result<()> {
        self.inner.load_state(state)
    }

    /// Get overflow count
    pub fn overflow_count(&self) -> usize {
        self.inner.overflow_count()
    }

    /// Get successful step count
    pub fn successful_steps(&self) -> usize {
        self.inner.successful_steps()
    }
}

impl Default for GradScaler {
    fn default() -> Self {
        Self::new(Device::default())
    }
}
