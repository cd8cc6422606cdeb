//! Gradient scaler for first-generation sharded data parallelism.

use std::fmt;
use std::sync::Arc;

use log::debug;

use super::grad_scaler::DynamicLossScale;
use super::{ScalerOptions, ScalerState};
use crate::distributed::{LocalGroup, ProcessGroup};
use crate::error::Result;

/// Gradient scaler whose overflow check spans every rank of a process group
///
/// Each rank unscales only its own gradient shard. The local inf/NaN flag is
/// OR-reduced across the group so all ranks skip the same steps and keep
/// identical loss scales.
#[derive(Clone)]
pub struct ShardedGradScaler {
    group: Arc<dyn ProcessGroup>,
    inner: DynamicLossScale,
}

impl ShardedGradScaler {
    /// Create a scaler over the single-process group with default hyper-parameters
    pub fn new() -> Self {
        Self { group: Arc::new(LocalGroup), inner: DynamicLossScale::defaults() }
    }

    /// Create from options
    pub fn with_options(options: &ScalerOptions) -> Result<Self> {
        let inner = DynamicLossScale::new(options)?;
        debug!("created sharded grad scaler with init_scale {}", options.init_scale);
        Ok(Self { group: Arc::new(LocalGroup), inner })
    }

    /// Reduce overflow flags over `group` instead of the local process
    pub fn with_process_group(mut self, group: Arc<dyn ProcessGroup>) -> Self {
        self.group = group;
        self
    }

    /// Process group overflow flags are reduced over
    pub fn process_group(&self) -> &Arc<dyn ProcessGroup> {
        &self.group
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

    /// Unscale this rank's gradient shard and agree on overflow with the group
    ///
    /// Returns `true` if any rank found an inf/NaN. If the collective fails
    /// the shard stays unscaled; calling `unscale` or `step` again retries
    /// the reduction without dividing the gradients a second time.
    pub fn unscale(&mut self, grads: &mut [f32]) -> Result<bool> {
        if !self.inner.is_enabled() {
            return Ok(false);
        }
        let local = match self.inner.take_pending() {
            Some(local) => local,
            None => self.inner.unscale_local(grads)?,
        };
        let found_inf = match self.group.all_reduce_any(local) {
            Ok(found_inf) => found_inf,
            Err(e) => {
                self.inner.defer(local);
                return Err(e);
            }
        };
        if found_inf && !local {
            debug!("rank {} skipping step: overflow on another rank", self.group.rank());
        }
        self.inner.record(found_inf);
        Ok(found_inf)
    }

    /// Run `optimizer_step` unless any rank's gradients overflowed
    ///
    /// Returns `None` when the step was skipped.
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
            return Ok(None);
        }
        Ok(Some(optimizer_step(grads)))
    }

    /// Adjust the scale from this iteration's reduced overflow result
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

impl Default for ShardedGradScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShardedGradScaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedGradScaler")
            .field("rank", &self.group.rank())
            .field("world_size", &self.group.world_size())
            .field("inner", &self.inner)
            .finish()
    }
}
