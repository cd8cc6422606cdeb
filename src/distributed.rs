//! Collective operations needed by the sharded gradient scaler
//!
//! With sharded data parallelism each rank only holds the gradients of its
//! own parameter shard, so an inf/NaN seen on one rank must be broadcast to
//! every other rank before any of them decides whether to skip the step.

use crate::error::Result;

/// Process group the sharded scaler reduces its overflow flag over
pub trait ProcessGroup: Send + Sync {
    /// Rank of the calling process
    fn rank(&self) -> usize;

    /// Number of processes in the group
    fn world_size(&self) -> usize;

    /// Logical-OR all-reduce: returns `true` on every rank if any rank passed `true`
    fn all_reduce_any(&self, flag: bool) -> Result<bool>;
}

/// Single-process group
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalGroup;

impl ProcessGroup for LocalGroup {
    fn rank(&self) -> usize {
        0
    }

    fn world_size(&self) -> usize {
        1
    }

    fn all_reduce_any(&self, flag: bool) -> Result<bool> {
        Ok(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_group_is_identity() {
        let group = LocalGroup;
        assert_eq!(group.rank(), 0);
        assert_eq!(group.world_size(), 1);
        assert!(group.all_reduce_any(true).unwrap());
        assert!(!group.all_reduce_any(false).unwrap());
    }
}
