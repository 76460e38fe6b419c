//! Round-robin selection strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::load_balancer::Strategy;
use crate::registry::InstanceAddress;

/// Round-robin selector.
/// Holds one service's cursor; every pick is a single atomic read-and-increment.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor value.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Relaxed)
    }
}

impl Strategy for RoundRobin {
    fn pick(&self, candidates: &[InstanceAddress]) -> Option<InstanceAddress> {
        if candidates.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
        Some(candidates[index].clone())
    }
}
