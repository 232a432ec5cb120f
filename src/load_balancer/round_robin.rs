//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Round-robin selector.
/// Stores the rotation cursor shared by every request matching one path.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cursor value (number of selections made so far).
    pub fn cursor(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server<'a>(&self, backends: &'a [Backend]) -> Option<&'a Backend> {
        if backends.is_empty() {
            return None;
        }

        // fetch_add hands every caller a distinct cursor value
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % backends.len();
        backends.get(index)
    }
}
