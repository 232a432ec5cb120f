//! Weighted round-robin strategy.
//!
//! The pool is treated as if each backend were listed `weight` times in a row;
//! the same atomic cursor as [`RoundRobin`](super::round_robin::RoundRobin) walks
//! that logical sequence. A weight of 0 counts as 1.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::load_balancer::{backend::Backend, LoadBalancer};

#[derive(Debug, Default)]
pub struct WeightedRoundRobin {
    counter: AtomicUsize,
}

impl WeightedRoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

fn effective_weight(backend: &Backend) -> usize {
    backend.weight.max(1) as usize
}

impl LoadBalancer for WeightedRoundRobin {
    fn next_server<'a>(&self, backends: &'a [Backend]) -> Option<&'a Backend> {
        let total: usize = backends.iter().map(effective_weight).sum();
        if total == 0 {
            return None;
        }

        let mut slot = self.counter.fetch_add(1, Ordering::Relaxed) % total;
        for backend in backends {
            let weight = effective_weight(backend);
            if slot < weight {
                return Some(backend);
            }
            slot -= weight;
        }
        None
    }
}
