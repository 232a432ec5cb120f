//! Backend pool management.
//!
//! # Responsibilities
//! - Hold the ordered backends of one path rule
//! - Own the balancer (and therefore the rotation cursor) for that pool

use crate::config::{BalanceStrategy, PathConfig};
use crate::load_balancer::{
    backend::Backend, round_robin::RoundRobin, weighted::WeightedRoundRobin, LoadBalancer,
};

/// Ordered backends plus the strategy that rotates through them.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Backend>,
    balancer: Box<dyn LoadBalancer>,
}

impl BackendPool {
    pub fn new(backends: Vec<Backend>, strategy: BalanceStrategy) -> Self {
        let balancer: Box<dyn LoadBalancer> = match strategy {
            BalanceStrategy::RoundRobin => Box::new(RoundRobin::new()),
            BalanceStrategy::Weighted => Box::new(WeightedRoundRobin::new()),
        };
        Self { backends, balancer }
    }

    /// Pick the next backend and advance the cursor.
    pub fn select(&self) -> Option<&Backend> {
        self.balancer.next_server(&self.backends)
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl From<&PathConfig> for BackendPool {
    fn from(config: &PathConfig) -> Self {
        Self::new(
            config.backends.iter().map(Backend::from).collect(),
            config.balance,
        )
    }
}
