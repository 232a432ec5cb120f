//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Path rule matched
//!     → pool.rs (ordered backends of that rule)
//!     → Apply load balancing algorithm:
//!         - round_robin.rs (rotate through backends, default)
//!         - weighted.rs (rotate, each backend repeated `weight` times)
//!     → backend.rs (origin address for the forwarder)
//! ```
//!
//! # Design Decisions
//! - One balancer per path rule; its atomic counter is the only mutable
//!   state shared between requests
//! - Selection happens before every forwarding attempt, retries included
//! - No health tracking: an unreachable backend is skipped by the retry
//!   policy moving the cursor, not by excluding it

pub mod backend;
pub mod pool;
pub mod round_robin;
pub mod weighted;

pub use backend::Backend;
pub use pool::BackendPool;

/// Strategy that picks the next backend from an ordered pool.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Returns `None` only when `backends` is empty.
    fn next_server<'a>(&self, backends: &'a [Backend]) -> Option<&'a Backend>;
}
