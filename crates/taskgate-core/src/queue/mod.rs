//! Queue module: pending priority queue, resource locks and rate limiting.
//!
//! No I/O here; everything is in-memory and safe to share behind an `Arc`.

mod locks;
mod pending;
mod rate_limit;

pub use locks::ResourceLocks;
pub use pending::PendingQueue;
pub use rate_limit::RateLimiter;
