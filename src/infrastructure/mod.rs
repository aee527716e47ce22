//! Infrastructure Layer
//!
//! Cross-cutting concerns and infrastructure components.

pub mod rate_limiter;
pub mod shutdown;
pub mod stats_publisher;

pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use shutdown::{shutdown_signal, ShutdownController};
pub use stats_publisher::{StatsObserver, StatsPublisher, Subscription};
