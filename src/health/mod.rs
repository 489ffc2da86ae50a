//! Health-check manager and status aggregation.
//!
//! ```text
//! HealthManager
//!   ├── register(Checker)          append-only registry + requiredness
//!   ├── evaluate()                 cached Report or a fresh run_checks()
//!   │   └── run_checks()           one task per checker, each under its own deadline
//!   │       └── aggregate()        required+unhealthy → unhealthy, else any issue → degraded
//!   ├── start() / stop()           background re-evaluation loop
//!   └── is_live / is_ready / is_started
//! ```
//!
//! Check failures are values, never errors: a checker that fails, times out or
//! panics shows up as an `unhealthy` [`CheckResult`] under its name.

pub mod checker;
pub mod checkers;
pub mod manager;
pub mod result;
pub mod status;

pub use checker::{CheckContext, Checker};
pub use checkers::{FuncChecker, HttpChecker, PingChecker, Pinger};
#[cfg(feature = "redis")]
pub use checkers::RedisChecker;
pub use manager::{HealthError, HealthManager, ManagerConfig};
pub use result::{aggregate, CheckResult, Report};
pub use status::Status;
