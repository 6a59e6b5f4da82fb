//! Three-cadence optimization loop: hourly budget reallocation by ROI, daily
//! champion/challenger promotion, and weekly cross-venture pattern mining.
//!
//! The procedures are pure functions of their input snapshot. The scheduler
//! wraps them with timing, structured logging and a best-effort write to the
//! decision log.

pub mod daily;
pub mod hourly;
pub mod scheduler;
pub mod source;
pub mod weekly;

pub use daily::ChampionPromoter;
pub use hourly::BudgetReallocator;
pub use scheduler::{CadenceIntervals, CadenceScheduler};
pub use source::{MetricsSource, SnapshotSource};
pub use weekly::PatternMiner;
