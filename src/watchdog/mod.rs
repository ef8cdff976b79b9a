// Watchdog module - Uptime checks and restarts on each supervisor tick

pub mod monitor;
pub mod restart;

pub use monitor::{TickReport, Uptimemon};
pub use restart::{RestartExecutor, RestartOutcome};
