// Deposit reconciliation: the block scanner and the timer that drives it
pub mod scanner;
pub mod scheduler;

pub use scanner::{
    CycleReport, ReconciliationScanner, ScanConfig, DEFAULT_PAGE_SIZE, DEFAULT_WINDOW_SIZE,
};
pub use scheduler::{dispatch_cycle, WatchScheduleConfig, WatchScheduler};
