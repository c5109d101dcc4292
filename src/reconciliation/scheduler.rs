// Watch Scheduler - triggers one reconciliation cycle per tick
//
// - Fixed interval, first tick fires immediately
// - Missed ticks are skipped, never bunched up
// - Every cycle goes through `dispatch_cycle`, which owns cycle logging

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use super::scanner::{CycleOutcome, CycleReport, ReconciliationScanner};
use crate::error::AppResult;

/// Watch schedule configuration
#[derive(Debug, Clone)]
pub struct WatchScheduleConfig {
    pub scan_interval: Duration,
}

impl Default for WatchScheduleConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(5),
        }
    }
}

/// Watch scheduler - drives the reconciliation scanner on a timer
pub struct WatchScheduler {
    config: WatchScheduleConfig,
    scanner: Arc<ReconciliationScanner>,
}

impl WatchScheduler {
    pub fn new(config: WatchScheduleConfig, scanner: Arc<ReconciliationScanner>) -> Self {
        Self { config, scanner }
    }

    /// Start the watch loop (runs in background)
    pub fn start(&self) -> JoinHandle<()> {
        let scanner = self.scanner.clone();
        let period = self.config.scan_interval;

        info!("⏰ Deposit watcher scanning every {:?}", period);

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                // failures are logged by the dispatcher; the next tick retries
                let _ = dispatch_cycle(&scanner).await;
            }
        })
    }
}

/// Runs one cycle and logs its duration and result. Both the timer and the
/// manual scan endpoint go through here.
pub async fn dispatch_cycle(scanner: &ReconciliationScanner) -> AppResult<CycleReport> {
    let started = Instant::now();
    let result = scanner.run_cycle().await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match &result {
        Ok(report) if report.outcome == CycleOutcome::Scanned => {
            info!(
                chain_id = report.chain_id,
                from = report.from_block,
                to = report.to_block,
                credited = report.credited,
                skipped = report.skipped,
                elapsed_ms,
                "✓ Reconciliation cycle completed"
            );
        }
        Ok(report) => {
            debug!(
                chain_id = report.chain_id,
                outcome = %report.outcome,
                elapsed_ms,
                "Reconciliation cycle completed"
            );
        }
        Err(e) => {
            error!(
                chain_id = scanner.chain_id(),
                elapsed_ms,
                "❌ Reconciliation cycle failed: {}",
                e
            );
        }
    }

    result
}
