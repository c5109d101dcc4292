use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::chain::{ChainClient, HeightRange, RawTx, SortOrder};
use crate::error::{AppError, AppResult};
use crate::extractor::{EventExtractor, WatchSet};
use crate::ledger::{
    AddressRegistry, ChainWatermark, DepositEvent, InsertOutcome, LedgerEntry, LedgerStore,
    WatermarkStore,
};

pub const DEFAULT_WINDOW_SIZE: u64 = 100;
pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub chain_id: i64,
    /// Blocks covered per cycle beyond the watermark.
    pub window_size: u64,
    pub page_size: u32,
    /// Canonical form of the business address.
    pub business_address: String,
}

impl ScanConfig {
    pub fn new(chain_id: i64, business_address: impl Into<String>) -> Self {
        Self {
            chain_id,
            window_size: DEFAULT_WINDOW_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            business_address: business_address.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// First cycle for the chain: the watermark was set to the tip, nothing scanned.
    Seeded,
    /// The node reports no height beyond the watermark.
    NoNewBlocks,
    /// No active custody wallets; the window was skipped.
    NoActiveWallets,
    Scanned,
    /// Another cycle held the guard; this trigger did nothing.
    AlreadyRunning,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Seeded => "seeded",
            CycleOutcome::NoNewBlocks => "no_new_blocks",
            CycleOutcome::NoActiveWallets => "no_active_wallets",
            CycleOutcome::Scanned => "scanned",
            CycleOutcome::AlreadyRunning => "already_running",
        }
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub chain_id: i64,
    pub outcome: CycleOutcome,
    pub from_block: u64,
    pub to_block: u64,
    pub transactions_seen: u64,
    pub credited: u64,
    pub duplicates: u64,
    pub skipped: u64,
}

impl CycleReport {
    fn new(chain_id: i64, outcome: CycleOutcome, from_block: u64, to_block: u64) -> Self {
        Self {
            chain_id,
            outcome,
            from_block,
            to_block,
            transactions_seen: 0,
            credited: 0,
            duplicates: 0,
            skipped: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    Credited,
    Duplicate,
}

/// Watermark-driven block scanner that records inbound transfers to custody
/// wallets exactly once.
pub struct ReconciliationScanner {
    chain: Arc<dyn ChainClient>,
    watermarks: Arc<dyn WatermarkStore>,
    registry: Arc<dyn AddressRegistry>,
    ledger: Arc<dyn LedgerStore>,
    extractor: EventExtractor,
    config: ScanConfig,
    cycle_guard: Mutex<()>,
}

impl ReconciliationScanner {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        watermarks: Arc<dyn WatermarkStore>,
        registry: Arc<dyn AddressRegistry>,
        ledger: Arc<dyn LedgerStore>,
        extractor: EventExtractor,
        config: ScanConfig,
    ) -> Self {
        Self {
            chain,
            watermarks,
            registry,
            ledger,
            extractor,
            config,
            cycle_guard: Mutex::new(()),
        }
    }

    pub fn chain_id(&self) -> i64 {
        self.config.chain_id
    }

    pub async fn watermark(&self) -> AppResult<Option<ChainWatermark>> {
        self.watermarks.get_watermark(self.config.chain_id).await
    }

    /// Runs one reconciliation cycle. Safe to call at any time: a call that
    /// arrives while another cycle is in flight returns `AlreadyRunning`.
    ///
    /// Chain or watermark failures abort the cycle with the watermark untouched.
    /// Per-transaction failures are logged and counted as skipped.
    #[instrument(skip(self), fields(chain_id = self.config.chain_id))]
    pub async fn run_cycle(&self) -> AppResult<CycleReport> {
        let _guard = match self.cycle_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Previous cycle still running, skipping trigger");
                let outcome = CycleOutcome::AlreadyRunning;
                return Ok(CycleReport::new(self.config.chain_id, outcome, 0, 0));
            }
        };

        self.scan().await
    }

    async fn scan(&self) -> AppResult<CycleReport> {
        let chain_id = self.config.chain_id;

        let watermark = match self.watermarks.get_watermark(chain_id).await? {
            Some(watermark) => watermark.last_scanned_block,
            None => {
                let tip = self.chain.current_height().await?;
                self.watermarks.create_watermark(chain_id, tip).await?;
                info!("📍 Seeded watermark for chain {} at block {}", chain_id, tip);
                return Ok(CycleReport::new(chain_id, CycleOutcome::Seeded, tip, tip));
            }
        };

        let tip = self.chain.current_height().await?;
        if tip <= watermark {
            debug!(watermark, tip, "No new blocks");
            let outcome = CycleOutcome::NoNewBlocks;
            return Ok(CycleReport::new(chain_id, outcome, watermark, watermark));
        }

        let range = HeightRange {
            from: watermark,
            to: watermark.saturating_add(self.config.window_size).min(tip),
        };

        let wallets = self.registry.active_wallets().await?;
        let watch = WatchSet::new(
            self.extractor.codec(),
            &wallets,
            self.config.business_address.clone(),
        );

        if watch.wallet_count() == 0 {
            self.watermarks.advance_watermark(chain_id, range.to).await?;
            debug!(
                from = range.from,
                to = range.to,
                "No active wallets, advanced watermark"
            );
            let outcome = CycleOutcome::NoActiveWallets;
            return Ok(CycleReport::new(chain_id, outcome, range.from, range.to));
        }

        let mut report = CycleReport::new(chain_id, CycleOutcome::Scanned, range.from, range.to);
        let mut page = 1;

        loop {
            let result = self
                .chain
                .search_transactions(range, page, self.config.page_size, SortOrder::Asc)
                .await?;
            if result.is_empty() {
                break;
            }

            report.transactions_seen += result.returned();
            for tx in &result.undecoded {
                warn!(tx = %tx.hash, "Skipping undecodable transaction: {}", tx.reason);
                report.skipped += 1;
            }
            for tx in &result.txs {
                self.process_transaction(tx, &watch, &mut report).await;
            }

            if report.transactions_seen >= result.total_count {
                break;
            }
            page += 1;
        }

        self.watermarks.advance_watermark(chain_id, range.to).await?;

        info!(
            "🔄 Scanned {}..={} on chain {}: {} txs, {} credited, {} duplicate, {} skipped",
            range.from,
            range.to,
            chain_id,
            report.transactions_seen,
            report.credited,
            report.duplicates,
            report.skipped
        );

        Ok(report)
    }

    async fn process_transaction(&self, tx: &RawTx, watch: &WatchSet, report: &mut CycleReport) {
        let event = match self.extractor.extract(tx, watch) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(e) => {
                warn!(tx = %tx.hash, height = tx.height, "Skipping undecodable transaction: {}", e);
                report.skipped += 1;
                return;
            }
        };

        match self.credit(event, watch).await {
            Ok(CreditOutcome::Credited) => report.credited += 1,
            Ok(CreditOutcome::Duplicate) => report.duplicates += 1,
            Err(e) => {
                warn!(tx = %tx.hash, height = tx.height, "Failed to credit deposit: {}", e);
                report.skipped += 1;
            }
        }
    }

    /// Records `event` unless its dedup key is already in the ledger.
    pub async fn credit(&self, event: DepositEvent, watch: &WatchSet) -> AppResult<CreditOutcome> {
        if self.ledger.find_entry(&event.dedup_key()).await?.is_some() {
            return Ok(CreditOutcome::Duplicate);
        }

        let registry_key = watch.registry_key(&event.receiver_address);
        let entity_id = match self.registry.entity_by_wallet_address(registry_key).await {
            Ok(entity) => Some(entity.id),
            Err(AppError::NotFound(_)) if watch.is_business(&event.receiver_address) => None,
            Err(e) => return Err(e),
        };

        let entry = LedgerEntry::inbound(event, entity_id);
        match self.ledger.insert_if_absent(&entry).await? {
            InsertOutcome::Inserted => {
                info!(
                    "💰 Credited {}{} to {} (tx {}, event {}, block {})",
                    entry.amount,
                    entry.denom,
                    entry.receiver_address,
                    entry.source_tx_hash,
                    entry.event_index,
                    entry.block_number
                );
                Ok(CreditOutcome::Credited)
            }
            InsertOutcome::AlreadyRecorded => Ok(CreditOutcome::Duplicate),
        }
    }
}
