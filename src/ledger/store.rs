use async_trait::async_trait;

use super::models::{ChainWatermark, CustodyWallet, DedupKey, Entity, LedgerEntry};
use crate::error::AppResult;

/// Per-chain scan progress.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    async fn get_watermark(&self, chain_id: i64) -> AppResult<Option<ChainWatermark>>;

    async fn create_watermark(&self, chain_id: i64, height: u64) -> AppResult<()>;

    /// Sets the height unconditionally. Callers only ever move it forward.
    async fn advance_watermark(&self, chain_id: i64, height: u64) -> AppResult<()>;
}

/// Custody wallets and the entities that own them.
#[async_trait]
pub trait AddressRegistry: Send + Sync {
    /// Active wallets, ordered by address.
    async fn active_wallets(&self) -> AppResult<Vec<CustodyWallet>>;

    /// Fails with `AppError::NotFound` when no entity owns `address`.
    async fn entity_by_wallet_address(&self, address: &str) -> AppResult<Entity>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyRecorded,
}

/// Append-only ledger keyed by `(source_tx_hash, event_index, receiver_address)`.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_entry(&self, key: &DedupKey) -> AppResult<Option<LedgerEntry>>;

    /// Inserts unless an entry with the same key exists. The existence check and
    /// the write are atomic; losing a race reports `AlreadyRecorded`.
    async fn insert_if_absent(&self, entry: &LedgerEntry) -> AppResult<InsertOutcome>;
}
