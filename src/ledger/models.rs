use chrono::{DateTime, Utc};
use sqlx::types::BigDecimal;
use std::fmt;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Contract address recorded for transfers of the chain's native coin.
pub const NATIVE_CONTRACT_ADDRESS: &str = "aioz";

/// Last fully processed block height, per chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainWatermark {
    pub chain_id: i64,
    pub last_scanned_block: u64,
}

/// An internal account that owns one custody wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub id: Uuid,
    pub name: String,
    /// Canonical (checksummed hex) custody address.
    pub wallet_address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodyWallet {
    pub address: String,
    pub owning_entity_id: Uuid,
    pub is_active: bool,
}

/// Transfer direction, relative to the custody side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Inbound => "in",
            Direction::Outbound => "out",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "in" => Ok(Direction::Inbound),
            "out" => Ok(Direction::Outbound),
            other => Err(AppError::Internal(format!("unknown direction {:?}", other))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a ledger entry. Only `New` is written here; `Handled` is set
/// by the downstream settlement process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    New,
    Handled,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::New => "new",
            EntryStatus::Handled => "handled",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "new" => Ok(EntryStatus::New),
            "handled" => Ok(EntryStatus::Handled),
            other => Err(AppError::Internal(format!("unknown entry status {:?}", other))),
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized transfer pulled out of one chain transaction. Never stored as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositEvent {
    pub source_tx_hash: String,
    /// EVM hash of the wrapped transaction, contract-log path only.
    pub secondary_tx_hash: Option<String>,
    pub contract_address: String,
    pub sender_address: String,
    pub receiver_address: String,
    pub block_number: u64,
    pub event_index: u32,
    /// Empty for contract-log transfers.
    pub denom: String,
    pub amount: BigDecimal,
}

impl DepositEvent {
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            source_tx_hash: self.source_tx_hash.clone(),
            event_index: self.event_index,
            receiver_address: self.receiver_address.clone(),
        }
    }
}

/// The ledger's idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub source_tx_hash: String,
    pub event_index: u32,
    pub receiver_address: String,
}

/// Persisted, immutable record of an accepted transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: Uuid,
    /// `None` for transfers into the business address.
    pub entity_id: Option<Uuid>,
    pub source_tx_hash: String,
    pub secondary_tx_hash: Option<String>,
    pub contract_address: String,
    pub sender_address: String,
    pub receiver_address: String,
    pub block_number: u64,
    pub event_index: u32,
    pub denom: String,
    pub amount: BigDecimal,
    pub direction: Direction,
    pub status: EntryStatus,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn inbound(event: DepositEvent, entity_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id,
            source_tx_hash: event.source_tx_hash,
            secondary_tx_hash: event.secondary_tx_hash,
            contract_address: event.contract_address,
            sender_address: event.sender_address,
            receiver_address: event.receiver_address,
            block_number: event.block_number,
            event_index: event.event_index,
            denom: event.denom,
            amount: event.amount,
            direction: Direction::Inbound,
            status: EntryStatus::New,
            created_at: Utc::now(),
        }
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            source_tx_hash: self.source_tx_hash.clone(),
            event_index: self.event_index,
            receiver_address: self.receiver_address.clone(),
        }
    }
}
