use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::chain::AddressCodec;
use crate::error::AppResult;
use crate::ledger::{ChainWatermark, Entity, LedgerEntry};
use crate::reconciliation::CycleReport;

pub const DEFAULT_DEPOSIT_PAGE: i64 = 50;
pub const MAX_DEPOSIT_PAGE: i64 = 500;

// ========== REQUEST MODELS ==========

/// Registers an entity against a custody wallet provisioned elsewhere.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterEntityRequest {
    #[validate(length(min = 1, max = 128, message = "name must be 1 to 128 characters"))]
    pub name: String,

    /// Bech32 or hex.
    #[validate(length(min = 1, message = "wallet_address is required"))]
    pub wallet_address: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DepositListQuery {
    pub limit: Option<i64>,
}

impl DepositListQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_DEPOSIT_PAGE)
            .clamp(1, MAX_DEPOSIT_PAGE)
    }
}

// ========== RESPONSE MODELS ==========

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct WatermarkResponse {
    pub chain_id: i64,
    pub last_scanned_block: u64,
}

impl From<ChainWatermark> for WatermarkResponse {
    fn from(watermark: ChainWatermark) -> Self {
        Self {
            chain_id: watermark.chain_id,
            last_scanned_block: watermark.last_scanned_block,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleReportResponse {
    pub chain_id: i64,
    pub outcome: String,
    pub from_block: u64,
    pub to_block: u64,
    pub transactions_seen: u64,
    pub credited: u64,
    pub duplicates: u64,
    pub skipped: u64,
}

impl From<CycleReport> for CycleReportResponse {
    fn from(report: CycleReport) -> Self {
        Self {
            chain_id: report.chain_id,
            outcome: report.outcome.as_str().to_string(),
            from_block: report.from_block,
            to_block: report.to_block,
            transactions_seen: report.transactions_seen,
            credited: report.credited,
            duplicates: report.duplicates,
            skipped: report.skipped,
        }
    }
}

/// Entity with both renderings of its custody address.
#[derive(Debug, Serialize)]
pub struct EntityResponse {
    pub id: Uuid,
    pub name: String,
    pub wallet_address: String,
    pub wallet_address_bech32: String,
    pub created_at: DateTime<Utc>,
}

impl EntityResponse {
    pub fn from_entity(entity: Entity, codec: &AddressCodec) -> AppResult<Self> {
        let address = codec.parse(&entity.wallet_address)?;
        Ok(Self {
            id: entity.id,
            name: entity.name,
            wallet_address_bech32: codec.to_bech32(&address)?,
            wallet_address: entity.wallet_address,
            created_at: entity.created_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DepositResponse {
    pub id: Uuid,
    pub source_tx_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_tx_hash: Option<String>,
    pub contract_address: String,
    pub sender_address: String,
    pub receiver_address: String,
    pub block_number: u64,
    pub event_index: u32,
    pub denom: String,
    /// Decimal string; amounts exceed what JSON numbers carry safely.
    pub amount: String,
    pub direction: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntry> for DepositResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            source_tx_hash: entry.source_tx_hash,
            secondary_tx_hash: entry.secondary_tx_hash,
            contract_address: entry.contract_address,
            sender_address: entry.sender_address,
            receiver_address: entry.receiver_address,
            block_number: entry.block_number,
            event_index: entry.event_index,
            denom: entry.denom,
            amount: entry.amount.to_string(),
            direction: entry.direction.as_str().to_string(),
            status: entry.status.as_str().to_string(),
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DepositListResponse {
    pub entity_id: Uuid,
    pub deposits: Vec<DepositResponse>,
}
