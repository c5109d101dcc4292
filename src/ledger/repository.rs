use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::BigDecimal;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use super::models::*;
use super::store::{AddressRegistry, InsertOutcome, LedgerStore, WatermarkStore};
use crate::error::{AppError, AppResult};

/// Ledger repository - Postgres-backed watermark, registry and ledger stores
pub struct LedgerRepository {
    pub pool: PgPool,
}

// ========== STORAGE ROWS ==========

#[derive(Debug, FromRow)]
struct WatermarkRow {
    chain_id: i64,
    last_scanned_block: i64,
}

#[derive(Debug, FromRow)]
struct EntityRow {
    id: Uuid,
    name: String,
    wallet_address: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct CustodyWalletRow {
    address: String,
    entity_id: Uuid,
    is_active: bool,
}

#[derive(Debug, FromRow)]
struct LedgerEntryRow {
    id: Uuid,
    entity_id: Option<Uuid>,
    source_tx_hash: String,
    secondary_tx_hash: Option<String>,
    contract_address: String,
    sender_address: String,
    receiver_address: String,
    block_number: i64,
    event_index: i32,
    denom: String,
    amount: BigDecimal,
    direction: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<WatermarkRow> for ChainWatermark {
    type Error = AppError;

    fn try_from(row: WatermarkRow) -> AppResult<Self> {
        Ok(ChainWatermark {
            chain_id: row.chain_id,
            last_scanned_block: from_db_height(row.last_scanned_block)?,
        })
    }
}

impl From<EntityRow> for Entity {
    fn from(row: EntityRow) -> Self {
        Entity {
            id: row.id,
            name: row.name,
            wallet_address: row.wallet_address,
            created_at: row.created_at,
        }
    }
}

impl From<CustodyWalletRow> for CustodyWallet {
    fn from(row: CustodyWalletRow) -> Self {
        CustodyWallet {
            address: row.address,
            owning_entity_id: row.entity_id,
            is_active: row.is_active,
        }
    }
}

impl TryFrom<LedgerEntryRow> for LedgerEntry {
    type Error = AppError;

    fn try_from(row: LedgerEntryRow) -> AppResult<Self> {
        Ok(LedgerEntry {
            id: row.id,
            entity_id: row.entity_id,
            source_tx_hash: row.source_tx_hash,
            secondary_tx_hash: row.secondary_tx_hash,
            contract_address: row.contract_address,
            sender_address: row.sender_address,
            receiver_address: row.receiver_address,
            block_number: from_db_height(row.block_number)?,
            event_index: u32::try_from(row.event_index).map_err(|_| {
                AppError::Internal(format!("negative event index {}", row.event_index))
            })?,
            denom: row.denom,
            amount: row.amount,
            direction: Direction::parse(&row.direction)?,
            status: EntryStatus::parse(&row.status)?,
            created_at: row.created_at,
        })
    }
}

fn to_db_height(height: u64) -> AppResult<i64> {
    i64::try_from(height)
        .map_err(|_| AppError::Internal(format!("block height {} out of range", height)))
}

fn from_db_height(height: i64) -> AppResult<u64> {
    u64::try_from(height)
        .map_err(|_| AppError::Internal(format!("negative block height {}", height)))
}

fn to_db_index(index: u32) -> AppResult<i32> {
    i32::try_from(index)
        .map_err(|_| AppError::Internal(format!("event index {} out of range", index)))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

const LEDGER_COLUMNS: &str = r#"
    id, entity_id, source_tx_hash, secondary_tx_hash, contract_address,
    sender_address, receiver_address, block_number, event_index, denom,
    amount, direction, status, created_at
"#;

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ========== ENTITY OPERATIONS ==========

    /// Creates the entity and its active custody wallet in one transaction.
    /// `wallet_address` must already be in canonical form.
    pub async fn register_entity(&self, name: &str, wallet_address: &str) -> AppResult<Entity> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            INSERT INTO entities (id, name, wallet_address)
            VALUES ($1, $2, $3)
            RETURNING id, name, wallet_address, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(wallet_address)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("entity name or wallet already registered: {}", name))
            } else {
                e.into()
            }
        })?;

        sqlx::query(
            r#"
            INSERT INTO custody_wallets (address, entity_id, is_active)
            VALUES ($1, $2, true)
            "#,
        )
        .bind(wallet_address)
        .bind(row.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!("custody wallet already registered: {}", wallet_address))
            } else {
                e.into()
            }
        })?;

        tx.commit().await?;

        info!("Registered entity {} with custody wallet {}", row.name, row.wallet_address);
        Ok(row.into())
    }

    pub async fn get_entity(&self, entity_id: Uuid) -> AppResult<Option<Entity>> {
        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            SELECT id, name, wallet_address, created_at
            FROM entities
            WHERE id = $1
            "#,
        )
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Entity::from))
    }

    /// Ledger entries credited to an entity, newest first.
    pub async fn list_entries_for_entity(
        &self,
        entity_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, LedgerEntryRow>(&format!(
            r#"
            SELECT {}
            FROM ledger_entries
            WHERE entity_id = $1
            ORDER BY block_number DESC, event_index DESC
            LIMIT $2
            "#,
            LEDGER_COLUMNS
        ))
        .bind(entity_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerEntry::try_from).collect()
    }
}

// ========== WATERMARK STORE ==========

#[async_trait]
impl WatermarkStore for LedgerRepository {
    async fn get_watermark(&self, chain_id: i64) -> AppResult<Option<ChainWatermark>> {
        let row = sqlx::query_as::<_, WatermarkRow>(
            r#"
            SELECT chain_id, last_scanned_block
            FROM chain_watermarks
            WHERE chain_id = $1
            "#,
        )
        .bind(chain_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ChainWatermark::try_from).transpose()
    }

    async fn create_watermark(&self, chain_id: i64, height: u64) -> AppResult<()> {
        // Two first cycles racing each other both seed from the tip; either row is valid.
        sqlx::query(
            r#"
            INSERT INTO chain_watermarks (chain_id, last_scanned_block)
            VALUES ($1, $2)
            ON CONFLICT (chain_id) DO NOTHING
            "#,
        )
        .bind(chain_id)
        .bind(to_db_height(height)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn advance_watermark(&self, chain_id: i64, height: u64) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE chain_watermarks
            SET last_scanned_block = $2, updated_at = NOW()
            WHERE chain_id = $1
            "#,
        )
        .bind(chain_id)
        .bind(to_db_height(height)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("watermark for chain {}", chain_id)));
        }

        Ok(())
    }
}

// ========== ADDRESS REGISTRY ==========

#[async_trait]
impl AddressRegistry for LedgerRepository {
    async fn active_wallets(&self) -> AppResult<Vec<CustodyWallet>> {
        let rows = sqlx::query_as::<_, CustodyWalletRow>(
            r#"
            SELECT address, entity_id, is_active
            FROM custody_wallets
            WHERE is_active = true
            ORDER BY address
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CustodyWallet::from).collect())
    }

    async fn entity_by_wallet_address(&self, address: &str) -> AppResult<Entity> {
        sqlx::query_as::<_, EntityRow>(
            r#"
            SELECT e.id, e.name, e.wallet_address, e.created_at
            FROM entities e
            JOIN custody_wallets w ON w.entity_id = e.id
            WHERE w.address = $1
            "#,
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await?
        .map(Entity::from)
        .ok_or_else(|| AppError::NotFound(format!("entity for wallet {}", address)))
    }
}

// ========== LEDGER STORE ==========

#[async_trait]
impl LedgerStore for LedgerRepository {
    async fn find_entry(&self, key: &DedupKey) -> AppResult<Option<LedgerEntry>> {
        let row = sqlx::query_as::<_, LedgerEntryRow>(&format!(
            r#"
            SELECT {}
            FROM ledger_entries
            WHERE source_tx_hash = $1 AND event_index = $2 AND receiver_address = $3
            "#,
            LEDGER_COLUMNS
        ))
        .bind(&key.source_tx_hash)
        .bind(to_db_index(key.event_index)?)
        .bind(&key.receiver_address)
        .fetch_optional(&self.pool)
        .await?;

        row.map(LedgerEntry::try_from).transpose()
    }

    async fn insert_if_absent(&self, entry: &LedgerEntry) -> AppResult<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, entity_id, source_tx_hash, secondary_tx_hash, contract_address,
                sender_address, receiver_address, block_number, event_index, denom,
                amount, direction, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (source_tx_hash, event_index, receiver_address) DO NOTHING
            "#,
        )
        .bind(entry.id)
        .bind(entry.entity_id)
        .bind(&entry.source_tx_hash)
        .bind(&entry.secondary_tx_hash)
        .bind(&entry.contract_address)
        .bind(&entry.sender_address)
        .bind(&entry.receiver_address)
        .bind(to_db_height(entry.block_number)?)
        .bind(to_db_index(entry.event_index)?)
        .bind(&entry.denom)
        .bind(&entry.amount)
        .bind(entry.direction.as_str())
        .bind(entry.status.as_str())
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::AlreadyRecorded)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_conversions() {
        assert_eq!(to_db_height(150).unwrap(), 150);
        assert!(to_db_height(u64::MAX).is_err());
        assert!(from_db_height(-1).is_err());
        assert!(to_db_index(u32::MAX).is_err());
    }

    #[test]
    fn test_row_conversion_rejects_unknown_status() {
        let row = LedgerEntryRow {
            id: Uuid::new_v4(),
            entity_id: None,
            source_tx_hash: "AB".to_string(),
            secondary_tx_hash: None,
            contract_address: NATIVE_CONTRACT_ADDRESS.to_string(),
            sender_address: "0x01".to_string(),
            receiver_address: "0x02".to_string(),
            block_number: 10,
            event_index: 0,
            denom: "aioz".to_string(),
            amount: BigDecimal::from(1),
            direction: "in".to_string(),
            status: "settled".to_string(),
            created_at: Utc::now(),
        };

        assert!(LedgerEntry::try_from(row).is_err());
    }
}
