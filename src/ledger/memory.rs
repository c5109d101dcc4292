use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{ChainWatermark, CustodyWallet, DedupKey, Entity, LedgerEntry};
use super::store::{AddressRegistry, InsertOutcome, LedgerStore, WatermarkStore};
use crate::error::{AppError, AppResult};

/// In-memory implementation of the three stores, for driving full cycles in tests.
#[derive(Default)]
pub struct InMemoryLedger {
    watermarks: RwLock<HashMap<i64, u64>>,
    entities: RwLock<HashMap<Uuid, Entity>>,
    wallets: RwLock<HashMap<String, CustodyWallet>>,
    entries: RwLock<HashMap<DedupKey, LedgerEntry>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_entity(&self, name: &str, wallet_address: &str) -> Entity {
        let entity = Entity {
            id: Uuid::new_v4(),
            name: name.to_string(),
            wallet_address: wallet_address.to_string(),
            created_at: Utc::now(),
        };
        self.entities.write().await.insert(entity.id, entity.clone());
        self.wallets.write().await.insert(
            wallet_address.to_string(),
            CustodyWallet {
                address: wallet_address.to_string(),
                owning_entity_id: entity.id,
                is_active: true,
            },
        );
        entity
    }

    pub async fn set_wallet_active(&self, address: &str, active: bool) {
        if let Some(wallet) = self.wallets.write().await.get_mut(address) {
            wallet.is_active = active;
        }
    }

    pub async fn entries(&self) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = self.entries.read().await.values().cloned().collect();
        entries.sort_by_key(|e| (e.block_number, e.event_index));
        entries
    }

    pub async fn watermark(&self, chain_id: i64) -> Option<u64> {
        self.watermarks.read().await.get(&chain_id).copied()
    }
}

#[async_trait]
impl WatermarkStore for InMemoryLedger {
    async fn get_watermark(&self, chain_id: i64) -> AppResult<Option<ChainWatermark>> {
        Ok(self
            .watermarks
            .read()
            .await
            .get(&chain_id)
            .map(|height| ChainWatermark {
                chain_id,
                last_scanned_block: *height,
            }))
    }

    async fn create_watermark(&self, chain_id: i64, height: u64) -> AppResult<()> {
        self.watermarks.write().await.entry(chain_id).or_insert(height);
        Ok(())
    }

    async fn advance_watermark(&self, chain_id: i64, height: u64) -> AppResult<()> {
        match self.watermarks.write().await.get_mut(&chain_id) {
            Some(current) => {
                *current = height;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("watermark for chain {}", chain_id))),
        }
    }
}

#[async_trait]
impl AddressRegistry for InMemoryLedger {
    async fn active_wallets(&self) -> AppResult<Vec<CustodyWallet>> {
        let mut wallets: Vec<CustodyWallet> = self
            .wallets
            .read()
            .await
            .values()
            .filter(|w| w.is_active)
            .cloned()
            .collect();
        wallets.sort_by(|a, b| a.address.cmp(&b.address));
        Ok(wallets)
    }

    async fn entity_by_wallet_address(&self, address: &str) -> AppResult<Entity> {
        let wallets = self.wallets.read().await;
        let wallet = wallets
            .get(address)
            .ok_or_else(|| AppError::NotFound(format!("entity for wallet {}", address)))?;

        self.entities
            .read()
            .await
            .get(&wallet.owning_entity_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("entity for wallet {}", address)))
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedger {
    async fn find_entry(&self, key: &DedupKey) -> AppResult<Option<LedgerEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn insert_if_absent(&self, entry: &LedgerEntry) -> AppResult<InsertOutcome> {
        let mut entries = self.entries.write().await;
        let key = entry.dedup_key();
        if entries.contains_key(&key) {
            return Ok(InsertOutcome::AlreadyRecorded);
        }
        entries.insert(key, entry.clone());
        Ok(InsertOutcome::Inserted)
    }
}
