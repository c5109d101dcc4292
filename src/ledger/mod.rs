// Persistent state: watermarks, custody registry, and the deposit ledger
pub mod models;
pub mod repository;
pub mod store;

#[cfg(test)]
pub mod memory;

pub use models::{
    ChainWatermark, CustodyWallet, DepositEvent, Entity, LedgerEntry, NATIVE_CONTRACT_ADDRESS,
};
pub use repository::LedgerRepository;
pub use store::{AddressRegistry, InsertOutcome, LedgerStore, WatermarkStore};
