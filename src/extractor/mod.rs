// Turns raw chain transactions into normalized deposit events
pub mod amount;
pub mod contract_log;
pub mod native;

#[cfg(test)]
pub mod fixtures;

use std::collections::HashMap;

use tracing::warn;

use crate::chain::{AddressCodec, RawTx};
use crate::error::ExtractError;
use crate::ledger::{CustodyWallet, DepositEvent};

/// Event kinds the chain emits for EVM and bank transfers.
pub const EVENT_ETHEREUM_TX: &str = "ethereum_tx";
pub const EVENT_TX_LOG: &str = "tx_log";
pub const EVENT_TRANSFER: &str = "transfer";

/// Receivers a cycle is allowed to credit: a snapshot of the active custody
/// wallets plus the business address, keyed by canonical form.
#[derive(Debug, Clone)]
pub struct WatchSet {
    /// Canonical address to the address as the registry stores it.
    wallets: HashMap<String, String>,
    business_address: String,
}

impl WatchSet {
    /// Wallets whose stored address does not parse are logged and left out.
    pub fn new(
        codec: &AddressCodec,
        wallets: &[CustodyWallet],
        business_address: impl Into<String>,
    ) -> Self {
        let wallets = wallets
            .iter()
            .filter(|w| w.is_active)
            .filter_map(|w| match codec.normalize(&w.address) {
                Ok(canonical) => Some((canonical, w.address.clone())),
                Err(e) => {
                    warn!(address = %w.address, "Ignoring custody wallet: {}", e);
                    None
                }
            })
            .collect();

        Self {
            wallets,
            business_address: business_address.into(),
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        address == self.business_address || self.wallets.contains_key(address)
    }

    pub fn is_business(&self, address: &str) -> bool {
        address == self.business_address
    }

    /// Registry lookup key for a canonical receiver.
    pub fn registry_key<'a>(&'a self, address: &'a str) -> &'a str {
        self.wallets.get(address).map(String::as_str).unwrap_or(address)
    }

    pub fn wallet_count(&self) -> usize {
        self.wallets.len()
    }
}

/// Decodes one transaction into at most one deposit.
///
/// Transactions carrying a non-empty `tx_log` event go through the
/// contract-log decoder and never reach the native decoder, even if they also
/// carry bank `transfer` events.
#[derive(Debug, Clone)]
pub struct EventExtractor {
    codec: AddressCodec,
}

impl EventExtractor {
    pub fn new(codec: AddressCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &AddressCodec {
        &self.codec
    }

    /// `Ok(None)` means nothing in the transaction is creditable to `watch`.
    pub fn extract(
        &self,
        tx: &RawTx,
        watch: &WatchSet,
    ) -> Result<Option<DepositEvent>, ExtractError> {
        if !tx.succeeded() {
            return Ok(None);
        }

        let logs = contract_log::collect_logs(tx)?;
        if !logs.is_empty() {
            return contract_log::extract(tx, &logs, watch);
        }

        native::extract(tx, &self.codec, watch)
    }
}
