use tracing::debug;

use super::amount::parse_coin_amount;
use super::{WatchSet, EVENT_TRANSFER};
use crate::chain::{AddressCodec, RawTx};
use crate::error::ExtractError;
use crate::ledger::{DepositEvent, NATIVE_CONTRACT_ADDRESS};

/// First bank `transfer` event whose sender and recipient both resolve and
/// whose recipient is watched. Later qualifying transfers in the same
/// transaction are not reported.
pub fn extract(
    tx: &RawTx,
    codec: &AddressCodec,
    watch: &WatchSet,
) -> Result<Option<DepositEvent>, ExtractError> {
    for (index, event) in tx.events.iter().enumerate() {
        if event.kind != EVENT_TRANSFER {
            continue;
        }

        let sender = match codec.normalize(event.attribute("sender").unwrap_or_default()) {
            Ok(address) => address,
            Err(e) => {
                debug!(tx = %tx.hash, event_index = index, "transfer sender unreadable: {}", e);
                continue;
            }
        };
        let recipient = match codec.normalize(event.attribute("recipient").unwrap_or_default()) {
            Ok(address) => address,
            Err(e) => {
                debug!(tx = %tx.hash, event_index = index, "transfer recipient unreadable: {}", e);
                continue;
            }
        };

        if !watch.contains(&recipient) {
            continue;
        }

        let coin = parse_coin_amount(event.attribute("amount").unwrap_or_default())?;

        return Ok(Some(DepositEvent {
            source_tx_hash: tx.hash.clone(),
            secondary_tx_hash: None,
            contract_address: NATIVE_CONTRACT_ADDRESS.to_string(),
            sender_address: sender,
            receiver_address: recipient,
            block_number: tx.height,
            event_index: index as u32,
            denom: coin.denom,
            amount: coin.amount,
        }));
    }

    Ok(None)
}
