use std::str::FromStr;

use base64::Engine;
use primitive_types::U256;
use serde::Deserialize;
use sqlx::types::BigDecimal;
use tracing::debug;

use super::{WatchSet, EVENT_ETHEREUM_TX, EVENT_TX_LOG};
use crate::chain::{Address, RawTx};
use crate::error::ExtractError;
use crate::ledger::DepositEvent;

const TX_LOG_ATTRIBUTE: &str = "txLog";
const ETHEREUM_TX_HASH_ATTRIBUTE: &str = "ethereumTxHash";

/// An EVM log as the chain embeds it in a `tx_log` event.
#[derive(Debug, Clone, Deserialize)]
pub struct TxLog {
    /// Empty or absent means the event carries no log.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    /// Base64 of the raw data bytes.
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default, rename = "blockNumber")]
    pub block_number: u64,
}

/// A decoded log plus the position of its `tx_log` event in the transaction.
#[derive(Debug, Clone)]
pub struct IndexedLog {
    pub event_index: u32,
    pub log: TxLog,
}

/// Every non-empty `tx_log` payload in emission order.
pub fn collect_logs(tx: &RawTx) -> Result<Vec<IndexedLog>, ExtractError> {
    let mut logs = Vec::new();

    for (index, event) in tx.events.iter().enumerate() {
        if event.kind != EVENT_TX_LOG {
            continue;
        }
        let raw = match event.attribute(TX_LOG_ATTRIBUTE) {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => continue,
        };

        let log: TxLog = serde_json::from_str(raw)?;
        if log.address.is_empty() {
            continue;
        }

        logs.push(IndexedLog {
            event_index: index as u32,
            log,
        });
    }

    Ok(logs)
}

/// First log whose receiver is watched and whose sender and amount are set.
pub fn extract(
    tx: &RawTx,
    logs: &[IndexedLog],
    watch: &WatchSet,
) -> Result<Option<DepositEvent>, ExtractError> {
    let secondary_tx_hash = tx
        .events
        .iter()
        .filter(|e| e.kind == EVENT_ETHEREUM_TX)
        .find_map(|e| e.attribute(ETHEREUM_TX_HASH_ATTRIBUTE))
        .filter(|hash| !hash.is_empty())
        .map(str::to_string);

    for IndexedLog { event_index, log } in logs {
        let receiver = match topic_address(&log.topics, 2)? {
            Some(address) => address.to_checksum(),
            None => {
                debug!(tx = %tx.hash, event_index, "tx_log has no receiver topic");
                continue;
            }
        };
        if !watch.contains(&receiver) {
            continue;
        }

        let sender = match topic_address(&log.topics, 1)? {
            Some(address) => address.to_checksum(),
            None => {
                debug!(tx = %tx.hash, event_index, "tx_log has no sender topic");
                continue;
            }
        };

        let amount = match decode_amount(log.data.as_deref())? {
            Some(amount) => amount,
            None => {
                debug!(tx = %tx.hash, event_index, "tx_log carries no amount");
                continue;
            }
        };

        let block_number = if log.block_number == 0 {
            tx.height
        } else {
            log.block_number
        };

        return Ok(Some(DepositEvent {
            source_tx_hash: tx.hash.clone(),
            secondary_tx_hash,
            contract_address: log.address.clone(),
            sender_address: sender,
            receiver_address: receiver,
            block_number,
            event_index: *event_index,
            denom: String::new(),
            amount,
        }));
    }

    Ok(None)
}

/// Address held in topic slot `index`, or `None` when the slot is absent or empty.
fn topic_address(topics: &[String], index: usize) -> Result<Option<Address>, ExtractError> {
    let topic = match topics.get(index) {
        Some(topic) => topic,
        None => return Ok(None),
    };

    let digits = topic
        .strip_prefix("0x")
        .or_else(|| topic.strip_prefix("0X"))
        .unwrap_or(topic);
    if digits.is_empty() {
        return Ok(None);
    }

    let padded;
    let digits = if digits.len() % 2 == 1 {
        padded = format!("0{}", digits);
        padded.as_str()
    } else {
        digits
    };

    let bytes = hex::decode(digits).map_err(|_| ExtractError::MalformedTopic {
        index,
        topic: topic.clone(),
    })?;

    Ok(Some(Address::from_word(&bytes)))
}

/// Big-endian unsigned amount. Missing or empty data is `None`.
fn decode_amount(data: Option<&str>) -> Result<Option<BigDecimal>, ExtractError> {
    let data = match data {
        Some(data) if !data.is_empty() => data,
        _ => return Ok(None),
    };

    let bytes = base64::engine::general_purpose::STANDARD.decode(data)?;
    if bytes.is_empty() {
        return Ok(None);
    }

    let first_significant = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let significant = &bytes[first_significant..];
    if significant.len() > 32 {
        return Err(ExtractError::AmountOverflow(significant.len()));
    }

    let value = U256::from_big_endian(significant).to_string();
    BigDecimal::from_str(&value)
        .map(Some)
        .map_err(|_| ExtractError::LogAmount(value))
}
