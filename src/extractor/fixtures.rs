use base64::Engine;
use uuid::Uuid;

use super::{EventExtractor, WatchSet, EVENT_ETHEREUM_TX, EVENT_TRANSFER, EVENT_TX_LOG};
use crate::chain::{AddressCodec, RawTx, TxEvent};
use crate::ledger::CustodyWallet;

pub const SENDER_A: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const CUSTODY_1: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
pub const CUSTODY_2: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";
pub const BUSINESS: &str = "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb";
pub const OUTSIDER: &str = "0x1111111111111111111111111111111111111111";
pub const EVM_HASH: &str = "0x9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
pub const TRANSFER_TOPIC: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

pub fn codec() -> AddressCodec {
    AddressCodec::new("aioz").unwrap()
}

pub fn extractor() -> EventExtractor {
    EventExtractor::new(codec())
}

pub fn wallets() -> Vec<CustodyWallet> {
    [CUSTODY_1, CUSTODY_2]
        .iter()
        .map(|address| CustodyWallet {
            address: address.to_string(),
            owning_entity_id: Uuid::nil(),
            is_active: true,
        })
        .collect()
}

pub fn watch_set() -> WatchSet {
    WatchSet::new(&codec(), &wallets(), BUSINESS)
}

pub fn bech32(codec: &AddressCodec, hex_address: &str) -> String {
    let address = codec.parse(hex_address).unwrap();
    codec.to_bech32(&address).unwrap()
}

pub fn transfer(sender: &str, recipient: &str, amount: &str) -> TxEvent {
    TxEvent::new(
        EVENT_TRANSFER,
        &[("recipient", recipient), ("sender", sender), ("amount", amount)],
    )
}

pub fn native_tx(hash: &str, height: u64, events: Vec<TxEvent>) -> RawTx {
    let mut all = vec![TxEvent::new("message", &[("action", "/cosmos.bank.v1beta1.MsgSend")])];
    all.extend(events);
    RawTx {
        hash: hash.to_string(),
        height,
        code: 0,
        events: all,
    }
}

/// A 32-byte topic holding `address` in its trailing 20 bytes.
pub fn topic(address: &str) -> String {
    format!("0x{:0>64}", address.trim_start_matches("0x").to_lowercase())
}

pub fn amount_data(amount: u64) -> String {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&amount.to_be_bytes());
    base64::engine::general_purpose::STANDARD.encode(word)
}

pub fn tx_log_event(contract: &str, topics: &[String], data: &str, block_number: u64) -> TxEvent {
    let log = serde_json::json!({
        "address": contract,
        "topics": topics,
        "data": data,
        "blockNumber": block_number,
        "transactionHash": EVM_HASH,
        "transactionIndex": 0,
        "blockHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
        "logIndex": 0,
        "removed": false
    });
    let payload = log.to_string();
    TxEvent::new(EVENT_TX_LOG, &[("txLog", payload.as_str())])
}

pub fn contract_tx(
    hash: &str,
    height: u64,
    log_block: u64,
    contract: &str,
    sender: &str,
    receiver: &str,
    amount: u64,
) -> RawTx {
    let topics = vec![TRANSFER_TOPIC.to_string(), topic(sender), topic(receiver)];
    RawTx {
        hash: hash.to_string(),
        height,
        code: 0,
        events: vec![
            TxEvent::new(EVENT_ETHEREUM_TX, &[("amount", "0"), ("ethereumTxHash", EVM_HASH)]),
            tx_log_event(contract, &topics, &amount_data(amount), log_block),
        ],
    }
}
