use async_trait::async_trait;
use base64::Engine;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, instrument};

use super::client::ChainClient;
use super::types::{
    EventAttribute, HeightRange, RawTx, SortOrder, TxEvent, TxSearchPage, UndecodedTx,
};
use crate::error::ChainError;

// ========== WIRE TYPES ==========

#[derive(Debug, Serialize)]
struct RpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    sync_info: SyncInfo,
}

#[derive(Debug, Deserialize)]
struct SyncInfo {
    latest_block_height: String,
}

#[derive(Debug, Serialize)]
struct TxSearchParams {
    query: String,
    prove: bool,
    page: String,
    per_page: String,
    order_by: String,
}

#[derive(Debug, Deserialize)]
struct TxSearchResult {
    #[serde(default)]
    txs: Vec<RpcTx>,
    total_count: String,
}

#[derive(Debug, Deserialize)]
struct RpcTx {
    hash: String,
    height: String,
    tx_result: RpcTxResult,
}

#[derive(Debug, Deserialize)]
struct RpcTxResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    events: Vec<RpcEvent>,
}

#[derive(Debug, Deserialize)]
struct RpcEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    attributes: Vec<RpcAttribute>,
}

#[derive(Debug, Deserialize)]
struct RpcAttribute {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    value: Option<String>,
}

// ========== CLIENT ==========

/// JSON-RPC client for a CometBFT/Tendermint node.
pub struct TendermintClient {
    http: reqwest::Client,
    rpc_url: String,
    /// Tendermint 0.34 reports event attribute keys and values base64-encoded.
    base64_attributes: bool,
}

impl TendermintClient {
    pub fn new(http: reqwest::Client, rpc_url: impl Into<String>, base64_attributes: bool) -> Self {
        Self {
            http,
            rpc_url: rpc_url.into(),
            base64_attributes,
        }
    }

    async fn call<P: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<T, ChainError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response: RpcResponse<T> = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        unwrap_response(response)
    }
}

#[async_trait]
impl ChainClient for TendermintClient {
    #[instrument(skip(self))]
    async fn current_height(&self) -> Result<u64, ChainError> {
        let status: StatusResult = self.call("status", serde_json::json!({})).await?;
        parse_u64("latest_block_height", &status.sync_info.latest_block_height)
    }

    #[instrument(skip(self), fields(from = range.from, to = range.to))]
    async fn search_transactions(
        &self,
        range: HeightRange,
        page: u32,
        per_page: u32,
        order: SortOrder,
    ) -> Result<TxSearchPage, ChainError> {
        let params = TxSearchParams {
            query: range.to_query(),
            prove: false,
            page: page.to_string(),
            per_page: per_page.to_string(),
            order_by: order.as_str().to_string(),
        };

        let result: TxSearchResult = self.call("tx_search", params).await?;
        let page = decode_search_result(result, self.base64_attributes)?;

        debug!(
            returned = page.returned(),
            undecoded = page.undecoded.len(),
            total_count = page.total_count,
            "tx_search page fetched"
        );
        Ok(page)
    }
}

/// Chain id of the EVM side of the chain, via `eth_chainId`.
pub async fn fetch_evm_chain_id(http: &reqwest::Client, evm_url: &str) -> Result<i64, ChainError> {
    let request = RpcRequest {
        jsonrpc: "2.0",
        id: 1,
        method: "eth_chainId",
        params: Vec::<()>::new(),
    };

    let response: RpcResponse<String> = http
        .post(evm_url)
        .json(&request)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let hex_id = unwrap_response(response)?;
    parse_hex_quantity(&hex_id)
}

// ========== DECODING ==========

fn unwrap_response<T>(response: RpcResponse<T>) -> Result<T, ChainError> {
    if let Some(err) = response.error {
        let message = match err.data {
            Some(data) if !data.is_empty() => format!("{} ({})", err.message, data),
            _ => err.message,
        };
        return Err(ChainError::Rpc {
            code: err.code,
            message,
        });
    }

    response
        .result
        .ok_or_else(|| ChainError::MalformedResponse("missing result".to_string()))
}

fn decode_search_result(
    result: TxSearchResult,
    base64_attributes: bool,
) -> Result<TxSearchPage, ChainError> {
    let total_count = parse_u64("total_count", &result.total_count)?;
    let mut page = TxSearchPage {
        total_count,
        ..TxSearchPage::default()
    };

    for tx in result.txs {
        let hash = tx.hash.clone();
        match decode_tx(tx, base64_attributes) {
            Ok(raw) => page.txs.push(raw),
            Err(e) => page.undecoded.push(UndecodedTx {
                hash,
                reason: e.to_string(),
            }),
        }
    }

    Ok(page)
}

fn decode_tx(tx: RpcTx, base64_attributes: bool) -> Result<RawTx, ChainError> {
    let events = tx
        .tx_result
        .events
        .into_iter()
        .map(|event| decode_event(event, base64_attributes))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RawTx {
        hash: tx.hash,
        height: parse_u64("height", &tx.height)?,
        code: tx.tx_result.code,
        events,
    })
}

fn decode_event(event: RpcEvent, base64_attributes: bool) -> Result<TxEvent, ChainError> {
    let attributes = event
        .attributes
        .into_iter()
        .map(|attr| {
            Ok(EventAttribute {
                key: decode_text(attr.key.unwrap_or_default(), base64_attributes)?,
                value: decode_text(attr.value.unwrap_or_default(), base64_attributes)?,
            })
        })
        .collect::<Result<Vec<_>, ChainError>>()?;

    Ok(TxEvent {
        kind: event.kind,
        attributes,
    })
}

fn decode_text(raw: String, base64_attributes: bool) -> Result<String, ChainError> {
    if !base64_attributes {
        return Ok(raw);
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(raw.as_bytes())
        .map_err(|e| ChainError::MalformedResponse(format!("attribute is not base64: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| ChainError::MalformedResponse(format!("attribute is not utf-8: {}", e)))
}

fn parse_u64(field: &str, value: &str) -> Result<u64, ChainError> {
    value.parse::<u64>().map_err(|_| {
        ChainError::MalformedResponse(format!("{} is not an integer: {:?}", field, value))
    })
}

fn parse_hex_quantity(value: &str) -> Result<i64, ChainError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    i64::from_str_radix(digits, 16).map_err(|_| {
        ChainError::MalformedResponse(format!("chain id is not a hex quantity: {:?}", value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(s: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(s)
    }

    #[test]
    fn test_decode_search_result_base64() {
        let body = serde_json::json!({
            "txs": [{
                "hash": "9F86D081884C7D659A2FEAA0C55AD015A3BF4F1B2B0B822CD15D6C15B0F00A08",
                "height": "150",
                "index": 0,
                "tx_result": {
                    "code": 0,
                    "events": [{
                        "type": "transfer",
                        "attributes": [
                            {"key": b64("recipient"), "value": b64("aioz1abc"), "index": true},
                            {"key": b64("amount"), "value": b64("500aioz"), "index": true}
                        ]
                    }]
                }
            }],
            "total_count": "1"
        });

        let result: TxSearchResult = serde_json::from_value(body).unwrap();
        let page = decode_search_result(result, true).unwrap();

        assert_eq!(page.total_count, 1);
        let tx = &page.txs[0];
        assert_eq!(tx.height, 150);
        assert!(tx.succeeded());
        assert_eq!(tx.events[0].kind, "transfer");
        assert_eq!(tx.events[0].attribute("recipient"), Some("aioz1abc"));
        assert_eq!(tx.events[0].attribute("amount"), Some("500aioz"));
    }

    #[test]
    fn test_decode_plain_attributes_and_nulls() {
        let body = serde_json::json!({
            "txs": [{
                "hash": "AB",
                "height": "7",
                "tx_result": {
                    "code": 5,
                    "events": [{
                        "type": "message",
                        "attributes": [{"key": "action", "value": null}]
                    }]
                }
            }],
            "total_count": "3"
        });

        let result: TxSearchResult = serde_json::from_value(body).unwrap();
        let page = decode_search_result(result, false).unwrap();

        assert_eq!(page.total_count, 3);
        assert!(!page.txs[0].succeeded());
        assert_eq!(page.txs[0].events[0].attribute("action"), Some(""));
    }

    #[test]
    fn test_undecodable_tx_kept_apart_from_page() {
        let not_utf8 = base64::engine::general_purpose::STANDARD.encode([0xff, 0xfe, 0x00]);
        let body = serde_json::json!({
            "txs": [
                {
                    "hash": "GOOD",
                    "height": "150",
                    "tx_result": {"code": 0, "events": [{
                        "type": "transfer",
                        "attributes": [{"key": b64("amount"), "value": b64("500aioz")}]
                    }]}
                },
                {
                    "hash": "ODD",
                    "height": "151",
                    "tx_result": {"code": 0, "events": [{
                        "type": "transfer",
                        "attributes": [{"key": b64("amount"), "value": not_utf8}]
                    }]}
                },
                {"hash": "NOHEIGHT", "height": "abc", "tx_result": {}}
            ],
            "total_count": "3"
        });

        let result: TxSearchResult = serde_json::from_value(body).unwrap();
        let page = decode_search_result(result, true).unwrap();

        assert_eq!(page.returned(), 3);
        assert_eq!(page.txs.len(), 1);
        assert_eq!(page.txs[0].hash, "GOOD");

        let hashes: Vec<&str> = page.undecoded.iter().map(|u| u.hash.as_str()).collect();
        assert_eq!(hashes, vec!["ODD", "NOHEIGHT"]);
        assert!(page.undecoded[0].reason.contains("utf-8"));
        assert!(page.undecoded[1].reason.contains("height"));
    }

    #[test]
    fn test_bad_total_count_is_malformed() {
        let body = serde_json::json!({"txs": [], "total_count": "many"});

        let result: TxSearchResult = serde_json::from_value(body).unwrap();
        assert!(matches!(
            decode_search_result(result, false),
            Err(ChainError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_rpc_error_surfaces() {
        let response: RpcResponse<StatusResult> = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {
                "code": -32603,
                "message": "Internal error",
                "data": "page should be within [1, 2] range"
            }
        }))
        .unwrap();

        match unwrap_response(response) {
            Err(ChainError::Rpc { code, message }) => {
                assert_eq!(code, -32603);
                assert!(message.contains("page should be within"));
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_parse_hex_quantity() {
        assert_eq!(parse_hex_quantity("0xa8").unwrap(), 168);
        assert!(parse_hex_quantity("0xzz").is_err());
    }
}
