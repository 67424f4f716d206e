//! HTTP JSON-RPC client for an Ethereum-compatible node.

use async_trait::async_trait;
use primitive_types::U256;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_types::{Address, Bytes32, TxHash};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::domain::abi::decode_revert_reason;
use crate::domain::entities::{BlockInfo, CallRequest, LogEntry, LogFilter, Receipt};
use crate::domain::errors::LedgerError;
use crate::domain::revert::normalize_reason;
use crate::ports::outbound::{LedgerRpc, RpcConnector};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

pub struct JsonRpcClient {
    client: Client,
    endpoint: String,
    request_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id(),
        };
        debug!(method, id = request.id, "ledger rpc request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    LedgerError::Transport(format!("cannot connect to {}", self.endpoint))
                } else {
                    LedgerError::Transport(e.to_string())
                }
            })?;

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::Malformed(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(map_rpc_error(error));
        }
        Ok(body.result.unwrap_or(Value::Null))
    }
}

/// Turn a node error into a revert when it carries revert data or wording.
fn map_rpc_error(error: JsonRpcErrorObject) -> LedgerError {
    let data_hex = match &error.data {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(map)) => map.get("data").and_then(Value::as_str).map(str::to_string),
        _ => None,
    };

    if let Some(reason) = data_hex
        .as_deref()
        .and_then(|h| hex::decode(h.trim_start_matches("0x")).ok())
        .and_then(|bytes| decode_revert_reason(&bytes))
    {
        return LedgerError::reverted(reason);
    }

    if error.message.to_ascii_lowercase().contains("revert") {
        return LedgerError::reverted(normalize_reason(&error.message));
    }

    LedgerError::Rpc {
        code: error.code,
        message: error.message,
    }
}

// =============================================================================
// WIRE HELPERS
// =============================================================================

fn quantity(value: u64) -> String {
    format!("{value:#x}")
}

fn parse_u64(value: &Value) -> Result<u64, LedgerError> {
    let text = value
        .as_str()
        .ok_or_else(|| LedgerError::Malformed(format!("expected quantity, got {value}")))?;
    u64::from_str_radix(text.trim_start_matches("0x"), 16)
        .map_err(|e| LedgerError::Malformed(format!("quantity {text}: {e}")))
}

fn parse_u256(value: &Value) -> Result<U256, LedgerError> {
    let text = value
        .as_str()
        .ok_or_else(|| LedgerError::Malformed(format!("expected quantity, got {value}")))?;
    U256::from_str_radix(text.trim_start_matches("0x"), 16)
        .map_err(|e| LedgerError::Malformed(format!("quantity {text}: {e}")))
}

fn parse_data(value: &Value) -> Result<Vec<u8>, LedgerError> {
    let text = value
        .as_str()
        .ok_or_else(|| LedgerError::Malformed(format!("expected data, got {value}")))?;
    hex::decode(text.trim_start_matches("0x")).map_err(|e| LedgerError::Malformed(e.to_string()))
}

fn parse_address(value: &Value) -> Result<Address, LedgerError> {
    value
        .as_str()
        .ok_or_else(|| LedgerError::Malformed(format!("expected address, got {value}")))?
        .parse()
        .map_err(|e| LedgerError::Malformed(format!("address: {e}")))
}

fn parse_bytes32(value: &Value) -> Result<Bytes32, LedgerError> {
    value
        .as_str()
        .ok_or_else(|| LedgerError::Malformed(format!("expected hash, got {value}")))?
        .parse()
        .map_err(|e| LedgerError::Malformed(format!("hash: {e}")))
}

fn parse_log(value: &Value) -> Result<LogEntry, LedgerError> {
    let topics = value["topics"]
        .as_array()
        .ok_or_else(|| LedgerError::Malformed("log without topics".into()))?
        .iter()
        .map(parse_bytes32)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LogEntry {
        address: parse_address(&value["address"])?,
        topics,
        data: parse_data(&value["data"])?,
        block_number: parse_u64(&value["blockNumber"])?,
        tx_hash: parse_bytes32(&value["transactionHash"])?,
        log_index: parse_u64(&value["logIndex"])?,
    })
}

fn call_object(request: &CallRequest) -> Value {
    let mut tx = json!({
        "to": request.to.to_lower_hex(),
        "data": format!("0x{}", hex::encode(&request.data)),
    });
    if let Some(from) = request.from {
        tx["from"] = json!(from.to_lower_hex());
    }
    tx
}

fn parse_receipt(value: &Value) -> Result<Receipt, LedgerError> {
    let logs = value["logs"]
        .as_array()
        .map(|logs| logs.iter().map(parse_log).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();

    // Pre-London nodes omit effectiveGasPrice.
    let effective_gas_price = match &value["effectiveGasPrice"] {
        Value::Null => U256::zero(),
        v => parse_u256(v)?,
    };

    Ok(Receipt {
        tx_hash: parse_bytes32(&value["transactionHash"])?,
        block_number: parse_u64(&value["blockNumber"])?,
        from: parse_address(&value["from"])?,
        to: match &value["to"] {
            Value::Null => None,
            v => Some(parse_address(v)?),
        },
        gas_used: parse_u64(&value["gasUsed"])?,
        effective_gas_price,
        status: parse_u64(&value["status"])? == 1,
        logs,
    })
}

// =============================================================================
// PORT IMPLEMENTATION
// =============================================================================

#[async_trait]
impl LedgerRpc for JsonRpcClient {
    async fn chain_id(&self) -> Result<u64, LedgerError> {
        parse_u64(&self.request("eth_chainId", json!([])).await?)
    }

    async fn block_number(&self) -> Result<u64, LedgerError> {
        parse_u64(&self.request("eth_blockNumber", json!([])).await?)
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, LedgerError> {
        let tx = call_object(request);
        parse_data(&self.request("eth_call", json!([tx, "latest"])).await?)
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, LedgerError> {
        let tx = call_object(request);
        parse_u64(&self.request("eth_estimateGas", json!([tx, "latest"])).await?)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<TxHash, LedgerError> {
        let result = self
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        parse_bytes32(&result)
    }

    async fn transaction_count(
        &self,
        address: Address,
        pending: bool,
    ) -> Result<u64, LedgerError> {
        let tag = if pending { "pending" } else { "latest" };
        parse_u64(
            &self
                .request("eth_getTransactionCount", json!([address.to_lower_hex(), tag]))
                .await?,
        )
    }

    async fn gas_price(&self) -> Result<U256, LedgerError> {
        parse_u256(&self.request("eth_gasPrice", json!([])).await?)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>, LedgerError> {
        let result = self
            .request("eth_getTransactionReceipt", json!([hash.to_hex()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        parse_receipt(&result).map(Some)
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, LedgerError> {
        let mut params = json!({
            "address": filter.address.to_lower_hex(),
            "fromBlock": quantity(filter.from_block),
            "toBlock": filter.to_block.map(quantity).unwrap_or_else(|| "latest".to_string()),
        });
        if let Some(topic) = filter.topic0 {
            params["topics"] = json!([topic.to_hex()]);
        }

        let result = self.request("eth_getLogs", json!([params])).await?;
        result
            .as_array()
            .ok_or_else(|| LedgerError::Malformed("eth_getLogs did not return an array".into()))?
            .iter()
            .map(parse_log)
            .collect()
    }

    async fn block(&self, number: u64) -> Result<Option<BlockInfo>, LedgerError> {
        let result = self
            .request("eth_getBlockByNumber", json!([quantity(number), false]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        Ok(Some(BlockInfo {
            number: parse_u64(&result["number"])?,
            timestamp: parse_u64(&result["timestamp"])?,
        }))
    }

    async fn balance(&self, address: Address) -> Result<U256, LedgerError> {
        parse_u256(
            &self
                .request("eth_getBalance", json!([address.to_lower_hex(), "latest"]))
                .await?,
        )
    }
}

/// Connects over HTTP; reachability is proven with `eth_chainId`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

#[async_trait]
impl RpcConnector for HttpConnector {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn LedgerRpc>, LedgerError> {
        let client = JsonRpcClient::new(endpoint)?;
        client.chain_id().await?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::abi::encode_revert_reason;
    use crate::domain::revert::RevertKind;

    #[test]
    fn test_revert_data_is_decoded() {
        let payload = encode_revert_reason("Credential already exists");
        let err = map_rpc_error(JsonRpcErrorObject {
            code: 3,
            message: "execution reverted".into(),
            data: Some(json!(format!("0x{}", hex::encode(payload)))),
        });
        assert_eq!(err.revert_kind(), Some(RevertKind::AlreadyExists));
    }

    #[test]
    fn test_revert_message_without_data() {
        let err = map_rpc_error(JsonRpcErrorObject {
            code: -32603,
            message: "VM Exception while processing transaction: reverted with reason string 'Credential does not exist'".into(),
            data: None,
        });
        assert_eq!(err.revert_kind(), Some(RevertKind::NotFound));
    }

    #[test]
    fn test_plain_rpc_error() {
        let err = map_rpc_error(JsonRpcErrorObject {
            code: -32000,
            message: "nonce too low".into(),
            data: None,
        });
        assert!(matches!(err, LedgerError::Rpc { code: -32000, .. }));
    }

    #[test]
    fn test_call_object_omits_missing_sender() {
        let request = CallRequest {
            from: None,
            to: Address([0xaa; 20]),
            data: vec![0x12, 0x34],
        };
        let tx = call_object(&request);
        assert_eq!(tx["data"], "0x1234");
        assert!(tx.get("from").is_none());

        let tx = call_object(&CallRequest {
            from: Some(Address([0xbb; 20])),
            ..request
        });
        assert_eq!(tx["from"], format!("0x{}", "bb".repeat(20)));
    }

    #[test]
    fn test_parse_receipt() {
        let value = json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockNumber": "0x10",
            "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "to": null,
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "status": "0x1",
            "logs": [{
                "address": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
                "topics": [format!("0x{}", "22".repeat(32))],
                "data": "0x",
                "blockNumber": "0x10",
                "transactionHash": format!("0x{}", "11".repeat(32)),
                "logIndex": "0x0"
            }]
        });
        let receipt = parse_receipt(&value).unwrap();
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.gas_used, 21_000);
        assert!(receipt.status);
        assert!(receipt.to.is_none());
        assert_eq!(receipt.logs.len(), 1);
    }

    #[test]
    fn test_quantity_format() {
        assert_eq!(quantity(0), "0x0");
        assert_eq!(quantity(255), "0xff");
    }
}
