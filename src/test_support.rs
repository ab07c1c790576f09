// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process JSON-RPC server for tests.
//!
//! Answers every call through a closure and records the method and params,
//! so tests can assert both results and call order.

use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, Bloom, B256};
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use url::Url;

type Handler = Arc<dyn Fn(&str, &Value) -> Result<Value, String> + Send + Sync>;
type Calls = Arc<Mutex<Vec<(String, Value)>>>;

pub(crate) struct MockRpc {
    pub url: Url,
    calls: Calls,
}

impl MockRpc {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        let calls: Calls = Arc::default();
        let handler: Handler = Arc::new(handler);
        let app = Router::new()
            .route("/", post(answer))
            .with_state((handler, calls.clone()));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/").parse().unwrap(),
            calls,
        }
    }

    /// Methods in arrival order.
    pub fn methods(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(method, _)| method.clone())
            .collect()
    }

    /// Params of every call to `method`.
    pub fn params(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.params(method).len()
    }
}

async fn answer(
    State((handler, calls)): State<(Handler, Calls)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    match body {
        Value::Array(batch) => Json(Value::Array(
            batch
                .iter()
                .map(|request| respond(&handler, &calls, request))
                .collect(),
        )),
        request => Json(respond(&handler, &calls, &request)),
    }
}

fn respond(handler: &Handler, calls: &Calls, request: &Value) -> Value {
    let method = request["method"].as_str().unwrap_or_default();
    let params = request["params"].clone();
    calls.lock().unwrap().push((method.to_string(), params.clone()));

    match handler(method, &params) {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": request["id"], "result": result }),
        Err(message) => json!({
            "jsonrpc": "2.0",
            "id": request["id"],
            "error": { "code": -32000, "message": message },
        }),
    }
}

/// Calldata of an `eth_call` or `eth_estimateGas` request.
pub(crate) fn call_input(params: &Value) -> String {
    let tx = &params[0];
    tx["input"]
        .as_str()
        .or_else(|| tx["data"].as_str())
        .unwrap_or_default()
        .to_string()
}

/// Hex block number field of an `eth_getLogs` filter.
pub(crate) fn filter_block(params: &Value, field: &str) -> u64 {
    let raw = params[0][field].as_str().unwrap_or("0x0");
    u64::from_str_radix(raw.trim_start_matches("0x"), 16).unwrap_or(0)
}

/// Fee history with a non-zero base fee, enough for EIP-1559 estimation.
pub(crate) fn fee_history() -> Value {
    json!({
        "oldestBlock": "0x10",
        "baseFeePerGas": ["0x3b9aca00", "0x3b9aca00"],
        "gasUsedRatio": [0.5],
        "reward": [["0x3b9aca00"]],
    })
}

/// Hash returned for every `eth_sendRawTransaction`.
pub(crate) const SENT_TX_HASH: B256 = B256::repeat_byte(0x77);

/// Block in which [`receipt`] reports inclusion.
pub(crate) const RECEIPT_BLOCK: u64 = 0x20;

/// Answers for the calls an owner transaction makes: nonce, gas, fees, send
/// and receipt. `mined` is the receipt status, `None` keeps it pending.
/// Other methods return `None`.
pub(crate) fn owner_transaction(method: &str, mined: Option<bool>) -> Option<Result<Value, String>> {
    let result = match method {
        "eth_chainId" => json!("0xaa36a7"),
        "eth_getTransactionCount" => json!("0x0"),
        "eth_estimateGas" => json!("0x30000"),
        "eth_feeHistory" => fee_history(),
        "eth_maxPriorityFeePerGas" => json!("0x3b9aca00"),
        "eth_sendRawTransaction" => json!(SENT_TX_HASH),
        "eth_getTransactionReceipt" => match mined {
            Some(success) => receipt(SENT_TX_HASH, success),
            None => Value::Null,
        },
        _ => return None,
    };
    Some(Ok(result))
}

/// Mined EIP-1559 transaction receipt.
pub(crate) fn receipt(tx_hash: B256, success: bool) -> Value {
    json!({
        "transactionHash": tx_hash,
        "transactionIndex": "0x0",
        "blockHash": B256::repeat_byte(0xbb),
        "blockNumber": format!("{RECEIPT_BLOCK:#x}"),
        "from": Address::repeat_byte(0x0f),
        "to": Address::repeat_byte(0xad),
        "cumulativeGasUsed": "0x30000",
        "gasUsed": "0x30000",
        "effectiveGasPrice": "0x3b9aca00",
        "contractAddress": null,
        "logs": [],
        "logsBloom": Bloom::ZERO,
        "type": "0x2",
        "status": if success { "0x1" } else { "0x0" },
    })
}
