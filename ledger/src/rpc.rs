//! JSON-RPC control plane: profile policy and method dispatch.
//!
//! The dispatcher is a pure function over `(node, request)`: it owns no
//! I/O and never reads a clock, so the HTTP gateway stays a thin wrapper
//! and every method is testable in-process. Requests are JSON objects
//! with a `method` and optional `params`; responses always carry
//! `result.status` of `success` or `error`.
//!
//! The [`Profile`] acts as a pure filter in front of dispatch: in the
//! production profile the mutating methods are rejected with
//! `Method blocked by profile policy` before any handler runs.

use serde_json::{Value, json};

use crate::config::{BUILD_VERSION, Profile};
use crate::node::{Node, SubmitError};
use crate::pipeline::{Transaction, TxPayload};
use crate::types::AccountId;

/// Version of the agent-control API surface.
pub const API_VERSION: u32 = 1;

const KNOWN_METHODS: [&str; 10] = [
    "server_info",
    "ledger",
    "fee",
    "ledger_current",
    "account_info",
    "submit",
    "ping",
    "agent_status",
    "agent_config_get",
    "agent_config_set",
];

/// Methods that mutate node state and are blocked outside research.
const MUTATING_METHODS: [&str; 2] = ["submit", "agent_config_set"];

/// Whether `profile` permits `method`.
pub fn method_allowed(profile: Profile, method: &str) -> bool {
    match profile {
        Profile::Research => true,
        Profile::Production => !MUTATING_METHODS.contains(&method),
    }
}

fn rpc_error(message: impl Into<String>) -> Value {
    json!({ "result": { "status": "error", "error": message.into() } })
}

fn invalid_params(method: &str) -> Value {
    rpc_error(format!("Invalid {method} params"))
}

/// Dispatches one request against the node.
pub fn dispatch(node: &mut Node, request: &Value) -> Value {
    let Some(method) = request.get("method").and_then(Value::as_str) else {
        return rpc_error("Unknown method");
    };
    if !KNOWN_METHODS.contains(&method) {
        return rpc_error("Unknown method");
    }
    if !method_allowed(node.config.agent.profile, method) {
        return rpc_error("Method blocked by profile policy");
    }

    let params = request.get("params");
    match method {
        "server_info" => server_info(node),
        "fee" => fee(node),
        "ledger_current" => ledger_current(node),
        "ledger" => ledger(node, params),
        "account_info" => account_info(node, params),
        "submit" => submit(node, params),
        "ping" => json!({ "result": { "status": "success" } }),
        "agent_status" => agent_status(node),
        "agent_config_get" => agent_config(node),
        "agent_config_set" => agent_config_set(node, params),
        _ => rpc_error("Unknown method"),
    }
}

fn server_info(node: &Node) -> Value {
    let validated = node.ledger.last_closed();
    json!({
        "result": {
            "status": "success",
            "info": {
                "build_version": BUILD_VERSION,
                "server_state": node.server_state(),
                "network_id": node.config.network_id,
                "peers": 0,
                "validated_ledger": {
                    "seq": validated.sequence,
                    "hash": validated.hash.to_string(),
                },
            },
        }
    })
}

fn fee(node: &Node) -> Value {
    let base = node.config.fees.base_fee;
    let median = base.0 * u64::from(node.config.agent.fee_multiplier);
    json!({
        "result": {
            "status": "success",
            "drops": {
                "base_fee": base.to_string(),
                "median_fee": median.to_string(),
                "minimum_fee": base.to_string(),
            },
            "ledger_current_index": node.ledger.open_sequence(),
        }
    })
}

fn ledger_current(node: &Node) -> Value {
    json!({
        "result": {
            "status": "success",
            "ledger_current_index": node.ledger.open_sequence(),
        }
    })
}

fn ledger(node: &Node, params: Option<&Value>) -> Value {
    let Some(params) = params else {
        return invalid_params("ledger");
    };
    let Some(index) = params.get("ledger_index").and_then(Value::as_u64) else {
        return invalid_params("ledger");
    };
    let with_transactions = params
        .get("transactions")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let expand = params.get("expand").and_then(Value::as_bool).unwrap_or(false);

    let Ok(sequence) = u32::try_from(index) else {
        return invalid_params("ledger");
    };
    let Some(ledger) = node.ledger.ledger_by_seq(sequence) else {
        return rpc_error("lgrNotFound");
    };

    let transactions: Value = if !with_transactions {
        json!([])
    } else if expand {
        ledger
            .transactions
            .iter()
            .map(|hash| match node.stored_tx(hash) {
                Some(tx) => {
                    let mut body = tx_json(tx);
                    body["hash"] = json!(hash.to_string());
                    body
                }
                None => json!({ "hash": hash.to_string() }),
            })
            .collect()
    } else {
        ledger
            .transactions
            .iter()
            .map(|hash| json!(hash.to_string()))
            .collect()
    };

    json!({
        "result": {
            "status": "success",
            "ledger": {
                "ledger_index": ledger.sequence,
                "ledger_hash": ledger.hash.to_string(),
                "account_hash": ledger.account_state_hash.to_string(),
                "parent_hash": ledger.parent_hash.to_string(),
                "transaction_hash": ledger.transaction_hash.to_string(),
                "total_coins": ledger.total_coins.to_string(),
                "close_time": ledger.close_time,
                "parent_close_time": ledger.parent_close_time,
                "close_time_resolution": ledger.close_time_resolution,
                "close_flags": ledger.close_flags,
                "closed": ledger.closed,
                "transactions": transactions,
            },
        }
    })
}

fn account_info(node: &Node, params: Option<&Value>) -> Value {
    let Some(account_param) = params
        .and_then(|p| p.get("account"))
        .and_then(Value::as_str)
    else {
        return invalid_params("account_info");
    };

    let last_closed = node.ledger.last_closed();
    let Ok(account_id) = AccountId::from_hex(account_param) else {
        return json!({
            "result": {
                "status": "error",
                "error": "actMalformed",
                "validated": true,
                "ledger_index": last_closed.sequence,
                "ledger_hash": last_closed.hash.to_string(),
            }
        });
    };

    match node.ledger.state().get(&account_id) {
        Some(account) => json!({
            "result": {
                "status": "success",
                "validated": true,
                "account_data": {
                    "Account": account.id.to_string(),
                    "Balance": account.balance.to_string(),
                    "Flags": account.flags,
                    "OwnerCount": account.owner_count,
                    "Sequence": account.sequence,
                },
                "ledger_current_index": node.ledger.open_sequence(),
            }
        }),
        None => json!({
            "result": {
                "status": "error",
                "error": "actNotFound",
                "validated": true,
                "ledger_index": last_closed.sequence,
                "ledger_hash": last_closed.hash.to_string(),
            }
        }),
    }
}

fn submit(node: &mut Node, params: Option<&Value>) -> Value {
    let Some(blob_hex) = params
        .and_then(|p| p.get("tx_blob"))
        .and_then(Value::as_str)
    else {
        return invalid_params("submit");
    };

    match node.submit_blob(blob_hex) {
        Ok((tx, receipt)) => json!({
            "result": {
                "status": "success",
                "engine_result": receipt.result.token(),
                "engine_result_code": receipt.result.code(),
                "tx_json": tx_json(&tx),
                "validated": false,
            }
        }),
        Err(SubmitError::InvalidTxBlob) => rpc_error("InvalidTxBlob"),
    }
}

fn agent_status(node: &Node) -> Value {
    let agent = &node.config.agent;
    let strict = agent.strict_crypto_required || agent.profile == Profile::Production;
    json!({
        "result": {
            "status": "success",
            "agent_control": {
                "api_version": API_VERSION,
                "mode": agent.profile.to_string(),
                "strict_crypto_required": strict,
            },
            "node_state": {
                "uptime": node.uptime_secs,
                "validated_ledger_seq": node.ledger.last_closed().sequence,
                "pending_transactions": node.pending_transactions(),
                "max_peers": agent.max_peers,
                "allow_unl_updates": agent.allow_unl_updates,
            },
        }
    })
}

fn agent_config(node: &Node) -> Value {
    let agent = &node.config.agent;
    json!({
        "result": {
            "status": "success",
            "profile": agent.profile.to_string(),
            "max_peers": agent.max_peers,
            "fee_multiplier": agent.fee_multiplier,
            "strict_crypto_required": agent.strict_crypto_required,
            "allow_unl_updates": agent.allow_unl_updates,
        }
    })
}

fn agent_config_set(node: &mut Node, params: Option<&Value>) -> Value {
    let (Some(key), Some(value)) = (
        params.and_then(|p| p.get("key")).and_then(Value::as_str),
        params.and_then(|p| p.get("value")),
    ) else {
        return invalid_params("agent_config_set");
    };

    let agent = &mut node.config.agent;
    match key {
        "profile" => match value.as_str().and_then(|s| s.parse::<Profile>().ok()) {
            Some(profile) => {
                agent.profile = profile;
                if profile == Profile::Production {
                    // Production always runs with strict crypto.
                    agent.strict_crypto_required = true;
                }
            }
            None => return invalid_params("agent_config_set"),
        },
        "max_peers" => match value.as_u64().and_then(|v| u32::try_from(v).ok()) {
            Some(v) => agent.max_peers = v,
            None => return invalid_params("agent_config_set"),
        },
        "fee_multiplier" => match value.as_u64().and_then(|v| u32::try_from(v).ok()) {
            Some(v) => agent.fee_multiplier = v,
            None => return invalid_params("agent_config_set"),
        },
        "strict_crypto_required" => match value.as_bool() {
            Some(v) => agent.strict_crypto_required = v,
            None => return invalid_params("agent_config_set"),
        },
        "allow_unl_updates" => match value.as_bool() {
            Some(v) => agent.allow_unl_updates = v,
            None => return invalid_params("agent_config_set"),
        },
        _ => return invalid_params("agent_config_set"),
    }

    agent_config(node)
}

/// Renders a transaction in the `tx_json` response shape.
fn tx_json(tx: &Transaction) -> Value {
    let mut body = json!({
        "TransactionType": tx.tx_type().name(),
        "Account": tx.account.to_string(),
        "Fee": tx.fee.to_string(),
        "Sequence": tx.sequence,
    });

    match &tx.payload {
        TxPayload::Payment {
            destination,
            amount,
        } => {
            body["Destination"] = json!(destination.to_string());
            body["Amount"] = json!(amount.to_string());
        }
        TxPayload::EscrowCreate {
            amount,
            finish_after,
        } => {
            body["Amount"] = json!(amount.to_string());
            body["FinishAfter"] = json!(finish_after);
        }
        TxPayload::AccountSet => {}
        TxPayload::OfferCreate {
            taker_pays,
            taker_gets,
        } => {
            body["TakerPays"] = json!(taker_pays.to_string());
            body["TakerGets"] = json!(taker_gets.to_string());
        }
        TxPayload::OfferCancel { offer_sequence } => {
            body["OfferSequence"] = json!(offer_sequence);
        }
        TxPayload::PaymentChannelCreate {
            destination,
            amount,
            settle_delay,
        } => {
            body["Destination"] = json!(destination.to_string());
            body["Amount"] = json!(amount.to_string());
            body["SettleDelay"] = json!(settle_delay);
        }
        TxPayload::CheckCreate {
            destination,
            send_max,
        } => {
            body["Destination"] = json!(destination.to_string());
            body["SendMax"] = json!(send_max.to_string());
        }
        TxPayload::TrustSet {
            currency,
            issuer,
            limit,
        } => {
            body["LimitAmount"] = json!({
                "currency": hex::encode_upper(currency),
                "issuer": issuer.to_string(),
                "value": limit.to_string(),
            });
        }
        TxPayload::Unsupported { .. } => {}
    }
    body
}
