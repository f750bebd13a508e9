//! Provider error classification.
//!
//! Maps raw JSON-RPC failures and revert payloads onto [`GatewayError`].
//! Unrecognised failures degrade to `Unknown` with the raw text kept.

use alloy::rpc::json_rpc::ErrorPayload;
use alloy::sol_types::decode_revert_reason;
use alloy::transports::{RpcError, TransportErrorKind};

use crate::gateway::types::GatewayError;

/// EIP-1193 "user rejected request".
pub const USER_REJECTED_CODE: i64 = 4001;

/// JSON-RPC code geth and anvil use for execution reverts carrying data.
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// Revert reason phrase the marketplace contract uses for a sold listing.
const ALREADY_SOLD_PHRASE: &str = "already sold";

/// Classify a revert reason string.
pub fn classify_reason(reason: &str) -> GatewayError {
    let reason = reason.trim();
    let reason = reason.strip_prefix("revert:").unwrap_or(reason).trim();
    if reason.to_ascii_lowercase().contains(ALREADY_SOLD_PHRASE) {
        GatewayError::AlreadySold
    } else {
        GatewayError::Reverted(reason.to_string())
    }
}

/// Classify ABI-encoded revert data (`Error(string)`, `Panic(uint256)` or a
/// raw UTF-8 reason).
pub fn classify_revert(data: &[u8]) -> GatewayError {
    match decode_revert_reason(data) {
        Some(reason) => classify_reason(&reason),
        None => GatewayError::Reverted("execution reverted without a decodable reason".to_string()),
    }
}

/// Classify a JSON-RPC error response.
pub fn classify_payload(payload: &ErrorPayload) -> GatewayError {
    if payload.code == USER_REJECTED_CODE {
        return GatewayError::Declined;
    }

    if let Some(data) = payload.as_revert_data() {
        if !data.is_empty() {
            return classify_revert(&data);
        }
    }

    let message = payload.message.to_string();
    let lower = message.to_ascii_lowercase();
    if payload.code == EXECUTION_REVERTED_CODE || lower.contains("revert") {
        let reason = revert_reason(&message).unwrap_or("execution reverted");
        return classify_reason(reason);
    }

    if lower.contains("user denied") || lower.contains("user rejected") {
        return GatewayError::Declined;
    }

    GatewayError::Unknown(format!("code {}: {}", payload.code, message))
}

/// Reason text from a revert message, either geth style
/// ("execution reverted: <reason>") or ganache style
/// ("VM Exception while processing transaction: revert <reason>").
fn revert_reason(message: &str) -> Option<&str> {
    let lower = message.to_ascii_lowercase();
    let start = lower
        .find("reverted:")
        .map(|idx| idx + "reverted:".len())
        .or_else(|| lower.rfind("revert ").map(|idx| idx + "revert ".len()))?;
    Some(message[start..].trim()).filter(|r| !r.is_empty())
}

/// Classify any alloy RPC error.
pub fn classify_rpc_error(err: &RpcError<TransportErrorKind>) -> GatewayError {
    match err {
        RpcError::ErrorResp(payload) => classify_payload(payload),
        RpcError::Transport(kind) => GatewayError::ProviderUnreachable(kind.to_string()),
        other => GatewayError::Unknown(other.to_string()),
    }
}
