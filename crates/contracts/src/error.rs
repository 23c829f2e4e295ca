//! The error module holds the [ContractError] taxonomy and the mapping from
//! transport-layer failures onto it.

use bridge_abi::{codec, AbiError, Kind, Value};
use ethers::providers::{JsonRpcError, MiddlewareError};
use ethers::utils::hex;
use thiserror::Error;

/// Selector of the conventional `Error(string)` revert payload.
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Errors surfaced by the invoker and the events worker. None of these are
/// retried internally; retry policy belongs to the layer above.
#[derive(Debug, Error)]
pub enum ContractError {
    /// Local encoding/decoding failure; see [AbiError].
    #[error(transparent)]
    Abi(#[from] AbiError),

    /// The contract rejected the call, with the revert reason when the node
    /// returned one that decodes.
    #[error("call reverted: {}", reason.as_deref().unwrap_or("no reason returned"))]
    CallReverted { reason: Option<String> },

    /// The RPC endpoint could not be reached or answered out of protocol.
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// A broadcast transaction disappeared from the mempool before it was
    /// mined. The chain may or may not still include it.
    #[error("transaction dropped from the mempool before inclusion")]
    TransactionDropped,
}

/// Convenience result alias for contract operations.
pub type Result<T> = core::result::Result<T, ContractError>;

/// Maps a middleware failure onto the taxonomy: an execution revert becomes
/// [ContractError::CallReverted] with its decoded reason when one is present,
/// everything else is surfaced as [ContractError::TransportUnavailable].
pub(crate) fn from_middleware_error<E: MiddlewareError>(err: E) -> ContractError {
    if let Some(rpc) = err.as_error_response() {
        if let Some(reason) = revert_reason(rpc) {
            return ContractError::CallReverted {
                reason: Some(reason),
            };
        }
        // Nodes disagree on revert shapes: the EIP-1474 execution error code,
        // or just a message mentioning the revert with no data attached.
        if rpc.code == 3 || rpc.message.contains("revert") {
            return ContractError::CallReverted { reason: None };
        }
    }
    ContractError::TransportUnavailable(err.to_string())
}

fn revert_reason(rpc: &JsonRpcError) -> Option<String> {
    let data = rpc.data.as_ref()?.as_str()?;
    let bytes = hex::decode(data.trim_start_matches("0x")).ok()?;
    decode_revert_reason(&bytes)
}

/// Decodes a raw `Error(string)` revert payload, if that is what it is.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    if data.len() < 4 || data[..4] != ERROR_STRING_SELECTOR {
        return None;
    }
    let values = codec::decode(&[Kind::String], &data[4..]).ok()?;
    values.into_iter().next().and_then(Value::into_string)
}

#[cfg(test)]
mod test {
    use super::*;
    use bridge_abi::codec::encode;

    fn revert_payload(reason: &str) -> Vec<u8> {
        let mut payload = ERROR_STRING_SELECTOR.to_vec();
        payload.extend_from_slice(&encode(&[Value::String(reason.to_string())]));
        payload
    }

    #[test]
    fn decodes_error_string_payloads() {
        assert_eq!(
            decode_revert_reason(&revert_payload("bridge: terminated")),
            Some("bridge: terminated".to_string())
        );
    }

    #[test]
    fn ignores_foreign_payloads() {
        assert_eq!(decode_revert_reason(&[]), None);
        assert_eq!(decode_revert_reason(&[0xde, 0xad, 0xbe, 0xef, 0x00]), None);
        // Right selector, garbage body.
        let mut truncated = ERROR_STRING_SELECTOR.to_vec();
        truncated.push(0xff);
        assert_eq!(decode_revert_reason(&truncated), None);
    }
}
