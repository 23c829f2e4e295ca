//! Generic contract dispatch over a borrowed RPC transport, plus the typed
//! façades for the Bridge contract and its companion ERC-1155 token.
//!
//! The split of responsibilities: `bridge-abi` turns typed values into bytes
//! and back; this crate moves those bytes over a [Middleware] handle it
//! borrows but never owns. Gas, fees, nonces, signing, and retry policy all
//! live outside, behind the [GasPolicy] seam or in the middleware stack
//! itself.
//!
//! [Middleware]: ethers::providers::Middleware

// Re-exported so downstream crates build descriptors and filter makers
// against the same versions this crate was compiled with.
pub use bridge_abi;

mod bridge;
pub use bridge::{parcel_id, BridgeContract, BridgedResourceType, Parcel, PARCEL_NONE};

mod erc1155;
pub use erc1155::Erc1155Contract;

mod error;
pub use error::{decode_revert_reason, ContractError, Result};

mod events;
pub use events::{contract_filter, EventOccurrence, EventsWorker};

mod gas;
pub use gas::{GasPolicy, NodeGasPolicy, StaticGasPolicy};

mod invoker;
pub use invoker::ContractInvoker;
