//! The bridge module holds the [BridgeContract] façade: one thin, typed
//! method per Bridge contract operation and one worker constructor per
//! emitted event. The façade owns no behavior; everything funnels through the
//! generic invoker and events worker.

use crate::erc1155::Erc1155Contract;
use crate::error::{ContractError, Result};
use crate::event_worker_method;
use crate::gas::GasPolicy;
use crate::invoker::ContractInvoker;
use bridge_abi::{
    AbiError, EventDescriptor, EventParam, FunctionDescriptor, Kind, NamedValues, OutputShape,
    Param, Value,
};
use ethers::providers::Middleware;
use ethers::types::{Address, BlockId, TransactionReceipt, U256};
use lazy_static::lazy_static;
use std::sync::Arc;

/// The reserved "no parcel" marker: a parcel id a payment can never hash to.
pub const PARCEL_NONE: [u8; 32] = [0xff; 32];

lazy_static! {
    static ref BRIDGED_RESOURCE_TYPES: FunctionDescriptor = FunctionDescriptor::new(
        "bridgedResourceTypes",
        vec![Param::new("id", Kind::Uint(256))],
        OutputShape::Multi(vec![
            Param::new("amountPerUnit", Kind::Uint(256)),
            Param::new("defined", Kind::Bool),
        ]),
    );
    static ref ECONOMY: FunctionDescriptor =
        FunctionDescriptor::new("economy", Vec::new(), OutputShape::Single(Kind::Address));
    static ref OWNER: FunctionDescriptor =
        FunctionDescriptor::new("owner", Vec::new(), OutputShape::Single(Kind::Address));
    static ref PARCELS: FunctionDescriptor = FunctionDescriptor::new(
        "parcels",
        vec![Param::new("id", Kind::FixedBytes(32))],
        OutputShape::Multi(vec![
            Param::new("payer", Kind::Address),
            Param::new("paid", Kind::Uint(256)),
        ]),
    );
    static ref TERMINATED: FunctionDescriptor =
        FunctionDescriptor::new("terminated", Vec::new(), OutputShape::Single(Kind::Bool));
    static ref TRANSFER_OWNERSHIP: FunctionDescriptor = FunctionDescriptor::new(
        "transferOwnership",
        vec![Param::new("newOwner", Kind::Address)],
        OutputShape::None,
    );
    static ref SEND_UNITS: FunctionDescriptor = FunctionDescriptor::new(
        "sendUnits",
        vec![
            Param::new("to", Kind::Address),
            Param::new("id", Kind::Uint(256)),
            Param::new("units", Kind::Uint(256)),
        ],
        OutputShape::None,
    );
    static ref SEND_TOKENS: FunctionDescriptor = FunctionDescriptor::new(
        "sendTokens",
        vec![
            Param::new("to", Kind::Address),
            Param::new("id", Kind::Uint(256)),
            Param::new("value", Kind::Uint(256)),
            Param::new("data", Kind::Bytes),
        ],
        OutputShape::None,
    );
    static ref DEFINE_BRIDGED_RESOURCE_TYPE: FunctionDescriptor = FunctionDescriptor::new(
        "defineBridgedResourceType",
        vec![
            Param::new("id", Kind::Uint(256)),
            Param::new("amountPerUnit", Kind::Uint(256)),
        ],
        OutputShape::None,
    );
    static ref REMOVE_BRIDGED_RESOURCE_TYPE: FunctionDescriptor = FunctionDescriptor::new(
        "removeBridgedResourceType",
        vec![Param::new("id", Kind::Uint(256))],
        OutputShape::None,
    );
    static ref TERMINATE: FunctionDescriptor =
        FunctionDescriptor::new("terminate", Vec::new(), OutputShape::None);
    static ref BRIDGED_RESOURCE_TYPE_DEFINED: EventDescriptor = EventDescriptor::new(
        "BridgedResourceTypeDefined",
        vec![
            EventParam::new("id", Kind::Uint(256), true),
            EventParam::new("amountPerUnit", Kind::Uint(256), false),
        ],
    );
    static ref BRIDGED_RESOURCE_TYPE_REMOVED: EventDescriptor = EventDescriptor::new(
        "BridgedResourceTypeRemoved",
        vec![EventParam::new("id", Kind::Uint(256), true)],
    );
    static ref OWNERSHIP_TRANSFERRED: EventDescriptor = EventDescriptor::new(
        "OwnershipTransferred",
        vec![
            EventParam::new("previousOwner", Kind::Address, true),
            EventParam::new("newOwner", Kind::Address, true),
        ],
    );
}

/// One bridged resource type definition: how many ERC-1155 tokens one game
/// unit is worth, and whether the type is currently defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgedResourceType {
    pub amount_per_unit: U256,
    pub defined: bool,
}

/// One registered parcel, recording a payment made through the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parcel {
    pub payer: Address,
    pub paid: U256,
}

/// Derives a parcel id from a textual description: the UTF-8 bytes
/// right-padded into a `bytes32`. Descriptions longer than 32 bytes do not
/// fit and are rejected.
pub fn parcel_id(description: &str) -> Result<[u8; 32]> {
    let bytes = description.as_bytes();
    if bytes.len() > 32 {
        return Err(ContractError::Abi(AbiError::MalformedAbiData(format!(
            "parcel description of {} bytes does not fit bytes32",
            bytes.len()
        ))));
    }
    let mut id = [0u8; 32];
    id[..bytes.len()].copy_from_slice(bytes);
    Ok(id)
}

/// The [BridgeContract] struct is the typed surface over one deployed Bridge
/// contract.
pub struct BridgeContract<M> {
    invoker: ContractInvoker<M>,
}

impl<M> BridgeContract<M> {
    /// Binds the façade to a deployed Bridge with the default gas policy.
    pub fn new(provider: Arc<M>, address: Address) -> Self {
        Self {
            invoker: ContractInvoker::new(provider, address),
        }
    }

    /// Binds the façade with an explicit gas policy override.
    pub fn with_gas_policy(
        provider: Arc<M>,
        address: Address,
        gas_policy: Arc<dyn GasPolicy>,
    ) -> Self {
        Self {
            invoker: ContractInvoker::with_gas_policy(provider, address, gas_policy),
        }
    }

    pub fn address(&self) -> Address {
        self.invoker.address()
    }
}

impl<M: Middleware> BridgeContract<M> {
    /// Reads the definition of a bridged resource type. The id doubles as the
    /// corresponding ERC-1155 token id.
    pub async fn bridged_resource_types(
        &self,
        id: U256,
        block: Option<BlockId>,
    ) -> Result<BridgedResourceType> {
        let values = self
            .invoker
            .call(&BRIDGED_RESOURCE_TYPES, &[Value::Uint(id)], block)
            .await?
            .multi()
            .ok_or_else(|| shape_error("bridgedResourceTypes"))?;
        Ok(BridgedResourceType {
            amount_per_unit: uint_field(&values, "amountPerUnit")?,
            defined: bool_field(&values, "defined")?,
        })
    }

    /// Resolves the companion ERC-1155 contract, bound to the same transport
    /// and gas policy.
    pub async fn economy(&self, block: Option<BlockId>) -> Result<Erc1155Contract<M>> {
        let output = self.invoker.call(&ECONOMY, &[], block).await?;
        match output.single() {
            Some(Value::Address(address)) => Ok(Erc1155Contract::with_gas_policy(
                Arc::clone(self.invoker.provider()),
                address,
                self.invoker.gas_policy(),
            )),
            _ => Err(shape_error("economy")),
        }
    }

    /// Reads the current owner of the bridge.
    pub async fn owner(&self, block: Option<BlockId>) -> Result<Address> {
        let output = self.invoker.call(&OWNER, &[], block).await?;
        match output.single() {
            Some(Value::Address(address)) => Ok(address),
            _ => Err(shape_error("owner")),
        }
    }

    /// Reads a registered parcel by id.
    pub async fn parcels(&self, id: [u8; 32], block: Option<BlockId>) -> Result<Parcel> {
        let values = self
            .invoker
            .call(&PARCELS, &[Value::FixedBytes(id.to_vec())], block)
            .await?
            .multi()
            .ok_or_else(|| shape_error("parcels"))?;
        Ok(Parcel {
            payer: address_field(&values, "payer")?,
            paid: uint_field(&values, "paid")?,
        })
    }

    /// Whether the bridge has been terminated and stopped accepting payments.
    pub async fn terminated(&self, block: Option<BlockId>) -> Result<bool> {
        let output = self.invoker.call(&TERMINATED, &[], block).await?;
        match output.single() {
            Some(Value::Bool(flag)) => Ok(flag),
            _ => Err(shape_error("terminated")),
        }
    }

    /// Transfers the bridge to another owner address.
    pub async fn transfer_ownership(&self, new_owner: Address) -> Result<TransactionReceipt> {
        self.invoker
            .send(&TRANSFER_OWNERSHIP, &[Value::Address(new_owner)])
            .await
    }

    /// Sends units of a bridged resource back to a user.
    pub async fn send_units(
        &self,
        to: Address,
        id: U256,
        units: U256,
    ) -> Result<TransactionReceipt> {
        self.invoker
            .send(
                &SEND_UNITS,
                &[Value::Address(to), Value::Uint(id), Value::Uint(units)],
            )
            .await
    }

    /// Sends raw ERC-1155 tokens of a resource back to a user.
    pub async fn send_tokens(
        &self,
        to: Address,
        id: U256,
        value: U256,
        data: Vec<u8>,
    ) -> Result<TransactionReceipt> {
        self.invoker
            .send(
                &SEND_TOKENS,
                &[
                    Value::Address(to),
                    Value::Uint(id),
                    Value::Uint(value),
                    Value::Bytes(data),
                ],
            )
            .await
    }

    /// Defines or updates a bridged resource type.
    pub async fn define_bridged_resource_type(
        &self,
        id: U256,
        amount_per_unit: U256,
    ) -> Result<TransactionReceipt> {
        self.invoker
            .send(
                &DEFINE_BRIDGED_RESOURCE_TYPE,
                &[Value::Uint(id), Value::Uint(amount_per_unit)],
            )
            .await
    }

    /// Undefines a bridged resource type.
    pub async fn remove_bridged_resource_type(&self, id: U256) -> Result<TransactionReceipt> {
        self.invoker
            .send(&REMOVE_BRIDGED_RESOURCE_TYPE, &[Value::Uint(id)])
            .await
    }

    /// Terminates the bridge. No new payments can be received afterwards.
    pub async fn terminate(&self) -> Result<TransactionReceipt> {
        self.invoker.send(&TERMINATE, &[]).await
    }

    event_worker_method!(
        /// Worker over `BridgedResourceTypeDefined` occurrences.
        bridged_resource_type_defined_events,
        BRIDGED_RESOURCE_TYPE_DEFINED
    );

    event_worker_method!(
        /// Worker over `BridgedResourceTypeRemoved` occurrences.
        bridged_resource_type_removed_events,
        BRIDGED_RESOURCE_TYPE_REMOVED
    );

    event_worker_method!(
        /// Worker over `OwnershipTransferred` occurrences.
        ownership_transferred_events,
        OWNERSHIP_TRANSFERRED
    );
}

fn shape_error(method: &str) -> ContractError {
    ContractError::Abi(AbiError::MalformedAbiData(format!(
        "`{method}` reply did not match its declared output shape"
    )))
}

fn field_error(name: &str, expected: &str) -> ContractError {
    ContractError::Abi(AbiError::MalformedAbiData(format!(
        "field `{name}` is missing or is not {expected}"
    )))
}

pub(crate) fn uint_field(values: &NamedValues, name: &str) -> Result<U256> {
    values
        .get(name)
        .and_then(Value::as_uint)
        .ok_or_else(|| field_error(name, "an unsigned integer"))
}

pub(crate) fn bool_field(values: &NamedValues, name: &str) -> Result<bool> {
    values
        .get(name)
        .and_then(Value::as_bool)
        .ok_or_else(|| field_error(name, "a bool"))
}

pub(crate) fn address_field(values: &NamedValues, name: &str) -> Result<Address> {
    values
        .get(name)
        .and_then(Value::as_address)
        .ok_or_else(|| field_error(name, "an address"))
}
