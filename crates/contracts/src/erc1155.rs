//! The erc1155 module holds the [Erc1155Contract] façade for the bridge's
//! companion token contract, covering the handful of operations the bridge
//! workflows touch.

use crate::error::{ContractError, Result};
use crate::event_worker_method;
use crate::gas::GasPolicy;
use crate::invoker::ContractInvoker;
use bridge_abi::{
    AbiError, EventDescriptor, EventParam, FunctionDescriptor, Kind, OutputShape, Param, Value,
};
use ethers::providers::Middleware;
use ethers::types::{Address, BlockId, TransactionReceipt, U256};
use lazy_static::lazy_static;
use std::sync::Arc;

lazy_static! {
    static ref BALANCE_OF: FunctionDescriptor = FunctionDescriptor::new(
        "balanceOf",
        vec![
            Param::new("account", Kind::Address),
            Param::new("id", Kind::Uint(256)),
        ],
        OutputShape::Single(Kind::Uint(256)),
    );
    static ref URI: FunctionDescriptor = FunctionDescriptor::new(
        "uri",
        vec![Param::new("id", Kind::Uint(256))],
        OutputShape::Single(Kind::String),
    );
    static ref SAFE_TRANSFER_FROM: FunctionDescriptor = FunctionDescriptor::new(
        "safeTransferFrom",
        vec![
            Param::new("from", Kind::Address),
            Param::new("to", Kind::Address),
            Param::new("id", Kind::Uint(256)),
            Param::new("amount", Kind::Uint(256)),
            Param::new("data", Kind::Bytes),
        ],
        OutputShape::None,
    );
    static ref TRANSFER_SINGLE: EventDescriptor = EventDescriptor::new(
        "TransferSingle",
        vec![
            EventParam::new("operator", Kind::Address, true),
            EventParam::new("from", Kind::Address, true),
            EventParam::new("to", Kind::Address, true),
            EventParam::new("id", Kind::Uint(256), false),
            EventParam::new("value", Kind::Uint(256), false),
        ],
    );
}

/// The [Erc1155Contract] struct is the typed surface over the token contract
/// the bridge settles against. Usually obtained from
/// [BridgeContract::economy](crate::BridgeContract::economy), which shares its
/// transport and gas policy.
pub struct Erc1155Contract<M> {
    invoker: ContractInvoker<M>,
}

impl<M> Erc1155Contract<M> {
    pub fn new(provider: Arc<M>, address: Address) -> Self {
        Self {
            invoker: ContractInvoker::new(provider, address),
        }
    }

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

impl<M: Middleware> Erc1155Contract<M> {
    /// Reads the token balance of an account.
    pub async fn balance_of(
        &self,
        account: Address,
        id: U256,
        block: Option<BlockId>,
    ) -> Result<U256> {
        let output = self
            .invoker
            .call(
                &BALANCE_OF,
                &[Value::Address(account), Value::Uint(id)],
                block,
            )
            .await?;
        match output.single() {
            Some(Value::Uint(balance)) => Ok(balance),
            _ => Err(shape_error("balanceOf")),
        }
    }

    /// Reads the metadata URI of a token id.
    pub async fn uri(&self, id: U256, block: Option<BlockId>) -> Result<String> {
        let output = self.invoker.call(&URI, &[Value::Uint(id)], block).await?;
        match output.single() {
            Some(Value::String(uri)) => Ok(uri),
            _ => Err(shape_error("uri")),
        }
    }

    /// Transfers tokens between accounts.
    pub async fn safe_transfer_from(
        &self,
        from: Address,
        to: Address,
        id: U256,
        amount: U256,
        data: Vec<u8>,
    ) -> Result<TransactionReceipt> {
        self.invoker
            .send(
                &SAFE_TRANSFER_FROM,
                &[
                    Value::Address(from),
                    Value::Address(to),
                    Value::Uint(id),
                    Value::Uint(amount),
                    Value::Bytes(data),
                ],
            )
            .await
    }

    event_worker_method!(
        /// Worker over `TransferSingle` occurrences.
        transfer_single_events,
        TRANSFER_SINGLE
    );
}

fn shape_error(method: &str) -> ContractError {
    ContractError::Abi(AbiError::MalformedAbiData(format!(
        "`{method}` reply did not match its declared output shape"
    )))
}
