//! The invoker module holds the [ContractInvoker]: the one generic dispatch
//! path that every typed façade method funnels through, either as a read-only
//! call or as a state-changing transaction.

use crate::error::{from_middleware_error, ContractError, Result};
use crate::gas::{GasPolicy, NodeGasPolicy};
use bridge_abi::{DecodedOutput, FunctionDescriptor, Value};
use ethers::providers::Middleware;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, BlockId, TransactionReceipt, TransactionRequest};
use std::sync::Arc;

/// The [ContractInvoker] struct binds a target contract address to a borrowed
/// transport handle and a gas policy. It holds no other state: descriptors
/// come in per call and decoded results are never cached.
pub struct ContractInvoker<M> {
    provider: Arc<M>,
    address: Address,
    gas_policy: Arc<dyn GasPolicy>,
}

impl<M> ContractInvoker<M> {
    /// Creates an invoker with the default [NodeGasPolicy].
    pub fn new(provider: Arc<M>, address: Address) -> Self {
        Self::with_gas_policy(provider, address, Arc::new(NodeGasPolicy))
    }

    /// Creates an invoker with an explicit gas policy override.
    pub fn with_gas_policy(
        provider: Arc<M>,
        address: Address,
        gas_policy: Arc<dyn GasPolicy>,
    ) -> Self {
        Self {
            provider,
            address,
            gas_policy,
        }
    }

    /// The target contract address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The borrowed transport handle.
    pub fn provider(&self) -> &Arc<M> {
        &self.provider
    }

    /// The gas policy, shared with façades constructed from this one.
    pub fn gas_policy(&self) -> Arc<dyn GasPolicy> {
        Arc::clone(&self.gas_policy)
    }

    fn request(&self, descriptor: &FunctionDescriptor, args: &[Value]) -> Result<TypedTransaction> {
        let payload = descriptor.encode_call(args)?;
        Ok(TransactionRequest::new()
            .to(self.address)
            .data(payload)
            .into())
    }
}

impl<M: Middleware> ContractInvoker<M> {
    /// Performs a read-only call and decodes the reply against the
    /// descriptor's output shape. Never mutates chain state, so it is always
    /// safe to retry.
    pub async fn call(
        &self,
        descriptor: &FunctionDescriptor,
        args: &[Value],
        block: Option<BlockId>,
    ) -> Result<DecodedOutput> {
        let tx = self.request(descriptor, args)?;
        tracing::debug!(
            target: "contract-invoker",
            "calling {} on {:?}",
            descriptor.signature(),
            self.address
        );
        let reply = self
            .provider
            .call(&tx, block)
            .await
            .map_err(from_middleware_error)?;
        Ok(descriptor.decode_output(&reply)?)
    }

    /// Submits a state-changing transaction and waits for one confirmation.
    ///
    /// Exactly one transaction is broadcast per invocation; this layer never
    /// retries a `send`, since a retry could double-submit. A mined-but-failed
    /// transaction is returned through the receipt's status flag rather than
    /// as an error. Cancelling the returned future after broadcast does not
    /// undo anything on chain: delivery is at-least-once from the caller's
    /// point of view, and reconciling an ambiguous broadcast belongs to the
    /// layer above.
    pub async fn send(
        &self,
        descriptor: &FunctionDescriptor,
        args: &[Value],
    ) -> Result<TransactionReceipt> {
        let mut tx = self.request(descriptor, args)?;
        self.gas_policy.prepare(&mut tx).await?;
        tracing::debug!(
            target: "contract-invoker",
            "sending {} to {:?}",
            descriptor.signature(),
            self.address
        );
        let pending = self
            .provider
            .send_transaction(tx, None)
            .await
            .map_err(from_middleware_error)?;
        let receipt = pending
            .confirmations(1)
            .await
            .map_err(|e| ContractError::TransportUnavailable(e.to_string()))?
            .ok_or(ContractError::TransactionDropped)?;
        tracing::info!(
            target: "contract-invoker",
            "{} mined in block {:?}, tx hash {:?}",
            descriptor.signature(),
            receipt.block_number,
            receipt.transaction_hash
        );
        Ok(receipt)
    }
}
