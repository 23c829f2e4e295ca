//! The gas module holds the [GasPolicy] trait: the injected collaborator that
//! owns gas, fee, and nonce decisions for state-changing transactions. The
//! invoker never makes those decisions itself.

use crate::error::Result;
use async_trait::async_trait;
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::U256;

/// The [GasPolicy] trait prepares a transaction request before it is handed
/// to the transport. Implementations may fill gas limit, gas price, or nonce
/// fields; whatever they leave unset is resolved by the node or by middleware
/// layered below.
#[async_trait]
pub trait GasPolicy: Send + Sync {
    /// Prepares the transaction in place.
    async fn prepare(&self, tx: &mut TypedTransaction) -> Result<()>;
}

/// The default policy: touch nothing and let the node estimate gas and price
/// at submission time.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeGasPolicy;

#[async_trait]
impl GasPolicy for NodeGasPolicy {
    async fn prepare(&self, _tx: &mut TypedTransaction) -> Result<()> {
        Ok(())
    }
}

/// A fixed gas limit and gas price, for callers that pin their spend up
/// front instead of trusting estimation.
#[derive(Debug, Clone, Copy)]
pub struct StaticGasPolicy {
    pub gas: U256,
    pub gas_price: U256,
}

#[async_trait]
impl GasPolicy for StaticGasPolicy {
    async fn prepare(&self, tx: &mut TypedTransaction) -> Result<()> {
        tx.set_gas(self.gas);
        tx.set_gas_price(self.gas_price);
        Ok(())
    }
}
