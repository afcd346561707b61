use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use eyre::WrapErr;
use tracing::info;

use crate::{
    artifact::Artifact,
    provider::ChainHandle,
    simulator::TxReceipt,
    transaction::TransactionOperations,
};

/// Sends contract calls to the simulator on behalf of one unlocked account.
#[derive(Clone)]
pub struct ContractClient {
    provider: ChainHandle,
    from: Address,
}

impl ContractClient {
    pub fn new(provider: ChainHandle, from: Address) -> Self {
        Self { provider, from }
    }

    /// Deploy `artifact` with already-encoded constructor arguments.
    pub async fn deploy(
        &self,
        artifact: &Artifact,
        constructor_args: &[u8],
        gas: Option<u64>,
    ) -> eyre::Result<Address> {
        let tx = TransactionOperations::deploy_contract(
            self.from,
            artifact.deploy_code(constructor_args),
            gas,
        );
        let receipt = self
            .provider
            .send_transaction(tx)
            .await
            .wrap_err_with(|| format!("failed to deploy {}", artifact.name()))?;
        let address = receipt
            .contract_address
            .ok_or_else(|| eyre::eyre!("{} deployment created no contract", artifact.name()))?;
        if self.provider.code_at(address).await?.is_empty() {
            eyre::bail!("{} deployed no runtime code at {address}", artifact.name());
        }

        info!(
            target: "sandbox",
            block = receipt.block_number,
            gas_used = receipt.gas_used,
            "deployed {} at {address}",
            artifact.name()
        );
        Ok(address)
    }

    pub async fn send<C: SolCall>(&self, to: Address, call: C) -> eyre::Result<TxReceipt> {
        let tx = TransactionOperations::call_contract(self.from, to, call.abi_encode().into(), None);
        self.provider
            .send_transaction(tx)
            .await
            .wrap_err_with(|| format!("{} failed", C::SIGNATURE))
    }

    pub async fn estimate<C: SolCall>(&self, to: Address, call: C) -> eyre::Result<u64> {
        let tx = TransactionOperations::call_contract(self.from, to, call.abi_encode().into(), None);
        self.provider
            .estimate_gas(tx)
            .await
            .wrap_err_with(|| format!("gas estimation for {} failed", C::SIGNATURE))
    }
}
