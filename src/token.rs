//! Handle for the EraSwap ERC20 token.

use alloy_primitives::{Address, U256};
use alloy_sol_macro::sol;
use alloy_sol_types::SolCall;

use crate::{artifact::Artifact, client::ContractClient, simulator::TxReceipt};

sol! {
    #[allow(missing_docs)]
    contract Eraswap {
        function AddNRTManager(address NRTManager) public returns (bool);
        function approve(address spender, uint256 value) public returns (bool);
    }
}

pub struct TokenContract {
    address: Address,
    client: ContractClient,
}

impl TokenContract {
    /// Functions the artifact must expose.
    pub const FUNCTIONS: [&'static str; 2] = [
        Eraswap::AddNRTManagerCall::SIGNATURE,
        Eraswap::approveCall::SIGNATURE,
    ];

    pub async fn deploy(client: ContractClient, artifact: &Artifact) -> eyre::Result<Self> {
        artifact.ensure_functions(&Self::FUNCTIONS)?;
        let address = client.deploy(artifact, &[], None).await?;
        Ok(Self { address, client })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Let the NRT manager mint and move tokens.
    pub async fn add_nrt_manager(&self, manager: Address) -> eyre::Result<TxReceipt> {
        self.client
            .send(self.address, Eraswap::AddNRTManagerCall::new((manager,)))
            .await
    }

    pub async fn approve(&self, spender: Address, value: U256) -> eyre::Result<TxReceipt> {
        self.client
            .send(self.address, Eraswap::approveCall::new((spender, value)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::StubChain;

    #[tokio::test]
    async fn approve_sends_encoded_call() {
        let chain = StubChain::start(4).await;
        let token = TokenContract::deploy(chain.client(), &chain.artifacts.token)
            .await
            .unwrap();
        assert_eq!(token.address(), chain.deployer().create(0));

        let spender = chain.accounts[2];
        token.approve(spender, U256::from(5u64)).await.unwrap();

        let mined = chain.handle.transactions().await.unwrap();
        let expected = Eraswap::approveCall::new((spender, U256::from(5u64))).abi_encode();
        assert_eq!(mined.last().unwrap().input.as_ref(), expected.as_slice());
    }

    #[tokio::test]
    async fn refuses_artifact_without_token_functions() {
        let chain = StubChain::start(2).await;
        // The manager artifact does not expose the token functions.
        assert!(
            TokenContract::deploy(chain.client(), &chain.artifacts.manager)
                .await
                .is_err()
        );
        assert_eq!(chain.handle.block_number().await.unwrap(), 0);
    }
}
