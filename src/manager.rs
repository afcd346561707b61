//! Handle for the NRT manager, which distributes newly released tokens to a
//! fixed table of pool addresses.

use alloy_primitives::Address;
use alloy_sol_macro::sol;
use alloy_sol_types::{SolCall, SolConstructor};

use crate::{artifact::Artifact, client::ContractClient, simulator::TxReceipt};

/// Number of pool addresses `UpdateAddresses` expects.
pub const ADDRESS_TABLE_SLOTS: usize = 9;
/// Slot the reward contract occupies in the table.
pub const REWARD_CONTRACT_SLOT: usize = 8;

sol! {
    #[allow(missing_docs)]
    contract NRTManager {
        constructor(address token);
        function UpdateAddresses(address[] memory pool) public returns (bool);
    }
}

/// Pool table with every slot zeroed except the reward contract's.
pub fn address_table(reward_contract: Address) -> Vec<Address> {
    let mut table = vec![Address::ZERO; ADDRESS_TABLE_SLOTS];
    table[REWARD_CONTRACT_SLOT] = reward_contract;
    table
}

pub struct ManagerContract {
    address: Address,
    client: ContractClient,
}

impl ManagerContract {
    pub const FUNCTIONS: [&'static str; 1] = [NRTManager::UpdateAddressesCall::SIGNATURE];

    pub async fn deploy(
        client: ContractClient,
        artifact: &Artifact,
        token: Address,
    ) -> eyre::Result<Self> {
        artifact.ensure_functions(&Self::FUNCTIONS)?;
        let args = NRTManager::constructorCall::new((token,)).abi_encode();
        let address = client.deploy(artifact, &args, None).await?;
        Ok(Self { address, client })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn update_addresses(&self, table: Vec<Address>) -> eyre::Result<TxReceipt> {
        if table.len() != ADDRESS_TABLE_SLOTS {
            eyre::bail!(
                "address table needs {ADDRESS_TABLE_SLOTS} slots, got {}",
                table.len()
            );
        }
        self.client
            .send(self.address, NRTManager::UpdateAddressesCall::new((table,)))
            .await
    }
}
