//! Shared fixtures: a running simulator plus artifacts backed by a STOP
//! contract, so every call succeeds and costs only its intrinsic gas.

use std::path::Path;

use alloy_primitives::{Address, B256};
use tempfile::TempDir;

use crate::{
    artifact::{
        ArtifactSet, MANAGER_ARTIFACT, REWARD_ARTIFACT, TOKEN_ARTIFACT, fixtures::write_artifact,
    },
    chain,
    client::ContractClient,
    config::SimulationConfig,
    manager::ManagerContract,
    provider::ChainHandle,
    reward::RewardContract,
    simulator::tests::STOP_INITCODE,
    token::TokenContract,
};

pub(crate) fn stub_artifacts() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), TOKEN_ARTIFACT, &TokenContract::FUNCTIONS, STOP_INITCODE);
    write_artifact(dir.path(), MANAGER_ARTIFACT, &ManagerContract::FUNCTIONS, STOP_INITCODE);
    write_artifact(dir.path(), REWARD_ARTIFACT, &RewardContract::FUNCTIONS, STOP_INITCODE);
    dir
}

pub(crate) fn test_config(num_of_accounts: u64, first_batch: usize, artifacts_dir: &Path) -> SimulationConfig {
    SimulationConfig::new(
        1337,
        8_100_000,
        num_of_accounts,
        B256::repeat_byte(0x5a),
        artifacts_dir.to_path_buf(),
        first_batch,
    )
    .unwrap()
}

pub(crate) struct StubChain {
    pub handle: ChainHandle,
    pub accounts: Vec<Address>,
    pub artifacts: ArtifactSet,
    _dir: TempDir,
}

impl StubChain {
    pub async fn start(num_of_accounts: u64) -> Self {
        let dir = stub_artifacts();
        let config = test_config(num_of_accounts, 1, dir.path());
        let (_, handle) = chain::launch(&config, 1_700_000_000).unwrap();
        let accounts = handle.accounts().await.unwrap();
        let artifacts = ArtifactSet::load(dir.path()).unwrap();
        Self {
            handle,
            accounts,
            artifacts,
            _dir: dir,
        }
    }

    pub fn deployer(&self) -> Address {
        self.accounts[0]
    }

    pub fn client(&self) -> ContractClient {
        ContractClient::new(self.handle.clone(), self.deployer())
    }
}
