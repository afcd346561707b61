use std::fmt;

use alloy_primitives::{Address, U256};
use tracing::info;

use crate::{
    artifact::ArtifactSet,
    client::ContractClient,
    config::SimulationConfig,
    manager::{self, ManagerContract},
    provider::ChainHandle,
    reward::RewardContract,
    time_step,
    token::TokenContract,
};

/// Steps of the run, in the order they complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationPhase {
    DeployToken,
    DeployManager,
    RegisterManager,
    DeployReward,
    WireManager,
    CreatePlans,
    FundRewardBucket,
    Measure,
}

pub struct DeployedContracts {
    pub deployer: Address,
    pub token: TokenContract,
    pub manager: ManagerContract,
    pub reward: RewardContract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasMeasurement {
    pub recipients: usize,
    pub gas: u64,
}

impl fmt::Display for GasMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "for {}, gas needed is {}", self.recipients, self.gas)
    }
}

pub struct ScenarioOutcome {
    pub contracts: DeployedContracts,
    pub phases: Vec<SimulationPhase>,
    pub measurements: Vec<GasMeasurement>,
}

/// Batch for recipient count `count`: accounts `1..count`, each paid `amount`.
pub fn launch_batch(accounts: &[Address], count: usize, amount: U256) -> (Vec<Address>, Vec<U256>) {
    let recipients: Vec<Address> = accounts.iter().take(count).skip(1).copied().collect();
    let amounts = vec![amount; recipients.len()];
    (recipients, amounts)
}

pub struct ScenarioOrchestrator {
    provider: ChainHandle,
    artifacts: ArtifactSet,
    config: SimulationConfig,
    phases: Vec<SimulationPhase>,
}

impl ScenarioOrchestrator {
    pub fn new(provider: ChainHandle, artifacts: ArtifactSet, config: SimulationConfig) -> Self {
        Self {
            provider,
            artifacts,
            config,
            phases: Vec::new(),
        }
    }

    /// Deploy, wire, fund, then measure. The first failure aborts the run.
    pub async fn run(mut self) -> eyre::Result<ScenarioOutcome> {
        let accounts = self.provider.accounts().await?;
        let deployer = *accounts
            .first()
            .ok_or_else(|| eyre::eyre!("simulator has no accounts"))?;
        let client = ContractClient::new(self.provider.clone(), deployer);

        let contracts = self.deploy(deployer, client).await?;
        self.wire_manager(&contracts).await?;
        self.create_plans(&contracts).await?;
        self.fund_reward_bucket(&contracts).await?;
        let measurements = self.measure(&contracts, &accounts).await?;

        Ok(ScenarioOutcome {
            contracts,
            phases: self.phases,
            measurements,
        })
    }

    fn complete(&mut self, phase: SimulationPhase) {
        info!(target: "sandbox", ?phase, "phase complete");
        self.phases.push(phase);
    }

    async fn deploy(
        &mut self,
        deployer: Address,
        client: ContractClient,
    ) -> eyre::Result<DeployedContracts> {
        let token = {
            let _t = time_step!("deploy token");
            TokenContract::deploy(client.clone(), &self.artifacts.token).await?
        };
        self.complete(SimulationPhase::DeployToken);

        let manager = {
            let _t = time_step!("deploy manager");
            ManagerContract::deploy(client.clone(), &self.artifacts.manager, token.address())
                .await?
        };
        self.complete(SimulationPhase::DeployManager);

        {
            let _t = time_step!("register manager");
            token.add_nrt_manager(manager.address()).await?;
        }
        self.complete(SimulationPhase::RegisterManager);

        let reward = {
            let _t = time_step!("deploy reward contract");
            RewardContract::deploy(
                client,
                &self.artifacts.reward,
                token.address(),
                manager.address(),
                self.config.reward_deploy_gas_limit,
            )
            .await?
        };
        self.complete(SimulationPhase::DeployReward);

        Ok(DeployedContracts {
            deployer,
            token,
            manager,
            reward,
        })
    }

    async fn wire_manager(&mut self, contracts: &DeployedContracts) -> eyre::Result<()> {
        {
            let _t = time_step!("wire manager");
            let table = manager::address_table(contracts.reward.address());
            contracts.manager.update_addresses(table).await?;
        }
        self.complete(SimulationPhase::WireManager);
        Ok(())
    }

    async fn create_plans(&mut self, contracts: &DeployedContracts) -> eyre::Result<()> {
        {
            let _t = time_step!("create staking plans");
            let [first, second] = self.config.staking_plans;
            tokio::try_join!(
                contracts.reward.create_staking_plan(first),
                contracts.reward.create_staking_plan(second)
            )?;
        }
        self.complete(SimulationPhase::CreatePlans);
        Ok(())
    }

    async fn fund_reward_bucket(&mut self, contracts: &DeployedContracts) -> eyre::Result<()> {
        {
            let _t = time_step!("fund reward bucket");
            let amount = self.config.reward_bucket_amount();
            contracts
                .token
                .approve(contracts.reward.address(), amount)
                .await?;
            contracts.reward.topup_reward_bucket(amount).await?;
        }
        self.complete(SimulationPhase::FundRewardBucket);
        Ok(())
    }

    async fn measure(
        &mut self,
        contracts: &DeployedContracts,
        accounts: &[Address],
    ) -> eyre::Result<Vec<GasMeasurement>> {
        let mut measurements = Vec::new();

        for count in self.config.first_batch..accounts.len() {
            let _t = time_step!("estimate giveLaunchReward");
            let (recipients, amounts) = launch_batch(accounts, count, self.config.launch_reward);
            let gas = contracts
                .reward
                .estimate_give_launch_reward(recipients, amounts)
                .await?;

            let measurement = GasMeasurement {
                recipients: count,
                gas,
            };
            println!("{measurement}");
            measurements.push(measurement);
        }

        self.complete(SimulationPhase::Measure);
        Ok(measurements)
    }
}
