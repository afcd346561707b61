use std::path::PathBuf;

use alloy_primitives::{B256, U256, utils::parse_ether};

pub const DEFAULT_CHAIN_ID: u64 = 1337;
pub const DEFAULT_GAS_LIMIT: u64 = 8_100_000;
pub const DEFAULT_ACCOUNTS: u64 = 1_000;
pub const DEFAULT_FIRST_BATCH: usize = 600;
pub const DEFAULT_ARTIFACTS_DIR: &str = "build";

//Gas
const DEFAULT_GAS_PRICE: u128 = 20_000_000_000;
const REWARD_DEPLOY_GAS_LIMIT: u64 = 8_000_000;

//Amounts, in ether
const ACCOUNT_BALANCE: &str = "100";
const LAUNCH_REWARD_PER_RECIPIENT: &str = "30";
const REWARD_BUCKET_MULTIPLIER: u64 = 2_000;

/// A staking plan created on the reward contract before measuring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StakingPlan {
    pub months: u64,
    pub fraction_from_15: u64,
    pub use_percentage: bool,
}

impl StakingPlan {
    pub const fn new(months: u64, fraction_from_15: u64, use_percentage: bool) -> Self {
        Self {
            months,
            fraction_from_15,
            use_percentage,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub chain_id: u64,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub num_of_accounts: u64,
    pub account_balance: U256,
    pub account_seed: B256,
    pub artifacts_dir: PathBuf,
    pub reward_deploy_gas_limit: u64,
    pub first_batch: usize,
    pub launch_reward: U256,
    pub reward_bucket_multiplier: u64,
    pub staking_plans: [StakingPlan; 2],
}

impl SimulationConfig {
    pub fn new(
        chain_id: u64,
        gas_limit: u64,
        num_of_accounts: u64,
        account_seed: B256,
        artifacts_dir: PathBuf,
        first_batch: usize,
    ) -> eyre::Result<Self> {
        Ok(Self {
            chain_id,
            gas_limit,
            gas_price: DEFAULT_GAS_PRICE,
            num_of_accounts,
            account_balance: parse_ether(ACCOUNT_BALANCE)?,
            account_seed,
            artifacts_dir,
            reward_deploy_gas_limit: REWARD_DEPLOY_GAS_LIMIT,
            first_batch,
            launch_reward: parse_ether(LAUNCH_REWARD_PER_RECIPIENT)?,
            reward_bucket_multiplier: REWARD_BUCKET_MULTIPLIER,
            staking_plans: [StakingPlan::new(12, 13, false), StakingPlan::new(24, 15, false)],
        })
    }

    /// Amount approved for and moved into the reward bucket.
    pub fn reward_bucket_amount(&self) -> U256 {
        self.launch_reward * U256::from(self.reward_bucket_multiplier)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        if self.num_of_accounts == 0 {
            eyre::bail!("at least one account is needed to deploy the contracts");
        }
        if self.gas_limit == 0 {
            eyre::bail!("block gas limit must be non-zero");
        }
        if self.reward_deploy_gas_limit > self.gas_limit {
            eyre::bail!(
                "reward contract deploy gas {} exceeds the block gas limit {}",
                self.reward_deploy_gas_limit,
                self.gas_limit
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulationConfig {
        SimulationConfig::new(
            DEFAULT_CHAIN_ID,
            DEFAULT_GAS_LIMIT,
            DEFAULT_ACCOUNTS,
            B256::ZERO,
            PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            DEFAULT_FIRST_BATCH,
        )
        .unwrap()
    }

    #[test]
    fn defaults_match_the_measurement_run() {
        let config = config();
        assert_eq!(config.launch_reward, U256::from(30u64) * U256::from(10u64).pow(U256::from(18u64)));
        assert_eq!(config.reward_bucket_amount(), config.launch_reward * U256::from(2_000u64));
        assert_eq!(config.staking_plans[0], StakingPlan::new(12, 13, false));
        assert_eq!(config.staking_plans[1], StakingPlan::new(24, 15, false));
        config.validate().unwrap();
    }

    #[test]
    fn rejects_deploy_gas_above_block_limit() {
        let mut config = config();
        config.gas_limit = 7_000_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_account_set() {
        let mut config = config();
        config.num_of_accounts = 0;
        assert!(config.validate().is_err());
    }
}
