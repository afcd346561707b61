//! Handle for the TimeAlly staking contract, which pays launch rewards out of
//! its reward bucket.

use alloy_primitives::{Address, U256};
use alloy_sol_macro::sol;
use alloy_sol_types::{SolCall, SolConstructor};

use crate::{
    artifact::Artifact, client::ContractClient, config::StakingPlan, simulator::TxReceipt,
};

sol! {
    #[allow(missing_docs)]
    contract TimeAlly {
        constructor(address eraswapTokenAddress, address nrtAddress);
        function createStakingPlan(uint256 _months, uint256 _fractionFrom15, bool _usePercentage) public;
        function topupRewardBucket(uint256 _amount) public;
        function giveLaunchReward(address[] memory _addresses, uint256[] memory _amounts) public;
    }
}

pub struct RewardContract {
    address: Address,
    client: ContractClient,
}

impl RewardContract {
    pub const FUNCTIONS: [&'static str; 3] = [
        TimeAlly::createStakingPlanCall::SIGNATURE,
        TimeAlly::topupRewardBucketCall::SIGNATURE,
        TimeAlly::giveLaunchRewardCall::SIGNATURE,
    ];

    /// Deploy with the token and manager addresses wired into the constructor.
    pub async fn deploy(
        client: ContractClient,
        artifact: &Artifact,
        token: Address,
        manager: Address,
        gas_limit: u64,
    ) -> eyre::Result<Self> {
        artifact.ensure_functions(&Self::FUNCTIONS)?;
        let args = TimeAlly::constructorCall::new((token, manager)).abi_encode();
        let address = client.deploy(artifact, &args, Some(gas_limit)).await?;
        Ok(Self { address, client })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub async fn create_staking_plan(&self, plan: StakingPlan) -> eyre::Result<TxReceipt> {
        let call = TimeAlly::createStakingPlanCall::new((
            U256::from(plan.months),
            U256::from(plan.fraction_from_15),
            plan.use_percentage,
        ));
        self.client.send(self.address, call).await
    }

    /// Pull `amount` tokens from the caller into the reward bucket. Needs a
    /// prior token approval.
    pub async fn topup_reward_bucket(&self, amount: U256) -> eyre::Result<TxReceipt> {
        self.client
            .send(self.address, TimeAlly::topupRewardBucketCall::new((amount,)))
            .await
    }

    /// Gas a `giveLaunchReward` batch would need. Nothing is committed.
    pub async fn estimate_give_launch_reward(
        &self,
        recipients: Vec<Address>,
        amounts: Vec<U256>,
    ) -> eyre::Result<u64> {
        if recipients.len() != amounts.len() {
            eyre::bail!(
                "{} recipients but {} amounts",
                recipients.len(),
                amounts.len()
            );
        }
        self.client
            .estimate(
                self.address,
                TimeAlly::giveLaunchRewardCall::new((recipients, amounts)),
            )
            .await
    }
}
