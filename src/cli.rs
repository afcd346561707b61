use std::path::PathBuf;

use alloy_primitives::B256;
use clap::Parser;
use rand::Rng;

use crate::config::{
    DEFAULT_ACCOUNTS, DEFAULT_ARTIFACTS_DIR, DEFAULT_CHAIN_ID, DEFAULT_FIRST_BATCH,
    DEFAULT_GAS_LIMIT, SimulationConfig,
};

/// Measure the gas of batched launch-reward payouts on an in-memory chain.
///
/// With no flags this runs the reference measurement: 1000 funded accounts,
/// an 8.1M block gas limit and recipient counts 600 to 999.
#[derive(Debug, Parser)]
#[command(name = "reward-gas-sandbox", version)]
pub struct Cli {
    /// Directory holding Eraswap_0.json, NRTManager_0.json and TimeAlly_0.json.
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    /// Number of funded accounts.
    #[arg(long, default_value_t = DEFAULT_ACCOUNTS)]
    pub accounts: u64,

    /// Block gas limit.
    #[arg(long, default_value_t = DEFAULT_GAS_LIMIT)]
    pub gas_limit: u64,

    /// First recipient count to measure.
    #[arg(long, default_value_t = DEFAULT_FIRST_BATCH)]
    pub first_batch: usize,

    /// 32-byte hex seed for the account keys. Random when omitted.
    #[arg(long)]
    pub seed: Option<B256>,

    /// Also write the generated genesis to this file.
    #[arg(long)]
    pub genesis_out: Option<PathBuf>,
}

impl Cli {
    pub fn simulation_config(&self) -> eyre::Result<SimulationConfig> {
        let seed = self.seed.unwrap_or_else(|| {
            let mut seed = B256::ZERO;
            rand::rng().fill(&mut seed.0);
            seed
        });

        let config = SimulationConfig::new(
            DEFAULT_CHAIN_ID,
            self.gas_limit,
            self.accounts,
            seed,
            self.artifacts_dir.clone(),
            self.first_batch,
        )?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_gives_the_reference_run() {
        let cli = Cli::try_parse_from(["reward-gas-sandbox"]).unwrap();
        let config = cli.simulation_config().unwrap();

        assert_eq!(config.num_of_accounts, 1_000);
        assert_eq!(config.gas_limit, 8_100_000);
        assert_eq!(config.first_batch, 600);
        assert_eq!(config.artifacts_dir, PathBuf::from("build"));
        assert!(cli.genesis_out.is_none());
    }

    #[test]
    fn parses_overrides() {
        let seed = format!("0x{}", "11".repeat(32));
        let cli = Cli::try_parse_from([
            "reward-gas-sandbox",
            "--accounts",
            "50",
            "--first-batch",
            "10",
            "--seed",
            seed.as_str(),
            "--artifacts-dir",
            "out",
        ])
        .unwrap();
        let config = cli.simulation_config().unwrap();

        assert_eq!(config.num_of_accounts, 50);
        assert_eq!(config.first_batch, 10);
        assert_eq!(config.account_seed, B256::repeat_byte(0x11));
        assert_eq!(config.artifacts_dir, PathBuf::from("out"));
    }

    #[test]
    fn rejects_gas_limit_below_reward_deployment() {
        let cli = Cli::try_parse_from(["reward-gas-sandbox", "--gas-limit", "1000000"]).unwrap();
        assert!(cli.simulation_config().is_err());
    }
}
