use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing::info;

mod actor;
mod artifact;
mod chain;
mod cli;
mod client;
mod config;
mod manager;
mod metrics;
mod orchestrator;
mod provider;
mod reward;
mod simulator;
mod token;
mod transaction;

#[cfg(test)]
mod test_utils;

use artifact::ArtifactSet;
use orchestrator::ScenarioOrchestrator;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<(), eyre::Error> {
    metrics::run_start();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let sim_config = cli.simulation_config()?;

    // Fail on missing artifacts before generating any keys.
    let artifacts = ArtifactSet::load(&sim_config.artifacts_dir)?;

    println!("\nGenerating {} demo accounts...", sim_config.num_of_accounts);
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    let (genesis, chain) = {
        let _t = time_step!("generate accounts");
        chain::launch(&sim_config, timestamp)?
    };

    if let Some(path) = &cli.genesis_out {
        chain::write_genesis(&genesis, path)?;
    }

    println!("numberOfAccounts created {}", chain.accounts().await?.len());
    println!("Done\n");

    let outcome = ScenarioOrchestrator::new(chain.clone(), artifacts, sim_config)
        .run()
        .await?;

    let mined = chain.transactions().await?;
    let deployer_balance = chain.balance(outcome.contracts.deployer).await?;
    let blocks = chain.block_number().await?;
    info!(
        target: "sandbox",
        transactions = mined.len(),
        setup_gas = mined.iter().map(|tx| tx.gas_used).sum::<u64>(),
        reverted = mined.iter().filter(|tx| !tx.success).count(),
        from_deployer = mined.iter().filter(|tx| tx.from == outcome.contracts.deployer).count(),
        %deployer_balance,
        token = %outcome.contracts.token.address(),
        manager = %outcome.contracts.manager.address(),
        reward = %outcome.contracts.reward.address(),
        measurements = outcome.measurements.len(),
        blocks,
        "run complete"
    );

    metrics::run_end();
    metrics::print_step_summary();
    Ok(())
}
