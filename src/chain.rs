use std::{fs, path::Path};

use alloy_genesis::{Genesis, GenesisAccount};
use tracing::info;

use crate::{
    actor::ActorPool, config::SimulationConfig, provider::ChainHandle, simulator::Simulator,
};

/// Generate the accounts, fund them at genesis and start the simulator task.
pub fn launch(config: &SimulationConfig, timestamp: u64) -> eyre::Result<(Genesis, ChainHandle)> {
    let actors = ActorPool::generate(config.account_seed, config.num_of_accounts, config.chain_id)?;
    let genesis = custom_genesis(config, &actors, timestamp);
    let simulator = Simulator::from_genesis(&genesis, actors.addresses(), config.gas_price)?;

    info!(
        target: "sandbox",
        accounts = actors.len(),
        gas_limit = genesis.gas_limit,
        chain_id = genesis.config.chain_id,
        "simulator ready"
    );
    Ok((genesis, ChainHandle::spawn(simulator)))
}

/// Genesis with one funded alloc entry per actor.
pub fn custom_genesis(config: &SimulationConfig, actors: &ActorPool, timestamp: u64) -> Genesis {
    let alloc = actors.iter().map(|actor| {
        (
            actor.address(),
            GenesisAccount {
                balance: config.account_balance,
                private_key: Some(actor.private_key()),
                ..Default::default()
            },
        )
    });

    let mut genesis = Genesis::default()
        .with_gas_limit(config.gas_limit)
        .with_timestamp(timestamp)
        .extend_accounts(alloc);
    genesis.config.chain_id = config.chain_id;
    genesis
}

pub fn write_genesis(genesis: &Genesis, path: &Path) -> eyre::Result<()> {
    let json = serde_json::to_string_pretty(genesis)?;
    fs::write(path, json)?;
    info!(target: "sandbox", "✅ Wrote genesis file to {:?}", path);
    Ok(())
}
