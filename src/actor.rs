//! Locally held keys for the simulated accounts.

use alloy_primitives::{Address, B256, keccak256};
use alloy_signer::Signer;
use alloy_signer_local::{LocalSigner, PrivateKeySigner};
use k256::ecdsa::SigningKey;
use rayon::iter::{IntoParallelIterator, ParallelIterator};

/// Every account the simulator funds at genesis. Index 0 deploys the contracts.
pub struct ActorPool {
    actors: Vec<Actor>,
}

impl ActorPool {
    /// Derive `num_of_actors` signers from `seed` in parallel.
    pub fn generate(seed: B256, num_of_actors: u64, chain_id: u64) -> eyre::Result<Self> {
        let actors = (0..num_of_actors)
            .into_par_iter()
            .map(|index| Actor::from_seed(seed, index, chain_id))
            .collect::<eyre::Result<Vec<Actor>>>()?;
        Ok(Self { actors })
    }

    pub fn addresses(&self) -> Vec<Address> {
        self.actors.iter().map(Actor::address).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.actors.iter()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }
}

#[derive(Debug, Clone)]
pub struct Actor {
    signer: LocalSigner<SigningKey>,
}

impl Actor {
    /// Key `index` of the pool is `keccak256(seed ‖ index)`.
    pub fn from_seed(seed: B256, index: u64, chain_id: u64) -> eyre::Result<Self> {
        let mut preimage = [0u8; 40];
        preimage[..32].copy_from_slice(seed.as_slice());
        preimage[32..].copy_from_slice(&index.to_be_bytes());

        let signer = PrivateKeySigner::from_bytes(&keccak256(preimage))
            .map_err(|err| eyre::eyre!("failed to derive key {index}: {err}"))?
            .with_chain_id(Some(chain_id));

        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn private_key(&self) -> B256 {
        self.signer.to_bytes()
    }
}
