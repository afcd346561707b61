//! In-memory EVM chain. One block is mined per committed transaction.

use alloy_genesis::Genesis;
use alloy_primitives::{Address, B256, Bytes, TxKind, U256};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_sol_types::decode_revert_reason;
use revm::{
    Context, ExecuteEvm, MainBuilder, MainContext,
    bytecode::Bytecode,
    context::{
        BlockEnv, TxEnv,
        result::{ExecutionResult, Output},
    },
    database::{CacheDB, EmptyDB},
    database_interface::DatabaseCommit,
    state::{AccountInfo, EvmState},
};
use tracing::{debug, warn};

/// Returned for every transaction the simulator mines successfully.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub block_number: u64,
    pub gas_used: u64,
    pub contract_address: Option<Address>,
}

/// History entry kept for every mined transaction, reverted ones included.
#[derive(Clone, Debug)]
pub struct MinedTransaction {
    pub block_number: u64,
    pub from: Address,
    pub kind: TxKind,
    pub input: Bytes,
    pub gas_used: u64,
    pub success: bool,
    pub contract_address: Option<Address>,
}

#[derive(Clone, Copy, Debug)]
struct Head {
    number: u64,
    timestamp: u64,
}

pub struct Simulator {
    db: CacheDB<EmptyDB>,
    chain_id: u64,
    gas_limit: u64,
    gas_price: u128,
    head: Head,
    accounts: Vec<Address>,
    history: Vec<MinedTransaction>,
}

impl Simulator {
    /// Seed the in-memory state from the genesis alloc. Alloc order is the
    /// order `accounts()` reports.
    pub fn from_genesis(genesis: &Genesis, accounts: Vec<Address>, gas_price: u128) -> eyre::Result<Self> {
        let mut db = CacheDB::<EmptyDB>::default();

        for (address, account) in &genesis.alloc {
            let mut info = AccountInfo {
                balance: account.balance,
                nonce: account.nonce.unwrap_or_default(),
                ..Default::default()
            };
            if let Some(code) = &account.code {
                let bytecode = Bytecode::new_raw(code.clone());
                info.code_hash = bytecode.hash_slow();
                info.code = Some(bytecode);
            }
            db.insert_account_info(*address, info);

            for (slot, value) in account.storage.iter().flatten() {
                db.insert_account_storage(
                    *address,
                    U256::from_be_bytes(slot.0),
                    U256::from_be_bytes(value.0),
                )
                .map_err(|err| eyre::eyre!("failed to seed storage of {address}: {err:?}"))?;
            }
        }

        for address in &accounts {
            if !genesis.alloc.contains_key(address) {
                eyre::bail!("account {address} is not funded in genesis");
            }
        }

        Ok(Self {
            db,
            chain_id: genesis.config.chain_id,
            gas_limit: genesis.gas_limit,
            gas_price,
            head: Head {
                number: 0,
                timestamp: genesis.timestamp,
            },
            accounts,
            history: Vec::new(),
        })
    }

    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    pub fn block_number(&self) -> u64 {
        self.head.number
    }

    pub fn transactions(&self) -> &[MinedTransaction] {
        &self.history
    }

    pub fn nonce(&self, address: Address) -> u64 {
        self.account_info(address)
            .map(|info| info.nonce)
            .unwrap_or_default()
    }

    pub fn balance(&self, address: Address) -> U256 {
        self.account_info(address)
            .map(|info| info.balance)
            .unwrap_or_default()
    }

    pub fn code_at(&self, address: Address) -> Bytes {
        self.account_info(address)
            .and_then(|info| {
                info.code
                    .clone()
                    .or_else(|| self.db.cache.contracts.get(&info.code_hash).cloned())
            })
            .map(|code| code.original_bytes())
            .unwrap_or_default()
    }

    /// Execute and commit `request`, mining one block.
    ///
    /// A missing gas limit is filled with an estimate. Reverted and halted
    /// transactions are still mined before the error is returned.
    pub fn send_transaction(&mut self, request: TransactionRequest) -> eyre::Result<TxReceipt> {
        let from = sender(&request)?;
        if !self.accounts.contains(&from) {
            eyre::bail!("sender account not recognized: {from}");
        }

        let gas_limit = match request.gas {
            Some(gas) => gas,
            None => self.estimate_gas(&request)?,
        };
        if gas_limit > self.gas_limit {
            eyre::bail!(
                "transaction gas {} exceeds block gas limit {}",
                gas_limit,
                self.gas_limit
            );
        }

        let tx = self.tx_env(&request, gas_limit)?;
        let (result, state) = self.transact(tx)?;
        self.db.commit(state);

        self.head.number += 1;
        self.head.timestamp += 1;

        let contract_address = match &result {
            ExecutionResult::Success {
                output: Output::Create(_, address),
                ..
            } => *address,
            _ => None,
        };

        self.history.push(MinedTransaction {
            block_number: self.head.number,
            from,
            kind: request.to.unwrap_or(TxKind::Create),
            input: request.input.input().cloned().unwrap_or_default(),
            gas_used: result.gas_used(),
            success: result.is_success(),
            contract_address,
        });

        debug!(
            target: "sandbox",
            block = self.head.number,
            gas_used = result.gas_used(),
            "mined transaction from {from}"
        );

        match result {
            ExecutionResult::Success { gas_used, .. } => Ok(TxReceipt {
                block_number: self.head.number,
                gas_used,
                contract_address,
            }),
            failed => Err(execution_failure(&failed)),
        }
    }

    /// Smallest gas limit under which `request` succeeds. Never commits.
    pub fn estimate_gas(&mut self, request: &TransactionRequest) -> eyre::Result<u64> {
        let cap = request
            .gas
            .unwrap_or(self.gas_limit)
            .min(self.gas_limit)
            .min(self.affordable_gas(request)?);

        let (result, _) = self.transact(self.tx_env(request, cap)?)?;
        let spent = match &result {
            ExecutionResult::Success {
                gas_used,
                gas_refunded,
                ..
            } => gas_used + gas_refunded,
            failed => return Err(execution_failure(failed)),
        };

        // Most calls succeed with exactly what they spent before refunds.
        if spent >= cap || self.succeeds_with(request, spent)? {
            return Ok(spent.min(cap));
        }

        let mut lowest_failing = spent;
        let mut highest_passing = cap;
        while highest_passing - lowest_failing > 1 {
            let mid = lowest_failing + (highest_passing - lowest_failing) / 2;
            if self.succeeds_with(request, mid)? {
                highest_passing = mid;
            } else {
                lowest_failing = mid;
            }
        }

        Ok(highest_passing)
    }

    /// Most gas the sender can pay for after `value`, as geth caps estimates.
    fn affordable_gas(&self, request: &TransactionRequest) -> eyre::Result<u64> {
        let gas_price = request.gas_price.unwrap_or(self.gas_price);
        if gas_price == 0 {
            return Ok(u64::MAX);
        }
        let available = self
            .balance(sender(request)?)
            .saturating_sub(request.value.unwrap_or_default());
        Ok((available / U256::from(gas_price)).saturating_to::<u64>())
    }

    fn succeeds_with(&mut self, request: &TransactionRequest, gas_limit: u64) -> eyre::Result<bool> {
        let (result, _) = self.transact(self.tx_env(request, gas_limit)?)?;
        Ok(result.is_success())
    }

    fn tx_env(&self, request: &TransactionRequest, gas_limit: u64) -> eyre::Result<TxEnv> {
        let caller = sender(request)?;
        Ok(TxEnv {
            caller,
            gas_limit,
            gas_price: request.gas_price.unwrap_or(self.gas_price),
            kind: request.to.unwrap_or(TxKind::Create),
            value: request.value.unwrap_or_default(),
            data: request.input.input().cloned().unwrap_or_default(),
            nonce: self.nonce(caller),
            chain_id: Some(self.chain_id),
            ..Default::default()
        })
    }

    /// Run `tx` on top of the current state against the pending block.
    fn transact(&mut self, tx: TxEnv) -> eyre::Result<(ExecutionResult, EvmState)> {
        let chain_id = self.chain_id;
        let block = self.pending_block();

        let mut evm = Context::mainnet()
            .with_db(&mut self.db)
            .with_block(block)
            .modify_cfg_chained(|cfg| {
                cfg.chain_id = chain_id;
            })
            .build_mainnet();

        let outcome = evm.transact(tx).map_err(|err| {
            warn!(target: "sandbox", ?err, "transaction rejected");
            eyre::eyre!("transaction rejected: {err:?}")
        })?;

        Ok((outcome.result, outcome.state))
    }

    fn pending_block(&self) -> BlockEnv {
        let mut block = BlockEnv::default();
        block.number = U256::from(self.head.number + 1);
        block.timestamp = U256::from(self.head.timestamp + 1);
        block.gas_limit = self.gas_limit;
        block.basefee = 0;
        block.beneficiary = Address::ZERO;
        block.prevrandao = Some(B256::ZERO);
        block
    }

    fn account_info(&self, address: Address) -> Option<&AccountInfo> {
        self.db.cache.accounts.get(&address).map(|account| &account.info)
    }
}

fn sender(request: &TransactionRequest) -> eyre::Result<Address> {
    request
        .from
        .ok_or_else(|| eyre::eyre!("transaction has no sender"))
}

fn execution_failure(result: &ExecutionResult) -> eyre::Report {
    match result {
        ExecutionResult::Revert { output, .. } => match decode_revert_reason(output) {
            Some(reason) => eyre::eyre!("execution reverted: {reason}"),
            None => eyre::eyre!("execution reverted"),
        },
        ExecutionResult::Halt { reason, .. } => eyre::eyre!("execution halted: {reason:?}"),
        ExecutionResult::Success { .. } => eyre::eyre!("execution succeeded"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use alloy_genesis::GenesisAccount;
    use alloy_primitives::{address, hex};
    use alloy_rpc_types_eth::TransactionInput;

    use super::*;

    /// Creation code whose runtime is a single STOP.
    pub(crate) const STOP_INITCODE: &str = "6001600c60003960016000f300";
    /// Creation code whose runtime always reverts with empty data.
    pub(crate) const REVERT_INITCODE: &str = "6005600c60003960056000f360006000fd";

    const ALICE: Address = address!("0x00000000000000000000000000000000000a11ce");
    const BOB: Address = address!("0x0000000000000000000000000000000000000b0b");

    fn simulator() -> Simulator {
        let genesis = Genesis::default()
            .with_gas_limit(8_100_000)
            .with_timestamp(1_000)
            .extend_accounts([
                (ALICE, GenesisAccount::default().with_balance(U256::from(10u64).pow(U256::from(20u64)))),
                (BOB, GenesisAccount::default().with_balance(U256::from(10u64).pow(U256::from(20u64)))),
            ]);
        Simulator::from_genesis(&genesis, vec![ALICE, BOB], 20_000_000_000).unwrap()
    }

    fn deploy(sim: &mut Simulator, initcode: &str) -> Address {
        let request = TransactionRequest {
            from: Some(ALICE),
            to: Some(TxKind::Create),
            input: TransactionInput::new(hex::decode(initcode).unwrap().into()),
            ..Default::default()
        };
        sim.send_transaction(request).unwrap().contract_address.unwrap()
    }

    fn call(to: Address, data: Vec<u8>) -> TransactionRequest {
        TransactionRequest {
            from: Some(ALICE),
            to: Some(TxKind::Call(to)),
            input: TransactionInput::new(data.into()),
            ..Default::default()
        }
    }

    #[test]
    fn deploy_mines_a_block_and_stores_code() {
        let mut sim = simulator();
        let contract = deploy(&mut sim, STOP_INITCODE);

        assert_eq!(contract, ALICE.create(0));
        assert_eq!(sim.code_at(contract), Bytes::from_static(&[0x00]));
        assert_eq!(sim.block_number(), 1);
        assert_eq!(sim.nonce(ALICE), 1);
        assert_eq!(sim.transactions().len(), 1);
        assert_eq!(sim.transactions()[0].contract_address, Some(contract));
    }

    #[test]
    fn estimate_does_not_commit() {
        let mut sim = simulator();
        let contract = deploy(&mut sim, STOP_INITCODE);

        let gas = sim.estimate_gas(&call(contract, Vec::new())).unwrap();
        assert_eq!(gas, 21_000);
        assert_eq!(sim.nonce(ALICE), 1);
        assert_eq!(sim.block_number(), 1);
    }

    #[test]
    fn estimate_grows_with_calldata() {
        let mut sim = simulator();
        let contract = deploy(&mut sim, STOP_INITCODE);

        let small = sim.estimate_gas(&call(contract, vec![1u8; 64])).unwrap();
        let large = sim.estimate_gas(&call(contract, vec![1u8; 128])).unwrap();
        assert!(small > 21_000);
        assert!(large > small);
    }

    #[test]
    fn revert_is_mined_and_reported() {
        let mut sim = simulator();
        let contract = deploy(&mut sim, REVERT_INITCODE);

        assert!(sim.estimate_gas(&call(contract, Vec::new())).is_err());

        let mut request = call(contract, Vec::new());
        request.gas = Some(100_000);
        let err = sim.send_transaction(request).unwrap_err();
        assert!(err.to_string().contains("reverted"));
        assert_eq!(sim.nonce(ALICE), 2);
        assert!(!sim.transactions()[1].success);
    }

    #[test]
    fn rejects_unknown_sender_and_oversized_gas() {
        let mut sim = simulator();
        let contract = deploy(&mut sim, STOP_INITCODE);

        let mut stranger = call(contract, Vec::new());
        stranger.from = Some(Address::repeat_byte(0x42));
        assert!(sim.send_transaction(stranger).is_err());

        let mut greedy = call(contract, Vec::new());
        greedy.gas = Some(9_000_000);
        assert!(sim.send_transaction(greedy).is_err());
        assert_eq!(sim.block_number(), 1);
    }

    #[test]
    fn estimate_is_capped_by_sender_balance() {
        let genesis = Genesis::default()
            .with_gas_limit(6_000_000_000)
            .extend_accounts([(
                ALICE,
                GenesisAccount::default().with_balance(U256::from(10u64).pow(U256::from(20u64))),
            )]);
        let mut sim = Simulator::from_genesis(&genesis, vec![ALICE], 20_000_000_000).unwrap();

        // 6e9 gas at 20 gwei costs more than the 100 ether the sender holds.
        assert_eq!(sim.affordable_gas(&call(BOB, Vec::new())).unwrap(), 5_000_000_000);
        assert_eq!(sim.estimate_gas(&call(BOB, Vec::new())).unwrap(), 21_000);

        let contract = deploy(&mut sim, STOP_INITCODE);
        assert_eq!(sim.code_at(contract), Bytes::from_static(&[0x00]));
    }

    #[test]
    fn charges_gas_at_the_configured_price() {
        let mut sim = simulator();
        let before = sim.balance(BOB);

        let mut request = call(ALICE, Vec::new());
        request.from = Some(BOB);
        let receipt = sim.send_transaction(request).unwrap();

        assert_eq!(receipt.gas_used, 21_000);
        assert_eq!(before - sim.balance(BOB), U256::from(21_000u64 * 20_000_000_000u64));
    }
}
