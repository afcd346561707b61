use alloy_primitives::{Address, Bytes, TxKind, U256};
use alloy_rpc_types_eth::{TransactionInput, TransactionRequest};

/// Helper for building the requests the sandbox sends to the simulator.
#[derive(Debug)]
pub struct TransactionOperations;

impl TransactionOperations {
    /// Contract creation. A `None` gas limit is estimated by the simulator.
    pub fn deploy_contract(from: Address, init_code: Bytes, gas: Option<u64>) -> TransactionRequest {
        tx(from, TxKind::Create, Some(init_code), gas)
    }

    /// Call into `to` with ABI-encoded `data`.
    pub fn call_contract(from: Address, to: Address, data: Bytes, gas: Option<u64>) -> TransactionRequest {
        tx(from, TxKind::Call(to), Some(data), gas)
    }
}

fn tx(from: Address, to: TxKind, data: Option<Bytes>, gas: Option<u64>) -> TransactionRequest {
    TransactionRequest {
        from: Some(from),
        to: Some(to),
        gas,
        value: Some(U256::ZERO),
        input: TransactionInput { input: None, data },
        ..Default::default()
    }
}
