//! Async access to a [`Simulator`] owned by a dedicated task.

use alloy_primitives::{Address, Bytes, U256};
use alloy_rpc_types_eth::TransactionRequest;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

use crate::simulator::{MinedTransaction, Simulator, TxReceipt};

const REQUEST_BUFFER: usize = 1000;

enum ChainRequest {
    Accounts(oneshot::Sender<Vec<Address>>),
    BlockNumber(oneshot::Sender<u64>),
    Balance(Address, oneshot::Sender<U256>),
    Code(Address, oneshot::Sender<Bytes>),
    Transactions(oneshot::Sender<Vec<MinedTransaction>>),
    SendTransaction(TransactionRequest, oneshot::Sender<eyre::Result<TxReceipt>>),
    EstimateGas(TransactionRequest, oneshot::Sender<eyre::Result<u64>>),
}

/// Cloneable handle to the simulator task. Requests are served one at a time
/// in the order they arrive.
#[derive(Clone)]
pub struct ChainHandle {
    sender: mpsc::Sender<ChainRequest>,
}

impl ChainHandle {
    /// Move `simulator` into its own task and return a handle to it. The task
    /// stops once every handle is dropped.
    pub fn spawn(simulator: Simulator) -> Self {
        let (sender, receiver) = mpsc::channel(REQUEST_BUFFER);
        tokio::spawn(serve(simulator, receiver));
        Self { sender }
    }

    pub async fn accounts(&self) -> eyre::Result<Vec<Address>> {
        self.request(ChainRequest::Accounts).await
    }

    pub async fn block_number(&self) -> eyre::Result<u64> {
        self.request(ChainRequest::BlockNumber).await
    }

    pub async fn balance(&self, address: Address) -> eyre::Result<U256> {
        self.request(|reply| ChainRequest::Balance(address, reply)).await
    }

    pub async fn code_at(&self, address: Address) -> eyre::Result<Bytes> {
        self.request(|reply| ChainRequest::Code(address, reply)).await
    }

    pub async fn transactions(&self) -> eyre::Result<Vec<MinedTransaction>> {
        self.request(ChainRequest::Transactions).await
    }

    pub async fn send_transaction(&self, tx: TransactionRequest) -> eyre::Result<TxReceipt> {
        self.request(|reply| ChainRequest::SendTransaction(tx, reply))
            .await?
    }

    pub async fn estimate_gas(&self, tx: TransactionRequest) -> eyre::Result<u64> {
        self.request(|reply| ChainRequest::EstimateGas(tx, reply))
            .await?
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ChainRequest,
    ) -> eyre::Result<T> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(make(reply))
            .await
            .map_err(|_| eyre::eyre!("simulator task has stopped"))?;
        response
            .await
            .map_err(|_| eyre::eyre!("simulator task dropped the request"))
    }
}

async fn serve(mut simulator: Simulator, mut receiver: mpsc::Receiver<ChainRequest>) {
    while let Some(request) = receiver.recv().await {
        // A caller that went away no longer needs its reply.
        match request {
            ChainRequest::Accounts(reply) => {
                let _ = reply.send(simulator.accounts().to_vec());
            }
            ChainRequest::BlockNumber(reply) => {
                let _ = reply.send(simulator.block_number());
            }
            ChainRequest::Balance(address, reply) => {
                let _ = reply.send(simulator.balance(address));
            }
            ChainRequest::Code(address, reply) => {
                let _ = reply.send(simulator.code_at(address));
            }
            ChainRequest::Transactions(reply) => {
                let _ = reply.send(simulator.transactions().to_vec());
            }
            ChainRequest::SendTransaction(tx, reply) => {
                let _ = reply.send(simulator.send_transaction(tx));
            }
            ChainRequest::EstimateGas(tx, reply) => {
                let _ = reply.send(simulator.estimate_gas(&tx));
            }
        }
    }

    info!(
        target: "sandbox",
        blocks = simulator.block_number(),
        "simulator stopped"
    );
}
