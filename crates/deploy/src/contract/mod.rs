//! Capability surface of the prediction contract.
//!
//! The orchestrator only talks to the contract through [`PredictionContract`]
//! and [`ContractFactory`]. The JSON-RPC implementation lives in [`rpc`];
//! tests provide in-memory doubles.

use std::future::Future;

use alloy_core::primitives::{Address, B256};
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::EventSpec;

pub mod abi;
pub mod rpc;

pub use rpc::{ArtifactFactory, RpcClient, RpcContract};

/// A submitted transaction that has not been confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    pub hash: B256,
}

/// Receipt of a confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    /// `false` when the transaction was mined but reverted.
    pub success: bool,
    /// Set for contract creation transactions.
    pub contract_address: Option<Address>,
}

/// Answer of `getCurrentRoundInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundInfo {
    pub round_id: u64,
    pub is_active: bool,
    pub time_remaining: u64,
}

/// Answer of `getPredictionStats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionStats {
    pub total_predictions: u64,
    pub is_finalized: bool,
    pub is_active: bool,
}

/// A bound, confirmed prediction contract.
pub trait PredictionContract: Send + Sync {
    /// Address the handle is bound to.
    fn address(&self) -> Address;

    fn owner(&self) -> impl Future<Output = Result<Address>> + Send;

    fn total_events(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Submit a `createEvent` transaction. The caller must wait for its receipt.
    fn create_event(&self, spec: &EventSpec) -> impl Future<Output = Result<PendingTx>> + Send;

    /// Block until the transaction is confirmed or the client's ceiling is hit.
    fn wait_for_receipt(&self, tx: &PendingTx) -> impl Future<Output = Result<TxReceipt>> + Send;

    fn current_round_info(&self, record_id: u64) -> impl Future<Output = Result<RoundInfo>> + Send;

    fn is_guess_time_active(&self, record_id: u64) -> impl Future<Output = Result<bool>> + Send;

    fn prediction_stats(
        &self,
        record_id: u64,
    ) -> impl Future<Output = Result<PredictionStats>> + Send;
}

/// Creates contract handles, either by deploying new code or binding to an address.
pub trait ContractFactory: Send + Sync {
    type Contract: PredictionContract;

    /// Submit the deployment transaction.
    fn deploy(&self) -> impl Future<Output = Result<PendingTx>> + Send;

    /// Block until the deployment transaction is confirmed.
    fn wait_for_deployment(
        &self,
        pending: &PendingTx,
    ) -> impl Future<Output = Result<TxReceipt>> + Send;

    /// Bind a handle to an already deployed contract.
    fn attach(&self, address: Address) -> Self::Contract;
}
