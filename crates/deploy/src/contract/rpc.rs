//! JSON-RPC implementation of the contract capability surface.
//!
//! Transactions are sent with `eth_sendTransaction` from an account unlocked on
//! the node (Anvil, Hardhat node, or a signing proxy). Key custody stays with
//! the node.

use std::time::Duration;

use alloy_core::primitives::{Address, B256};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use super::{
    ContractFactory, PendingTx, PredictionContract, PredictionStats, RoundInfo, TxReceipt,
    abi::{self, Token},
};
use crate::{ContractArtifact, EventSpec, rpc};

/// Connection to a JSON-RPC node plus the signing identity used for transactions.
#[derive(Debug, Clone)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    signer: Address,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

/// Receipt fields read from `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: B256,
    #[serde(default, deserialize_with = "rpc::deserialize_opt_u64_from_hex")]
    block_number: Option<u64>,
    #[serde(default, deserialize_with = "rpc::deserialize_opt_u64_from_hex")]
    status: Option<u64>,
    #[serde(default)]
    contract_address: Option<Address>,
}

impl From<RpcReceipt> for TxReceipt {
    fn from(receipt: RpcReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            // Pre-Byzantium receipts have no status field.
            success: receipt.status.is_none_or(|status| status == 1),
            contract_address: receipt.contract_address,
        }
    }
}

impl RpcClient {
    pub fn new(
        url: impl Into<String>,
        signer: Address,
        confirmation_timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self> {
        Ok(Self {
            http: rpc::create_client()?,
            url: url.into(),
            signer,
            confirmation_timeout,
            poll_interval,
        })
    }

    /// First account managed by the node at `url`, used when no signer is configured.
    pub async fn default_account(url: &str) -> Result<Address> {
        let http = rpc::create_client()?;
        let accounts: Vec<Address> = rpc::json_rpc_call(&http, url, "eth_accounts", vec![])
            .await
            .context("Failed to list node accounts")?;

        accounts
            .into_iter()
            .next()
            .context("The node does not manage any account; configure a signer")
    }

    pub fn signer(&self) -> Address {
        self.signer
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Submit a transaction from the signer. `to = None` creates a contract.
    pub async fn send_transaction(&self, to: Option<Address>, data: &[u8]) -> Result<B256> {
        let mut tx = serde_json::json!({
            "from": self.signer,
            "data": format!("0x{}", hex::encode(data)),
        });
        if let Some(to) = to {
            tx["to"] = serde_json::json!(to);
        }

        let hash: B256 = rpc::json_rpc_call(&self.http, &self.url, "eth_sendTransaction", vec![tx])
            .await
            .context("Failed to send transaction")?;

        tracing::debug!(tx_hash = %hash, ?to, "Transaction sent");
        Ok(hash)
    }

    /// Read-only `eth_call` against the latest block.
    pub async fn call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>> {
        let result: String = rpc::json_rpc_call(
            &self.http,
            &self.url,
            "eth_call",
            vec![
                serde_json::json!({
                    "to": to,
                    "data": format!("0x{}", hex::encode(data)),
                }),
                Value::from("latest"),
            ],
        )
        .await?;

        hex::decode(result.trim_start_matches("0x")).context("eth_call returned invalid hex")
    }

    /// Poll for the receipt of `hash` until it is mined or the confirmation ceiling is hit.
    pub async fn wait_for_receipt(&self, hash: B256) -> Result<TxReceipt> {
        let receipt: RpcReceipt = rpc::poll_until(
            &format!("receipt of {}", hash),
            self.confirmation_timeout,
            self.poll_interval,
            || async move {
                rpc::json_rpc_call::<Option<RpcReceipt>>(
                    &self.http,
                    &self.url,
                    "eth_getTransactionReceipt",
                    vec![serde_json::json!(hash)],
                )
                .await
            },
        )
        .await?;

        Ok(receipt.into())
    }
}

/// A prediction contract reached through JSON-RPC.
#[derive(Debug, Clone)]
pub struct RpcContract {
    client: RpcClient,
    address: Address,
}

impl RpcContract {
    pub fn new(client: RpcClient, address: Address) -> Self {
        Self { client, address }
    }

    async fn read(&self, signature: &str, args: &[Token<'_>]) -> Result<Vec<u8>> {
        self.client
            .call(self.address, &abi::encode_call(signature, args))
            .await
            .with_context(|| format!("Failed to call {} on {}", signature, self.address))
    }
}

impl PredictionContract for RpcContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn owner(&self) -> Result<Address> {
        let data = self.read(abi::OWNER, &[]).await?;
        abi::decode_address(&data, 0)
    }

    async fn total_events(&self) -> Result<u64> {
        let data = self.read(abi::GET_TOTAL_EVENTS, &[]).await?;
        abi::decode_u64(&data, 0)
    }

    async fn create_event(&self, spec: &EventSpec) -> Result<PendingTx> {
        let data = abi::encode_call(
            abi::CREATE_EVENT,
            &[
                Token::Str(&spec.title),
                Token::Str(&spec.description),
                Token::Uint(spec.duration_seconds),
            ],
        );
        let hash = self.client.send_transaction(Some(self.address), &data).await?;
        Ok(PendingTx { hash })
    }

    async fn wait_for_receipt(&self, tx: &PendingTx) -> Result<TxReceipt> {
        self.client.wait_for_receipt(tx.hash).await
    }

    async fn current_round_info(&self, record_id: u64) -> Result<RoundInfo> {
        let data = self
            .read(abi::GET_CURRENT_ROUND_INFO, &[Token::Uint(record_id)])
            .await?;
        Ok(RoundInfo {
            round_id: abi::decode_u64(&data, 0)?,
            is_active: abi::decode_bool(&data, 1)?,
            time_remaining: abi::decode_u64(&data, 2)?,
        })
    }

    async fn is_guess_time_active(&self, record_id: u64) -> Result<bool> {
        let data = self
            .read(abi::IS_GUESS_TIME_ACTIVE, &[Token::Uint(record_id)])
            .await?;
        abi::decode_bool(&data, 0)
    }

    async fn prediction_stats(&self, record_id: u64) -> Result<PredictionStats> {
        let data = self
            .read(abi::GET_PREDICTION_STATS, &[Token::Uint(record_id)])
            .await?;
        Ok(PredictionStats {
            total_predictions: abi::decode_u64(&data, 0)?,
            is_finalized: abi::decode_bool(&data, 1)?,
            is_active: abi::decode_bool(&data, 2)?,
        })
    }
}

/// Deploys contracts from a compiled artifact, or binds to existing ones.
#[derive(Debug, Clone)]
pub struct ArtifactFactory {
    client: RpcClient,
    artifact: Option<ContractArtifact>,
}

impl ArtifactFactory {
    /// A factory able to deploy `artifact`.
    pub fn new(client: RpcClient, artifact: ContractArtifact) -> Self {
        Self {
            client,
            artifact: Some(artifact),
        }
    }

    /// A factory that can only attach to deployed contracts.
    pub fn attach_only(client: RpcClient) -> Self {
        Self {
            client,
            artifact: None,
        }
    }
}

impl ContractFactory for ArtifactFactory {
    type Contract = RpcContract;

    async fn deploy(&self) -> Result<PendingTx> {
        let artifact = self
            .artifact
            .as_ref()
            .context("No contract artifact loaded; cannot deploy")?;

        tracing::info!(
            contract = %artifact.contract_name,
            bytecode_len = artifact.bytecode.len(),
            from = %self.client.signer(),
            "Submitting deployment transaction..."
        );

        let hash = self.client.send_transaction(None, &artifact.bytecode).await?;
        Ok(PendingTx { hash })
    }

    async fn wait_for_deployment(&self, pending: &PendingTx) -> Result<TxReceipt> {
        self.client.wait_for_receipt(pending.hash).await
    }

    fn attach(&self, address: Address) -> RpcContract {
        RpcContract::new(self.client.clone(), address)
    }
}
