//! Deployment stage: bring up (or bind to) the contract and resolve its state.

use alloy_core::primitives::Address;

use crate::{
    DeploymentResult,
    contract::{ContractFactory, PredictionContract},
    error::DeploymentError,
};

/// Deploy a new contract instance and wait for its confirmation.
///
/// The deployment either completes with a bound handle or fails without
/// exposing any handle.
pub async fn deploy_contract<F: ContractFactory>(
    factory: &F,
) -> Result<(F::Contract, DeploymentResult), DeploymentError> {
    let pending = factory
        .deploy()
        .await
        .map_err(|e| DeploymentError::Rejected {
            reason: format!("{:#}", e),
        })?;

    tracing::info!(tx_hash = %pending.hash, "Deployment transaction sent, waiting for confirmation...");

    let receipt = factory.wait_for_deployment(&pending).await.map_err(|e| {
        DeploymentError::ConfirmationFailed {
            tx_hash: pending.hash,
            reason: format!("{:#}", e),
        }
    })?;

    if !receipt.success {
        return Err(DeploymentError::Reverted {
            tx_hash: pending.hash,
        });
    }

    let address = receipt
        .contract_address
        .ok_or(DeploymentError::MissingAddress {
            tx_hash: pending.hash,
        })?;

    tracing::info!(
        address = %address,
        block = ?receipt.block_number,
        "Contract deployed"
    );

    let contract = factory.attach(address);
    let (owner_address, initial_record_count) = read_state(&contract).await?;

    Ok((
        contract,
        DeploymentResult {
            address,
            owner_address,
            initial_record_count,
            deployed: true,
            transaction_hash: Some(pending.hash),
        },
    ))
}

/// Bind to an already deployed contract and read its state.
pub async fn attach_contract<F: ContractFactory>(
    factory: &F,
    address: Address,
) -> Result<(F::Contract, DeploymentResult), DeploymentError> {
    tracing::info!(address = %address, "Attaching to deployed contract...");

    let contract = factory.attach(address);
    let (owner_address, initial_record_count) = read_state(&contract).await?;

    Ok((
        contract,
        DeploymentResult {
            address,
            owner_address,
            initial_record_count,
            deployed: false,
            transaction_hash: None,
        },
    ))
}

/// Read the owner and record count of a bound contract.
async fn read_state<C: PredictionContract>(contract: &C) -> Result<(Address, u64), DeploymentError> {
    let unreachable = |e: anyhow::Error| DeploymentError::Unreachable {
        address: contract.address(),
        reason: format!("{:#}", e),
    };

    let owner = contract.owner().await.map_err(unreachable)?;
    let total = contract.total_events().await.map_err(unreachable)?;

    tracing::info!(owner = %owner, total_events = total, "Contract state resolved");

    Ok((owner, total))
}
