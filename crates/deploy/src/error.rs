//! Error taxonomy of a provisioning run.
//!
//! Only [`RunError`] ever reaches the caller of [`crate::run`]. Item and
//! verification errors are folded into the report by the stage that raised
//! them.

use std::path::PathBuf;

use alloy_core::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// An [`crate::EventSpec`] that must not be submitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("event title must not be empty")]
    EmptyTitle,

    #[error("event '{title}' has an empty description")]
    EmptyDescription { title: String },

    #[error("event '{title}' has a zero duration")]
    ZeroDuration { title: String },
}

/// The active signer is not the owner registered in the contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("signer {actual} is not the contract owner {expected}")]
pub struct NotOwnerError {
    pub actual: Address,
    pub expected: Address,
}

/// A local precondition does not hold. Raised before any privileged call.
#[derive(Debug, thiserror::Error)]
pub enum PreconditionError {
    #[error("contract artifact not found: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("contract artifact {} is malformed: {reason}", path.display())]
    ArtifactMalformed { path: PathBuf, reason: String },

    #[error(transparent)]
    NotOwner(#[from] NotOwnerError),

    #[error("invalid event catalog entry {index}: {source}")]
    InvalidCatalog {
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

/// The contract could not be deployed or bound.
#[derive(Debug, thiserror::Error)]
pub enum DeploymentError {
    #[error("deployment transaction rejected: {reason}")]
    Rejected { reason: String },

    #[error("deployment transaction {tx_hash} was not confirmed: {reason}")]
    ConfirmationFailed { tx_hash: B256, reason: String },

    #[error("deployment transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },

    #[error("deployment receipt for {tx_hash} carries no contract address")]
    MissingAddress { tx_hash: B256 },

    #[error("contract at {address} is unreachable: {reason}")]
    Unreachable { address: Address, reason: String },
}

/// Failure of a single record creation. Never escapes the provisioner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvisionItemError {
    #[error("rejected before submission: {0}")]
    Invalid(#[from] ValidationError),

    #[error("transaction submission failed: {reason}")]
    Submission { reason: String },

    #[error("transaction {tx_hash} was not confirmed: {reason}")]
    Confirmation { tx_hash: B256, reason: String },

    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },
}

impl ProvisionItemError {
    /// Hash of the submitted transaction, when the failure happened after submission.
    pub fn transaction_hash(&self) -> Option<B256> {
        match self {
            ProvisionItemError::Confirmation { tx_hash, .. }
            | ProvisionItemError::Reverted { tx_hash } => Some(*tx_hash),
            ProvisionItemError::Invalid(_) | ProvisionItemError::Submission { .. } => None,
        }
    }
}

/// A smoke-test query that did not answer. Recorded, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{query} failed: {reason}")]
pub struct VerificationError {
    pub query: String,
    pub reason: String,
}

/// Errors that abort a run and set a failing exit status.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl From<NotOwnerError> for RunError {
    fn from(err: NotOwnerError) -> Self {
        RunError::Precondition(PreconditionError::NotOwner(err))
    }
}
