//! Data model shared by every stage of a run.

use std::fmt;

use alloy_core::primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, VerificationError};

/// How the provisioner treats a contract that already holds records.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RunMode {
    /// Create nothing when the contract already holds at least one record.
    IdempotentSkip,
    /// Always create the whole catalog. Reruns duplicate records.
    AlwaysCreate,
}

/// Whether record creation is restricted to the contract owner.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum OwnershipMode {
    /// The signer must be the registered owner before provisioning.
    Required,
    /// The contract accepts records from anyone; the owner is not checked.
    Public,
}

/// Outcome of the deployment (or attach) stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentResult {
    /// Address of the confirmed contract.
    pub address: Address,
    /// Owner registered in the contract.
    pub owner_address: Address,
    /// Number of records held by the contract right after deployment.
    pub initial_record_count: u64,
    /// `false` when the run attached to an already deployed contract.
    pub deployed: bool,
    /// Hash of the deployment transaction, if this run deployed.
    pub transaction_hash: Option<B256>,
}

/// A record ("event") to create in the prediction contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSpec {
    pub title: String,
    pub description: String,
    pub duration_seconds: u64,
}

impl EventSpec {
    /// Build a validated event spec.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        duration_seconds: u64,
    ) -> Result<Self, ValidationError> {
        let spec = Self {
            title: title.into(),
            description: description.into(),
            duration_seconds,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Check the invariants every spec must hold before it is submitted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription {
                title: self.title.clone(),
            });
        }
        if self.duration_seconds == 0 {
            return Err(ValidationError::ZeroDuration {
                title: self.title.clone(),
            });
        }
        Ok(())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ProvisionStatus {
    Succeeded,
    Failed,
}

/// Terminal result of one record creation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionOutcome {
    /// Position of the spec in the catalog.
    pub index: usize,
    pub spec: EventSpec,
    pub status: ProvisionStatus,
    pub transaction_hash: Option<B256>,
    pub block_number: Option<u64>,
    pub error_message: Option<String>,
}

impl ProvisionOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == ProvisionStatus::Succeeded
    }
}

/// Everything the provisioner observed during one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionSummary {
    /// Record count read before any creation.
    pub records_before: u64,
    /// One outcome per attempted spec, in catalog order.
    pub outcomes: Vec<ProvisionOutcome>,
    /// Record count re-read after the loop; `None` if that query failed.
    pub records_after: Option<u64>,
    /// Set when the idempotency check short-circuited the run.
    pub skipped: bool,
    /// Why the initial record count could not be read. With `skipped` this
    /// means emptiness was unprovable; otherwise the count was assumed to be 0.
    #[serde(default)]
    pub count_error: Option<String>,
}

impl ProvisionSummary {
    pub fn succeeded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ProvisionOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    /// Skipped because the contract already held records.
    pub fn already_populated(&self) -> bool {
        self.skipped && self.count_error.is_none()
    }
}

/// Result of the ownership stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "status")]
pub enum OwnershipCheck {
    /// The signer is the registered owner.
    Verified { owner: Address },
    /// The contract is public; the owner was not compared.
    NotRequired,
}

impl fmt::Display for OwnershipCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OwnershipCheck::Verified { owner } => write!(f, "verified (owner {})", owner),
            OwnershipCheck::NotRequired => write!(f, "not required (public contract)"),
        }
    }
}

/// Read-only snapshot of one record, assembled by the smoke test.
///
/// A `None` field means the query producing it failed; the failure is listed
/// in `errors`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VerificationReport {
    pub record_id: u64,
    pub round_id: Option<u64>,
    pub round_is_active: Option<bool>,
    pub guess_time_active: Option<bool>,
    pub time_remaining_seconds: Option<u64>,
    pub total_predictions: Option<u64>,
    pub is_finalized: Option<bool>,
    pub errors: Vec<VerificationError>,
}

impl VerificationReport {
    /// Whether all three queries answered.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}
