//! prophecy-deploy - Deployment and provisioning library for prediction contracts.
//!
//! This crate deploys (or attaches to) a prediction contract, checks that the
//! signer owns it, seeds it with a catalog of events and smoke-tests the
//! result.
//!
//! # Example
//!
//! ```no_run
//! use prophecy_deploy::{RunConfig, execute};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = RunConfig::load(None)?;
//! let report = execute(&config).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

mod artifact;
mod catalog;
mod config;
mod deployer;
mod ownership;
mod provisioner;
mod report;
mod rpc;
mod runner;
mod types;
mod verifier;

pub mod contract;
pub mod error;

pub use artifact::ContractArtifact;
pub use catalog::Catalog;
pub use config::{CONFIG_FILENAME, ContractVariant, ENV_PREFIX, RunConfig, RunPlan, Target};
pub use deployer::{attach_contract, deploy_contract};
pub use ownership::check_ownership;
pub use provisioner::provision;
pub use report::RunReport;
pub use runner::{RunContext, execute, run};
pub use types::{
    DeploymentResult, EventSpec, OwnershipCheck, OwnershipMode, ProvisionOutcome,
    ProvisionStatus, ProvisionSummary, RunMode, VerificationReport,
};
pub use verifier::{target_record, verify};
