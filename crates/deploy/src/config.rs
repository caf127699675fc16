//! Run configuration, layered from defaults, a TOML file and the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_core::primitives::Address;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{Catalog, OwnershipMode, RunMode, error::PreconditionError};

/// The default name for the configuration file, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "Prophecy.toml";

/// Prefix of the environment variables overriding configuration keys.
pub const ENV_PREFIX: &str = "PROPHECY_";

/// The prediction contract flavours this tool knows how to provision.
///
/// Each variant carries the defaults its deployment flow needs; `run_mode`,
/// `ownership` and `catalog_path` can override them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ContractVariant {
    /// Owner-managed platform, seeded once with the showcase events.
    #[default]
    PrivacyPredictionPlatform,
    /// Hash-based platform, seeded on every deployment.
    PrivacyPredictionPlatformSimple,
    /// Open platform where anyone may create events.
    PrivacyGuessPublic,
    /// FHE platform, probed with a single test event.
    PrivacyGuessFheSimple,
}

impl ContractVariant {
    /// Solidity contract name, which is also the artifact name.
    pub fn contract_name(&self) -> &'static str {
        match self {
            ContractVariant::PrivacyPredictionPlatform => "PrivacyPredictionPlatform",
            ContractVariant::PrivacyPredictionPlatformSimple => "PrivacyPredictionPlatformSimple",
            ContractVariant::PrivacyGuessPublic => "PrivacyGuessPublic",
            ContractVariant::PrivacyGuessFheSimple => "PrivacyGuessFHESimple",
        }
    }

    pub fn default_ownership(&self) -> OwnershipMode {
        match self {
            ContractVariant::PrivacyGuessPublic => OwnershipMode::Public,
            _ => OwnershipMode::Required,
        }
    }

    pub fn default_run_mode(&self) -> RunMode {
        match self {
            ContractVariant::PrivacyPredictionPlatform => RunMode::IdempotentSkip,
            _ => RunMode::AlwaysCreate,
        }
    }

    pub fn default_catalog(&self) -> Catalog {
        match self {
            ContractVariant::PrivacyPredictionPlatform => Catalog::standard(),
            ContractVariant::PrivacyPredictionPlatformSimple => Catalog::simple(),
            ContractVariant::PrivacyGuessPublic => Catalog::public_probe(),
            ContractVariant::PrivacyGuessFheSimple => Catalog::fhe_probe(),
        }
    }
}

/// Raw configuration of a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// JSON-RPC endpoint of the ledger network.
    pub rpc_url: String,
    /// Signing account. Defaults to the first account managed by the node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<String>,
    /// Contract flavour to deploy or attach to.
    pub variant: ContractVariant,
    /// Attach to this address instead of deploying a new contract.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    /// Root of the Hardhat artifacts tree.
    pub artifacts_dir: PathBuf,
    /// Overrides the variant's run mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_mode: Option<RunMode>,
    /// Overrides the variant's ownership mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership: Option<OwnershipMode>,
    /// TOML catalog replacing the variant's built-in events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,
    /// Ceiling on every confirmation wait, in seconds.
    pub confirmation_timeout_secs: u64,
    /// Receipt polling interval, in milliseconds.
    pub poll_interval_ms: u64,
    /// Run the post-deployment smoke test.
    pub verify: bool,
    /// Where to write the JSON run report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            signer: None,
            variant: ContractVariant::default(),
            contract_address: None,
            artifacts_dir: PathBuf::from("artifacts"),
            run_mode: None,
            ownership: None,
            catalog_path: None,
            confirmation_timeout_secs: 120,
            poll_interval_ms: 2000,
            verify: true,
            report_path: None,
        }
    }
}

/// Whether the run deploys a new contract or binds to an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Deploy,
    Attach(Address),
}

/// Fully resolved run parameters, ready for [`crate::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub variant: ContractVariant,
    pub target: Target,
    pub ownership: OwnershipMode,
    pub run_mode: RunMode,
    pub catalog: Catalog,
    pub verify: bool,
}

impl RunConfig {
    /// Load the configuration.
    ///
    /// Layers, lowest priority first: built-in defaults, the TOML file at `path`
    /// (or `Prophecy.toml` if present), then `PROPHECY_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, PreconditionError> {
        let mut figment = Figment::from(Serialized::defaults(RunConfig::default()));

        match path {
            Some(path) if !path.exists() => {
                return Err(PreconditionError::Config {
                    reason: format!("configuration file not found: {}", path.display()),
                });
            }
            Some(path) => figment = figment.merge(Toml::file(path)),
            None if Path::new(CONFIG_FILENAME).exists() => {
                figment = figment.merge(Toml::file(CONFIG_FILENAME))
            }
            None => {}
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| PreconditionError::Config {
                reason: e.to_string(),
            })?;

        tracing::debug!(config = ?config, "Configuration loaded");
        Ok(config)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Configured signer, if any.
    pub fn signer_address(&self) -> Result<Option<Address>, PreconditionError> {
        self.signer
            .as_deref()
            .map(|s| parse_address("signer", s))
            .transpose()
    }

    /// Check the endpoint and resolve variant defaults, target and catalog.
    pub fn plan(&self) -> Result<RunPlan, PreconditionError> {
        url::Url::parse(&self.rpc_url).map_err(|e| PreconditionError::Config {
            reason: format!("invalid rpc_url '{}': {}", self.rpc_url, e),
        })?;

        if self.confirmation_timeout_secs == 0 || self.poll_interval_ms == 0 {
            return Err(PreconditionError::Config {
                reason: "confirmation_timeout_secs and poll_interval_ms must be positive"
                    .to_string(),
            });
        }

        let target = match self.contract_address.as_deref() {
            Some(address) => Target::Attach(parse_address("contract_address", address)?),
            None => Target::Deploy,
        };

        let catalog = match &self.catalog_path {
            Some(path) => Catalog::load_from_file(path)?,
            None => Catalog::new(self.variant.default_catalog().into_inner())?,
        };

        Ok(RunPlan {
            variant: self.variant,
            target,
            ownership: self
                .ownership
                .unwrap_or_else(|| self.variant.default_ownership()),
            run_mode: self
                .run_mode
                .unwrap_or_else(|| self.variant.default_run_mode()),
            catalog,
            verify: self.verify,
        })
    }

    /// Path of the compiled artifact for the configured variant.
    pub fn artifact_path(&self) -> PathBuf {
        crate::ContractArtifact::path_for(&self.artifacts_dir, self.variant.contract_name())
    }
}

fn parse_address(key: &str, value: &str) -> Result<Address, PreconditionError> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| PreconditionError::Config {
            reason: format!("invalid {} '{}': {}", key, value, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use strum::IntoEnumIterator;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = RunConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config, RunConfig::default());

            let plan = config.plan().map_err(|e| e.to_string())?;
            assert_eq!(plan.target, Target::Deploy);
            assert_eq!(plan.ownership, OwnershipMode::Required);
            assert_eq!(plan.run_mode, RunMode::IdempotentSkip);
            assert_eq!(plan.catalog.len(), 3);
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILENAME,
                r#"
                rpc_url = "http://node:8545"
                variant = "privacy-guess-public"
                confirmation_timeout_secs = 30
                "#,
            )?;
            jail.set_env("PROPHECY_CONFIRMATION_TIMEOUT_SECS", "45");
            jail.set_env(
                "PROPHECY_CONTRACT_ADDRESS",
                "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            );
            jail.set_env("PROPHECY_RUN_MODE", "idempotent-skip");

            let config = RunConfig::load(None).map_err(|e| e.to_string())?;
            assert_eq!(config.rpc_url, "http://node:8545");
            assert_eq!(config.variant, ContractVariant::PrivacyGuessPublic);
            assert_eq!(config.confirmation_timeout_secs, 45);

            let plan = config.plan().map_err(|e| e.to_string())?;
            assert!(matches!(plan.target, Target::Attach(_)));
            assert_eq!(plan.ownership, OwnershipMode::Public);
            assert_eq!(plan.run_mode, RunMode::IdempotentSkip);
            assert_eq!(plan.catalog.len(), 1);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        Jail::expect_with(|_jail| {
            let err = RunConfig::load(Some(Path::new("missing.toml"))).unwrap_err();
            assert!(matches!(err, PreconditionError::Config { .. }));
            Ok(())
        });
    }

    #[test]
    fn test_plan_rejects_bad_values() {
        let config = RunConfig {
            rpc_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.plan().is_err());

        let config = RunConfig {
            contract_address: Some("0x1234".to_string()),
            ..Default::default()
        };
        assert!(config.plan().is_err());

        let config = RunConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.plan().is_err());
    }

    #[test]
    fn test_variant_presets() {
        for variant in ContractVariant::iter() {
            assert_eq!(variant.to_string().parse::<ContractVariant>().unwrap(), variant);
            assert!(!variant.default_catalog().is_empty());
        }
        assert_eq!(
            ContractVariant::PrivacyGuessFheSimple.to_string(),
            "privacy-guess-fhe-simple"
        );
        assert_eq!(
            ContractVariant::PrivacyGuessFheSimple.contract_name(),
            "PrivacyGuessFHESimple"
        );
        assert_eq!(
            ContractVariant::PrivacyGuessPublic.default_ownership(),
            OwnershipMode::Public
        );
    }

    #[test]
    fn test_artifact_path_uses_contract_name() {
        let config = RunConfig {
            variant: ContractVariant::PrivacyGuessFheSimple,
            ..Default::default()
        };
        assert!(config
            .artifact_path()
            .ends_with("contracts/PrivacyGuessFHESimple.sol/PrivacyGuessFHESimple.json"));
    }
}
