//! Compiled contract artifacts.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use serde::Deserialize;

use crate::error::PreconditionError;

/// Creation bytecode of a compiled contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    pub contract_name: String,
    pub bytecode: Bytes,
}

/// The subset of a Hardhat artifact file we need.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: Option<String>,
    bytecode: String,
}

impl ContractArtifact {
    /// Location of a contract artifact in a Hardhat `artifacts/` tree.
    pub fn path_for(artifacts_dir: &Path, contract_name: &str) -> PathBuf {
        artifacts_dir
            .join("contracts")
            .join(format!("{}.sol", contract_name))
            .join(format!("{}.json", contract_name))
    }

    /// Load and check an artifact file.
    pub fn load(path: &Path, contract_name: &str) -> Result<Self, PreconditionError> {
        if !path.exists() {
            return Err(PreconditionError::ArtifactMissing {
                path: path.to_path_buf(),
            });
        }

        let malformed = |reason: String| PreconditionError::ArtifactMalformed {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
        let artifact: HardhatArtifact =
            serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;

        let bytecode = hex::decode(artifact.bytecode.trim_start_matches("0x"))
            .map_err(|e| malformed(format!("bytecode is not valid hex: {}", e)))?;
        if bytecode.is_empty() {
            return Err(malformed(
                "bytecode is empty (abstract contract or interface?)".to_string(),
            ));
        }

        let contract_name = artifact
            .contract_name
            .unwrap_or_else(|| contract_name.to_string());

        tracing::debug!(
            path = %path.display(),
            contract = %contract_name,
            bytecode_len = bytecode.len(),
            "Contract artifact loaded"
        );

        Ok(Self {
            contract_name,
            bytecode: bytecode.into(),
        })
    }
}
