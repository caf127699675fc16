//! Final run report.

use std::{fmt, path::Path};

use anyhow::{Context, Result};
use comfy_table::{Table, presets::UTF8_FULL_CONDENSED};
use serde::{Deserialize, Serialize};

use crate::{
    ContractVariant, DeploymentResult, OwnershipCheck, ProvisionStatus, ProvisionSummary,
    RunMode, VerificationReport,
};

/// Aggregated outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub variant: ContractVariant,
    pub run_mode: RunMode,
    pub deployment: DeploymentResult,
    pub ownership: OwnershipCheck,
    pub provision: ProvisionSummary,
    pub verification: Option<VerificationReport>,
    /// RFC 3339 timestamp of the report.
    pub generated_at: String,
    /// Deployment succeeded and the ownership gate passed (or did not apply).
    ///
    /// Failing either stage aborts the run with a [`crate::error::RunError`]
    /// before any report exists, so a built report always carries `true`.
    pub success: bool,
}

impl RunReport {
    /// Assemble the report of a run that got past deployment and the ownership gate.
    ///
    /// Item, record count and verification failures never clear `success`;
    /// they show up in [`RunReport::warnings`].
    pub fn new(
        variant: ContractVariant,
        run_mode: RunMode,
        deployment: DeploymentResult,
        ownership: OwnershipCheck,
        provision: ProvisionSummary,
        verification: Option<VerificationReport>,
    ) -> Self {
        Self {
            variant,
            run_mode,
            deployment,
            ownership,
            provision,
            verification,
            generated_at: chrono::Utc::now().to_rfc3339(),
            success: true,
        }
    }

    /// Non-fatal problems: an unreadable record count, failed items and
    /// unanswered smoke-test queries.
    pub fn warnings(&self) -> Vec<String> {
        let count = self.provision.count_error.iter().map(|reason| {
            let consequence = if self.provision.skipped {
                "provisioning skipped"
            } else {
                "assumed 0"
            };
            format!("initial record count unreadable ({}): {}", consequence, reason)
        });
        let items = self.provision.failed().map(|o| {
            format!(
                "event {} ({}) failed: {}",
                o.index,
                o.spec.title,
                o.error_message.as_deref().unwrap_or("unknown error")
            )
        });
        let queries = self
            .verification
            .iter()
            .flat_map(|v| v.errors.iter())
            .map(|e| format!("verification: {}", e));

        let mut warnings: Vec<String> = count.chain(items).chain(queries).collect();
        if !self.provision.skipped && self.provision.records_after.is_none() {
            warnings.push("final record count could not be read".to_string());
        }
        warnings
    }

    /// Write the report as pretty JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Run report saved");
        Ok(())
    }

    fn outcomes_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_header(vec!["#", "Title", "Duration", "Status", "Transaction / Error"]);

        for outcome in &self.provision.outcomes {
            let detail = match outcome.status {
                ProvisionStatus::Succeeded => outcome
                    .transaction_hash
                    .map(|h| h.to_string())
                    .unwrap_or_default(),
                ProvisionStatus::Failed => outcome.error_message.clone().unwrap_or_default(),
            };
            table.add_row(vec![
                outcome.index.to_string(),
                outcome.spec.title.clone(),
                format_duration(outcome.spec.duration_seconds),
                outcome.status.to_string(),
                detail,
            ]);
        }

        table
    }
}

fn format_duration(seconds: u64) -> String {
    const DAY: u64 = 24 * 60 * 60;
    if seconds % DAY == 0 {
        format!("{}d", seconds / DAY)
    } else {
        format!("{}s", seconds)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "SUCCESS" } else { "FAILED" };
        writeln!(f, "Run Status: {}", status)?;
        writeln!(f)?;

        writeln!(f, "=== Contract ({}) ===", self.variant.contract_name())?;
        let action = if self.deployment.deployed { "deployed" } else { "attached" };
        writeln!(f, "  address:         {} ({})", self.deployment.address, action)?;
        if let Some(tx) = self.deployment.transaction_hash {
            writeln!(f, "  deployment tx:   {}", tx)?;
        }
        writeln!(f, "  owner:           {}", self.deployment.owner_address)?;
        writeln!(f, "  ownership check: {}", self.ownership)?;
        writeln!(f)?;

        writeln!(f, "=== Events ({}) ===", self.run_mode)?;
        let after = self
            .provision
            .records_after
            .map_or_else(|| "unknown".to_string(), |n| n.to_string());
        writeln!(f, "  before: {}  after: {}", self.provision.records_before, after)?;
        if self.provision.already_populated() {
            writeln!(f, "  Events already exist, creation skipped")?;
        } else if self.provision.skipped {
            writeln!(f, "  Record count unreadable, creation skipped")?;
        } else {
            if self.provision.count_error.is_some() {
                writeln!(f, "  Record count unreadable, assumed 0")?;
            }
            writeln!(
                f,
                "  created {}/{}",
                self.provision.succeeded_count(),
                self.provision.outcomes.len()
            )?;
            if !self.provision.outcomes.is_empty() {
                writeln!(f, "{}", self.outcomes_table())?;
            }
        }
        writeln!(f)?;

        if let Some(ref verification) = self.verification {
            writeln!(f, "=== Smoke Test ===")?;
            writeln!(f, "{}", verification)?;
            writeln!(f)?;
        }

        let warnings = self.warnings();
        if !warnings.is_empty() {
            writeln!(f, "=== Warnings ===")?;
            for warning in &warnings {
                writeln!(f, "  - {}", warning)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "=== Next Steps ===")?;
        writeln!(f, "  Update CONTRACT_ADDRESS_RAW in index.html:")?;
        write!(
            f,
            "    const CONTRACT_ADDRESS_RAW = \"{}\";",
            self.deployment.address
        )
    }
}
