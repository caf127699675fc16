//! Bulk provisioning of catalog events.
//!
//! Items are processed one after another: concurrent submissions from the same
//! signer would race on the account nonce. Each item walks the same state
//! machine, and a failure at any step is recorded on that item only.

use crate::{
    EventSpec, ProvisionOutcome, ProvisionStatus, ProvisionSummary, RunMode,
    contract::{PendingTx, PredictionContract, TxReceipt},
    error::ProvisionItemError,
};

/// Suspension points of a single record creation.
#[derive(Debug)]
enum ItemState {
    Pending,
    Validated,
    Submitted(PendingTx),
    Confirmed(TxReceipt),
}

/// Create every event of `catalog`, unless the idempotency check says otherwise.
///
/// Never fails: item errors end up in the returned outcomes.
pub async fn provision<C: PredictionContract>(
    contract: &C,
    catalog: &[EventSpec],
    mode: RunMode,
) -> ProvisionSummary {
    let (records_before, count_error) = match contract.total_events().await {
        Ok(total) => (total, None),
        Err(e) if mode == RunMode::IdempotentSkip => {
            // Emptiness cannot be proven, so creating could duplicate records.
            let reason = format!("{:#}", e);
            tracing::warn!(error = %reason, "Failed to read record count, skipping provisioning");
            return ProvisionSummary {
                records_before: 0,
                outcomes: Vec::new(),
                records_after: None,
                skipped: true,
                count_error: Some(reason),
            };
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            tracing::warn!(error = %reason, "Failed to read record count, assuming 0");
            (0, Some(reason))
        }
    };

    tracing::info!(records_before, mode = %mode, "Current total events");

    if mode == RunMode::IdempotentSkip && records_before > 0 {
        tracing::info!(records_before, "Events already exist, skipping creation");
        return ProvisionSummary {
            records_before,
            outcomes: Vec::new(),
            records_after: Some(records_before),
            skipped: true,
            count_error: None,
        };
    }

    tracing::info!(count = catalog.len(), "Creating events...");

    let mut outcomes = Vec::with_capacity(catalog.len());
    for (index, spec) in catalog.iter().enumerate() {
        tracing::info!(index, title = %spec.title, "Creating event");

        let outcome = match create_one(contract, spec).await {
            Ok(receipt) => {
                tracing::info!(
                    index,
                    tx_hash = %receipt.transaction_hash,
                    block = ?receipt.block_number,
                    "Event created"
                );
                ProvisionOutcome {
                    index,
                    spec: spec.clone(),
                    status: ProvisionStatus::Succeeded,
                    transaction_hash: Some(receipt.transaction_hash),
                    block_number: receipt.block_number,
                    error_message: None,
                }
            }
            Err(err) => {
                tracing::error!(index, title = %spec.title, error = %err, "Failed to create event");
                ProvisionOutcome {
                    index,
                    spec: spec.clone(),
                    status: ProvisionStatus::Failed,
                    transaction_hash: err.transaction_hash(),
                    block_number: None,
                    error_message: Some(err.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }

    let records_after = match contract.total_events().await {
        Ok(total) => Some(total),
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "Failed to re-read record count");
            None
        }
    };

    tracing::info!(?records_after, "Final total events");

    ProvisionSummary {
        records_before,
        outcomes,
        records_after,
        skipped: false,
        count_error,
    }
}

/// Drive one item through validate -> submit -> confirm.
async fn create_one<C: PredictionContract>(
    contract: &C,
    spec: &EventSpec,
) -> Result<TxReceipt, ProvisionItemError> {
    let mut state = ItemState::Pending;
    loop {
        state = match state {
            ItemState::Pending => {
                spec.validate()?;
                ItemState::Validated
            }
            ItemState::Validated => {
                let tx = contract.create_event(spec).await.map_err(|e| {
                    ProvisionItemError::Submission {
                        reason: format!("{:#}", e),
                    }
                })?;
                tracing::info!(tx_hash = %tx.hash, "Transaction sent");
                ItemState::Submitted(tx)
            }
            ItemState::Submitted(tx) => {
                let receipt = contract.wait_for_receipt(&tx).await.map_err(|e| {
                    ProvisionItemError::Confirmation {
                        tx_hash: tx.hash,
                        reason: format!("{:#}", e),
                    }
                })?;
                if !receipt.success {
                    return Err(ProvisionItemError::Reverted { tx_hash: tx.hash });
                }
                ItemState::Confirmed(receipt)
            }
            ItemState::Confirmed(receipt) => return Ok(receipt),
        };
    }
}
