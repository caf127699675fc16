//! Ownership gate in front of privileged provisioning.

use alloy_core::primitives::Address;

use crate::{OwnershipCheck, OwnershipMode, error::NotOwnerError};

/// Compare the active signer with the registered owner.
///
/// Addresses are compared as 20-byte values, so checksummed and lowercase
/// spellings of the same account match. `OwnershipMode::Public` skips the
/// comparison entirely.
pub fn check_ownership(
    signer: Address,
    owner: Address,
    mode: OwnershipMode,
) -> Result<OwnershipCheck, NotOwnerError> {
    match mode {
        OwnershipMode::Public => {
            tracing::info!(signer = %signer, owner = %owner, "Public contract, ownership check skipped");
            Ok(OwnershipCheck::NotRequired)
        }
        OwnershipMode::Required if signer == owner => {
            tracing::info!(owner = %owner, "Owner verification passed");
            Ok(OwnershipCheck::Verified { owner })
        }
        OwnershipMode::Required => {
            tracing::error!(signer = %signer, owner = %owner, "Signer is not the contract owner");
            Err(NotOwnerError {
                actual: signer,
                expected: owner,
            })
        }
    }
}
