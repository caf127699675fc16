//! Event catalogs seeded into freshly deployed contracts.

use std::path::Path;

use anyhow::Context;
use derive_more::Deref;
use serde::{Deserialize, Serialize};

use crate::{EventSpec, error::PreconditionError};

const DAY: u64 = 24 * 60 * 60;

/// An ordered, validated list of events.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deref, Serialize)]
pub struct Catalog(Vec<EventSpec>);

/// On-disk catalog layout.
///
/// ```toml
/// [[events]]
/// title = "🏆 2026 FIFA World Cup Winner Prediction"
/// description = "Predict which team will win the 2026 FIFA World Cup!"
/// duration_seconds = 7776000
/// ```
#[derive(Debug, Deserialize)]
struct CatalogFile {
    events: Vec<EventSpec>,
}

impl Catalog {
    /// Build a catalog, rejecting it as a whole if any entry is invalid.
    pub fn new(events: Vec<EventSpec>) -> Result<Self, PreconditionError> {
        for (index, spec) in events.iter().enumerate() {
            spec.validate()
                .map_err(|source| PreconditionError::InvalidCatalog { index, source })?;
        }
        Ok(Self(events))
    }

    /// Load a catalog from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, PreconditionError> {
        let config_error = |e: anyhow::Error| PreconditionError::Config {
            reason: format!("{:#}", e),
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog from {}", path.display()))
            .map_err(config_error)?;
        let file: CatalogFile = toml::from_str(&content)
            .context("Failed to parse catalog file as TOML")
            .map_err(config_error)?;

        let catalog = Self::new(file.events)?;
        tracing::info!(path = %path.display(), events = catalog.len(), "Catalog loaded");
        Ok(catalog)
    }

    pub fn into_inner(self) -> Vec<EventSpec> {
        self.0
    }

    /// The three showcase events seeded into the owner-managed platform.
    pub fn standard() -> Self {
        Self(vec![
            spec(
                "🏆 2026 FIFA World Cup Winner Prediction",
                "Predict which team will win the 2026 FIFA World Cup! Your prediction will be encrypted and protected until the tournament ends.",
                90 * DAY,
            ),
            spec(
                "💎 Bitcoin $100K Breakthrough Prediction",
                "Will Bitcoin break through $100,000 by the end of 2024? Use FHE encryption technology to protect your prediction.",
                60 * DAY,
            ),
            spec(
                "🎮 Gaming Championship Prediction",
                "Predict the outcome of major esports and gaming championships. Your predictions are secured with homomorphic encryption.",
                30 * DAY,
            ),
        ])
    }

    /// Showcase events for the hash-based (non-FHE) platform.
    pub fn simple() -> Self {
        Self(vec![
            spec(
                "🏆 2026 FIFA World Cup Winner Prediction",
                "Predict which team will win the 2026 FIFA World Cup! Your prediction will be protected until the tournament ends.",
                90 * DAY,
            ),
            spec(
                "💎 Bitcoin $100K Breakthrough Prediction",
                "Will Bitcoin break through $100,000 by the end of 2024? Make your confidential prediction now!",
                60 * DAY,
            ),
            spec(
                "🎮 Gaming Championship Prediction",
                "Predict the outcome of major esports and gaming championships. Your predictions are secured with cryptographic hashing.",
                30 * DAY,
            ),
        ])
    }

    /// A single event proving that anyone can create records.
    pub fn public_probe() -> Self {
        Self(vec![spec(
            "🎯 Test Event - Bitcoin $100K Prediction",
            "Test event to verify anyone can create predictions",
            7 * DAY,
        )])
    }

    /// A single event exercising the encrypted prediction flow.
    pub fn fhe_probe() -> Self {
        Self(vec![spec(
            "🧪 FHE Test Event - Bitcoin $100K Prediction",
            "Test event for FHE encrypted predictions using enhanced privacy mechanisms",
            7 * DAY,
        )])
    }
}

fn spec(title: &str, description: &str, duration_seconds: u64) -> EventSpec {
    EventSpec {
        title: title.to_string(),
        description: description.to_string(),
        duration_seconds,
    }
}
