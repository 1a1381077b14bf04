//! Typed errors surfaced by the conversion core.

use std::time::Duration;
use thiserror::Error;

/// Errors returned from a conversion request.
///
/// These are ordinary results, never panics: callers render a placeholder
/// and show the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The amount could not be parsed, or parsed to a non-finite value.
    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// The unit is not part of the category. For currency this includes
    /// codes missing from the current rate snapshot.
    #[error("Unknown unit '{unit}' in category '{category}'")]
    UnknownUnit { category: String, unit: String },

    /// Currency was requested but no rate snapshot was ever obtained.
    #[error("Currency rates are not available yet")]
    RatesUnavailable,
}

/// Advisory error for a failed rate refresh. Any previously fetched
/// snapshot is still served alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateFetchError {
    #[error("Rate refresh timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rate refresh failed: {0}")]
    Failed(String),
}

/// Violations of the catalog invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Category '{0}' has no units")]
    EmptyCategory(String),

    #[error("Duplicate unit '{unit}' in category '{category}'")]
    DuplicateUnit { category: String, unit: String },

    #[error("Duplicate category: {0}")]
    DuplicateCategory(String),

    /// A linear category must have exactly one unit with ratio 1.
    #[error("Category '{category}' has {found} base units, expected exactly one")]
    MissingBaseUnit { category: String, found: usize },
}
