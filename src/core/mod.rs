//! Core conversion logic, free of network and terminal concerns

pub mod cache;
pub mod catalog;
pub mod config;
pub mod currency;
pub mod engine;
pub mod error;
pub mod format;
pub mod log;
pub mod units;

// Re-export main types for cleaner imports
pub use catalog::{CURRENCY_CATEGORY, UnitCatalog};
pub use currency::{ExchangeRateSnapshot, RateSource, RateState, SnapshotSource, SnapshotView};
pub use engine::ConversionEngine;
pub use error::{CatalogError, ConversionError, RateFetchError};
pub use format::Formatter;
pub use units::{Category, ConversionModel, Unit};
