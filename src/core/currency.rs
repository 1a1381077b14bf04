//! Currency abstractions: rate snapshots, their sources, and the adapter
//! that turns a snapshot into an ordinary linear category.

use crate::core::catalog::CURRENCY_CATEGORY;
use crate::core::error::RateFetchError;
use crate::core::units::{Category, Unit};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// An immutable set of exchange rates relative to a pivot currency.
///
/// `rates[code]` is the number of `code` units per one pivot unit. Every
/// rate is finite and strictly positive, and the pivot is always present
/// with rate 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateSnapshot {
    pivot: String,
    rates: BTreeMap<String, f64>,
    fetched_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    provenance: String,
}

impl ExchangeRateSnapshot {
    /// Builds a snapshot from raw rates. Codes are upper-cased, unusable
    /// rates (non-finite or non-positive) are dropped, and the pivot is
    /// pinned to 1.
    pub fn new(
        pivot: &str,
        raw_rates: impl IntoIterator<Item = (String, f64)>,
        fetched_at: DateTime<Utc>,
        provenance: &str,
    ) -> Result<Self> {
        let pivot = pivot.trim().to_uppercase();
        if pivot.is_empty() {
            return Err(anyhow!("Rate snapshot has no pivot currency"));
        }

        let mut rates = BTreeMap::new();
        for (code, rate) in raw_rates {
            let code = code.trim().to_uppercase();
            if code.is_empty() {
                continue;
            }
            if !rate.is_finite() || rate <= 0.0 {
                warn!(%code, rate, "Dropping unusable exchange rate");
                continue;
            }
            rates.insert(code, rate);
        }

        if rates.keys().all(|code| *code == pivot) {
            return Err(anyhow!("Rate snapshot for {pivot} has no usable rates"));
        }
        if let Some(rate) = rates.insert(pivot.clone(), 1.0) {
            if rate != 1.0 {
                warn!(%pivot, rate, "Pivot currency rate was not 1, pinning it");
            }
        }

        Ok(Self {
            pivot,
            rates,
            fetched_at,
            published_at: None,
            provenance: provenance.to_string(),
        })
    }

    pub fn with_published_at(mut self, published_at: Option<DateTime<Utc>>) -> Self {
        self.published_at = published_at;
        self
    }

    /// Re-checks the invariants, e.g. after deserializing from storage.
    pub fn validate(&self) -> Result<()> {
        if self.rates.get(&self.pivot) != Some(&1.0) {
            return Err(anyhow!("Pivot {} is missing from the rates", self.pivot));
        }
        if let Some((code, rate)) = self
            .rates
            .iter()
            .find(|(_, rate)| !rate.is_finite() || **rate <= 0.0)
        {
            return Err(anyhow!("Invalid rate {rate} for {code}"));
        }
        Ok(())
    }

    pub fn pivot(&self) -> &str {
        &self.pivot
    }

    pub fn rates(&self) -> &BTreeMap<String, f64> {
        &self.rates
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Timestamp reported by the remote source, if any.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    pub fn provenance(&self) -> &str {
        &self.provenance
    }
}

/// A remote origin of exchange rate snapshots.
#[async_trait]
pub trait RateSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_snapshot(&self) -> Result<ExchangeRateSnapshot>;
}

/// Coarse state of a rate cache as seen by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateState {
    Uninitialized,
    Loading,
    Fresh,
    Stale,
    Error,
}

/// What a caller sees when asking for rates: the best snapshot available
/// right now plus advisory flags.
#[derive(Debug, Clone, Default)]
pub struct SnapshotView {
    pub snapshot: Option<Arc<ExchangeRateSnapshot>>,
    pub is_loading: bool,
    pub is_stale: bool,
    pub error: Option<RateFetchError>,
}

impl SnapshotView {
    pub fn state(&self) -> RateState {
        if self.is_loading {
            RateState::Loading
        } else if self.error.is_some() {
            RateState::Error
        } else {
            match &self.snapshot {
                None => RateState::Uninitialized,
                Some(_) if self.is_stale => RateState::Stale,
                Some(_) => RateState::Fresh,
            }
        }
    }
}

/// Non-blocking access to the current rate snapshot.
pub trait SnapshotSource: Send + Sync {
    fn snapshot(&self) -> SnapshotView;
}

/// Display names and symbols for common currencies. Codes not listed use
/// the code itself.
const CURRENCY_NAMES: &[(&str, &str, &str)] = &[
    ("AUD", "Australian Dollar", "A$"),
    ("BRL", "Brazilian Real", "R$"),
    ("CAD", "Canadian Dollar", "C$"),
    ("CHF", "Swiss Franc", "CHF"),
    ("CNY", "Chinese Yuan", "¥"),
    ("EUR", "Euro", "€"),
    ("GBP", "British Pound", "£"),
    ("HKD", "Hong Kong Dollar", "HK$"),
    ("INR", "Indian Rupee", "₹"),
    ("JPY", "Japanese Yen", "¥"),
    ("KRW", "South Korean Won", "₩"),
    ("MXN", "Mexican Peso", "MX$"),
    ("NZD", "New Zealand Dollar", "NZ$"),
    ("SEK", "Swedish Krona", "kr"),
    ("SGD", "Singapore Dollar", "S$"),
    ("USD", "US Dollar", "$"),
    ("ZAR", "South African Rand", "R"),
];

fn currency_display(code: &str) -> (&str, &str) {
    CURRENCY_NAMES
        .iter()
        .find(|(known, _, _)| *known == code)
        .map_or((code, code), |(_, name, symbol)| (*name, *symbol))
}

/// Adapts rate snapshots into the currency category.
///
/// Each currency becomes a linear unit with `ratio = 1 / rate`, so values
/// pivot through the snapshot's base currency. The last built category is
/// memoized on snapshot identity.
#[derive(Default)]
pub struct CurrencyCategoryBuilder {
    memo: Mutex<Option<(Arc<ExchangeRateSnapshot>, Arc<Category>)>>,
}

impl CurrencyCategoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(snapshot: &ExchangeRateSnapshot) -> Category {
        // pivot first, so it stays the base unit even when another
        // currency is pegged at exactly 1
        let pivot = snapshot.pivot();
        let (mut units, others): (Vec<Unit>, Vec<Unit>) = snapshot
            .rates()
            .iter()
            .map(|(code, rate)| {
                let (name, symbol) = currency_display(code);
                Unit::linear(code, name, symbol, 1.0 / rate)
            })
            .partition(|unit| unit.id() == pivot);
        units.extend(others);
        // rates are keyed by code and always contain the pivot
        Category::from_parts(CURRENCY_CATEGORY, "Currency", units)
    }

    pub fn category_for(&self, snapshot: &Arc<ExchangeRateSnapshot>) -> Arc<Category> {
        let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached, category)) = memo.as_ref() {
            if Arc::ptr_eq(cached, snapshot) {
                return Arc::clone(category);
            }
        }
        debug!(
            pivot = snapshot.pivot(),
            currencies = snapshot.rates().len(),
            "Building currency category"
        );
        let category = Arc::new(Self::build(snapshot));
        *memo = Some((Arc::clone(snapshot), Arc::clone(&category)));
        category
    }
}
