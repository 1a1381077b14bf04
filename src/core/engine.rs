//! The conversion engine: one synchronous entry point over static and
//! currency-derived categories.

use crate::core::catalog::{CURRENCY_CATEGORY, UnitCatalog};
use crate::core::currency::{CurrencyCategoryBuilder, SnapshotSource, SnapshotView};
use crate::core::error::ConversionError;
use crate::core::format::Formatter;
use crate::core::units::Category;
use std::sync::Arc;
use tracing::debug;

pub struct ConversionEngine {
    catalog: Arc<UnitCatalog>,
    rates: Option<Arc<dyn SnapshotSource>>,
    currency: CurrencyCategoryBuilder,
    formatter: Formatter,
}

impl ConversionEngine {
    pub fn new(catalog: Arc<UnitCatalog>) -> Self {
        Self {
            catalog,
            rates: None,
            currency: CurrencyCategoryBuilder::new(),
            formatter: Formatter::default(),
        }
    }

    /// Enables the currency category, backed by `rates`.
    pub fn with_rates(mut self, rates: Arc<dyn SnapshotSource>) -> Self {
        self.rates = Some(rates);
        self
    }

    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    /// Converts `amount` and renders the result for display.
    pub fn convert(
        &self,
        category_id: &str,
        from_unit: &str,
        to_unit: &str,
        amount: &str,
    ) -> Result<String, ConversionError> {
        let value = self.convert_value(category_id, from_unit, to_unit, amount)?;
        Ok(self.formatter.format(value))
    }

    /// Converts `amount` and returns the raw numeric result.
    pub fn convert_value(
        &self,
        category_id: &str,
        from_unit: &str,
        to_unit: &str,
        amount: &str,
    ) -> Result<f64, ConversionError> {
        let amount = parse_amount(amount)?;
        let category = self.category(category_id)?;

        let from = category
            .unit(from_unit)
            .ok_or_else(|| unknown_unit(&category, from_unit))?;
        let to = category
            .unit(to_unit)
            .ok_or_else(|| unknown_unit(&category, to_unit))?;

        if from.id() == to.id() {
            return Ok(amount);
        }

        let result = to.from_base(from.to_base(amount));
        debug!(
            category = category.id(),
            from = from.id(),
            to = to.id(),
            amount,
            result,
            "Converted"
        );
        Ok(result)
    }

    /// Resolves a category by id, building the currency category from the
    /// current rate snapshot when asked for it.
    pub fn category(&self, id: &str) -> Result<Arc<Category>, ConversionError> {
        if id == CURRENCY_CATEGORY {
            return self.currency_category();
        }
        self.catalog.get_category(id)
    }

    /// All static categories, followed by currency once rates are known.
    pub fn list_categories(&self) -> Vec<Arc<Category>> {
        let mut categories = self.catalog.list_categories().to_vec();
        if let Ok(currency) = self.currency_category() {
            categories.push(currency);
        }
        categories
    }

    /// Advisory rate status, if currency is enabled.
    pub fn rate_status(&self) -> Option<SnapshotView> {
        self.rates.as_ref().map(|rates| rates.snapshot())
    }

    fn currency_category(&self) -> Result<Arc<Category>, ConversionError> {
        let rates = self
            .rates
            .as_ref()
            .ok_or(ConversionError::RatesUnavailable)?;
        let snapshot = rates
            .snapshot()
            .snapshot
            .ok_or(ConversionError::RatesUnavailable)?;
        Ok(self.currency.category_for(&snapshot))
    }
}

fn parse_amount(text: &str) -> Result<f64, ConversionError> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ConversionError::InvalidAmount(text.to_string()))
}

fn unknown_unit(category: &Category, unit: &str) -> ConversionError {
    ConversionError::UnknownUnit {
        category: category.id().to_string(),
        unit: unit.to_string(),
    }
}
