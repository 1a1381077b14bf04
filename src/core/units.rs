//! Categories, units and the conversion model shared by static and
//! currency-derived units.

use crate::core::error::CatalogError;
use std::collections::HashSet;

/// How a unit maps to and from its category's base unit.
#[derive(Debug, Clone, Copy)]
pub enum ConversionModel {
    /// `to_base(v) = v * ratio`, `from_base(v) = v / ratio`.
    Linear { ratio: f64 },
    /// Offset-and-scale rule, e.g. temperature scales.
    Affine {
        to_base: fn(f64) -> f64,
        from_base: fn(f64) -> f64,
    },
}

impl ConversionModel {
    pub fn to_base(&self, value: f64) -> f64 {
        match self {
            ConversionModel::Linear { ratio } => value * ratio,
            ConversionModel::Affine { to_base, .. } => to_base(value),
        }
    }

    pub fn from_base(&self, value: f64) -> f64 {
        match self {
            ConversionModel::Linear { ratio } => value / ratio,
            ConversionModel::Affine { from_base, .. } => from_base(value),
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, ConversionModel::Linear { .. })
    }

    /// Ratio to the base unit, if the model is linear.
    pub fn ratio(&self) -> Option<f64> {
        match self {
            ConversionModel::Linear { ratio } => Some(*ratio),
            ConversionModel::Affine { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Unit {
    id: String,
    name: String,
    symbol: String,
    model: ConversionModel,
}

impl Unit {
    pub fn linear(id: &str, name: &str, symbol: &str, ratio: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            model: ConversionModel::Linear { ratio },
        }
    }

    pub fn affine(
        id: &str,
        name: &str,
        symbol: &str,
        to_base: fn(f64) -> f64,
        from_base: fn(f64) -> f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            model: ConversionModel::Affine { to_base, from_base },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn model(&self) -> &ConversionModel {
        &self.model
    }

    pub fn to_base(&self, value: f64) -> f64 {
        self.model.to_base(value)
    }

    pub fn from_base(&self, value: f64) -> f64 {
        self.model.from_base(value)
    }
}

/// A conversion domain with an ordered set of mutually convertible units.
#[derive(Debug, Clone)]
pub struct Category {
    id: String,
    name: String,
    units: Vec<Unit>,
}

impl Category {
    /// Creates a category, checking that it has units and that unit ids
    /// are unique.
    pub fn new(id: &str, name: &str, units: Vec<Unit>) -> Result<Self, CatalogError> {
        if units.is_empty() {
            return Err(CatalogError::EmptyCategory(id.to_string()));
        }
        let mut seen = HashSet::new();
        for unit in &units {
            if !seen.insert(unit.id()) {
                return Err(CatalogError::DuplicateUnit {
                    category: id.to_string(),
                    unit: unit.id().to_string(),
                });
            }
        }
        Ok(Self::from_parts(id, name, units))
    }

    /// Builds a category whose units the caller already guarantees to be
    /// non-empty and unique.
    pub(crate) fn from_parts(id: &str, name: &str, units: Vec<Unit>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            units,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id() == id)
    }

    /// The first linear unit with ratio 1. Categories with affine units list
    /// their base unit first, so the first affine unit is used there.
    pub fn base_unit(&self) -> Option<&Unit> {
        self.units
            .iter()
            .find(|u| u.model().ratio() == Some(1.0))
            .or_else(|| self.units.iter().find(|u| !u.model().is_linear()))
    }

    /// Every ordered `(from, to)` pair of distinct units.
    pub fn unit_pairs(&self) -> impl Iterator<Item = (&Unit, &Unit)> + '_ {
        self.units.iter().flat_map(move |from| {
            self.units
                .iter()
                .filter(move |to| to.id() != from.id())
                .map(move |to| (from, to))
        })
    }

    /// Checks that an all-linear category has exactly one unit with ratio 1.
    pub fn validate_base(&self) -> Result<(), CatalogError> {
        if !self.units.iter().all(|u| u.model().is_linear()) {
            return Ok(());
        }
        let found = self
            .units
            .iter()
            .filter(|u| u.model().ratio() == Some(1.0))
            .count();
        if found != 1 {
            return Err(CatalogError::MissingBaseUnit {
                category: self.id.clone(),
                found,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn length() -> Category {
        Category::new(
            "length",
            "Length",
            vec![
                Unit::linear("meter", "Meter", "m", 1.0),
                Unit::linear("kilometer", "Kilometer", "km", 1000.0),
                Unit::linear("foot", "Foot", "ft", 0.3048),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_linear_model() {
        let model = ConversionModel::Linear { ratio: 1000.0 };
        assert_eq!(model.to_base(2.5), 2500.0);
        assert_eq!(model.from_base(2500.0), 2.5);
        assert_eq!(model.ratio(), Some(1000.0));
    }

    #[test]
    fn test_affine_model() {
        let unit = Unit::affine("kelvin", "Kelvin", "K", |v| v - 273.15, |v| v + 273.15);
        assert!(!unit.model().is_linear());
        assert_eq!(unit.to_base(273.15), 0.0);
        assert_eq!(unit.from_base(0.0), 273.15);
    }

    #[test]
    fn test_category_rejects_empty_and_duplicates() {
        assert_eq!(
            Category::new("empty", "Empty", vec![]).unwrap_err(),
            CatalogError::EmptyCategory("empty".to_string())
        );

        let err = Category::new(
            "length",
            "Length",
            vec![
                Unit::linear("meter", "Meter", "m", 1.0),
                Unit::linear("meter", "Metre", "m", 1.0),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            CatalogError::DuplicateUnit {
                category: "length".to_string(),
                unit: "meter".to_string()
            }
        );
    }

    #[test]
    fn test_lookup_and_base_unit() {
        let category = length();
        assert_eq!(category.unit("foot").unwrap().symbol(), "ft");
        assert!(category.unit("bogus").is_none());
        assert_eq!(category.base_unit().unwrap().id(), "meter");
        assert!(category.validate_base().is_ok());
    }

    #[test]
    fn test_validate_base_counts_ratio_one_units() {
        let category = Category::new(
            "broken",
            "Broken",
            vec![
                Unit::linear("a", "A", "a", 2.0),
                Unit::linear("b", "B", "b", 3.0),
            ],
        )
        .unwrap();
        assert_eq!(
            category.validate_base().unwrap_err(),
            CatalogError::MissingBaseUnit {
                category: "broken".to_string(),
                found: 0
            }
        );
    }

    #[test]
    fn test_unit_pairs_skip_identity() {
        let category = length();
        let pairs: Vec<_> = category
            .unit_pairs()
            .map(|(a, b)| (a.id().to_string(), b.id().to_string()))
            .collect();
        assert_eq!(pairs.len(), 6);
        assert!(pairs.iter().all(|(a, b)| a != b));
        assert!(pairs.contains(&("kilometer".to_string(), "foot".to_string())));
    }
}
