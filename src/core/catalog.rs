//! The built-in, immutable registry of conversion categories.
//!
//! Every linear unit is expressed as a ratio to its category's base unit
//! (`to_base(v) = v * ratio`). Imperial values use the exact international
//! definitions (1 yd = 0.9144 m, 1 lb = 0.45359237 kg) and volumes use US
//! customary measures (1 gal = 231 in³).

use crate::core::error::{CatalogError, ConversionError};
use crate::core::units::{Category, Unit};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Identifier reserved for the rate-backed currency category.
pub const CURRENCY_CATEGORY: &str = "currency";

type LinearSpec<'a> = (&'a str, &'a str, &'a str, f64);

#[derive(Debug)]
pub struct UnitCatalog {
    categories: Vec<Arc<Category>>,
    index: HashMap<String, usize>,
}

impl UnitCatalog {
    pub fn new(categories: Vec<Category>) -> Result<Self, CatalogError> {
        let mut index = HashMap::new();
        for (position, category) in categories.iter().enumerate() {
            if index.insert(category.id().to_string(), position).is_some() {
                return Err(CatalogError::DuplicateCategory(category.id().to_string()));
            }
        }
        Ok(Self {
            categories: categories.into_iter().map(Arc::new).collect(),
            index,
        })
    }

    /// The compiled-in catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        let catalog = Self::new(vec![
            length()?,
            mass()?,
            temperature()?,
            volume()?,
            area()?,
            speed()?,
            time()?,
            data_storage()?,
            energy()?,
            pressure()?,
        ])?;
        debug!(categories = catalog.categories.len(), "Built unit catalog");
        Ok(catalog)
    }

    pub fn list_categories(&self) -> &[Arc<Category>] {
        &self.categories
    }

    pub fn get_category(&self, id: &str) -> Result<Arc<Category>, ConversionError> {
        self.index
            .get(id)
            .map(|&position| Arc::clone(&self.categories[position]))
            .ok_or_else(|| ConversionError::UnknownCategory(id.to_string()))
    }

    /// Checks every catalog invariant: unique category ids, non-empty
    /// categories, unique unit ids and exactly one base unit per linear
    /// category.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut ids = HashSet::new();
        for category in &self.categories {
            if !ids.insert(category.id()) {
                return Err(CatalogError::DuplicateCategory(category.id().to_string()));
            }
            Category::new(
                category.id(),
                category.name(),
                category.units().to_vec(),
            )?;
            category.validate_base()?;
        }
        Ok(())
    }
}

fn linear_category(id: &str, name: &str, units: &[LinearSpec]) -> Result<Category, CatalogError> {
    let units = units
        .iter()
        .map(|&(unit_id, unit_name, symbol, ratio)| Unit::linear(unit_id, unit_name, symbol, ratio))
        .collect();
    Category::new(id, name, units)
}

fn length() -> Result<Category, CatalogError> {
    linear_category(
        "length",
        "Length",
        &[
            ("nanometer", "Nanometer", "nm", 1e-9),
            ("micrometer", "Micrometer", "µm", 1e-6),
            ("millimeter", "Millimeter", "mm", 1e-3),
            ("centimeter", "Centimeter", "cm", 1e-2),
            ("meter", "Meter", "m", 1.0),
            ("kilometer", "Kilometer", "km", 1e3),
            ("inch", "Inch", "in", 0.0254),
            ("foot", "Foot", "ft", 0.3048),
            ("yard", "Yard", "yd", 0.9144),
            ("mile", "Mile", "mi", 1609.344),
            ("nautical_mile", "Nautical Mile", "nmi", 1852.0),
        ],
    )
}

fn mass() -> Result<Category, CatalogError> {
    linear_category(
        "mass",
        "Mass",
        &[
            ("microgram", "Microgram", "µg", 1e-9),
            ("milligram", "Milligram", "mg", 1e-6),
            ("gram", "Gram", "g", 1e-3),
            ("kilogram", "Kilogram", "kg", 1.0),
            ("metric_ton", "Metric Ton", "t", 1e3),
            ("ounce", "Ounce", "oz", 0.028349523125),
            ("pound", "Pound", "lb", 0.45359237),
            ("stone", "Stone", "st", 6.35029318),
            ("short_ton", "Short Ton", "tn", 907.18474),
        ],
    )
}

fn temperature() -> Result<Category, CatalogError> {
    Category::new(
        "temperature",
        "Temperature",
        vec![
            Unit::affine("celsius", "Celsius", "°C", |v| v, |v| v),
            Unit::affine(
                "fahrenheit",
                "Fahrenheit",
                "°F",
                |v| (v - 32.0) * 5.0 / 9.0,
                |v| v * 9.0 / 5.0 + 32.0,
            ),
            Unit::affine("kelvin", "Kelvin", "K", |v| v - 273.15, |v| v + 273.15),
            Unit::affine(
                "rankine",
                "Rankine",
                "°R",
                |v| (v - 491.67) * 5.0 / 9.0,
                |v| (v + 273.15) * 9.0 / 5.0,
            ),
        ],
    )
}

fn volume() -> Result<Category, CatalogError> {
    linear_category(
        "volume",
        "Volume",
        &[
            ("milliliter", "Milliliter", "mL", 1e-3),
            ("liter", "Liter", "L", 1.0),
            ("cubic_meter", "Cubic Meter", "m³", 1e3),
            ("teaspoon", "Teaspoon", "tsp", 0.00492892159375),
            ("tablespoon", "Tablespoon", "tbsp", 0.01478676478125),
            ("fluid_ounce", "Fluid Ounce", "fl oz", 0.0295735295625),
            ("cup", "Cup", "cup", 0.2365882365),
            ("pint", "Pint", "pt", 0.473176473),
            ("quart", "Quart", "qt", 0.946352946),
            ("gallon", "Gallon", "gal", 3.785411784),
        ],
    )
}

fn area() -> Result<Category, CatalogError> {
    linear_category(
        "area",
        "Area",
        &[
            ("square_millimeter", "Square Millimeter", "mm²", 1e-6),
            ("square_centimeter", "Square Centimeter", "cm²", 1e-4),
            ("square_meter", "Square Meter", "m²", 1.0),
            ("hectare", "Hectare", "ha", 1e4),
            ("square_kilometer", "Square Kilometer", "km²", 1e6),
            ("square_inch", "Square Inch", "in²", 0.00064516),
            ("square_foot", "Square Foot", "ft²", 0.09290304),
            ("square_yard", "Square Yard", "yd²", 0.83612736),
            ("acre", "Acre", "ac", 4046.8564224),
            ("square_mile", "Square Mile", "mi²", 2589988.110336),
        ],
    )
}

fn speed() -> Result<Category, CatalogError> {
    linear_category(
        "speed",
        "Speed",
        &[
            ("meter_per_second", "Meter per Second", "m/s", 1.0),
            ("kilometer_per_hour", "Kilometer per Hour", "km/h", 1000.0 / 3600.0),
            ("mile_per_hour", "Mile per Hour", "mph", 0.44704),
            ("foot_per_second", "Foot per Second", "ft/s", 0.3048),
            ("knot", "Knot", "kn", 1852.0 / 3600.0),
        ],
    )
}

fn time() -> Result<Category, CatalogError> {
    linear_category(
        "time",
        "Time",
        &[
            ("nanosecond", "Nanosecond", "ns", 1e-9),
            ("microsecond", "Microsecond", "µs", 1e-6),
            ("millisecond", "Millisecond", "ms", 1e-3),
            ("second", "Second", "s", 1.0),
            ("minute", "Minute", "min", 60.0),
            ("hour", "Hour", "h", 3600.0),
            ("day", "Day", "d", 86400.0),
            ("week", "Week", "wk", 604800.0),
            // Julian year, 365.25 days
            ("year", "Year", "yr", 31557600.0),
        ],
    )
}

/// Base unit is the byte. SI prefixes are decimal, IEC prefixes binary.
fn data_storage() -> Result<Category, CatalogError> {
    linear_category(
        "data_storage",
        "Data Storage",
        &[
            ("bit", "Bit", "b", 0.125),
            ("byte", "Byte", "B", 1.0),
            ("kilobyte", "Kilobyte", "kB", 1e3),
            ("megabyte", "Megabyte", "MB", 1e6),
            ("gigabyte", "Gigabyte", "GB", 1e9),
            ("terabyte", "Terabyte", "TB", 1e12),
            ("petabyte", "Petabyte", "PB", 1e15),
            ("kibibyte", "Kibibyte", "KiB", 1024.0),
            ("mebibyte", "Mebibyte", "MiB", 1048576.0),
            ("gibibyte", "Gibibyte", "GiB", 1073741824.0),
            ("tebibyte", "Tebibyte", "TiB", 1099511627776.0),
        ],
    )
}

fn energy() -> Result<Category, CatalogError> {
    linear_category(
        "energy",
        "Energy",
        &[
            ("joule", "Joule", "J", 1.0),
            ("kilojoule", "Kilojoule", "kJ", 1e3),
            ("calorie", "Calorie", "cal", 4.184),
            ("kilocalorie", "Kilocalorie", "kcal", 4184.0),
            ("watt_hour", "Watt Hour", "Wh", 3600.0),
            ("kilowatt_hour", "Kilowatt Hour", "kWh", 3.6e6),
            ("btu", "British Thermal Unit", "BTU", 1055.05585262),
            ("electronvolt", "Electronvolt", "eV", 1.602176634e-19),
        ],
    )
}

fn pressure() -> Result<Category, CatalogError> {
    linear_category(
        "pressure",
        "Pressure",
        &[
            ("pascal", "Pascal", "Pa", 1.0),
            ("kilopascal", "Kilopascal", "kPa", 1e3),
            ("bar", "Bar", "bar", 1e5),
            ("psi", "Pound per Square Inch", "psi", 6894.757293168361),
            ("atmosphere", "Atmosphere", "atm", 101325.0),
            ("millimeter_of_mercury", "Millimeter of Mercury", "mmHg", 133.322387415),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = UnitCatalog::builtin().unwrap();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.list_categories().len(), 10);
        assert!(catalog.get_category(CURRENCY_CATEGORY).is_err());
    }

    #[test]
    fn test_get_category() {
        let catalog = UnitCatalog::builtin().unwrap();
        let length = catalog.get_category("length").unwrap();
        assert_eq!(length.name(), "Length");
        assert_eq!(length.base_unit().unwrap().id(), "meter");

        assert_eq!(
            catalog.get_category("bogus").unwrap_err(),
            ConversionError::UnknownCategory("bogus".to_string())
        );
    }

    #[test]
    fn test_base_units() {
        let catalog = UnitCatalog::builtin().unwrap();
        let bases: Vec<_> = catalog
            .list_categories()
            .iter()
            .map(|c| (c.id().to_string(), c.base_unit().unwrap().id().to_string()))
            .collect();
        assert!(bases.contains(&("data_storage".to_string(), "byte".to_string())));
        assert!(bases.contains(&("temperature".to_string(), "celsius".to_string())));
        assert!(bases.contains(&("mass".to_string(), "kilogram".to_string())));
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let err = UnitCatalog::new(vec![length().unwrap(), length().unwrap()]).unwrap_err();
        assert_eq!(err, CatalogError::DuplicateCategory("length".to_string()));
    }

    #[test]
    fn test_validate_detects_missing_base() {
        let broken = linear_category("broken", "Broken", &[("a", "A", "a", 2.0)]).unwrap();
        let catalog = UnitCatalog::new(vec![broken]).unwrap();
        assert!(matches!(
            catalog.validate(),
            Err(CatalogError::MissingBaseUnit { found: 0, .. })
        ));
    }

    #[test]
    fn test_all_ratios_positive_and_finite() {
        let catalog = UnitCatalog::builtin().unwrap();
        for category in catalog.list_categories() {
            for unit in category.units() {
                if let Some(ratio) = unit.model().ratio() {
                    assert!(
                        ratio.is_finite() && ratio > 0.0,
                        "{}/{} has ratio {ratio}",
                        category.id(),
                        unit.id()
                    );
                }
            }
        }
    }
}
