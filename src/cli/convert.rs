use super::{rates, ui};
use crate::core::catalog::CURRENCY_CATEGORY;
use crate::core::engine::ConversionEngine;
use crate::core::error::ConversionError;
use crate::core::units::Unit;
use anyhow::Result;

/// Placeholder printed in place of a result when the conversion fails.
pub const PLACEHOLDER: &str = "—";

/// Renders `amount from = result to` using unit symbols.
pub fn render_conversion(amount: &str, from: &Unit, result: &str, to: &Unit) -> String {
    format!(
        "{} {} = {} {}",
        amount.trim(),
        from.symbol(),
        ui::style_text(result, ui::StyleType::Result),
        to.symbol()
    )
}

/// Converts and renders the result line, e.g. `1 km = 0.621371 mi`.
pub fn conversion_line(
    engine: &ConversionEngine,
    category_id: &str,
    from_unit: &str,
    to_unit: &str,
    amount: &str,
) -> Result<String, ConversionError> {
    let result = engine.convert(category_id, from_unit, to_unit, amount)?;
    let category = engine.category(category_id)?;

    // units were resolved by the conversion above
    match (category.unit(from_unit), category.unit(to_unit)) {
        (Some(from), Some(to)) => Ok(render_conversion(amount, from, &result, to)),
        _ => Ok(result),
    }
}

/// Stale or error notice to print under a currency result.
pub fn currency_notice(engine: &ConversionEngine, category_id: &str) -> Option<String> {
    if category_id != CURRENCY_CATEGORY {
        return None;
    }
    engine.rate_status().as_ref().and_then(rates::rate_notice)
}

pub fn run(
    engine: &ConversionEngine,
    category_id: &str,
    from_unit: &str,
    to_unit: &str,
    amount: &str,
) -> Result<()> {
    match conversion_line(engine, category_id, from_unit, to_unit, amount) {
        Ok(line) => println!("{line}"),
        Err(e) => {
            println!("{}", ui::style_text(PLACEHOLDER, ui::StyleType::Subtle));
            eprintln!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
            return Err(e.into());
        }
    }

    if let Some(notice) = currency_notice(engine, category_id) {
        println!("{notice}");
    }
    Ok(())
}
