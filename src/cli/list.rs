use super::ui;
use crate::core::engine::ConversionEngine;
use crate::core::units::{Category, ConversionModel};
use anyhow::Result;
use comfy_table::{Cell, Table};
use std::sync::Arc;

/// Table of all categories with their base unit and unit count.
pub fn categories_table(categories: &[Arc<Category>]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Category"),
        ui::header_cell("Name"),
        ui::header_cell("Base Unit"),
        ui::header_cell("Units"),
    ]);

    for category in categories {
        table.add_row(vec![
            Cell::new(category.id()),
            Cell::new(category.name()),
            ui::format_optional_cell(category.base_unit(), |u| u.id().to_string()),
            ui::number_cell(&category.units().len().to_string()),
        ]);
    }
    table
}

fn model_text(model: &ConversionModel) -> String {
    match model {
        ConversionModel::Linear { ratio } => format!("× {ratio}"),
        ConversionModel::Affine { .. } => "affine".to_string(),
    }
}

/// Table of the units in one category.
pub fn units_table(category: &Category) -> Table {
    let base = category.base_unit().map(|u| u.symbol()).unwrap_or_default();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Unit"),
        ui::header_cell("Name"),
        ui::header_cell("Symbol"),
        ui::header_cell(&format!("To Base ({base})")),
    ]);

    for unit in category.units() {
        table.add_row(vec![
            Cell::new(unit.id()),
            Cell::new(unit.name()),
            Cell::new(unit.symbol()),
            ui::number_cell(&model_text(unit.model())),
        ]);
    }
    table
}

/// Every `category/from/to` conversion path, one per line.
pub fn matrix_lines(category: &Category) -> Vec<String> {
    category
        .unit_pairs()
        .map(|(from, to)| format!("{}/{}/{}", category.id(), from.id(), to.id()))
        .collect()
}

pub fn run(engine: &ConversionEngine, category_id: Option<&str>) -> Result<()> {
    match category_id {
        None => {
            println!(
                "{}\n",
                ui::style_text("Conversion categories", ui::StyleType::Title)
            );
            println!("{}", categories_table(&engine.list_categories()));
        }
        Some(id) => {
            let category = engine.category(id)?;
            println!(
                "{}\n",
                ui::style_text(category.name(), ui::StyleType::Title)
            );
            println!("{}", units_table(&category));
        }
    }
    Ok(())
}

pub fn run_matrix(engine: &ConversionEngine, category_id: &str) -> Result<()> {
    let category = engine.category(category_id)?;
    for line in matrix_lines(&category) {
        println!("{line}");
    }
    Ok(())
}
