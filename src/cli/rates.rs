use super::ui;
use crate::core::currency::{RateState, SnapshotView};
use crate::providers::caching::{RateProvider, RefreshOutcome};
use anyhow::Result;
use comfy_table::{Cell, Color, Table};
use tracing::debug;

/// Makes sure a one-shot command has usable rates: loads the stored
/// snapshot and fetches a new one when nothing is cached or it is stale.
/// A failed fetch is not an error here; callers see it in the view.
pub async fn ensure_rates(provider: &RateProvider, force: bool) -> SnapshotView {
    provider.warm_start().await;

    let view = provider.peek();
    if force || view.snapshot.is_none() || view.is_stale {
        let pb = ui::new_spinner("Fetching exchange rates...");
        let outcome = provider.refresh_now().await;
        pb.finish_and_clear();
        debug!(outcome = outcome_label(&outcome), "Rate refresh finished");
    }
    provider.peek()
}

fn state_cell(state: RateState) -> Cell {
    let (text, color) = match state {
        RateState::Fresh => ("live", Color::Green),
        RateState::Stale => ("stale", Color::Yellow),
        RateState::Loading => ("loading", Color::Cyan),
        RateState::Error => ("error", Color::Red),
        RateState::Uninitialized => ("unavailable", Color::DarkGrey),
    };
    Cell::new(text).fg(color)
}

/// Renders the snapshot status as a two-column table.
pub fn status_table(view: &SnapshotView) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Rates"), ui::header_cell("")]);

    table.add_row(vec![Cell::new("Status"), state_cell(view.state())]);
    if let Some(snapshot) = &view.snapshot {
        table.add_row(vec![Cell::new("Pivot"), Cell::new(snapshot.pivot())]);
        table.add_row(vec![
            Cell::new("Currencies"),
            Cell::new(snapshot.rates().len().to_string()),
        ]);
        table.add_row(vec![
            Cell::new("Fetched"),
            Cell::new(snapshot.fetched_at().format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        ]);
        table.add_row(vec![
            Cell::new("Published"),
            ui::format_optional_cell(snapshot.published_at(), |t| {
                t.format("%Y-%m-%d %H:%M:%S UTC").to_string()
            }),
        ]);
        table.add_row(vec![Cell::new("Source"), Cell::new(snapshot.provenance())]);
    }
    if let Some(error) = &view.error {
        table.add_row(vec![Cell::new("Error"), Cell::new(error.to_string()).fg(Color::Red)]);
    }
    table
}

/// Advisory line shown next to a currency result when rates are not live.
pub fn rate_notice(view: &SnapshotView) -> Option<String> {
    let snapshot = view.snapshot.as_ref()?;
    let fetched = snapshot.fetched_at().format("%Y-%m-%d %H:%M UTC");
    if let Some(error) = &view.error {
        return Some(ui::style_text(
            &format!("Using rates from {fetched}: {error}"),
            ui::StyleType::Warning,
        ));
    }
    if view.is_stale {
        return Some(ui::style_text(
            &format!("Rates from {fetched} may be out of date"),
            ui::StyleType::Warning,
        ));
    }
    None
}

pub async fn run(provider: &RateProvider) -> Result<()> {
    let view = ensure_rates(provider, true).await;
    println!("{}", status_table(&view));

    if let Some(snapshot) = &view.snapshot {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell(&format!("Per 1 {}", snapshot.pivot())),
        ]);
        for (code, rate) in snapshot.rates() {
            table.add_row(vec![Cell::new(code), ui::number_cell(&rate.to_string())]);
        }
        println!("\n{table}");
    }

    match (&view.snapshot, &view.error) {
        (None, Some(error)) => Err(anyhow::anyhow!("No exchange rates available: {error}")),
        _ => Ok(()),
    }
}

/// Short label for a refresh outcome.
pub fn outcome_label(outcome: &RefreshOutcome) -> &'static str {
    match outcome {
        RefreshOutcome::Applied(_) => "applied",
        RefreshOutcome::Superseded => "superseded",
        RefreshOutcome::Failed(_) => "failed",
    }
}
