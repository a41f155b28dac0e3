use super::ui;
use crate::providers::yahoo_finance::{SymbolSuggestion, YahooRelaySource};
use anyhow::{Result, bail};
use comfy_table::Cell;

pub fn display_suggestions(suggestions: &[SymbolSuggestion]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Exchange"),
        ui::header_cell("Name"),
    ]);
    for s in suggestions {
        table.add_row(vec![
            Cell::new(&s.symbol),
            Cell::new(&s.exchange),
            Cell::new(&s.longname),
        ]);
    }
    table.to_string()
}

pub async fn run(source: &YahooRelaySource, query: &str) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        bail!("Search query must not be empty");
    }

    let suggestions = source.search(query).await?;
    if suggestions.is_empty() {
        println!(
            "{}",
            ui::style_text(&format!("No symbols match '{query}'"), ui::StyleType::Subtle)
        );
        return Ok(());
    }

    println!("{}", display_suggestions(&suggestions));
    Ok(())
}
