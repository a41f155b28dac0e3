use super::ui;
use crate::core::{AssetId, Comparison, ComparisonResults, InvestmentResult};
use anyhow::Result;
use comfy_table::{Cell, Color};
use tracing::info;

/// Renders one row per asset, in the order given; assets without a result show N/A.
pub fn display_comparison(assets: &[AssetId], results: &ComparisonResults) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Asset"),
        ui::header_cell("Invested"),
        ui::header_cell("Value"),
        ui::header_cell("Units"),
        ui::header_cell("ROI"),
        ui::header_cell("Purchases"),
        ui::header_cell("Avg Price"),
    ]);

    for asset in assets {
        let result: Option<&InvestmentResult> = results.get(asset).and_then(Option::as_ref);
        let name = match result {
            Some(_) => Cell::new(asset.label()),
            None => Cell::new(asset.label()).fg(Color::Red),
        };
        let roi = result.map_or_else(
            || ui::format_optional_cell(None::<f64>, |_| String::new()),
            |r| ui::roi_cell(r.roi_percent),
        );

        table.add_row(vec![
            name,
            ui::format_optional_cell(result, |r| format!("${:.2}", r.total_invested)),
            ui::format_optional_cell(result, |r| format!("${:.2}", r.current_value)),
            ui::format_optional_cell(result, |r| {
                format!("{:.6} {}", r.total_units_held, asset.unit())
            }),
            roi,
            ui::format_optional_cell(result, |r| r.purchase_count.to_string()),
            ui::format_optional_cell(result, |r| format!("${:.2}", r.average_purchase_price)),
        ]);
    }

    table.to_string()
}

pub async fn run(comparison: &Comparison) -> Result<()> {
    let assets = comparison.assets();
    let params = comparison.params();
    info!(count = assets.len(), "Comparing assets");

    let pb = ui::new_progress_bar(assets.len() as u64, true);
    pb.set_message("Fetching price histories");
    let results = comparison.recompute_with_progress(&|| pb.inc(1)).await;
    pb.finish_and_clear();

    println!(
        "{} every {} from {} to {}\n",
        ui::style_text(
            &format!("${:.2}", params.amount_per_purchase),
            ui::StyleType::Title
        ),
        params.frequency,
        params.start_date,
        params.end_date,
    );
    println!("{}", display_comparison(&assets, &results));

    let failed = assets
        .iter()
        .filter(|a| matches!(results.get(*a), Some(None) | None))
        .count();
    if failed > 0 {
        println!(
            "\n{}",
            ui::style_text(
                &format!("{failed} asset(s) could not be simulated"),
                ui::StyleType::Error
            )
        );
    }
    Ok(())
}
