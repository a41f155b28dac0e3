use super::ui;
use crate::core::{AssetId, InvestmentResult, PriceHistoryProvider, ScheduleParameters, simulate};
use anyhow::{Context, Result};
use comfy_table::Cell;
use tracing::info;

impl InvestmentResult {
    pub fn display_summary(&self, asset: &AssetId, params: &ScheduleParameters) -> String {
        let unit = asset.unit();
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);

        let stats = self.statistics();
        let rows = [
            ("Total invested", format!("${:.2}", self.total_invested)),
            ("Current value", format!("${:.2}", self.current_value)),
            ("Units held", format!("{:.6} {unit}", self.total_units_held)),
            ("Purchases", stats.purchase_count.to_string()),
            (
                "Average price",
                format!("${:.2}", stats.average_purchase_price),
            ),
            ("Best price", format!("${:.2}", stats.best_purchase_price)),
            ("Worst price", format!("${:.2}", stats.worst_purchase_price)),
        ];
        for (label, value) in rows {
            table.add_row(vec![Cell::new(label), ui::number_cell(value)]);
        }
        table.add_row(vec![Cell::new("ROI"), ui::roi_cell(self.roi_percent)]);

        let mut output = format!(
            "{} {} every {} from {} to {}\n\n",
            ui::style_text(asset.label(), ui::StyleType::Title),
            ui::style_text(
                &format!("${:.2}", params.amount_per_purchase),
                ui::StyleType::TotalLabel
            ),
            params.frequency,
            params.start_date,
            params.end_date,
        );
        output.push_str(&table.to_string());

        if self.purchase_count == 0 {
            output.push_str(&format!(
                "\n\n{}",
                ui::style_text("No purchases fell inside the selected range", ui::StyleType::Subtle)
            ));
        }
        output
    }

    pub fn display_transactions(&self, asset: &AssetId) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Date"),
            ui::header_cell("Amount"),
            ui::header_cell("Price"),
            ui::header_cell(&format!("Units ({})", asset.unit())),
        ]);

        for tx in &self.transactions {
            table.add_row(vec![
                Cell::new(tx.day.to_string()),
                ui::number_cell(format!("{:.2}", tx.amount)),
                ui::number_cell(format!("{:.2}", tx.price)),
                ui::number_cell(format!("{:.6}", tx.units_bought)),
            ]);
        }
        table.to_string()
    }
}

pub async fn run(
    provider: &dyn PriceHistoryProvider,
    asset: &AssetId,
    params: &ScheduleParameters,
    show_transactions: bool,
) -> Result<()> {
    info!(asset = %asset, "Running DCA simulation");

    let prices = provider
        .fetch_history(asset)
        .await
        .with_context(|| format!("Failed to load price history for {asset}"))?;
    let result = simulate(&prices, params);

    println!("{}", result.display_summary(asset, params));
    if show_transactions && !result.transactions.is_empty() {
        ui::print_separator();
        println!("{}", result.display_transactions(asset));
    }
    Ok(())
}
