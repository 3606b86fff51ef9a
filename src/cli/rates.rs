use super::ui;
use crate::core::{RateCache, RateSnapshot, format_for_display, get_exchange_rate};
use anyhow::{Context, Result};
use comfy_table::Cell;

impl RateSnapshot {
    /// Renders every known currency's rate against `base`.
    pub fn display_as_table(&self, base: &str) -> Result<String> {
        // Fail early on an unknown base rather than on every row
        get_exchange_rate(&self.rates, base, base)
            .with_context(|| format!("Cannot list rates against {base}"))?;

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell(&format!("Per 1 {base}")),
        ]);

        for code in self.rates.currencies() {
            let rate = get_exchange_rate(&self.rates, base, &code)?;
            table.add_row(vec![
                Cell::new(&code),
                ui::number_cell(format_for_display(rate)),
            ]);
        }

        let mut output = format!(
            "Exchange rates: {}\n\n",
            ui::style_text(base, ui::StyleType::Title)
        );
        output.push_str(&table.to_string());
        output.push_str(&format!(
            "\n\n{}\n{}",
            ui::style_text(
                &format!("Updated {}", self.updated_label()),
                ui::StyleType::Subtle
            ),
            ui::attribution()
        ));

        Ok(output)
    }
}

pub async fn run(cache: &RateCache, base: &str) -> Result<()> {
    let pb = ui::new_spinner("Loading exchange rates...");
    let snapshot = cache.current_rates().await;
    pb.finish_and_clear();

    let snapshot = snapshot.context("Failed to load exchange rates")?;
    println!("{}", snapshot.display_as_table(base)?);
    Ok(())
}
