use super::ui;
use crate::core::{
    CurrencyPair, RateCache, RateSnapshot, convert, convert_reverse, format_for_display,
    get_exchange_rate,
};
use crate::store::PairPreferences;
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub amount: f64,
    pub pair: CurrencyPair,
    /// Treat `amount` as the target-side value and solve for the source amount.
    pub reverse: bool,
}

/// Renders the pair rate and the converted amount for `snapshot`.
pub fn render_conversion(snapshot: &RateSnapshot, request: &ConvertRequest) -> Result<String> {
    let CurrencyPair { from, to } = &request.pair;
    let rate = get_exchange_rate(&snapshot.rates, from, to)
        .with_context(|| format!("Cannot convert {from} to {to}"))?;

    let (source, target) = if request.reverse {
        (
            format_for_display(convert_reverse(request.amount, rate)),
            request.amount.to_string(),
        )
    } else {
        (
            request.amount.to_string(),
            format_for_display(convert(request.amount, rate)),
        )
    };

    let mut output = format!(
        "1 {from} equals\n{}\n",
        ui::style_text(
            &format!("{} {to}", format_for_display(rate)),
            ui::StyleType::Title
        )
    );
    output.push_str(&ui::style_text(
        &format!("Updated {}", snapshot.updated_label()),
        ui::StyleType::Subtle,
    ));
    output.push('\n');
    output.push_str(&ui::attribution());
    output.push_str(&format!(
        "\n\n{} = {}",
        ui::style_text(&format!("{source} {from}"), ui::StyleType::TotalLabel),
        ui::style_text(&format!("{target} {to}"), ui::StyleType::TotalValue)
    ));

    Ok(output)
}

pub async fn run(
    cache: &RateCache,
    preferences: &PairPreferences,
    request: &ConvertRequest,
) -> Result<()> {
    let pb = ui::new_spinner("Loading exchange rates...");
    let snapshot = cache.current_rates().await;
    pb.finish_and_clear();

    let snapshot = snapshot.context("Failed to load exchange rates")?;
    println!("{}", render_conversion(&snapshot, request)?);

    preferences
        .save(&request.pair)
        .await
        .context("Failed to remember currency pair")?;
    Ok(())
}
