use super::ui;
use crate::core::{
    CurrencyPair, RateCache, RateSnapshot, format_for_display, get_exchange_rate,
};
use crate::core::error::Result as RateResult;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// One line of watch output for a refresh outcome.
pub fn render_update(pair: &CurrencyPair, update: RateResult<RateSnapshot>) -> String {
    let line = update.and_then(|snapshot| {
        let rate = get_exchange_rate(&snapshot.rates, &pair.from, &pair.to)?;
        Ok(format!(
            "1 {} = {} {} {}",
            pair.from,
            format_for_display(rate),
            pair.to,
            ui::style_text(
                &format!("(updated {})", snapshot.updated_label()),
                ui::StyleType::Subtle
            )
        ))
    });

    line.unwrap_or_else(|e| ui::style_text(&format!("Refresh failed: {e}"), ui::StyleType::Error))
}

/// Prints the pair rate on every scheduled refresh until Ctrl-C.
pub async fn run(cache: Arc<RateCache>, pair: CurrencyPair, interval: Duration) -> Result<()> {
    info!(
        from = %pair.from,
        to = %pair.to,
        interval_secs = interval.as_secs(),
        "Watching exchange rate"
    );
    println!(
        "Watching {}/{} every {} minutes. Press Ctrl-C to stop.",
        pair.from,
        pair.to,
        interval.as_secs() / 60
    );

    let handle = cache.spawn_refresh(interval, move |update| {
        println!("{}", render_update(&pair, update));
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    handle.cancel().await;
    Ok(())
}
