//! One-shot analysis from the command line.
//!
//! Usage: `analyze_once <query> [max_results]`
//! Prints the aggregate result and the recommendation as pretty JSON.

use anyhow::{bail, Context, Result};

use xsent::config::AppConfig;
use xsent::engine::DEFAULT_MAX_RESULTS;
use xsent::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let mut args = std::env::args().skip(1);
    let query = match args.next() {
        Some(q) if !q.trim().is_empty() => q,
        _ => bail!("usage: analyze_once <query> [max_results]"),
    };
    let max_results: i64 = match args.next() {
        Some(v) => v
            .parse()
            .with_context(|| format!("max_results must be an integer, got {v:?}"))?,
        None => DEFAULT_MAX_RESULTS as i64,
    };

    let cfg = AppConfig::load().context("loading configuration")?;
    cfg.logging.init();
    let state = AppState::from_config(&cfg)?;

    let result = state.aggregator.analyze(&query, max_results, None).await?;
    let recommendation = state.rule.evaluate(&result);

    let out = serde_json::json!({
        "generated_at": chrono::Utc::now().to_rfc3339(),
        "result": result,
        "recommendation": recommendation,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
