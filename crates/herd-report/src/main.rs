use anyhow::Result;
use chrono::Utc;
use herd_ledger::HerdDb;

mod config;
mod report;

use config::ReportConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load .env, init tracing
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // 2. Load configuration
    let config = ReportConfig::from_env()?;
    tracing::info!(
        database_url = %config.database_url,
        category = ?config.category,
        field_id = ?config.field_id,
        finance = config.include_finance,
        "Configuration loaded"
    );

    // 3. Open the ledger
    if !config.database_url.contains(":memory:") && !HerdDb::exists(&config.database_url) {
        tracing::warn!(
            "No database at {}; starting from an empty ledger",
            config.database_url
        );
    }
    let db = HerdDb::new(&config.database_url).await?;

    // 4. Reconstruct and print; logs go to stderr so stdout stays JSON
    let report = report::build(&db, &config, Utc::now().date_naive()).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
