mod cli;
mod table;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use spot_core::Config;
use spot_pricing::{AliyunPriceSource, PriceSource};

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    spot_core::config::load_dotenv();
    let args = CliArgs::parse();
    let config = match &args.profile {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };

    let source = AliyunPriceSource::from_config(&config.aliyun)
        .context("Aliyun credentials are required")?
        .with_concurrency(config.alarm.fetch_concurrency);

    let query = args.to_query();
    info!(conditions = %query.conditions(), "querying spot prices");
    let groups = source
        .query(&query)
        .await
        .with_context(|| format!("price query failed for {}", query.region))?;

    let mut ranked = spot_rules::analyze(&groups);
    ranked.truncate(query.limit);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
    } else {
        table::print_table(&ranked, query.cutoff, &query.conditions())?;
    }
    Ok(())
}
