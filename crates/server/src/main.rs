mod api;
mod cli;
mod router;
mod startup;
mod state;

use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Command;

async fn serve(config: spot_core::Config) -> anyhow::Result<()> {
    config.log_summary();

    let source = startup::price_source(&config)?;
    let rules = startup::load_rules(&config)?;
    let state = startup::build_app_state(config, source, rules);
    state.scheduler.start();

    let addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let app = router::build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            info!("Shutdown requested");
        })
        .await?;

    state.scheduler.shutdown().await;
    info!("Scheduler stopped");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    spot_core::config::load_dotenv();
    let mut config = spot_core::Config::from_env();
    let args: Vec<String> = std::env::args().collect();

    match cli::dispatch(&mut config, &args)? {
        Command::Serve => serve(config).await,
        Command::Done => Ok(()),
    }
}
