//! MCP server binary entry point.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use video_stats_mcp::{
    config::Settings,
    database::{PostgresExecutor, ScalarExecutor},
    llm::{OpenRouterClient, RetryPolicy},
    pipeline::QuestionPipeline,
    protocol::McpServerBuilder,
    security::RateLimiter,
    server::{McpHandler, ServerState},
};

/// How often idle rate-limit entries are dropped.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    info!(
        "Starting {} v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let settings = Settings::from_env().context("Invalid configuration")?;
    info!("Loaded settings: {:?}", settings);

    let executor = Arc::new(
        PostgresExecutor::new(&settings)
            .await
            .context("Failed to connect to database")?,
    );
    executor
        .health_check()
        .await
        .context("Database health check failed")?;
    info!("Executor {} ready", executor.name());
    let generator = OpenRouterClient::from_settings(&settings)
        .context("Failed to create LLM client")?;
    info!("Using model {}", generator.model());

    let rate_limiter = Arc::new(RateLimiter::new(settings.rate_limit));
    spawn_purge_task(Arc::clone(&rate_limiter));

    let pipeline = QuestionPipeline::new(
        Arc::new(generator),
        Arc::clone(&executor) as Arc<dyn ScalarExecutor>,
        rate_limiter,
        RetryPolicy::default(),
    );
    let state = Arc::new(ServerState::new(settings, Arc::new(pipeline)));
    info!("Server state initialized with {} tools", state.tools.len());

    let server = McpServerBuilder::new()
        .handler(McpHandler::new(state))
        .name(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .build()?;

    info!("MCP server ready, waiting for requests on stdin");
    server.run().await?;

    let metrics = executor.metrics();
    info!(
        queries_executed = metrics.queries_executed,
        query_errors = metrics.query_errors,
        timeouts = metrics.timeouts,
        "Server shutdown complete"
    );
    Ok(())
}

fn spawn_purge_task(rate_limiter: Arc<RateLimiter>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            ticker.tick().await;
            rate_limiter.purge_expired();
        }
    });
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("video_stats_mcp=info,warn"));

    // stdout carries the protocol
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .json()
        .init();
}
