use std::sync::Arc;

use taskrelay::bot::Bot;
use taskrelay::config::AppConfig;
use taskrelay::connector::HttpConnector;
use taskrelay::notifier::Notifier;
use taskrelay::server::app_routes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("🤖 Task Relay Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Messages: http://{}:{}/api/messages", config.host, config.port);
    eprintln!(
        "   App ID: {}",
        if config.app_id.is_empty() {
            "(none — emulator mode)"
        } else {
            config.app_id.as_str()
        }
    );
    eprintln!(
        "   Logic App endpoint: {}\n",
        if config.logicapp_endpoint.is_empty() {
            "(not configured)"
        } else {
            config.logicapp_endpoint.as_str()
        }
    );

    let connector = Arc::new(HttpConnector::new(config.clone()));
    let notifier = Notifier::new(config.logicapp_endpoint.clone());
    let bot = Arc::new(Bot::new(connector, notifier));

    let app = app_routes(bot);
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    tracing::info!(host = %config.host, port = config.port, "bot server started");
    axum::serve(listener, app).await?;

    Ok(())
}
