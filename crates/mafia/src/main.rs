use mafia::{MafiaError, MafiaServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), MafiaError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr,
        idle_timeout_secs = config.idle_timeout.as_secs(),
        result_delay_ms = config.room.result_display_delay.as_millis() as u64,
        "starting mafia server"
    );

    let server = MafiaServer::builder().config(config).build().await?;
    server.run().await
}
