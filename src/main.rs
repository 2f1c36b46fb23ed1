use anyhow::Context;
use tokio::net::TcpListener;

use icebreaker::config::Config;
use icebreaker::game::Session;
use icebreaker::http::routes::AppState;
use icebreaker::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let config = Config::from_env().context("invalid configuration")?;
    let session = Session::new(config.session.clone()).context("failed to initialize card pool")?;
    let addr = config.server_addr();
    tracing::info!(
        public_url = %config.public_url,
        mobile_url = %config.mobile_url(),
        static_dir = ?config.static_dir,
        "starting"
    );

    let app = icebreaker::app(AppState::new(config, session));

    tracing::info!(%addr, "listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
