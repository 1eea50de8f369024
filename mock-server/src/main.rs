use mock_panel::{MockConfig, TokenMode};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mock_panel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "8888".to_string());
    let api_key = std::env::var("BT_API_KEY").unwrap_or_else(|_| "test-key".to_string());
    let token_mode = match std::env::var("BT_TOKEN_MODE").as_deref() {
        Ok("time+key") => TokenMode::TimeKey,
        _ => TokenMode::TimeMd5Key,
    };

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, ?token_mode, "mock panel listening");
    mock_panel::run(listener, MockConfig::new(&api_key, token_mode), mock_panel::new_log()).await
}
