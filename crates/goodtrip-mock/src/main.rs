use std::net::SocketAddr;

use goodtrip_mock::{AppStateInner, MockServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "goodtrip_mock=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("GOODTRIP_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let host = std::env::var("GOODTRIP_MOCK_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port: u16 = std::env::var("GOODTRIP_MOCK_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()?;

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let server = MockServer::bind(addr, AppStateInner::new(jwt_secret)).await?;
    server.wait().await
}
