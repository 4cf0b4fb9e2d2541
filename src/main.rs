use axum::{routing::get, Router};
use healthchecker::{async_probe_fn, config, handlers, metrics, ProbeOutcome};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const GITHUB_URL: &str = "https://api.github.com/users/ervitis";
const LOCAL_PORT: &str = "127.0.0.1:8185";

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "healthchecker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    if let Err(e) = run().await {
        tracing::error!("Health server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config_with_fallback()?;

    let mut checker = config.healthchecker()?;
    checker.add(async_probe_fn(check_github).named("checkGithub"), None);
    checker.add(async_probe_fn(check_port), Some("checkPort"));

    let app = Router::new()
        .merge(handlers::health_router(Arc::new(checker), &config.route_path))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!(
        "Serving health checks on http://{}{}",
        addr,
        handlers::normalize_route_path(&config.route_path)
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Fails when nothing is listening on the local service port
async fn check_port() -> ProbeOutcome {
    match tokio::time::timeout(Duration::from_secs(2), TcpStream::connect(LOCAL_PORT)).await {
        Ok(Ok(_stream)) => ProbeOutcome::ok(200),
        Ok(Err(e)) => ProbeOutcome::failed(500, e),
        Err(_) => ProbeOutcome::failed(500, format!("connect to {} timed out", LOCAL_PORT)),
    }
}

/// Fails when the upstream API does not answer 200
async fn check_github() -> ProbeOutcome {
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
    {
        Ok(client) => client,
        Err(e) => return ProbeOutcome::failed(500, e),
    };

    match client.get(GITHUB_URL).send().await {
        Ok(response) if response.status().is_success() => ProbeOutcome::ok(200),
        Ok(response) => {
            let status = response.status();
            ProbeOutcome::failed(status.as_u16(), status)
        }
        Err(e) => ProbeOutcome::failed(500, e),
    }
}
