//! Market Intel Digest HTTP entrypoint.
//! Boots the Axum server with the insight, subscribe and send routes plus `/metrics`.

use std::process::ExitCode;
use std::sync::Arc;

use market_intel::api::{self, AppState};
use market_intel::bootstrap::Runtime;
use market_intel::metrics::Metrics;
use market_intel::telemetry;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let runtime = match Runtime::from_env() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let metrics_router: Option<axum::Router> = match Metrics::init() {
        Ok(m) => Some(m.router()),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics disabled");
            None
        }
    };

    let state = AppState {
        insights: runtime.insights.clone(),
        subscribers: runtime.subscribers.clone(),
        distributor: runtime.distributor().map(Arc::new),
    };
    let mut app = api::router(state);
    if let Some(m) = metrics_router {
        app = app.merge(m);
    }

    let addr = runtime.settings.bind_addr.clone();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("cannot bind {addr}: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(%addr, "listening");
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = ?e, "server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
