//! Entry point for the `relay-gateway` HTTP server.

use relay_gateway::{config::GatewayConfig, routes::create_router, state::AppState, telemetry};
use tracing::info;

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();
    telemetry::init();
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "loaded environment file");
    }

    let config = match GatewayConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let state = match AppState::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to build upstream clients");
            std::process::exit(1);
        }
    };
    let app = create_router(state);

    let addr = config.listen_addr;
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    info!(addr = %addr, "relay-gateway listening");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
