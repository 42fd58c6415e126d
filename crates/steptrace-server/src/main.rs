//! Binary entrypoint for the steptrace HTTP server.
//!
//! Configuration comes from environment variables, see
//! [`ServerConfig::from_env`].

use steptrace_server::config::ServerConfig;
use steptrace_server::router::build_router;
use steptrace_server::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ServerConfig::from_env();
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(executor = ?config.executor, "steptrace server starting on {}", addr);

    let app = build_router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
