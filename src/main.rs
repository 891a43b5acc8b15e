use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use mowbook::auth::Credentials;
use mowbook::engine::Engine;
use mowbook::http::{self, AppState};
use mowbook::reaper;
use mowbook::session::{SESSION_TTL, SessionAuthority};
use mowbook::storage::{JsonCredentialFile, JsonFileStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("MOWBOOK_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    mowbook::observability::init(metrics_port);

    let port = std::env::var("MOWBOOK_PORT").unwrap_or_else(|_| "3000".into());
    let bind = std::env::var("MOWBOOK_BIND").unwrap_or_else(|_| "0.0.0.0".into());
    let data_dir = std::env::var("MOWBOOK_DATA_DIR").unwrap_or_else(|_| "./data".into());
    let public_dir = std::env::var("MOWBOOK_PUBLIC_DIR").unwrap_or_else(|_| "./public".into());
    let default_password =
        std::env::var("MOWBOOK_ADMIN_PASSWORD").unwrap_or_else(|_| "garden-admin".into());

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;
    let data_dir = PathBuf::from(data_dir);

    let store = Arc::new(JsonFileStore::new(data_dir.join("appointments.json")));
    let credentials = Arc::new(Credentials::new(Arc::new(JsonCredentialFile::new(
        data_dir.join("admin.json"),
    ))));
    if credentials.seed_if_absent(&default_password).await? {
        info!("seeded admin credential from the configured default password");
    }

    let engine = Arc::new(Engine::new(store));
    let sessions = Arc::new(SessionAuthority::new(credentials, SESSION_TTL));
    tokio::spawn(reaper::run_session_reaper(sessions.clone()));

    let app = http::app(AppState { engine, sessions }, Path::new(&public_dir));

    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("mowbook listening on {addr}");
    info!("  data_dir: {}", data_dir.display());
    info!("  public_dir: {public_dir}");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    // Graceful shutdown: stop accepting on SIGTERM/ctrl-c, drain in-flight requests
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {},
                _ = sigterm.recv() => {},
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        info!("shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("shutdown complete");
    Ok(())
}
