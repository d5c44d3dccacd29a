use medflow::config::CONFIG;
use medflow::db::{self, DbOptions};
use medflow::server::{MedflowState, medflow_router};
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = &*CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        listen_addr = %cfg.basic.listen_addr,
        listen_port = cfg.basic.listen_port,
        loglevel = %cfg.basic.loglevel,
        data_dir = %cfg.database.data_dir.display(),
        storage_prefix = %cfg.database.storage_prefix,
        in_memory = cfg.database.in_memory,
        max_init_attempts = cfg.database.max_init_attempts,
        retry_delay_ms = cfg.database.retry_delay_ms,
        rotate_storage_per_attempt = cfg.database.rotate_storage_per_attempt,
        "MedFlow Registry config loaded"
    );

    let db = db::spawn(DbOptions::from_config(&cfg.database)).await;

    // Keep serving on failure so the database can be recovered via /api/system/reset.
    match db.initialize().await {
        Ok(()) => info!("Patient registration system is online"),
        Err(e) => error!(
            error = %e,
            "Failed to initialize database; POST /api/system/reset to retry"
        ),
    }

    let state = MedflowState::new(db);
    let app = medflow_router(state);

    let addr = SocketAddr::from((cfg.basic.listen_addr, cfg.basic.listen_port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server has shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
