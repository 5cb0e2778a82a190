//! Per-tenant pacing HTTP front end.
//!
//! Requests to `/` are paced by the tenant named in the configured header
//! (`X-App-ID` by default); `/healthz` is never paced.
//!
//! Tenant limiters are created on first sight and never evicted, and each
//! tenant id is a metric label. Any client can mint new ids, so memory and
//! metric cardinality grow with the number of distinct ids seen. Run this
//! behind a proxy that authenticates the header when that matters.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Extension;
use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::extract::ConnectInfo;
use axum::response::IntoResponse;
use axum::routing::get;
use clap::Parser;
use tokio::net::TcpListener;
use tower::BoxError;
use tower::ServiceBuilder;
use tower_pace::Admission;
use tower_pace::AdmissionLayer;
use tower_pace::HeaderTenant;
use tower_pace::PaceError;
use tower_pace::ServerConfig;
use tracing::Level;
use tracing::info;
use tracing_subscriber::fmt;

/// Per-tenant pacing HTTP front end.
#[derive(Parser, Debug)]
#[command(name = "pace-server", version)]
struct Args {
    /// Path to the JSON configuration; defaults are used if it does not exist.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Give up on requests that would wait longer than this, e.g. "2s".
    #[arg(long)]
    max_wait: Option<humantime::Duration>,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    fmt().with_max_level(log_level).init();

    let config = ServerConfig::load(&args.config)?;
    info!("pace-server starting...");

    let registry = Arc::new(config.registry()?);
    let resolver = HeaderTenant::named(&config.tenant_header)?;
    let mut admission = AdmissionLayer::new(registry, resolver);
    if let Some(max_wait) = args.max_wait {
        admission = admission.with_timeout(max_wait.into());
    }

    // Only routes added before the layer are paced.
    let app = Router::new()
        .route("/", get(allowed))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_pace_error))
                .layer(admission)
                .map_err(BoxError::from),
        )
        .route("/healthz", get(|| async { "ok" }));

    let listener = TcpListener::bind(config.listen_addr()).await?;
    info!("Listening on {}...", config.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

async fn allowed(
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Extension(admission): Extension<Admission>,
) -> String {
    let granted_at = humantime::format_rfc3339_nanos(admission.granted_at);
    info!(
        %remote,
        tenant = %admission.tenant,
        waited = ?admission.waited,
        "request allowed at {granted_at}"
    );
    format!("Request allowed at {granted_at}\n")
}

async fn handle_pace_error(err: BoxError) -> impl IntoResponse {
    PaceError::from_boxed(err).into_response()
}
