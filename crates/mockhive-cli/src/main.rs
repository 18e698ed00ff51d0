//! MockHive server binary

use anyhow::Result;
use axum::middleware;
use axum::Router;
use clap::{Args, Parser, Subcommand};
use mockhive_core::EndpointStore;
use mockhive_graphql::{graphql_admin_router, graphql_router, GraphQLRegistry};
use mockhive_http::admin_auth::require_admin;
use mockhive_http::{admin_router, mock_router, AdminAuth, AppState};
use mockhive_ws::{ws_admin_router, ws_router, WsEngine};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

mod seed;

#[derive(Parser)]
#[command(name = "mockhive")]
#[command(about = "MockHive - Programmable HTTP/WebSocket/GraphQL mock server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Set log level (error, warn, info, debug, trace)
    #[arg(short = 'v', long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the mock server (the default)
    Serve(ServeArgs),
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Listen port
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Directory for persisted state
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Skip sample data seeding even outside production
    #[arg(long)]
    no_seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.clone())),
        )
        .init();

    let args = match cli.command {
        Some(Commands::Serve(args)) => args,
        None => ServeArgs {
            port: std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3001),
            data_dir: PathBuf::from("data"),
            no_seed: false,
        },
    };

    serve(args).await
}

async fn serve(args: ServeArgs) -> Result<()> {
    let snapshot_path = args.data_dir.join("endpoints.json");
    let store = EndpointStore::with_persistence(snapshot_path).await;
    let state = AppState::new(store, AdminAuth::from_env());
    let ws_engine = Arc::new(WsEngine::new());
    let graphql = Arc::new(GraphQLRegistry::new());

    // Background maintenance: rate-limit sweep and WebSocket keepalive.
    state.rate_limiter.spawn_sweeper(Duration::from_secs(60));
    ws_engine.spawn_keepalive(Duration::from_secs(30));

    let production = std::env::var("NODE_ENV")
        .map(|v| v.eq_ignore_ascii_case("production"))
        .unwrap_or(false);
    if !production && !args.no_seed {
        seed::seed_sample_data(&state, &ws_engine, &graphql).await;
    }

    let admin = admin_router(state.clone())
        .nest(
            "/websocket",
            ws_admin_router(Arc::clone(&ws_engine)).layer(middleware::from_fn_with_state(
                state.clone(),
                require_admin,
            )),
        )
        .nest(
            "/graphql",
            graphql_admin_router(Arc::clone(&graphql)).layer(middleware::from_fn_with_state(
                state.clone(),
                require_admin,
            )),
        );

    let app = Router::new()
        .merge(mock_router(state.clone()))
        .merge(ws_router(ws_engine))
        .nest("/api/admin", admin)
        .fallback_service(graphql_router(graphql))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "mockhive listening");
    info!("mock surface:    /mock/**");
    info!("admin surface:   /api/admin");
    info!("websocket:       /ws/**");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Flush a final registry snapshot before exiting.
    state.store.flush().await?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
