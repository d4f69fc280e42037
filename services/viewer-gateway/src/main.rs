//! Viewer Gateway - serves the live map, table and controls over HTTP/WebSocket

use anyhow::Result;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use adsb_viewer::{TrackerHandle, TrackerService};

mod api;
mod settings;
mod ws_handler;

use settings::Settings;

/// Shared application state
pub struct AppState {
    pub tracker: TrackerHandle,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let mut filter = EnvFilter::from_default_env();
    for directive in ["viewer_gateway=info", "adsb_viewer=info", "tower_http=info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("===========================================");
    info!("   Viewer Gateway - ADS-B Live Map");
    info!("===========================================");

    let settings = Settings::from_env()?;

    info!("Configuration:");
    info!("  Data source: {}", settings.data_source);
    info!("  HTTP/WS port: {}", settings.http_port);
    info!("  Static files: {}", settings.static_dir);
    info!("  Display units: {}", settings.display_units);
    match &settings.db_dir {
        Some(dir) => info!("  Metadata database: {}", dir.display()),
        None => info!("  Metadata database: disabled"),
    }

    let (service, tracker) = TrackerService::open(settings.tracker_config()).await?;
    let mut tracker_task = tokio::spawn(service.run(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown requested");
    }));

    let app_state = Arc::new(AppState { tracker });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // WebSocket endpoint
        .route("/ws", get(ws_handler::ws_handler))
        // REST API endpoints
        .route("/api/aircraft", get(api::get_aircraft))
        .route("/api/aircraft/:hex", get(api::get_aircraft_detail))
        .route("/api/aircraft/:hex/track", get(api::get_aircraft_track))
        .route("/api/aircraft/:hex/metadata", put(api::put_aircraft_metadata))
        .route("/api/sort/:column", post(api::post_sort))
        .route("/api/filters", get(api::get_filters).post(api::post_filter))
        .route(
            "/api/filters/:index",
            put(api::put_filter).delete(api::delete_filter),
        )
        .route("/api/filters/highlight", post(api::post_highlight))
        .route("/api/select", delete(api::delete_select))
        .route("/api/select/:hex", post(api::post_select))
        .route("/api/follow/:hex", post(api::post_follow))
        .route("/api/select_all", post(api::post_select_all))
        .route("/api/viewport", put(api::put_viewport))
        .route("/api/status", get(api::get_status))
        .route("/health", get(api::health_check))
        // Static files
        .fallback_service(ServeDir::new(&settings.static_dir))
        .layer(cors)
        .with_state(app_state);

    let http_addr = format!("0.0.0.0:{}", settings.http_port);
    info!("Starting HTTP/WebSocket server on {}", http_addr);

    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    let http_server = axum::serve(listener, app);

    // Run until either the tracker or the server stops
    tokio::select! {
        result = &mut tracker_task => {
            match result {
                Ok(Ok(())) => info!("Tracker stopped"),
                Ok(Err(e)) => error!("Tracker error: {:#}", e),
                Err(e) => error!("Tracker task failed: {}", e),
            }
        }
        result = http_server => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
            }
        }
    }

    Ok(())
}
