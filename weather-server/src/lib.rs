//! HTTP surface for the weather alerts service.
//!
//! Binds the core services to REST routes:
//!
//! | Route | Purpose |
//! |---|---|
//! | `POST /api/auth/register`, `POST /api/auth/login` | accounts and bearer tokens |
//! | `GET /api/geocode?q=` | place suggestions |
//! | `GET /api/forecast?lat=&lon=` | normalized forecast with alerts |
//! | `GET/POST /api/users/{user_id}/saved-locations` | favorite places |
//! | `DELETE /api/users/{user_id}/saved-locations/{loc_id}` | remove a favorite |
//! | `GET /health` | liveness |
//!
//! Errors are mapped to status codes in one place, [`error::ApiError`].

use anyhow::Context;
use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{delete, get, post},
};
use std::time::Duration;
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use weather_core::Config;

pub mod error;
pub mod routes;
pub mod state;

use routes::{
    add_location_handler, forecast_handler, geocode_handler, health_handler, list_locations_handler,
    login_handler, register_handler, remove_location_handler,
};
use state::{AppState, SharedState};

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin: HeaderValue = origin
        .parse()
        .with_context(|| format!("Invalid CORS origin '{origin}'"))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60)))
}

pub fn router(state: SharedState, cors_origin: &str) -> anyhow::Result<Router> {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/geocode", get(geocode_handler))
        .route("/api/forecast", get(forecast_handler))
        .route(
            "/api/users/{user_id}/saved-locations",
            get(list_locations_handler).post(add_location_handler),
        )
        .route(
            "/api/users/{user_id}/saved-locations/{loc_id}",
            delete(remove_location_handler),
        )
        .layer(cors_layer(cors_origin)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

pub async fn start_server(config: Config) -> anyhow::Result<()> {
    info!("Initializing state...");
    let state = AppState::from_config(&config)?;
    if !state.require_auth {
        info!("Saved-location routes are open (require_auth = false)");
    }

    let app = router(state, &config.server.cors_origin)?;

    let address = format!("0.0.0.0:{}", config.server.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
