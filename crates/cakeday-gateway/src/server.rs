//! HTTP server: shared state, router, and startup.

use axum::Router;
use axum::routing::{delete, get, post};
use cakeday_channels::EmailSender;
use cakeday_core::config::GatewayConfig;
use cakeday_core::error::{CakedayError, Result};
use cakeday_scheduler::DispatchCoordinator;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::holidays::HolidayClient;
use crate::routes;

/// State shared by every handler.
pub struct AppState {
    pub config: GatewayConfig,
    pub coordinator: Arc<DispatchCoordinator>,
    pub email: Option<EmailSender>,
    pub holidays: Option<HolidayClient>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: GatewayConfig, coordinator: Arc<DispatchCoordinator>) -> Self {
        Self {
            config,
            coordinator,
            email: None,
            holidays: None,
            start_time: std::time::Instant::now(),
        }
    }

    pub fn with_email(mut self, email: Option<EmailSender>) -> Self {
        self.email = email;
        self
    }

    pub fn with_holidays(mut self, holidays: Option<HolidayClient>) -> Self {
        self.holidays = holidays;
        self
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        .route("/add-birthday", post(routes::add_birthday))
        .route("/birthdays", get(routes::list_birthdays))
        .route("/birthdays/{id}", delete(routes::delete_birthday))
        .route("/birthday-wish", post(routes::birthday_wish))
        .route("/events", post(routes::events))
        .route("/run", post(routes::run_pass))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn start_server(
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| CakedayError::Gateway(format!("Cannot bind {addr}: {e}")))?;
    tracing::info!("🌐 Gateway listening on http://{addr}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| CakedayError::Gateway(e.to_string()))
}
