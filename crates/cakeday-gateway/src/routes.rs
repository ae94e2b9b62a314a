//! API route handlers for the gateway.
//!
//! Every response except `/health` uses the `{success, message, payload}`
//! envelope.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cakeday_core::error::CakedayError;
use cakeday_core::types::NewBirthday;
use cakeday_scheduler::datemath;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::holidays::HolidayScope;
use crate::server::AppState;

fn respond(status: StatusCode, message: impl Into<String>, payload: Value) -> Response {
    let body = json!({
        "success": status.is_success(),
        "message": message.into(),
        "payload": payload,
    });
    (status, Json(body)).into_response()
}

fn error_status(e: &CakedayError) -> StatusCode {
    match e {
        CakedayError::InvalidRecord(_) => StatusCode::BAD_REQUEST,
        CakedayError::NotFound(_) => StatusCode::NOT_FOUND,
        CakedayError::PassInProgress => StatusCode::CONFLICT,
        CakedayError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Health check endpoint.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "cakeday-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct AddBirthdayRequest {
    pub name: Option<String>,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp; only month and day are kept.
    pub date: Option<String>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    #[serde(rename = "fcmToken", alias = "recipientToken")]
    pub fcm_token: Option<String>,
}

/// Month and day of a submitted date.
pub fn parse_month_day(raw: &str) -> Option<(u32, u32)> {
    let raw = raw.trim();
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        let date = ts.date_naive();
        return Some((date.month(), date.day()));
    }
    let prefix = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
        .ok()
        .map(|date| (date.month(), date.day()))
}

pub async fn add_birthday(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddBirthdayRequest>,
) -> Response {
    let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
    let (Some(name), Some(token)) = (non_empty(req.name), non_empty(req.fcm_token)) else {
        return respond(StatusCode::BAD_REQUEST, "Missing fields", json!({}));
    };

    let (month, day) = match (req.month, req.day, req.date.as_deref()) {
        (Some(month), Some(day), _) => (month, day),
        (_, _, Some(date)) => match parse_month_day(date) {
            Some(parsed) => parsed,
            None => {
                return respond(
                    StatusCode::BAD_REQUEST,
                    format!("Unrecognised date: {date}"),
                    json!({}),
                );
            }
        },
        _ => return respond(StatusCode::BAD_REQUEST, "Missing fields", json!({})),
    };

    match state
        .coordinator
        .store()
        .create(NewBirthday::new(name.clone(), month, day, token))
        .await
    {
        Ok(id) => {
            tracing::info!("📅 Birthday for {name} saved ({month}/{day})");
            respond(StatusCode::OK, "Birthday saved!", json!({ "id": id }))
        }
        Err(e) => {
            tracing::error!("❌ Failed to save birthday for {name}: {e}");
            let message = match e {
                CakedayError::InvalidRecord(ref reason) => reason.clone(),
                _ => "Failed to save birthday".to_string(),
            };
            respond(error_status(&e), message, json!({}))
        }
    }
}

pub async fn list_birthdays(State(state): State<Arc<AppState>>) -> Response {
    match state.coordinator.store().list().await {
        Ok(records) => {
            let count = records.len();
            respond(
                StatusCode::OK,
                format!("{count} birthdays"),
                serde_json::to_value(records).unwrap_or_default(),
            )
        }
        Err(e) => respond(error_status(&e), e.to_string(), json!([])),
    }
}

pub async fn delete_birthday(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    match state.coordinator.store().delete(&id).await {
        Ok(()) => respond(StatusCode::OK, "Birthday removed", json!({ "id": id })),
        Err(e) => respond(error_status(&e), e.to_string(), json!({})),
    }
}

#[derive(Debug, Deserialize)]
pub struct WishRequest {
    pub email: Option<String>,
    pub name: Option<String>,
}

pub async fn birthday_wish(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WishRequest>,
) -> Response {
    let (Some(email), Some(name)) = (
        req.email.filter(|e| !e.trim().is_empty()),
        req.name.filter(|n| !n.trim().is_empty()),
    ) else {
        return respond(StatusCode::BAD_REQUEST, "Email and name are required", json!({}));
    };
    let Some(sender) = &state.email else {
        return respond(StatusCode::SERVICE_UNAVAILABLE, "Email is not configured", json!({}));
    };

    match sender.send_birthday_wish(&email, &name).await {
        Ok(()) => respond(StatusCode::OK, "Birthday wish sent successfully 🎉", json!({})),
        Err(e) => {
            tracing::error!("❌ Birthday wish to {email} failed: {e}");
            respond(error_status(&e), e.to_string(), json!({}))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsRequest {
    pub data: Option<String>,
}

pub async fn events(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EventsRequest>,
) -> Response {
    let Some(client) = &state.holidays else {
        return respond(StatusCode::SERVICE_UNAVAILABLE, "Holiday lookup is not configured", json!([]));
    };
    let scope = HolidayScope::from_request(req.data.as_deref());
    let coordinator = &state.coordinator;
    let today = datemath::local_today(coordinator.clock().now(), coordinator.timezone());

    match client.fetch(scope, today).await {
        Ok(holidays) if holidays.is_empty() => {
            respond(StatusCode::OK, "No holidays today 🎈", json!([]))
        }
        Ok(holidays) => respond(StatusCode::OK, "Holidays found 🎉", Value::Array(holidays)),
        Err(e) => {
            tracing::error!("❌ Holiday lookup failed: {e}");
            respond(StatusCode::BAD_GATEWAY, e.to_string(), json!([]))
        }
    }
}

/// Trigger a reminder pass now, queueing behind a running one.
pub async fn run_pass(State(state): State<Arc<AppState>>) -> Response {
    match state.coordinator.run_now().await {
        Ok(report) => respond(
            StatusCode::OK,
            "Reminder pass finished",
            serde_json::to_value(report).unwrap_or_default(),
        ),
        Err(e) => respond(error_status(&e), e.to_string(), json!({})),
    }
}
