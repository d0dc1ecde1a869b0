//! REST endpoint handlers for the Fleetsim API server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/start` | Start the scheduler (idempotent) |
//! | `GET` | `/api/check` | Scheduler status |
//! | `GET` | `/api/end` | Stop the scheduler (idempotent) |
//! | `GET` | `/api/dropall` | Stop and destroy all reading tables |
//! | `POST` | `/api/register` | Register a device |
//! | `GET` | `/api/fetch-device` | Device ids grouped by type |
//! | `GET` | `/api/average` | Average over a device/time window |
//! | `GET` | `/api/max` | Maximum over a device/time window |
//! | `GET` | `/api/min` | Minimum over a device/time window |
//! | `POST` | `/api/info` | Min, max, and average in one call |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use chrono::Utc;
use fleetsim_core::{StartOutcome, StopOutcome};
use fleetsim_types::{Device, DeviceKind};
use tracing::info;

use crate::error::ApiError;
use crate::queries::{parse_kind, AggregateRequest, RegisterRequest};
use crate::state::AppState;
use crate::store::Aggregate;

fn message(text: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": text }))
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing scheduler status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.scheduler.status();
    let device_count = state.scheduler.registry().len().await;
    let state_label = if status.running { "RUNNING" } else { "STOPPED" };
    let ticks = status.ticks_completed;

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Fleetsim</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Fleetsim</h1>
    <p class="subtitle">IoT sensor fleet simulator</p>

    <p>Scheduler: <span class="status">{state_label}</span> &middot; ticks: {ticks} &middot; devices: {device_count}</p>

    <hr>
    <ul>
        <li><a href="/api/start">GET /api/start</a></li>
        <li><a href="/api/check">GET /api/check</a></li>
        <li><a href="/api/end">GET /api/end</a></li>
        <li><a href="/api/fetch-device">GET /api/fetch-device</a></li>
        <li>POST /api/register</li>
        <li>GET /api/average &middot; /api/max &middot; /api/min</li>
        <li>POST /api/info</li>
        <li>WS /ws/readings</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// Scheduler lifecycle
// ---------------------------------------------------------------------------

/// `GET /api/start` -- ensure the schema exists, then start the
/// scheduler. A no-op when already running.
pub async fn start(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.storage.ensure_schema().await?;

    let outcome = state
        .scheduler
        .start()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(match outcome {
        StartOutcome::Started { devices } => {
            info!(devices, "Simulation started");
            message("IoT devices running")
        }
        StartOutcome::AlreadyRunning => message("Simulation already running"),
    })
}

/// `GET /api/check` -- current scheduler status.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let status = state.scheduler.status();
    Json(serde_json::json!({
        "status": if status.running { "running" } else { "stopped" },
        "ticks": status.ticks_completed,
    }))
}

/// `GET /api/end` -- stop the scheduler. The in-flight tick, if any,
/// completes and publishes before the loop exits.
pub async fn end(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    match state.scheduler.stop() {
        StopOutcome::Stopping => {
            info!("Simulation stop requested");
            message("IoT devices stopped")
        }
        StopOutcome::NotRunning => message("Simulation not running"),
    }
}

/// `GET /api/dropall` -- stop the scheduler and destroy all four
/// reading tables. The device catalog is preserved.
pub async fn dropall(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let _ = state.scheduler.stop();
    state.storage.drop_readings().await?;
    info!("All reading tables dropped");
    Ok(message("IoT devices stopped and all readings deleted"))
}

// ---------------------------------------------------------------------------
// Device registration and listing
// ---------------------------------------------------------------------------

/// `POST /api/register` -- atomically register a device and seed its
/// in-memory simulation state so it joins the next tick.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let kind = parse_kind(&body.kind)?;
    let device = Device {
        device_id: body.device_id.clone(),
        name: body.name.clone(),
        kind,
        registered_at: Utc::now(),
    };

    let Some(_row_id) = state.storage.register(&device).await? else {
        return Err(ApiError::AlreadyExists(String::from(
            "Error device id already present",
        )));
    };

    let seed = state.scheduler.seed_value(kind).await;
    state
        .scheduler
        .registry()
        .insert(&device.device_id, kind, seed)
        .await;

    info!(device_id = %device.device_id, kind = %kind, "Device registered");

    let body = serde_json::json!({
        "id": device.device_id,
        "message": format!(
            "Device {} of type {} registered on {}",
            device.name, kind, device.registered_at.to_rfc3339(),
        ),
    });
    Ok((StatusCode::CREATED, Json(body)))
}

/// `GET /api/fetch-device` -- device ids grouped by sensor type. Every
/// type appears in the response even when it has no devices.
pub async fn fetch_device(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<DeviceKind, Vec<String>>>, ApiError> {
    let mut grouped: BTreeMap<DeviceKind, Vec<String>> =
        DeviceKind::ALL.iter().map(|k| (*k, Vec::new())).collect();

    for device in state.storage.devices().await? {
        grouped.entry(device.kind).or_default().push(device.device_id);
    }
    Ok(Json(grouped))
}

// ---------------------------------------------------------------------------
// Aggregate queries
// ---------------------------------------------------------------------------

async fn run_aggregate(
    state: &AppState,
    agg: Aggregate,
    body: &AggregateRequest,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (kind, start, end) = body.parse()?;
    let value = state
        .storage
        .aggregate(agg, kind, &body.device_id, start, end)
        .await?;
    // An empty window yields null, never zero.
    Ok(Json(serde_json::json!({ "value": value })))
}

/// `GET /api/average` -- mean reading for a device in a time window.
pub async fn average(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AggregateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    run_aggregate(&state, Aggregate::Avg, &body).await
}

/// `GET /api/max` -- largest reading for a device in a time window.
pub async fn max(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AggregateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    run_aggregate(&state, Aggregate::Max, &body).await
}

/// `GET /api/min` -- smallest reading for a device in a time window.
pub async fn min(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AggregateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    run_aggregate(&state, Aggregate::Min, &body).await
}

/// `POST /api/info` -- minimum, maximum, and average over the same
/// filtered set in one call.
pub async fn info_stats(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AggregateRequest>,
) -> Result<Json<fleetsim_types::ReadingStats>, ApiError> {
    let (kind, start, end) = body.parse()?;
    let stats = state
        .storage
        .stats(kind, &body.device_id, start, end)
        .await?;
    Ok(Json(stats))
}
