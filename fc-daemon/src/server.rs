//! Status HTTP Server
//!
//! Read-only view of the controller. `GET /status` serializes the latest
//! published [`Snapshot`]; nothing here can change the fan.
//!
//! # Behavior
//! - Handlers only clone an `Arc` out of the [`SnapshotCell`], so a slow
//!   client never stalls the control loop
//! - Unknown paths answer 404, other methods on `/status` answer 405
//! - Responses carry `Cache-Control: no-store, no-cache, must-revalidate`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Local, SecondsFormat};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

use fc_core::{Snapshot, SnapshotCell, SwitchEvent};
use fc_error::{FanctrlError, Result};
use fc_protocol::{StatusResponse, SwitchPoint, STATUS_CACHE_CONTROL, STATUS_PATH};

use crate::shutdown;

pub fn router(snapshots: Arc<SnapshotCell>) -> Router {
    Router::new()
        .route(STATUS_PATH, get(get_status))
        .with_state(snapshots)
}

async fn get_status(State(snapshots): State<Arc<SnapshotCell>>) -> impl IntoResponse {
    let snapshot = snapshots.load();
    (
        [(header::CACHE_CONTROL, STATUS_CACHE_CONTROL)],
        Json(status_response(&snapshot)),
    )
}

/// Convert a snapshot into its wire form
pub fn status_response(snapshot: &Snapshot) -> StatusResponse {
    StatusResponse {
        fan_on: snapshot.fan_on,
        temp_c: snapshot.temp_c,
        temp_on_c: snapshot.temp_on_c,
        temp_off_c: snapshot.temp_off_c,
        version: snapshot.version.clone(),
        updated_at: timestamp(&snapshot.updated_at),
        last_change_at: timestamp(&snapshot.last_change_at),
        min_c: snapshot.min_c,
        max_c: snapshot.max_c,
        error: snapshot.error.clone(),
        switchpoints: snapshot.switchpoints.iter().map(switch_point).collect(),
    }
}

fn switch_point(event: &SwitchEvent) -> SwitchPoint {
    SwitchPoint {
        ts: timestamp(&event.at),
        fan_on: event.fan_on,
        temp_c: event.temp_c,
        temp_on_c: event.temp_on_c,
        temp_off_c: event.temp_off_c,
    }
}

fn timestamp(at: &DateTime<Local>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Bind the status listener; failure here is fatal at startup
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| FanctrlError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Serve `/status` until shutdown is requested
pub async fn serve(
    listener: TcpListener,
    snapshots: Arc<SnapshotCell>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let local = listener.local_addr()?;
    info!("Status server listening on http://{}{}", local, STATUS_PATH);

    axum::serve(listener, router(snapshots))
        .with_graceful_shutdown(async move { shutdown::requested(&mut shutdown_rx).await })
        .await?;

    info!("Status server stopped");
    Ok(())
}
