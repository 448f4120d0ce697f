//! Wire types for the fanctrl status endpoint
//!
//! `GET /status` answers with a [`StatusResponse`] encoded as JSON.

use serde::{Deserialize, Serialize};

/// Path of the status endpoint
pub const STATUS_PATH: &str = "/status";

/// Cache policy sent with every status response
pub const STATUS_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub fan_on: bool,
    /// Latest reading in °C, `null` when the last read failed
    pub temp_c: Option<f64>,
    pub temp_on_c: f64,
    pub temp_off_c: f64,
    pub version: String,
    /// RFC 3339 time the controller state was last published
    pub updated_at: String,
    /// RFC 3339 time of the last fan transition
    pub last_change_at: String,
    pub min_c: Option<f64>,
    pub max_c: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub switchpoints: Vec<SwitchPoint>,
}

/// One recorded fan transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwitchPoint {
    pub ts: String,
    pub fan_on: bool,
    pub temp_c: Option<f64>,
    pub temp_on_c: f64,
    pub temp_off_c: f64,
}
