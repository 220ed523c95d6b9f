use serde::{Deserialize, Serialize};

use super::hours::HoursRounding;
use super::log::LogEntry;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkRequest {
    pub restaurant_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRequest {
    pub restaurant_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogResponse {
    pub entries: Vec<LogEntry>,
    pub total_hours: f64,
    pub rounding: HoursRounding,
}
