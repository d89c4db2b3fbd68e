//! Aggregate views over alerts

use serde::{Deserialize, Serialize};

use super::alert::{AlertSeverity, AlertSource};

/// Number of alerts classified to one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoHeatmapEntry {
    pub region: String,
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    pub top: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapResponse {
    /// Alerts counted across all regions, not only the returned ones
    pub total: u64,
    pub region_count: usize,
    pub entries: Vec<GeoHeatmapEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCount {
    pub severity: AlertSeverity,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    pub source: AlertSource,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSummary {
    pub total: u64,
    pub by_severity: Vec<SeverityCount>,
    pub by_source: Vec<SourceCount>,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyQuery {
    pub domain: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub domain: String,
    pub region: String,
}
