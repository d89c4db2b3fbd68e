//! Unified alert model
//!
//! Detectors report alerts in slightly different shapes (phishing reports a
//! `pageUrl`, malware a `downloadUrl`, some use `type` for the source).
//! [`RawAlert`] accepts all of them and [`UnifiedAlert::normalize`] turns
//! one into the single shape the aggregator works on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AlertValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unknown alert source `{0}`")]
    UnknownSource(String),

    #[error("unknown severity `{0}`")]
    UnknownSeverity(String),

    #[error("timestamp {0} is out of range")]
    InvalidTimestamp(i64),
}

impl From<AlertValidationError> for crate::AppError {
    fn from(err: AlertValidationError) -> Self {
        crate::AppError::ValidationError(err.to_string())
    }
}

// ============================================================================
// ENUMS
// ============================================================================

/// Detector that produced the alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSource {
    Phishing,
    Malware,
    Scam,
    Cryptojacking,
    Tracker,
    DataExfiltration,
}

impl AlertSource {
    pub const ALL: [AlertSource; 6] = [
        AlertSource::Phishing,
        AlertSource::Malware,
        AlertSource::Scam,
        AlertSource::Cryptojacking,
        AlertSource::Tracker,
        AlertSource::DataExfiltration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSource::Phishing => "phishing",
            AlertSource::Malware => "malware",
            AlertSource::Scam => "scam",
            AlertSource::Cryptojacking => "cryptojacking",
            AlertSource::Tracker => "tracker",
            AlertSource::DataExfiltration => "data_exfiltration",
        }
    }
}

impl FromStr for AlertSource {
    type Err = AlertValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "phishing" => Ok(AlertSource::Phishing),
            "malware" => Ok(AlertSource::Malware),
            "scam" => Ok(AlertSource::Scam),
            "cryptojacking" | "cryptominer" => Ok(AlertSource::Cryptojacking),
            "tracker" => Ok(AlertSource::Tracker),
            "data_exfiltration" | "exfiltration" => Ok(AlertSource::DataExfiltration),
            _ => Err(AlertValidationError::UnknownSource(s.to_string())),
        }
    }
}

impl fmt::Display for AlertSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    /// Most severe first
    pub const ALL: [AlertSeverity; 4] = [
        AlertSeverity::Critical,
        AlertSeverity::High,
        AlertSeverity::Medium,
        AlertSeverity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl FromStr for AlertSeverity {
    type Err = AlertValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" | "info" => Ok(AlertSeverity::Low),
            "medium" => Ok(AlertSeverity::Medium),
            "high" => Ok(AlertSeverity::High),
            "critical" => Ok(AlertSeverity::Critical),
            _ => Err(AlertValidationError::UnknownSeverity(s.to_string())),
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RAW PAYLOAD
// ============================================================================

/// Alert as reported by a detector, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAlert {
    #[serde(alias = "alertId")]
    pub id: Option<String>,
    #[serde(alias = "type", alias = "kind")]
    pub source: Option<String>,
    #[serde(alias = "level")]
    pub severity: Option<String>,
    #[serde(alias = "message")]
    pub title: Option<String>,
    pub domain: Option<String>,
    #[serde(alias = "pageUrl", alias = "downloadUrl")]
    pub url: Option<String>,
    /// Unix seconds
    #[serde(alias = "detectedAt", alias = "createdAt")]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IngestAlertsRequest {
    #[validate(length(min = 1, max = 1000))]
    pub alerts: Vec<RawAlert>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAlertsResponse {
    pub accepted: usize,
    /// Alerts whose id was already buffered
    pub duplicates: usize,
    pub evicted: usize,
    pub buffered: usize,
}

// ============================================================================
// UNIFIED ALERT
// ============================================================================

/// Normalized security alert. Fields are read-only once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedAlert {
    id: String,
    source: AlertSource,
    severity: AlertSeverity,
    title: String,
    domain: Option<String>,
    url: Option<String>,
    timestamp: DateTime<Utc>,
}

impl UnifiedAlert {
    /// Validate a raw detector payload and build the unified alert
    pub fn normalize(raw: RawAlert) -> Result<Self, AlertValidationError> {
        let id = required(raw.id, "id")?;
        let source: AlertSource = required(raw.source, "source")?.parse()?;
        let severity: AlertSeverity = required(raw.severity, "severity")?.parse()?;
        let title = required(raw.title, "title")?;

        let secs = raw.timestamp.ok_or(AlertValidationError::MissingField("timestamp"))?;
        let timestamp = DateTime::from_timestamp(secs, 0)
            .ok_or(AlertValidationError::InvalidTimestamp(secs))?;

        let url = non_empty(raw.url);
        let domain = non_empty(raw.domain)
            .or_else(|| url.as_deref().and_then(host_of))
            .map(|d| d.to_lowercase());

        Ok(Self {
            id,
            source,
            severity,
            title,
            domain,
            url,
            timestamp,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> AlertSource {
        self.source
    }

    pub fn severity(&self) -> AlertSeverity {
        self.severity
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

// Helper functions

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, AlertValidationError> {
    non_empty(value).ok_or(AlertValidationError::MissingField(field))
}

fn host_of(raw_url: &str) -> Option<String> {
    url::Url::parse(raw_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}
