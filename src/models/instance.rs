//! Managed instance (browser extension agent) model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use validator::Validate;

/// Stored liveness of an instance.
///
/// Offline is not a variant: a removed instance has no record at all and is
/// only reflected in [`FleetStats::offline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Online,
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedInstance {
    pub instance_id: String,
    pub hostname: String,
    pub browser: String,
    pub version: String,
    pub status: InstanceStatus,
    pub last_seen: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
}

impl ManagedInstance {
    pub fn is_online(&self) -> bool {
        self.status == InstanceStatus::Online
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInstanceRequest {
    #[validate(length(min = 1, max = 128))]
    pub instance_id: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub hostname: String,
    #[serde(default)]
    #[validate(length(max = 64))]
    pub browser: String,
    #[serde(default)]
    #[validate(length(max = 64))]
    pub version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInstanceResponse {
    pub instance: ManagedInstance,
    pub server_time: i64,
}

/// Reply to heartbeat / mark-stale: `accepted` is false when the id is unknown
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckResponse {
    pub accepted: bool,
    pub server_time: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveResponse {
    pub removed: bool,
}

/// Fleet health counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetStats {
    pub total: usize,
    pub online: usize,
    pub stale: usize,
    /// Removed instances that have not registered again
    pub offline: usize,
}
