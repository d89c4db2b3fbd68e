//! Alert ingest and aggregate view handlers

use axum::{extract::{State, Query}, Json};
use validator::Validate;

use crate::{AppState, AppError, AppResult};
use crate::alerts::{self, geo};
use crate::models::{
    AlertSummary, ClassifyQuery, ClassifyResponse, HeatmapQuery, HeatmapResponse,
    IngestAlertsRequest, IngestAlertsResponse, UnifiedAlert,
};

/// Normalize a batch of detector alerts into the buffer.
///
/// All-or-nothing: one invalid alert rejects the batch.
pub async fn ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestAlertsRequest>,
) -> AppResult<Json<IngestAlertsResponse>> {
    req.validate()?;

    let batch = req
        .alerts
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            UnifiedAlert::normalize(raw).map_err(|e| {
                tracing::warn!("Rejected alert batch at index {}: {}", i, e);
                AppError::ValidationError(format!("alerts[{}]: {}", i, e))
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let outcome = state.alerts.extend(batch);

    tracing::debug!(
        "Ingested {} alerts ({} duplicate, {} evicted)",
        outcome.accepted, outcome.duplicates, outcome.evicted
    );

    Ok(Json(IngestAlertsResponse {
        accepted: outcome.accepted,
        duplicates: outcome.duplicates,
        evicted: outcome.evicted,
        buffered: state.alerts.len(),
    }))
}

/// Geographic heatmap over the buffered alerts
pub async fn heatmap(
    State(state): State<AppState>,
    Query(query): Query<HeatmapQuery>,
) -> Json<HeatmapResponse> {
    let snapshot = state.alerts.snapshot();
    let heatmap = alerts::build_heatmap(&snapshot);
    let n = query.top.unwrap_or(state.config.heatmap_top_default);

    Json(HeatmapResponse {
        total: alerts::total(&heatmap),
        region_count: heatmap.len(),
        entries: alerts::top(&heatmap, n),
    })
}

/// Counts by severity and source
pub async fn summary(State(state): State<AppState>) -> Json<AlertSummary> {
    Json(alerts::summarize(&state.alerts.snapshot()))
}

/// Classify a single domain
pub async fn classify(Query(query): Query<ClassifyQuery>) -> Json<ClassifyResponse> {
    let domain = query.domain.unwrap_or_default();
    let region = geo::classify(&domain).to_string();
    Json(ClassifyResponse { domain, region })
}
