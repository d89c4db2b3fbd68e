//! Alert Aggregator
//!
//! Pure folds over a snapshot of alerts. Nothing here holds state or locks;
//! callers hand in a consistent slice (see [`super::AlertBuffer::snapshot`]).

use std::collections::HashMap;

use crate::models::{
    AlertSeverity, AlertSource, AlertSummary, GeoHeatmapEntry, SeverityCount, SourceCount,
    UnifiedAlert,
};
use super::geo;

// ============================================================================
// HEATMAP
// ============================================================================

/// Count alerts per classified region.
///
/// Sorted by count descending. Regions with equal counts keep the order in
/// which they were first seen in `alerts`.
pub fn build_heatmap(alerts: &[UnifiedAlert]) -> Vec<GeoHeatmapEntry> {
    let mut slots: HashMap<&'static str, usize> = HashMap::new();
    let mut entries: Vec<(&'static str, u64)> = Vec::new();

    for alert in alerts {
        let region = geo::classify_opt(alert.domain());
        let slot = *slots.entry(region).or_insert_with(|| {
            entries.push((region, 0));
            entries.len() - 1
        });
        entries[slot].1 += 1;
    }

    // sort_by is stable, so first-seen order survives among ties
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    entries
        .into_iter()
        .map(|(region, count)| GeoHeatmapEntry {
            region: region.to_string(),
            count,
        })
        .collect()
}

/// Sum of all counts
pub fn total(heatmap: &[GeoHeatmapEntry]) -> u64 {
    heatmap.iter().map(|e| e.count).sum()
}

/// First `n` entries of a sorted heatmap
pub fn top(heatmap: &[GeoHeatmapEntry], n: usize) -> Vec<GeoHeatmapEntry> {
    heatmap.iter().take(n).cloned().collect()
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Counts by severity (most severe first) and by source, zero buckets omitted
pub fn summarize(alerts: &[UnifiedAlert]) -> AlertSummary {
    let mut severities: HashMap<AlertSeverity, u64> = HashMap::new();
    let mut sources: HashMap<AlertSource, u64> = HashMap::new();

    for alert in alerts {
        *severities.entry(alert.severity()).or_default() += 1;
        *sources.entry(alert.source()).or_default() += 1;
    }

    let by_severity = AlertSeverity::ALL
        .iter()
        .filter_map(|s| severities.get(s).map(|&count| SeverityCount { severity: *s, count }))
        .collect();

    let by_source = AlertSource::ALL
        .iter()
        .filter_map(|s| sources.get(s).map(|&count| SourceCount { source: *s, count }))
        .collect();

    AlertSummary {
        total: alerts.len() as u64,
        by_severity,
        by_source,
    }
}
