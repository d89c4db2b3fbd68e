//! Alert aggregation & geo-mapping
//!
//! - `geo.rs` - domain suffix → region classifier
//! - `aggregator.rs` - heatmap, top-N, severity/source summary
//! - `buffer.rs` - bounded store feeding snapshots to the aggregator

pub mod geo;
pub mod aggregator;
pub mod buffer;

pub use geo::{classify, classify_opt, FALLBACK_REGION};
pub use aggregator::{build_heatmap, summarize, top, total};
pub use buffer::{AlertBuffer, ExtendOutcome};
