//! Data models

pub mod instance;
pub mod alert;
pub mod heatmap;

pub use instance::*;
pub use alert::*;
pub use heatmap::*;
