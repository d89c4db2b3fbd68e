//! Fleet Registry
//!
//! ## Structure
//! - `registry.rs` - instance records, register/heartbeat/stale/remove
//! - `sweeper.rs` - periodic job that marks lapsed instances stale
//! - `clock.rs` - injectable time source

pub mod clock;
pub mod registry;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::{FleetRegistry, RegistryError};
pub use sweeper::StalenessSweeper;
