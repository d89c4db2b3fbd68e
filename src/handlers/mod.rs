//! HTTP handlers

pub mod health;
pub mod instances;
pub mod alerts;
