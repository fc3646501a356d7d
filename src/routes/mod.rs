//! Operational HTTP endpoints

pub mod autohide;
pub mod health;
pub mod metrics;
