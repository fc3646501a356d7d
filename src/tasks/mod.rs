//! Background tasks

pub mod autohide;
pub mod scheduler;
