//! Domain layer for Lumunus.
//!
//! Lumunus simulates a facilitated three-party conversation (the user, a
//! simulated partner and an AI facilitator) and a two-party prep dialogue that
//! walks through fixed phases and ends with an invitation summary.
//!
//! This crate holds the state and pure transitions. Scheduling lives in
//! `lumunus-execution`.

pub mod config;
pub mod error;
pub mod participant;
pub mod presets;
pub mod response;
pub mod session;
pub mod synthesis;

// Re-export common types
pub use config::LumunusConfig;
pub use error::{LumunusError, Result};
pub use response::{ResponseCursor, ResponseList, SelectionPolicy};
