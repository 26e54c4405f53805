//! Core of calsync: reconciles a schedule of events against remote calendars.
//!
//! This crate is shared by the calsync CLI and calendar providers:
//! - `record` and `schedule` for the desired events and where they come from
//! - `store` for resumable local sync state
//! - `retry` and `quota` for throttled remote calls
//! - `engine`, `resolver` and `dedupe` for the reconciliation passes
//! - `remote` for the service interface and the provider protocol

pub mod config;
pub mod constants;
pub mod date_range;
pub mod dedupe;
pub mod engine;
pub mod error;
pub mod quota;
pub mod record;
pub mod remote;
pub mod resolver;
pub mod retry;
pub mod schedule;
pub mod store;

pub use error::{CalSyncError, CalSyncResult};
