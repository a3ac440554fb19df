//! Duplex core library - domain types, configuration, run log, heartbeat.
//!
//! Public API surface:
//! - [`types`] - newtypes and domain structs
//! - [`error`] - [`ConfigError`], [`StateError`]
//! - [`config`] - [`SyncConfig`] load / validation / role resolution
//! - [`runlog`] - the timestamped run log shared by every phase
//! - [`heartbeat`] - atomic heartbeat record persistence

pub mod config;
pub mod error;
pub mod heartbeat;
pub mod runlog;
pub mod types;

pub use config::SyncConfig;
pub use error::{ConfigError, StateError};
pub use types::{
    CountComparison, Direction, HeartbeatRecord, HeartbeatStatus, HostName, Role, RunStatus,
    Severity, SyncMode, SyncResult,
};
