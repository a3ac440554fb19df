//! Transfer execution for `duplex-transfer`.
//!
//! This crate owns every child process the orchestrator spawns: the
//! delta-transfer tool for each direction and the remote shell for remote
//! file counts. It never interprets what the tool did beyond capturing its
//! exit status verbatim; retry, alerting, and overall run policy live in
//! `duplex-runtime`.
//!
//! Failure philosophy, matching how results are consumed:
//! - a tool that cannot be launched yields exit code 127, the shell
//!   convention for a missing command;
//! - a child killed by a signal (including our own timeout kill) yields
//!   `128 + signal`;
//! - a failed remote count degrades to 0 and is logged, never raised.

pub mod command;
pub mod count;
pub mod runner;

pub use command::{endpoints, transfer_args, Location};
pub use count::{count_local, count_remote};
pub use runner::{run_direction, DirectionRun, RunEnd, ToolRun};
