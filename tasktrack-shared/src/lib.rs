//! # TaskTrack Shared Library
//!
//! Persistence core for the TaskTrack project tracker. Records live in flat
//! comma-delimited files (one record per line) or, alternatively, in an
//! in-process document store that honors the same repository contracts.
//!
//! ## Module Organization
//!
//! - `models`: Domain entities (users, projects, tasks, task states, audit logs)
//! - `codec`: Entity <-> single-line text encoding
//! - `store`: Line-level flat file operations
//! - `diff`: Field-level change detection between two snapshots
//! - `repository`: Entity repositories for both backends
//! - `audit`: Audit trail queries, including the project roll-up
//! - `session`: Explicit session context and the `auth.csv` snapshot
//! - `backend`: Wiring of a complete backend from configuration
//! - `config`: Configuration management
//! - `error`: Repository error taxonomy
//! - `telemetry`: Tracing subscriber setup

pub mod audit;
pub mod backend;
pub mod codec;
pub mod config;
pub mod diff;
pub mod error;
pub mod models;
pub mod repository;
pub mod session;
pub mod store;
pub mod telemetry;

/// Current version of the TaskTrack shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
