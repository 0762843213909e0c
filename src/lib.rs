//! task-tracker - file-backed task list
//!
//! This library provides the store behind the task-tracker CLI: a single
//! JSON file of tasks that several processes may modify concurrently.
//!
//! # Core Concepts
//!
//! - **Tasks**: id, description, status and timestamps
//! - **Status lifecycle**: a fixed table of allowed status moves
//! - **Store lock**: an exclusive-create marker file serializing writers
//! - **Atomic writes**: temp file + rename, so readers never see a torn file
//!
//! # Module Organization
//!
//! - `task`: Task record, status lifecycle, record encoding
//! - `codec`: Store container encoding and lenient decoding
//! - `lock`: Store lock with timeout
//! - `atomic`: Atomic file replacement
//! - `storage`: `TaskStore`, the business operations
//! - `config`: Configuration loading from `.task-tracker.toml`
//! - `error`: Error types and result aliases
//! - `output`: CLI output formatting
//! - `cli`: Command-line interface using clap

pub mod atomic;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod lock;
pub mod output;
pub mod storage;
pub mod task;

pub use error::{Error, Result};
pub use storage::TaskStore;
pub use task::{Status, Task};
