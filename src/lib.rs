//! # cfkv
//!
//! A raw (non-transactional) key-value access layer over a pluggable,
//! column-family-organized storage engine:
//! - Point get/put/delete and bounded range scans per column family
//! - Snapshot readers released on every exit path
//! - Atomic write batches
//! - In-memory and durable (WAL + value log) engines
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │               (acceptor + worker pool)                       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   RawKvService                               │
//! │          RawGet / RawPut / RawDelete / RawScan               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │ Reader (snapshot)       │ WriteBatch (atomic)
//!          ▼                         ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Storage (trait)                             │
//! │       MemStorage          |     StandaloneStorage            │
//! │       MemTable            |  MemTable + WAL + value log      │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod memtable;
pub mod network;
pub mod protocol;
pub mod service;
pub mod storage;
pub mod wal;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use error::{CfkvError, Result};
pub use service::RawKvService;
pub use storage::{MemStorage, StandaloneStorage, Storage, StorageReader, WriteBatch};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of cfkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
