//! OrderTree Core - Ordered Tree Store
//!
//! This crate persists a hierarchy of named nodes in an embedded libsql
//! database. Each node has an optional parent and a position among its
//! siblings; positions stay dense (`1..=n`) across create, move and delete.
//!
//! # Architecture
//!
//! - **Flat adjacency list**: one `nodes` table, `parent_id` NULL for roots
//! - **Explicit ordering**: integer `sort_order` per sibling group
//! - **Optimistic concurrency**: update and delete compare a snapshot of the
//!   watched fields (`parent_id`, `status`, `importance`) inside the write
//! - **Atomic mutations**: each mutation is one `BEGIN IMMEDIATE` transaction
//!
//! # Modules
//!
//! - [`models`] - `Node` and `MutationOutcome`
//! - [`db`] - Database layer, `TreeStore` trait and its libsql implementation
//! - [`config`] - Store configuration
//! - [`error`] - Store error types

pub mod config;
pub mod db;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::StoreConfig;
pub use db::{DatabaseService, LibsqlTreeStore, TreeStore};
pub use error::{StoreError, StoreResult};
pub use models::*;
