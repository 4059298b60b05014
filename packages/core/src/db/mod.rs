//! Database Layer
//!
//! This module handles all database interactions using libsql:
//!
//! - Database initialization and connection management
//! - Transaction framing for mutations (`BEGIN IMMEDIATE`)
//! - Dense 1-based sibling positions per parent
//!
//! # Architecture
//!
//! The ordered tree lives in a single `nodes` table (flat adjacency list).
//! Front ends talk to the [`TreeStore`] trait; [`LibsqlTreeStore`] implements
//! it on top of [`DatabaseService`].

mod database;
mod error;
mod libsql_store;
pub mod sibling_ordering;
mod tree_store;

pub use database::DatabaseService;
pub use error::DatabaseError;
pub use libsql_store::LibsqlTreeStore;
pub use sibling_ordering::SiblingOrderCalculator;
pub use tree_store::TreeStore;
