//! TreeStore Trait - Ordered Tree Abstraction
//!
//! `TreeStore` is the narrow interface front ends (the HTTP layer, tests,
//! scripts) use to reach the ordered tree. `LibsqlTreeStore` is the
//! production implementation.
//!
//! # Contract
//!
//! - Every mutation is atomic: it either commits completely or leaves the
//!   stored state exactly as it was.
//! - Recoverable conditions are values: `Ok(None)` for a missing node on
//!   read, a non-`Applied` [`MutationOutcome`] for refused mutations.
//! - Storage failures are `Err(StoreError)` and are never folded into
//!   `MutationOutcome`.
//! - After every successful create, delete, move and reparenting update, the
//!   sort orders of each affected sibling group form the run `1..=n`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use ordertree_core::db::{DatabaseService, LibsqlTreeStore, TreeStore};
//! use ordertree_core::models::Node;
//! use ordertree_core::StoreConfig;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Arc::new(DatabaseService::new(PathBuf::from("./data/ordertree.db")).await?);
//! let store: Arc<dyn TreeStore> = Arc::new(LibsqlTreeStore::new(db, StoreConfig::default()));
//!
//! let root = store.create_node(&Node::new("Projects", None)).await?;
//! let child = store.create_node(&Node::new("Report", Some(root))).await?;
//!
//! // Move the child to the front of the root group
//! let outcome = store.move_node(child, None, Some(0)).await?;
//! assert!(outcome.is_applied());
//! # Ok(())
//! # }
//! ```

use crate::error::StoreResult;
use crate::models::{MutationOutcome, Node};
use async_trait::async_trait;

/// Persistence operations of the ordered tree
///
/// Implementations must be `Send + Sync` so a single store can be shared
/// across request handlers behind an `Arc`.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Insert `node` as the last child of `node.parent_id`
    ///
    /// The stored `sort_order` is one past the current maximum among the new
    /// node's siblings (1 for the first child). `node.id` and
    /// `node.sort_order` are ignored. The parent is not required to exist.
    ///
    /// # Returns
    ///
    /// The generated ID
    ///
    /// # Errors
    ///
    /// `StoreError::Validation` if the name is blank.
    async fn create_node(&self, node: &Node) -> StoreResult<i64>;

    /// Get node by ID
    ///
    /// - `Ok(Some(node))` if node exists
    /// - `Ok(None)` if node doesn't exist (not an error)
    async fn get_node(&self, id: i64) -> StoreResult<Option<Node>>;

    /// Direct children of `parent_id` (`None` = roots), ascending `sort_order`
    async fn get_children(&self, parent_id: Option<i64>) -> StoreResult<Vec<Node>>;

    /// Every node, ordered by `(parent_id, sort_order)`; roots first
    async fn get_all_nodes(&self) -> StoreResult<Vec<Node>>;

    /// Number of direct children of `parent_id`
    async fn count_children(&self, parent_id: Option<i64>) -> StoreResult<i64>;

    /// Replace the mutable fields of `old.id` with the values of `new`
    ///
    /// Applied only if the stored `parent_id`, `status` and `importance`
    /// still equal those of `old` (null-safe). Name, description, notes,
    /// tags, metadata and sort order are not part of the check, so
    /// concurrent edits to them are overwritten. `new.sort_order` and
    /// `new.id` are ignored. When `new.parent_id` differs the node is
    /// appended after the new parent's last child and the old group is
    /// renumbered, as with a move without index.
    async fn update_node(&self, old: &Node, new: &Node) -> StoreResult<MutationOutcome>;

    /// Delete `old.id` if its watched fields still match `old`
    ///
    /// The remaining siblings are renumbered to close the gap. Children are
    /// not touched and keep pointing at the deleted ID unless the store is
    /// configured to refuse such deletes.
    async fn delete_node(&self, old: &Node) -> StoreResult<MutationOutcome>;

    /// Move `id` under `new_parent_id` at zero-based `target_index`
    ///
    /// Without `target_index` the node is appended after the new parent's
    /// last child, even when the parent does not change. Past-the-end indexes
    /// append as well.
    async fn move_node(
        &self,
        id: i64,
        new_parent_id: Option<i64>,
        target_index: Option<i64>,
    ) -> StoreResult<MutationOutcome>;
}
