//! LibsqlTreeStore - TreeStore Implementation for libsql
//!
//! Every operation opens its own connection. Mutations run inside
//! `BEGIN IMMEDIATE`, so the read-then-write sequences that keep sibling
//! positions dense (max sort order, gap closing, slot opening) are serialised
//! against other writers.
//!
//! # Row Layout
//!
//! Queries select [`NODE_COLUMNS`] in this order:
//!
//! | idx | column      | type              |
//! |-----|-------------|-------------------|
//! | 0   | id          | INTEGER           |
//! | 1   | parent_id   | INTEGER, nullable |
//! | 2   | name        | TEXT              |
//! | 3   | description | TEXT, nullable    |
//! | 4   | notes       | TEXT, nullable    |
//! | 5   | tags        | TEXT (JSON), nullable |
//! | 6   | metadata    | TEXT (JSON), nullable |
//! | 7   | status      | TEXT, nullable    |
//! | 8   | importance  | INTEGER           |
//! | 9   | sort_order  | INTEGER           |
//!
//! Empty `tags`/`metadata` objects are stored as NULL and NULL reads back as
//! an empty object.

use crate::config::StoreConfig;
use crate::db::sibling_ordering::{
    ancestor_chain_contains, close_gap, count_siblings, max_sort_order, open_slot, parent_value,
    SiblingOrderCalculator,
};
use crate::db::tree_store::TreeStore;
use crate::db::DatabaseService;
use crate::error::{StoreError, StoreResult};
use crate::models::{MutationOutcome, Node};
use async_trait::async_trait;
use libsql::{Connection, Row, Value};
use serde_json::Map;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument;

const NODE_COLUMNS: &str =
    "id, parent_id, name, description, notes, tags, metadata, status, importance, sort_order";

/// libsql-backed ordered tree store
pub struct LibsqlTreeStore {
    db: Arc<DatabaseService>,
    config: StoreConfig,
}

impl LibsqlTreeStore {
    /// Wrap an already opened database
    pub fn new(db: Arc<DatabaseService>, config: StoreConfig) -> Self {
        Self { db, config }
    }

    /// Open (or create) the database at `db_path` using `config.busy_timeout_ms`
    pub async fn open(db_path: PathBuf, config: StoreConfig) -> StoreResult<Self> {
        let db = DatabaseService::with_busy_timeout(db_path, config.busy_timeout_ms).await?;
        Ok(Self::new(Arc::new(db), config))
    }

    pub fn database(&self) -> &Arc<DatabaseService> {
        &self.db
    }

    /// Checkpoint the WAL before shutdown
    pub async fn close(&self) -> StoreResult<()> {
        self.db.db_close().await?;
        Ok(())
    }

    /// Convert a row selected with [`NODE_COLUMNS`] into a Node
    fn row_to_node(row: &Row) -> StoreResult<Node> {
        let id: i64 = row.get(0)?;
        let parent_id: Option<i64> = row.get(1)?;
        let name: String = row.get(2)?;
        let description: Option<String> = row.get(3)?;
        let notes: Option<String> = row.get(4)?;
        let tags: Option<String> = row.get(5)?;
        let metadata: Option<String> = row.get(6)?;
        let status: Option<String> = row.get(7)?;
        let importance: i64 = row.get(8)?;
        let sort_order: i64 = row.get(9)?;

        Ok(Node {
            id,
            parent_id,
            name,
            description,
            notes,
            tags: decode_document(tags.as_deref(), "tags")?,
            metadata: decode_document(metadata.as_deref(), "metadata")?,
            status,
            importance,
            sort_order,
        })
    }

    async fn fetch_node(conn: &Connection, id: i64) -> StoreResult<Option<Node>> {
        let mut rows = conn
            .query(
                &format!("SELECT {} FROM nodes WHERE id = ?1", NODE_COLUMNS),
                vec![Value::Integer(id)],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::row_to_node(&row)?)),
            None => Ok(None),
        }
    }

    async fn fetch_nodes(&self, sql: &str, params: Vec<Value>) -> StoreResult<Vec<Node>> {
        let conn = self.db.connect_with_timeout().await?;
        let mut rows = conn.query(sql, params).await?;

        let mut nodes = Vec::new();
        while let Some(row) = rows.next().await? {
            nodes.push(Self::row_to_node(&row)?);
        }
        Ok(nodes)
    }

    async fn node_exists(conn: &Connection, id: i64) -> StoreResult<bool> {
        let mut rows = conn
            .query("SELECT 1 FROM nodes WHERE id = ?1", vec![Value::Integer(id)])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    /// Commit when `should_commit` accepts the result, roll back otherwise
    ///
    /// On error the original error is returned even if the rollback fails
    /// too; the rollback failure is only logged.
    async fn finish<T>(
        &self,
        conn: &Connection,
        result: StoreResult<T>,
        should_commit: impl FnOnce(&T) -> bool,
    ) -> StoreResult<T> {
        match result {
            Ok(value) if should_commit(&value) => {
                self.db.commit(conn).await?;
                Ok(value)
            }
            Ok(value) => {
                self.db.rollback(conn).await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = self.db.rollback(conn).await {
                    tracing::warn!("Rollback after failed operation failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    async fn insert_in_tx(
        &self,
        conn: &Connection,
        node: &Node,
        tags: Value,
        metadata: Value,
    ) -> StoreResult<i64> {
        let sort_order =
            SiblingOrderCalculator::append_after(max_sort_order(conn, node.parent_id, None).await?);

        conn.execute(
            "INSERT INTO nodes (parent_id, name, description, notes, tags, metadata, status, importance, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            vec![
                parent_value(node.parent_id),
                Value::Text(node.name.clone()),
                text_value(node.description.as_deref()),
                text_value(node.notes.as_deref()),
                tags,
                metadata,
                text_value(node.status.as_deref()),
                Value::Integer(node.importance),
                Value::Integer(sort_order),
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn update_in_tx(
        &self,
        conn: &Connection,
        old: &Node,
        new: &Node,
        tags: Value,
        metadata: Value,
    ) -> StoreResult<MutationOutcome> {
        let affected = conn
            .execute(
                "UPDATE nodes
                 SET parent_id = ?1, name = ?2, description = ?3, notes = ?4,
                     tags = ?5, metadata = ?6, status = ?7, importance = ?8
                 WHERE id = ?9 AND parent_id IS ?10 AND status IS ?11 AND importance = ?12",
                vec![
                    parent_value(new.parent_id),
                    Value::Text(new.name.clone()),
                    text_value(new.description.as_deref()),
                    text_value(new.notes.as_deref()),
                    tags,
                    metadata,
                    text_value(new.status.as_deref()),
                    Value::Integer(new.importance),
                    Value::Integer(old.id),
                    parent_value(old.parent_id),
                    text_value(old.status.as_deref()),
                    Value::Integer(old.importance),
                ],
            )
            .await?;

        if affected == 1 {
            if new.parent_id == old.parent_id {
                return Ok(MutationOutcome::Applied);
            }
            return self
                .reposition_after_reparent(conn, old.id, old.parent_id, new.parent_id)
                .await;
        }

        if Self::node_exists(conn, old.id).await? {
            Ok(MutationOutcome::PreconditionFailed)
        } else {
            Ok(MutationOutcome::NotFound)
        }
    }

    /// Keep both sibling groups dense after an update changed `parent_id`
    ///
    /// The row already carries the new parent but still holds its old
    /// `sort_order`; it is appended after the new parent's other children.
    async fn reposition_after_reparent(
        &self,
        conn: &Connection,
        id: i64,
        old_parent_id: Option<i64>,
        new_parent_id: Option<i64>,
    ) -> StoreResult<MutationOutcome> {
        if self.config.reject_cycles {
            if let Some(parent) = new_parent_id {
                if ancestor_chain_contains(conn, parent, id).await? {
                    return Ok(MutationOutcome::WouldCreateCycle);
                }
            }
        }

        let vacated = match Self::fetch_node(conn, id).await? {
            Some(node) => node.sort_order,
            None => return Ok(MutationOutcome::NotFound),
        };
        close_gap(conn, old_parent_id, vacated, Some(id)).await?;

        let sort_order = SiblingOrderCalculator::append_after(
            max_sort_order(conn, new_parent_id, Some(id)).await?,
        );
        conn.execute(
            "UPDATE nodes SET sort_order = ?1 WHERE id = ?2",
            vec![Value::Integer(sort_order), Value::Integer(id)],
        )
        .await?;

        Ok(MutationOutcome::Applied)
    }

    async fn delete_in_tx(&self, conn: &Connection, old: &Node) -> StoreResult<MutationOutcome> {
        let stored = match Self::fetch_node(conn, old.id).await? {
            Some(stored) => stored,
            None => return Ok(MutationOutcome::NotFound),
        };

        if !stored.watched_fields_match(old) {
            return Ok(MutationOutcome::PreconditionFailed);
        }

        if self.config.reject_delete_with_children
            && count_siblings(conn, Some(stored.id), None).await? > 0
        {
            return Ok(MutationOutcome::HasChildren);
        }

        let affected = conn
            .execute(
                "DELETE FROM nodes
                 WHERE id = ?1 AND parent_id IS ?2 AND status IS ?3 AND importance = ?4",
                vec![
                    Value::Integer(old.id),
                    parent_value(old.parent_id),
                    text_value(old.status.as_deref()),
                    Value::Integer(old.importance),
                ],
            )
            .await?;

        if affected != 1 {
            return Ok(MutationOutcome::PreconditionFailed);
        }

        close_gap(conn, stored.parent_id, stored.sort_order, None).await?;
        Ok(MutationOutcome::Applied)
    }

    async fn move_in_tx(
        &self,
        conn: &Connection,
        id: i64,
        new_parent_id: Option<i64>,
        target_index: Option<i64>,
    ) -> StoreResult<MutationOutcome> {
        let current = match Self::fetch_node(conn, id).await? {
            Some(node) => node,
            None => return Ok(MutationOutcome::NotFound),
        };

        if self.config.reject_cycles {
            if let Some(parent) = new_parent_id {
                if ancestor_chain_contains(conn, parent, id).await? {
                    return Ok(MutationOutcome::WouldCreateCycle);
                }
            }
        }

        close_gap(conn, current.parent_id, current.sort_order, Some(id)).await?;

        let sort_order = match target_index {
            Some(index) => {
                let others = count_siblings(conn, new_parent_id, Some(id)).await?;
                let slot = SiblingOrderCalculator::slot_for_index(index, others);
                open_slot(conn, new_parent_id, slot, id).await?;
                slot
            }
            None => SiblingOrderCalculator::append_after(
                max_sort_order(conn, new_parent_id, Some(id)).await?,
            ),
        };

        let affected = conn
            .execute(
                "UPDATE nodes SET parent_id = ?1, sort_order = ?2 WHERE id = ?3",
                vec![
                    parent_value(new_parent_id),
                    Value::Integer(sort_order),
                    Value::Integer(id),
                ],
            )
            .await?;

        if affected != 1 {
            return Ok(MutationOutcome::NotFound);
        }
        Ok(MutationOutcome::Applied)
    }
}

fn text_value(value: Option<&str>) -> Value {
    value
        .map(|v| Value::Text(v.to_string()))
        .unwrap_or(Value::Null)
}

fn encode_document(map: &Map<String, serde_json::Value>, field: &str) -> StoreResult<Value> {
    if map.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::to_string(map)
        .map(Value::Text)
        .map_err(|e| StoreError::serialization(format!("Failed to serialize {}: {}", field, e)))
}

fn decode_document(
    raw: Option<&str>,
    field: &str,
) -> StoreResult<Map<String, serde_json::Value>> {
    match raw {
        None => Ok(Map::new()),
        Some(text) if text.trim().is_empty() => Ok(Map::new()),
        Some(text) => serde_json::from_str(text)
            .map_err(|e| StoreError::serialization(format!("Failed to parse {}: {}", field, e))),
    }
}

#[async_trait]
impl TreeStore for LibsqlTreeStore {
    #[instrument(skip(self, node), fields(parent_id = ?node.parent_id))]
    async fn create_node(&self, node: &Node) -> StoreResult<i64> {
        node.validate()?;
        let tags = encode_document(&node.tags, "tags")?;
        let metadata = encode_document(&node.metadata, "metadata")?;

        let conn = self.db.connect_with_timeout().await?;
        self.db.begin(&conn).await?;
        let result = self.insert_in_tx(&conn, node, tags, metadata).await;
        let id = self.finish(&conn, result, |_| true).await?;

        tracing::debug!(id, "Node created");
        Ok(id)
    }

    async fn get_node(&self, id: i64) -> StoreResult<Option<Node>> {
        let conn = self.db.connect_with_timeout().await?;
        Self::fetch_node(&conn, id).await
    }

    async fn get_children(&self, parent_id: Option<i64>) -> StoreResult<Vec<Node>> {
        self.fetch_nodes(
            &format!(
                "SELECT {} FROM nodes WHERE parent_id IS ?1 ORDER BY sort_order, id",
                NODE_COLUMNS
            ),
            vec![parent_value(parent_id)],
        )
        .await
    }

    async fn get_all_nodes(&self) -> StoreResult<Vec<Node>> {
        self.fetch_nodes(
            &format!(
                "SELECT {} FROM nodes ORDER BY parent_id, sort_order, id",
                NODE_COLUMNS
            ),
            Vec::new(),
        )
        .await
    }

    async fn count_children(&self, parent_id: Option<i64>) -> StoreResult<i64> {
        let conn = self.db.connect_with_timeout().await?;
        Ok(count_siblings(&conn, parent_id, None).await?)
    }

    #[instrument(skip(self, old, new), fields(id = old.id))]
    async fn update_node(&self, old: &Node, new: &Node) -> StoreResult<MutationOutcome> {
        new.validate()?;
        let tags = encode_document(&new.tags, "tags")?;
        let metadata = encode_document(&new.metadata, "metadata")?;

        let conn = self.db.connect_with_timeout().await?;
        self.db.begin(&conn).await?;
        let result = self.update_in_tx(&conn, old, new, tags, metadata).await;
        let outcome = self.finish(&conn, result, |o| o.is_applied()).await?;

        if outcome.is_applied() {
            tracing::debug!("Node updated");
        } else {
            tracing::warn!(%outcome, "Update rejected");
        }
        Ok(outcome)
    }

    #[instrument(skip(self, old), fields(id = old.id))]
    async fn delete_node(&self, old: &Node) -> StoreResult<MutationOutcome> {
        let conn = self.db.connect_with_timeout().await?;
        self.db.begin(&conn).await?;
        let result = self.delete_in_tx(&conn, old).await;
        let outcome = self.finish(&conn, result, |o| o.is_applied()).await?;

        if outcome.is_applied() {
            tracing::debug!("Node deleted");
        } else {
            tracing::warn!(%outcome, "Delete rejected");
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    async fn move_node(
        &self,
        id: i64,
        new_parent_id: Option<i64>,
        target_index: Option<i64>,
    ) -> StoreResult<MutationOutcome> {
        let conn = self.db.connect_with_timeout().await?;
        self.db.begin(&conn).await?;
        let result = self
            .move_in_tx(&conn, id, new_parent_id, target_index)
            .await;
        let outcome = self.finish(&conn, result, |o| o.is_applied()).await?;

        if outcome.is_applied() {
            tracing::debug!("Node moved");
        } else {
            tracing::warn!(%outcome, "Move rejected");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use tempfile::TempDir;

    async fn create_test_store(config: StoreConfig) -> Result<(LibsqlTreeStore, TempDir)> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("test.db");
        let store = LibsqlTreeStore::open(db_path, config).await?;
        Ok((store, temp_dir))
    }

    async fn raw_column(store: &LibsqlTreeStore, column: &str, id: i64) -> Result<Option<String>> {
        let conn = store.database().connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {} FROM nodes WHERE id = ?1", column),
                vec![Value::Integer(id)],
            )
            .await?;
        let row = rows.next().await?.expect("row exists");
        Ok(row.get::<Option<String>>(0)?)
    }

    #[test]
    fn test_document_encoding() {
        assert_eq!(encode_document(&Map::new(), "tags").unwrap(), Value::Null);

        let map = json!({"a": 1}).as_object().cloned().unwrap();
        assert_eq!(
            encode_document(&map, "tags").unwrap(),
            Value::Text(r#"{"a":1}"#.to_string())
        );

        assert!(decode_document(None, "tags").unwrap().is_empty());
        assert!(decode_document(Some(""), "tags").unwrap().is_empty());
        assert_eq!(decode_document(Some(r#"{"a":1}"#), "tags").unwrap(), map);
        assert!(matches!(
            decode_document(Some("[1,2]"), "tags"),
            Err(StoreError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_create_and_get_node() -> Result<()> {
        let (store, _temp_dir) = create_test_store(StoreConfig::default()).await?;

        let node = Node::new("Inbox", None)
            .with_description("Unsorted items")
            .with_status("Active")
            .with_importance(3);
        let id = store.create_node(&node).await?;

        let fetched = store.get_node(id).await?.expect("node exists");
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.name, "Inbox");
        assert_eq!(fetched.description.as_deref(), Some("Unsorted items"));
        assert_eq!(fetched.status.as_deref(), Some("Active"));
        assert_eq!(fetched.importance, 3);
        assert_eq!(fetched.sort_order, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_missing_node() -> Result<()> {
        let (store, _temp_dir) = create_test_store(StoreConfig::default()).await?;
        assert!(store.get_node(999).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() -> Result<()> {
        let (store, _temp_dir) = create_test_store(StoreConfig::default()).await?;

        let err = store.create_node(&Node::new("  ", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.get_all_nodes().await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_documents_stored_as_null() -> Result<()> {
        let (store, _temp_dir) = create_test_store(StoreConfig::default()).await?;

        let plain = store.create_node(&Node::new("Plain", None)).await?;
        assert_eq!(raw_column(&store, "tags", plain).await?, None);
        assert_eq!(raw_column(&store, "metadata", plain).await?, None);

        let tagged = store
            .create_node(
                &Node::new("Tagged", None)
                    .with_tags(json!({"area": "work"}).as_object().cloned().unwrap())
                    .with_metadata(json!({"source": {"kind": "import"}}).as_object().cloned().unwrap()),
            )
            .await?;
        let fetched = store.get_node(tagged).await?.expect("node exists");
        assert_eq!(fetched.tags["area"], "work");
        assert_eq!(fetched.metadata["source"]["kind"], "import");

        Ok(())
    }

    #[tokio::test]
    async fn test_update_node() -> Result<()> {
        let (store, _temp_dir) = create_test_store(StoreConfig::default()).await?;

        let id = store.create_node(&Node::new("Draft", None).with_status("Open")).await?;
        let old = store.get_node(id).await?.expect("node exists");

        let mut new = old.clone();
        new.name = "Final".to_string();
        new.notes = Some("ship it".to_string());
        new.status = Some("Done".to_string());

        assert_eq!(store.update_node(&old, &new).await?, MutationOutcome::Applied);

        let fetched = store.get_node(id).await?.expect("node exists");
        assert_eq!(fetched.name, "Final");
        assert_eq!(fetched.notes.as_deref(), Some("ship it"));
        assert_eq!(fetched.status.as_deref(), Some("Done"));
        assert_eq!(fetched.sort_order, old.sort_order);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_distinguishes_missing_from_stale() -> Result<()> {
        let (store, _temp_dir) = create_test_store(StoreConfig::default()).await?;

        let id = store.create_node(&Node::new("Task", None).with_importance(1)).await?;
        let old = store.get_node(id).await?.expect("node exists");

        let mut stale = old.clone();
        stale.importance = 2;
        let new = old.clone().with_importance(5);
        assert_eq!(
            store.update_node(&stale, &new).await?,
            MutationOutcome::PreconditionFailed
        );
        assert_eq!(store.get_node(id).await?.expect("node exists").importance, 1);

        let mut missing = old.clone();
        missing.id = id + 100;
        assert_eq!(
            store.update_node(&missing, &new).await?,
            MutationOutcome::NotFound
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_move_rolls_back_when_rejected() -> Result<()> {
        let config = StoreConfig::default().with_reject_cycles(true);
        let (store, _temp_dir) = create_test_store(config).await?;

        let a = store.create_node(&Node::new("A", None)).await?;
        let b = store.create_node(&Node::new("B", Some(a))).await?;

        assert_eq!(
            store.move_node(a, Some(b), Some(0)).await?,
            MutationOutcome::WouldCreateCycle
        );
        assert_eq!(
            store.move_node(a, Some(a), None).await?,
            MutationOutcome::WouldCreateCycle
        );

        let roots = store.get_children(None).await?;
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, a);
        assert_eq!(roots[0].sort_order, 1);

        Ok(())
    }
}
