//! Sibling ordering
//!
//! Positions are dense 1-based integers per parent. Every helper here runs on
//! a connection that already holds an open transaction; none of them commit.
//!
//! Parents are matched with SQLite's null-safe `IS`, so `None` selects the
//! root group. The optional `exclude` id is matched with `IS NOT`, which keeps
//! every row when it is bound to NULL.

use crate::db::error::DatabaseError;
use libsql::{Connection, Value};

/// Pure position arithmetic, independent of the database
pub struct SiblingOrderCalculator;

impl SiblingOrderCalculator {
    /// Sort order for a node appended after `max_existing`
    pub fn append_after(max_existing: Option<i64>) -> i64 {
        max_existing.unwrap_or(0) + 1
    }

    /// Sort order for a zero-based `target_index` among `sibling_count`
    /// other siblings occupying `1..=sibling_count`.
    ///
    /// Negative indexes clamp to the front, past-the-end indexes to the back.
    ///
    /// # Example
    /// ```
    /// # use ordertree_core::db::SiblingOrderCalculator;
    /// assert_eq!(SiblingOrderCalculator::slot_for_index(0, 3), 1);
    /// assert_eq!(SiblingOrderCalculator::slot_for_index(2, 3), 3);
    /// assert_eq!(SiblingOrderCalculator::slot_for_index(10, 3), 4);
    /// ```
    pub fn slot_for_index(target_index: i64, sibling_count: i64) -> i64 {
        target_index.max(0).saturating_add(1).min(sibling_count + 1)
    }

    /// Check that positions form the run `1..=n`
    pub fn is_contiguous(orders: &[i64]) -> bool {
        orders
            .iter()
            .enumerate()
            .all(|(i, order)| *order == i as i64 + 1)
    }
}

pub(crate) fn parent_value(parent_id: Option<i64>) -> Value {
    parent_id.map(Value::Integer).unwrap_or(Value::Null)
}

async fn query_single_i64(
    conn: &Connection,
    sql: &str,
    params: Vec<Value>,
    what: &str,
) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query(sql, params)
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to query {}: {}", what, e)))?;

    let row = rows
        .next()
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to read {}: {}", what, e)))?
        .ok_or_else(|| DatabaseError::sql_execution(format!("No result row for {}", what)))?;

    row.get::<i64>(0)
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to decode {}: {}", what, e)))
}

/// Highest sort order under `parent_id`, ignoring `exclude`; `None` if empty
pub(crate) async fn max_sort_order(
    conn: &Connection,
    parent_id: Option<i64>,
    exclude: Option<i64>,
) -> Result<Option<i64>, DatabaseError> {
    let mut rows = conn
        .query(
            "SELECT MAX(sort_order) FROM nodes WHERE parent_id IS ?1 AND id IS NOT ?2",
            vec![parent_value(parent_id), parent_value(exclude)],
        )
        .await
        .map_err(|e| DatabaseError::sql_execution(format!("Failed to query max sort order: {}", e)))?;

    match rows.next().await? {
        Some(row) => Ok(row.get::<Option<i64>>(0)?),
        None => Ok(None),
    }
}

/// Number of children under `parent_id`, ignoring `exclude`
pub(crate) async fn count_siblings(
    conn: &Connection,
    parent_id: Option<i64>,
    exclude: Option<i64>,
) -> Result<i64, DatabaseError> {
    query_single_i64(
        conn,
        "SELECT COUNT(*) FROM nodes WHERE parent_id IS ?1 AND id IS NOT ?2",
        vec![parent_value(parent_id), parent_value(exclude)],
        "sibling count",
    )
    .await
}

/// Shift every sibling after `vacated` one position up
pub(crate) async fn close_gap(
    conn: &Connection,
    parent_id: Option<i64>,
    vacated: i64,
    exclude: Option<i64>,
) -> Result<u64, DatabaseError> {
    conn.execute(
        "UPDATE nodes SET sort_order = sort_order - 1
         WHERE parent_id IS ?1 AND sort_order > ?2 AND id IS NOT ?3",
        vec![
            parent_value(parent_id),
            Value::Integer(vacated),
            parent_value(exclude),
        ],
    )
    .await
    .map_err(|e| DatabaseError::sql_execution(format!("Failed to close sibling gap: {}", e)))
}

/// Shift every sibling at or after `slot` one position down
pub(crate) async fn open_slot(
    conn: &Connection,
    parent_id: Option<i64>,
    slot: i64,
    exclude: i64,
) -> Result<u64, DatabaseError> {
    conn.execute(
        "UPDATE nodes SET sort_order = sort_order + 1
         WHERE parent_id IS ?1 AND sort_order >= ?2 AND id IS NOT ?3",
        vec![
            parent_value(parent_id),
            Value::Integer(slot),
            Value::Integer(exclude),
        ],
    )
    .await
    .map_err(|e| DatabaseError::sql_execution(format!("Failed to open sibling slot: {}", e)))
}

/// True if `node_id` is `start` or one of its ancestors.
///
/// Walks `parent_id` links upward from `start`. `UNION` drops repeated ids, so
/// an already corrupted (cyclic) chain still terminates.
pub(crate) async fn ancestor_chain_contains(
    conn: &Connection,
    start: i64,
    node_id: i64,
) -> Result<bool, DatabaseError> {
    let hits = query_single_i64(
        conn,
        "WITH RECURSIVE chain(id) AS (
             SELECT ?1
             UNION
             SELECT n.parent_id FROM nodes n JOIN chain c ON n.id = c.id
             WHERE n.parent_id IS NOT NULL
         )
         SELECT COUNT(*) FROM chain WHERE id = ?2",
        vec![Value::Integer(start), Value::Integer(node_id)],
        "ancestor chain",
    )
    .await?;
    Ok(hits > 0)
}
