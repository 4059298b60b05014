//! Node Data Structures
//!
//! This module defines the `Node` struct, the single entity persisted by the
//! ordered tree store, together with its validation errors.
//!
//! # Architecture
//!
//! - **Flat adjacency list**: every node stores an optional `parent_id`;
//!   callers rebuild the tree from those links
//! - **Sibling ordering**: `sort_order` is a 1-based position that is only
//!   meaningful among nodes sharing the same `parent_id`
//! - **Free-form documents**: `tags` and `metadata` are arbitrary JSON objects
//!
//! # Wire Format
//!
//! Serialized field names follow the HTTP API (`ID`, `ParentID`, `Name`, ...).
//! Every field has a default, so partial snapshots such as the `old` object
//! of a delete request deserialize cleanly. A missing `Name` is caught by
//! [`Node::validate`] when the node is created.
//!
//! # Examples
//!
//! ```rust
//! use ordertree_core::models::Node;
//! use serde_json::json;
//!
//! let root = Node::new("Projects", None);
//! let task = Node::new("Write report", Some(7))
//!     .with_status("Active")
//!     .with_importance(2)
//!     .with_tags(json!({"area": "work"}).as_object().cloned().unwrap_or_default());
//!
//! assert!(root.is_root());
//! assert_eq!(task.parent_id, Some(7));
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Validation errors for Node operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid target index: {0}")]
    InvalidTargetIndex(i64),
}

/// A node in the ordered hierarchy.
///
/// # Fields
///
/// - `id`: Database-generated identifier (`0` until the node is persisted)
/// - `parent_id`: Parent node, `None` for roots. Not checked for existence.
/// - `name`: Required display name
/// - `description`, `notes`: Optional free text
/// - `tags`, `metadata`: JSON objects, empty when absent
/// - `status`: Optional status label
/// - `importance`: Integer weight, 0 by default
/// - `sort_order`: 1-based position among siblings, assigned by the store
///
/// `parent_id`, `status` and `importance` are the watched fields of the
/// optimistic concurrency check performed by update and delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "ID", default)]
    pub id: i64,

    #[serde(rename = "ParentID", default)]
    pub parent_id: Option<i64>,

    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "Description", default)]
    pub description: Option<String>,

    #[serde(rename = "Notes", default)]
    pub notes: Option<String>,

    #[serde(rename = "Tags", default, deserialize_with = "null_as_empty_map")]
    pub tags: Map<String, Value>,

    #[serde(rename = "Metadata", default, deserialize_with = "null_as_empty_map")]
    pub metadata: Map<String, Value>,

    #[serde(rename = "Status", default)]
    pub status: Option<String>,

    #[serde(rename = "Importance", default)]
    pub importance: i64,

    #[serde(rename = "SortOrder", default)]
    pub sort_order: i64,
}

/// `null` and a missing field both mean "no entries"
fn null_as_empty_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Node {
    /// Create an unsaved node with the given name and parent.
    ///
    /// All optional fields start empty; `id` and `sort_order` are assigned
    /// by the store on creation.
    pub fn new(name: impl Into<String>, parent_id: Option<i64>) -> Self {
        Self {
            id: 0,
            parent_id,
            name: name.into(),
            description: None,
            notes: None,
            tags: Map::new(),
            metadata: Map::new(),
            status: None,
            importance: 0,
            sort_order: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_tags(mut self, tags: Map<String, Value>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_importance(mut self, importance: i64) -> Self {
        self.importance = importance;
        self
    }

    /// Check if this node is a root (has no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Validate the node before insertion
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` when `name` is empty or only
    /// whitespace.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("Name".to_string()));
        }
        Ok(())
    }

    /// Compare the fields watched by the optimistic concurrency check.
    ///
    /// `None == None` holds for the nullable fields, matching the null-safe
    /// comparison the store performs in SQL.
    pub fn watched_fields_match(&self, other: &Node) -> bool {
        self.parent_id == other.parent_id
            && self.status == other.status
            && self.importance == other.importance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_creation() {
        let node = Node::new("Inbox", None);

        assert_eq!(node.id, 0);
        assert_eq!(node.name, "Inbox");
        assert!(node.is_root());
        assert!(node.tags.is_empty());
        assert!(node.metadata.is_empty());
        assert_eq!(node.importance, 0);
    }

    #[test]
    fn test_node_validation() {
        assert!(Node::new("Valid", None).validate().is_ok());

        let err = Node::new("   ", Some(3)).validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingField("Name".to_string()));
    }

    #[test]
    fn test_watched_fields_match_is_null_safe() {
        let a = Node::new("A", None).with_importance(1);
        let mut b = Node::new("renamed", None).with_importance(1);
        b.description = Some("ignored by the check".to_string());
        b.sort_order = 9;
        assert!(a.watched_fields_match(&b));

        b.status = Some("Active".to_string());
        assert!(!a.watched_fields_match(&b));

        let c = Node::new("A", Some(4)).with_importance(1);
        assert!(!a.watched_fields_match(&c));
    }

    #[test]
    fn test_serialization_uses_wire_names() {
        let node = Node::new("Child", Some(12))
            .with_status("Active")
            .with_tags(json!({"k": "v"}).as_object().cloned().unwrap());

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["Name"], "Child");
        assert_eq!(value["ParentID"], 12);
        assert_eq!(value["Status"], "Active");
        assert_eq!(value["Tags"]["k"], "v");
        assert_eq!(value["SortOrder"], 0);
    }

    #[test]
    fn test_partial_snapshot_deserializes() {
        let node: Node = serde_json::from_value(json!({
            "ID": 44,
            "ParentID": null,
            "Name": "",
            "Status": "Parent",
            "Importance": 1,
            "Tags": null
        }))
        .unwrap();

        assert_eq!(node.id, 44);
        assert!(node.parent_id.is_none());
        assert_eq!(node.status.as_deref(), Some("Parent"));
        assert_eq!(node.importance, 1);
        assert!(node.tags.is_empty());
        assert!(node.metadata.is_empty());
    }

    #[test]
    fn test_missing_name_fails_validation() {
        let node: Node = serde_json::from_value(json!({"ParentID": 1})).unwrap();
        assert!(node.name.is_empty());
        assert!(node.validate().is_err());
    }
}
