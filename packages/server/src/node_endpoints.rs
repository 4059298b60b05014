//! Node Endpoints
//!
//! Thin translation between HTTP requests and `TreeStore` calls.
//!
//! # Endpoints
//!
//! - `GET /` - Banner
//! - `GET /health` - Health check endpoint
//! - `POST /nodes` - Create a node as the last child of its parent
//! - `GET /nodes` - All nodes, or the children of `?parent=<id|null>`
//! - `GET /nodes/:id` - Get a node by ID
//! - `PATCH /nodes/:id` - Concurrency-checked update, body `{old, new}`
//! - `DELETE /nodes/:id` - Concurrency-checked delete, body `{old}`
//! - `POST /nodes/:id/move` - Move, body `{new_parent_id?, target_index?}`

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use ordertree_core::{MutationOutcome, Node, ValidationError};
use serde::{Deserialize, Serialize};

use crate::{AppState, HttpError};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Plain confirmation body
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response from node creation
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub message: String,
    #[serde(rename = "ID")]
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Parent ID, or `null` for the roots
    parent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub old: Node,
    pub new: Node,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub old: Node,
}

#[derive(Debug, Default, Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    pub new_parent_id: Option<i64>,
    #[serde(default)]
    pub target_index: Option<i64>,
}

fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.into(),
    })
}

fn check_outcome(outcome: MutationOutcome, id: i64) -> Result<(), HttpError> {
    match HttpError::from_outcome(outcome, id) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn check_path_id(path_id: i64, body_ids: &[i64]) -> Result<(), HttpError> {
    if body_ids.iter().any(|id| *id != path_id) {
        return Err(HttpError::with_details(
            "Mismatched node ID in URL vs. JSON",
            "INVALID_INPUT",
            format!("url: {}, body: {:?}", path_id, body_ids),
        ));
    }
    Ok(())
}

/// `null` (any case) selects the roots
fn parse_parent(raw: &str) -> Result<Option<i64>, HttpError> {
    if raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    raw.parse::<i64>().map(Some).map_err(|_| {
        HttpError::new(
            format!("Invalid parent '{}': expected an integer or 'null'", raw),
            "INVALID_INPUT",
        )
    })
}

async fn banner() -> &'static str {
    "Welcome to the OrderTree API!"
}

async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create a node
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/nodes \
///   -H "Content-Type: application/json" \
///   -d '{"Name": "Report", "ParentID": 3, "Status": "Active", "Importance": 2}'
/// ```
async fn create_node(
    State(state): State<AppState>,
    payload: Result<Json<Node>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), HttpError> {
    let Json(node) = payload?;
    let id = state.store.create_node(&node).await?;

    tracing::debug!("Created node {}", id);

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Node created".to_string(),
            id,
        }),
    ))
}

async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Node>, HttpError> {
    state
        .store
        .get_node(id)
        .await?
        .map(Json)
        .ok_or_else(|| HttpError::new(format!("Node {} not found", id), "NODE_NOT_FOUND"))
}

/// List nodes
///
/// ```bash
/// curl http://localhost:8080/nodes            # every node
/// curl "http://localhost:8080/nodes?parent=3" # children of 3
/// curl "http://localhost:8080/nodes?parent=null"
/// ```
async fn list_nodes(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Node>>, HttpError> {
    let nodes = match query.parent.as_deref() {
        Some(raw) => state.store.get_children(parse_parent(raw)?).await?,
        None => state.store.get_all_nodes().await?,
    };
    Ok(Json(nodes))
}

/// Update a node
///
/// Both snapshots must carry the ID of the URL. The store checks `old`'s
/// `ParentID`, `Status` and `Importance` against the stored row.
async fn update_node(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, HttpError> {
    let Json(request) = payload?;
    check_path_id(id, &[request.old.id, request.new.id])?;

    let outcome = state.store.update_node(&request.old, &request.new).await?;
    check_outcome(outcome, id)?;

    tracing::debug!("Updated node {}", id);
    Ok(message("Node updated"))
}

async fn delete_node(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, HttpError> {
    let Json(request) = payload?;
    check_path_id(id, &[request.old.id])?;

    let outcome = state.store.delete_node(&request.old).await?;
    check_outcome(outcome, id)?;

    tracing::debug!("Deleted node {}", id);
    Ok(message(format!("Node {} deleted", id)))
}

/// Move a node
///
/// ```bash
/// curl -X POST http://localhost:8080/nodes/5/move \
///   -H "Content-Type: application/json" \
///   -d '{"new_parent_id": 3, "target_index": 0}'
/// ```
async fn move_node(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, HttpError> {
    let Json(request) = payload?;
    if let Some(index) = request.target_index {
        if index < 0 {
            return Err(HttpError::new(
                ValidationError::InvalidTargetIndex(index).to_string(),
                "INVALID_INPUT",
            ));
        }
    }

    let outcome = state
        .store
        .move_node(id, request.new_parent_id, request.target_index)
        .await?;
    check_outcome(outcome, id)?;

    let parent = request
        .new_parent_id
        .map(|p| p.to_string())
        .unwrap_or_else(|| "null".to_string());
    let mut text = format!("Node {} moved to parent {}", id, parent);
    if let Some(index) = request.target_index {
        text.push_str(&format!(" at index {}", index));
    }

    tracing::debug!("{}", text);
    Ok(message(text))
}

/// Router with every node endpoint
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health_check))
        .route("/nodes", post(create_node).get(list_nodes))
        .route(
            "/nodes/:id",
            get(get_node).patch(update_node).delete(delete_node),
        )
        .route("/nodes/:id/move", post(move_node))
        .with_state(state)
}
