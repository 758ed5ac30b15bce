//! Read-only introspection of a collection's vector index graph.
//!
//! Pure pass-through shapes; nothing here is interpreted locally.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugDistanceResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugNeighbor {
    pub node_id: u64,
    pub vector_id: String,
    pub field: String,
    pub distance: f32,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugNodeInfo {
    pub node_id: u64,
    pub vector_id: String,
    pub field: String,
    pub level: u32,
    pub metadata: Option<Map<String, Value>>,
    pub neighbors: Vec<DebugNeighbor>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugNodeInfoResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<DebugNodeInfo>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugLevelInfo {
    pub level: u32,
    pub node_count: u64,
}

/// Levels per vector field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugLevelsResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: HashMap<String, Vec<DebugLevelInfo>>,
}

/// Node ids per vector field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugNodesAtLevelResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: HashMap<String, Vec<u64>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugVectorNode {
    pub id: u64,
    pub field: String,
    pub vector: Vec<f32>,
}

/// A stored document and the graph nodes created for its vector fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugReferenceNode {
    pub id: String,
    pub metadata: Option<Map<String, Value>>,
    pub nodes: Vec<DebugVectorNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugReferenceNodeResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<DebugReferenceNode>,
}

/// Pagination for neighbor listings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeighborPage {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl NeighborPage {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset", offset.to_string()));
        }
        query
    }
}
