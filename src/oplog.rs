//! Operation-log shapes used for replica catch-up.
//!
//! The server owns all LSN bookkeeping; these types only carry the values.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Embedding, Fields, MetadataFields};

/// Kind of change recorded in an oplog entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpType {
    Insert,
    Update,
    Delete,
    DropCollection,
    RenameCollection,
}

/// Full document attached to insert/update entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OplogRecord {
    pub id: String,
    pub fields: Fields,
    pub keyword_fields: Option<HashMap<String, bool>>,
    pub metadata_fields: Option<MetadataFields>,
    pub vectors: Option<HashMap<String, Embedding>>,
    pub dist: Option<f32>,
    pub nodes: Option<Vec<String>>,
    pub expiry: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OplogEntry {
    pub lsn: u64,
    pub timestamp: DateTime<Utc>,
    pub collection: String,
    pub doc_id: String,
    pub op_type: OpType,
    pub vector: Option<Embedding>,
    pub metadata: Option<Fields>,
    pub keywords: Option<Vec<String>>,
    pub full_doc: Option<OplogRecord>,
    pub vectors: Option<HashMap<String, Embedding>>,
    pub fields: Option<Fields>,
    pub keyword_fields: Option<HashMap<String, bool>>,
    pub metadata_fields: Option<MetadataFields>,
    pub expiry: Option<i64>,
    /// Target name of a `rename_collection` entry.
    pub new_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GetOplogResponse {
    pub success: bool,
    pub message: Option<String>,
    pub entries: Vec<OplogEntry>,
    pub last_lsn: u64,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OplogStatusResponse {
    pub success: bool,
    pub message: Option<String>,
    pub last_lsn: u64,
    pub retention_lsn: u64,
    pub replica_count: u64,
}

/// Heartbeat body: the highest LSN the replica has applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateReplicaLsnRequest {
    pub lsn: u64,
}

pub type UpdateReplicaLsnResponse = crate::types::GenericResponse;
