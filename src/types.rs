use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Result, ShilpError};
use crate::filters::{Filter, Sort};

/// Record payload: field name to text, vector or metadata value.
pub type Fields = serde_json::Map<String, Value>;
pub type Embedding = Vec<f32>;

/// Scalar kind of a metadata field. Encoded on the wire as an integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AttrType {
    Int64,
    Float64,
    String,
    Bool,
}

impl From<AttrType> for u8 {
    fn from(t: AttrType) -> Self {
        match t {
            AttrType::Int64 => 0,
            AttrType::Float64 => 1,
            AttrType::String => 2,
            AttrType::Bool => 3,
        }
    }
}

impl TryFrom<u8> for AttrType {
    type Error = ShilpError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(AttrType::Int64),
            1 => Ok(AttrType::Float64),
            2 => Ok(AttrType::String),
            3 => Ok(AttrType::Bool),
            other => Err(ShilpError::Decode(format!("unknown attribute type: {other}"))),
        }
    }
}

/// Metadata field declarations: field name to scalar kind.
pub type MetadataFields = HashMap<String, AttrType>;

/// Server-side storage backend identifier, passed through as the server reports it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageBackendType(pub u8);

// ---- Generic responses ----

/// `{success, message}` answer shared by most mutating endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenericResponse {
    pub success: bool,
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub success: bool,
    pub version: String,
}

// ---- Collections ----

#[derive(Clone, Debug, Default, Serialize)]
pub struct AddCollectionRequest {
    pub name: String,
    pub no_reference_storage: bool,
    pub has_metadata_storage: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_type: Option<StorageBackendType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_storage_type: Option<StorageBackendType>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub enable_pq: bool,
}

impl AddCollectionRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn no_reference_storage(mut self, value: bool) -> Self {
        self.no_reference_storage = value;
        self
    }

    pub fn metadata_storage(mut self, value: bool) -> Self {
        self.has_metadata_storage = value;
        self
    }

    pub fn storage_type(mut self, value: StorageBackendType) -> Self {
        self.storage_type = Some(value);
        self
    }

    pub fn reference_storage_type(mut self, value: StorageBackendType) -> Self {
        self.reference_storage_type = Some(value);
        self
    }

    pub fn enable_pq(mut self, value: bool) -> Self {
        self.enable_pq = value;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub attr_type: AttrType,
}

/// A collection as listed by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub is_loaded: bool,
    pub fields: Vec<String>,
    pub searchable_fields: Vec<String>,
    pub metadata: Option<Vec<MetadataColumnSchema>>,
    #[serde(default)]
    pub has_metadata_enabled: bool,
    #[serde(default)]
    pub no_reference_storage: bool,
    #[serde(default)]
    pub storage_type: StorageBackendType,
    #[serde(default)]
    pub reference_storage_type: StorageBackendType,
    #[serde(default)]
    pub is_pq_enabled: bool,
}

/// Metadata backend the server can attach to collections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataSupportInfo {
    pub support_metadata: bool,
    pub name: String,
    #[serde(rename = "type")]
    pub backend: StorageBackendType,
    pub is_default: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListCollectionsResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: Vec<CollectionInfo>,
    #[serde(default)]
    pub support_metadata: bool,
    pub metadata_info: Option<Vec<MetadataSupportInfo>>,
}

impl ListCollectionsResponse {
    pub fn names(&self) -> Vec<&str> {
        self.data.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn find(&self, name: &str) -> Option<&CollectionInfo> {
        self.data.iter().find(|c| c.name == name)
    }
}

#[derive(Serialize)]
pub(crate) struct RenameCollectionBody<'a> {
    pub new_name: &'a str,
}

// ---- Records ----

/// Insert one record. The body carries the collection too, alongside the path.
#[derive(Clone, Debug, Default, Serialize)]
pub struct InsertRecordRequest {
    pub collection: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub record: Fields,
    /// Expiry as unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_fields: Option<MetadataFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_fields: Option<Vec<String>>,
}

impl InsertRecordRequest {
    pub fn new(collection: impl Into<String>, record: Fields) -> Self {
        Self {
            collection: collection.into(),
            record,
            ..Default::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn expiry(mut self, unix_secs: i64) -> Self {
        self.expiry = Some(unix_secs);
        self
    }

    pub fn metadata_field(mut self, name: impl Into<String>, attr_type: AttrType) -> Self {
        self.metadata_fields
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), attr_type);
        self
    }

    pub fn embedding(mut self, provider: impl Into<String>, model: Option<String>) -> Self {
        self.embedding_provider = Some(provider.into());
        self.model = model;
        self
    }

    /// Fields to embed as vectors.
    pub fn fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn keyword_fields(mut self, fields: Vec<String>) -> Self {
        self.keyword_fields = Some(fields);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        crate::meta::CollectionNames::validate(&self.collection)?;
        if let Some(id) = &self.id {
            crate::meta::Identifiers::record_id(id)?;
        }
        if self.record.is_empty() {
            return Err(ShilpError::Validation("record must not be empty".into()));
        }
        Ok(())
    }
}

/// A stored record as echoed back by the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordData {
    pub id: String,
    pub expiry: Option<i64>,
    pub fields: Fields,
    pub keyword_fields: Option<HashMap<String, bool>>,
    pub metadata_fields: Option<MetadataFields>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InsertRecordResponse {
    pub success: bool,
    pub message: Option<String>,
    pub record: Option<RecordData>,
    pub remaining_records: Option<u64>,
}

/// Batch ingestion of a local file into a collection.
#[derive(Clone, Debug, Default, Serialize)]
pub struct IngestRequest {
    #[serde(skip)]
    pub file_path: PathBuf,
    pub collection_name: String,
    pub fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_fields: Option<MetadataFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingestion_batch_size: Option<u32>,
}

impl IngestRequest {
    pub fn new(
        collection_name: impl Into<String>,
        file_path: impl Into<PathBuf>,
        fields: Vec<String>,
    ) -> Self {
        Self {
            collection_name: collection_name.into(),
            file_path: file_path.into(),
            fields,
            ..Default::default()
        }
    }

    pub fn keyword_fields(mut self, fields: Vec<String>) -> Self {
        self.keyword_fields = Some(fields);
        self
    }

    pub fn metadata_field(mut self, name: impl Into<String>, attr_type: AttrType) -> Self {
        self.metadata_fields
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), attr_type);
        self
    }

    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    pub fn expiry_field(mut self, field: impl Into<String>) -> Self {
        self.expiry_field = Some(field.into());
        self
    }

    pub fn embedding(mut self, provider: impl Into<String>, model: Option<String>) -> Self {
        self.embedding_provider = Some(provider.into());
        self.embedding_model = model;
        self
    }

    pub fn batch_size(mut self, size: u32) -> Self {
        self.ingestion_batch_size = Some(size);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        crate::meta::CollectionNames::validate(&self.collection_name)?;
        if self.file_path.as_os_str().is_empty() {
            return Err(ShilpError::Validation("ingest file path must not be empty".into()));
        }
        if self.fields.is_empty() {
            return Err(ShilpError::Validation(
                "ingest requires at least one field".into(),
            ));
        }
        if self.ingestion_batch_size == Some(0) {
            return Err(ShilpError::Validation(
                "ingestion batch size must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: Option<String>,
    pub details: Option<Vec<String>>,
}

// ---- Search ----

/// Search a collection by query text and/or a query vector.
///
/// Filters and sorts are sent in their compound form, which is the only form
/// the search endpoint accepts.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SearchRequest {
    pub collection: String,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<HashMap<String, f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f32>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_conjunction"
    )]
    pub filters: Option<Filter>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_compound_sort"
    )]
    pub sort: Option<Sort>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_query: Option<Embedding>,
}

impl SearchRequest {
    pub fn new(collection: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn weight(mut self, field: impl Into<String>, weight: f32) -> Self {
        self.weights
            .get_or_insert_with(HashMap::new)
            .insert(field.into(), weight);
        self
    }

    pub fn max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance = Some(max_distance);
        self
    }

    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filters = Some(filter.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<Sort>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn vector_query(mut self, vector: Embedding) -> Self {
        self.vector_query = Some(vector);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        crate::meta::CollectionNames::validate(&self.collection)?;
        let has_vector = self.vector_query.as_ref().is_some_and(|v| !v.is_empty());
        if self.query.trim().is_empty() && !has_vector {
            return Err(ShilpError::Validation(
                "search requires a query text or a query vector".into(),
            ));
        }
        if self.limit == Some(0) {
            return Err(ShilpError::Validation("search limit must be positive".into()));
        }
        if let Some(d) = self.max_distance {
            if !d.is_finite() || d < 0.0 {
                return Err(ShilpError::Validation(format!(
                    "max_distance must be a non-negative number, got {d}"
                )));
            }
        }
        Ok(())
    }
}

fn as_conjunction<S: Serializer>(filter: &Option<Filter>, s: S) -> std::result::Result<S::Ok, S::Error> {
    filter.clone().map(Filter::into_conjunction).serialize(s)
}

fn as_compound_sort<S: Serializer>(sort: &Option<Sort>, s: S) -> std::result::Result<S::Ok, S::Error> {
    sort.clone().map(Sort::into_compound).serialize(s)
}

/// One search result. `id` is always present; everything else the server
/// returns for the hit is kept in `fields`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    #[serde(flatten)]
    pub fields: Fields,
}

impl SearchHit {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Distance to the query, when the server reports one.
    pub fn distance(&self) -> Option<f64> {
        self.fields.get("dist").and_then(Value::as_f64)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: Vec<SearchHit>,
}

impl SearchResponse {
    pub fn ids(&self) -> Vec<&str> {
        self.data.iter().map(|h| h.id.as_str()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.data.iter().any(|h| h.id == id)
    }
}

// ---- Storage ----

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageItem {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListStorageResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: HashMap<String, Vec<StorageItem>>,
}

/// Window and source selection for [`read_document`](crate::ShilpClient::read_document).
#[derive(Clone, Debug, Default)]
pub struct FileReaderOptions {
    /// `file` (default on the server) or `mongodb`.
    pub source: Option<String>,
    /// Rows to return; 0 lets the server choose.
    pub limit: u32,
    pub skip: u32,
    /// Only sent for the `mongodb` source.
    pub mongo_filter: Option<Value>,
}

impl FileReaderOptions {
    pub(crate) fn query(&self, path: &str) -> Vec<(&'static str, String)> {
        let mut query = vec![("path", path.to_string())];
        if let Some(source) = &self.source {
            query.push(("source", source.clone()));
        }
        if self.limit > 0 {
            query.push(("rows", self.limit.to_string()));
        }
        if self.skip > 0 {
            query.push(("skip", self.skip.to_string()));
        }
        if self.source.as_deref() == Some("mongodb") {
            if let Some(filter) = &self.mongo_filter {
                query.push(("mongo_filter", filter.to_string()));
            }
        }
        query
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadDocumentResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: Vec<serde_json::Map<String, Value>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingModel {
    pub name: String,
    pub is_default: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingProvider {
    pub name: String,
    pub is_default: bool,
    pub models: Vec<EmbeddingModel>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListEmbeddingModelsResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: Vec<EmbeddingProvider>,
    #[serde(default)]
    pub supports_distributed_embedding: bool,
}

impl ListEmbeddingModelsResponse {
    pub fn default_provider(&self) -> Option<&EmbeddingProvider> {
        self.data.iter().find(|p| p.is_default)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListIngestionSourcesResponse {
    pub success: bool,
    pub message: Option<String>,
    pub data: Vec<String>,
}
