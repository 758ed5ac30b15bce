use std::ops::ControlFlow;
use std::path::Path;
use std::time::Duration;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::collection::Collection;
use crate::config::ClientConfig;
use crate::debug::{
    DebugDistanceResponse, DebugLevelsResponse, DebugNodeInfoResponse, DebugNodesAtLevelResponse,
    DebugReferenceNodeResponse, NeighborPage,
};
use crate::error::{Result, ShilpError};
use crate::meta::{CollectionNames, Identifiers};
use crate::oplog::{GetOplogResponse, OplogStatusResponse, UpdateReplicaLsnRequest, UpdateReplicaLsnResponse};
use crate::sse::IngestStatsEvent;
use crate::transport::{ExportStream, HttpTransport};
use crate::types::{
    AddCollectionRequest, FileReaderOptions, GenericResponse, HealthResponse, IngestRequest,
    IngestResponse, InsertRecordRequest, InsertRecordResponse, ListCollectionsResponse,
    ListEmbeddingModelsResponse, ListIngestionSourcesResponse, ListStorageResponse,
    ReadDocumentResponse, RenameCollectionBody, SearchRequest, SearchResponse,
};

const COLLECTIONS: &str = "collections";
const DEBUG: &str = "debug";
const OPLOG: &str = "oplog";
const REPLICAS: &str = "replicas";
const STORAGE: &str = "storage";

/// Builder for configuring and constructing a [`ShilpClient`].
pub struct ShilpClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    http_client: Option<reqwest::Client>,
    user_agent: Option<String>,
}

/// Async client for the Shilp HTTP API.
///
/// One method per endpoint. Each call is an independent round trip: the
/// client keeps no remote state, and it never retries. Write operations
/// (`insert_record`, `ingest_data`, `import_collection`) carry no idempotency
/// key, so retrying them after a transport failure is the caller's decision.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Clone, Debug)]
pub struct ShilpClient {
    transport: HttpTransport,
}

impl ShilpClient {
    /// Client for `base_url` with the default timeout and a fresh connection pool.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    /// Build a client from a [`ClientConfig`].
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::builder()
            .base_url(config.base_url)
            .timeout(config.timeout)
            .build()
    }

    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        Self::from_config(config)
    }

    pub fn builder() -> ShilpClientBuilder {
        ShilpClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url().as_str()
    }

    pub fn timeout(&self) -> Duration {
        self.transport.timeout()
    }

    /// Handle bound to one collection name.
    pub fn collection(&self, name: impl Into<String>) -> Collection {
        Collection::new(self.clone(), name.into())
    }

    pub async fn health_check(&self) -> Result<HealthResponse> {
        self.transport.get_json(&["health"], &[]).await
    }

    // ---- Collections ----

    pub async fn list_collections(&self) -> Result<ListCollectionsResponse> {
        self.transport.get_json(&[COLLECTIONS], &[]).await
    }

    pub async fn add_collection(&self, request: &AddCollectionRequest) -> Result<GenericResponse> {
        CollectionNames::validate(&request.name)?;
        self.post(&[COLLECTIONS], Some(request)).await
    }

    pub async fn drop_collection(&self, name: &str) -> Result<GenericResponse> {
        CollectionNames::validate(name)?;
        self.transport
            .send_json::<(), _>(Method::DELETE, &[COLLECTIONS, name], None)
            .await
    }

    pub async fn rename_collection(&self, old_name: &str, new_name: &str) -> Result<GenericResponse> {
        CollectionNames::validate(old_name)?;
        CollectionNames::validate(new_name)?;
        let body = RenameCollectionBody { new_name };
        self.post(&[COLLECTIONS, old_name, "rename"], Some(&body)).await
    }

    /// Load a collection into server memory.
    pub async fn load_collection(&self, name: &str) -> Result<GenericResponse> {
        self.collection_action(name, "load").await
    }

    pub async fn unload_collection(&self, name: &str) -> Result<GenericResponse> {
        self.collection_action(name, "unload").await
    }

    /// Persist a collection's in-memory state to disk.
    pub async fn flush_collection(&self, name: &str) -> Result<GenericResponse> {
        self.collection_action(name, "flush").await
    }

    pub async fn reindex_collection(&self, name: &str) -> Result<GenericResponse> {
        self.collection_action(name, "reindex").await
    }

    /// Train product quantization for an existing collection.
    pub async fn pq_train(&self, name: &str) -> Result<GenericResponse> {
        self.collection_action(name, "pq-train").await
    }

    /// Open the binary export of a collection. The body is read lazily from the
    /// returned stream, and the timeout applies to each read rather than to
    /// the whole transfer.
    pub async fn export_collection(&self, name: &str) -> Result<ExportStream> {
        CollectionNames::validate(name)?;
        self.transport.download(&[COLLECTIONS, name, "export"]).await
    }

    /// Import a collection from a previously exported file.
    pub async fn import_collection(&self, file_path: impl AsRef<Path>) -> Result<GenericResponse> {
        let file_path = file_path.as_ref();
        require_file_path(file_path)?;
        self.transport
            .upload(&[COLLECTIONS, "import"], file_path, None)
            .await
    }

    async fn collection_action(&self, name: &str, action: &str) -> Result<GenericResponse> {
        CollectionNames::validate(name)?;
        self.post::<(), _>(&[COLLECTIONS, name, action], None).await
    }

    // ---- Records ----

    pub async fn insert_record(&self, request: &InsertRecordRequest) -> Result<InsertRecordResponse> {
        request.validate()?;
        self.post(&[COLLECTIONS, &request.collection, "records"], Some(request))
            .await
    }

    pub async fn delete_record(&self, collection: &str, record_id: &str) -> Result<GenericResponse> {
        CollectionNames::validate(collection)?;
        Identifiers::record_id(record_id)?;
        self.transport
            .send_json::<(), _>(
                Method::DELETE,
                &[COLLECTIONS, collection, "records", record_id],
                None,
            )
            .await
    }

    /// Upload a local file and ingest its rows into the collection.
    pub async fn ingest_data(&self, request: &IngestRequest) -> Result<IngestResponse> {
        request.validate()?;
        let options = serde_json::to_value(request)
            .map_err(|e| ShilpError::Validation(format!("cannot encode ingest options: {e}")))?;
        self.transport
            .upload(
                &[COLLECTIONS, &request.collection_name, "ingest"],
                &request.file_path,
                Some(options),
            )
            .await
    }

    /// Remove records whose expiry has passed.
    pub async fn expiry_cleanup(&self, collection: &str) -> Result<GenericResponse> {
        self.collection_action(collection, "expiry-cleanup").await
    }

    pub async fn search_data(&self, request: &SearchRequest) -> Result<SearchResponse> {
        request.validate()?;
        self.post(&[COLLECTIONS, &request.collection, "search"], Some(request))
            .await
    }

    // ---- Storage ----

    /// List a directory of the server's upload storage (or, for the `mongodb`
    /// source, databases and their collections).
    pub async fn list_storage(&self, path: &str, source: Option<&str>) -> Result<ListStorageResponse> {
        let mut query = Vec::new();
        if !path.is_empty() {
            query.push(("path", path.to_string()));
        }
        if let Some(source) = source {
            query.push(("source", source.to_string()));
        }
        self.transport.get_json(&[STORAGE], &query).await
    }

    /// Read a bounded window of rows from a CSV-like document.
    pub async fn read_document(
        &self,
        path: &str,
        options: &FileReaderOptions,
    ) -> Result<ReadDocumentResponse> {
        Identifiers::path(path)?;
        self.transport
            .get_json(&[STORAGE, "document"], &options.query(path))
            .await
    }

    pub async fn upload_data_file(&self, file_path: impl AsRef<Path>) -> Result<GenericResponse> {
        let file_path = file_path.as_ref();
        require_file_path(file_path)?;
        self.transport
            .upload(&[STORAGE, "upload"], file_path, None)
            .await
    }

    pub async fn list_embedding_models(&self) -> Result<ListEmbeddingModelsResponse> {
        self.transport.get_json(&["embedding-models"], &[]).await
    }

    pub async fn list_ingest_sources(&self) -> Result<ListIngestionSourcesResponse> {
        self.transport.get_json(&["ingest", "sources"], &[]).await
    }

    /// Subscribe to live ingestion statistics of a collection.
    ///
    /// Blocks the calling task until the server closes the stream, `on_event`
    /// returns `ControlFlow::Break`, or the server stays silent for longer
    /// than the timeout (`is_timeout()` on the error). An event whose payload is not JSON ends the stream
    /// with a decode error.
    pub async fn stream_ingest_stats<F>(&self, collection: &str, mut on_event: F) -> Result<()>
    where
        F: FnMut(IngestStatsEvent) -> ControlFlow<()>,
    {
        CollectionNames::validate(collection)?;
        tracing::debug!(collection, "subscribing to ingest stats");
        self.transport
            .event_stream(
                &[COLLECTIONS, collection, "ingest-stats", "stream"],
                |msg| IngestStatsEvent::from_message(msg).map(&mut on_event),
            )
            .await
    }

    // ---- Debug ----

    pub async fn get_collection_levels(&self, collection: &str) -> Result<DebugLevelsResponse> {
        CollectionNames::validate(collection)?;
        self.transport
            .get_json(&[COLLECTIONS, collection, DEBUG, "levels"], &[])
            .await
    }

    pub async fn get_collection_nodes_at_level(
        &self,
        collection: &str,
        level: u32,
    ) -> Result<DebugNodesAtLevelResponse> {
        CollectionNames::validate(collection)?;
        let level = level.to_string();
        self.transport
            .get_json(&[COLLECTIONS, collection, DEBUG, "levels", &level], &[])
            .await
    }

    pub async fn get_collection_node_info(
        &self,
        collection: &str,
        field: &str,
        node_id: u64,
    ) -> Result<DebugNodeInfoResponse> {
        CollectionNames::validate(collection)?;
        Identifiers::field(field)?;
        let node_id = node_id.to_string();
        self.transport
            .get_json(&[COLLECTIONS, collection, DEBUG, field, "nodes", &node_id], &[])
            .await
    }

    pub async fn get_collection_node_neighbors_at_level(
        &self,
        collection: &str,
        field: &str,
        node_id: u64,
        level: u32,
        page: NeighborPage,
    ) -> Result<DebugNodeInfoResponse> {
        CollectionNames::validate(collection)?;
        Identifiers::field(field)?;
        let node_id = node_id.to_string();
        let level = level.to_string();
        self.transport
            .get_json(
                &[COLLECTIONS, collection, DEBUG, field, "nodes", &node_id, "neighbors", &level],
                &page.query(),
            )
            .await
    }

    /// Distance between a graph node and the embedding of `text`.
    pub async fn get_collection_distance(
        &self,
        collection: &str,
        field: &str,
        node_id: u64,
        text: &str,
    ) -> Result<DebugDistanceResponse> {
        CollectionNames::validate(collection)?;
        Identifiers::field(field)?;
        let node_id = node_id.to_string();
        self.transport
            .get_json(
                &[COLLECTIONS, collection, DEBUG, field, "distance", &node_id],
                &[("text", text.to_string())],
            )
            .await
    }

    pub async fn get_collection_node_by_reference_node_id(
        &self,
        collection: &str,
        node_id: u64,
    ) -> Result<DebugReferenceNodeResponse> {
        CollectionNames::validate(collection)?;
        let node_id = node_id.to_string();
        self.transport
            .get_json(
                &[COLLECTIONS, collection, DEBUG, "nodes", "reference_node", &node_id],
                &[],
            )
            .await
    }

    // ---- Oplog ----

    /// Register a replica so the server retains oplog entries it has not acknowledged.
    pub async fn register_replica(&self, replica_id: &str) -> Result<GenericResponse> {
        Identifiers::replica_id(replica_id)?;
        self.post::<(), _>(&[OPLOG, REPLICAS, replica_id], None).await
    }

    pub async fn unregister_replica(&self, replica_id: &str) -> Result<GenericResponse> {
        Identifiers::replica_id(replica_id)?;
        self.transport
            .send_json::<(), _>(Method::DELETE, &[OPLOG, REPLICAS, replica_id], None)
            .await
    }

    /// Entries after `after_lsn`; `limit == 0` lets the server choose the page size.
    pub async fn get_oplog_entries(
        &self,
        collection: &str,
        after_lsn: u64,
        limit: u32,
    ) -> Result<GetOplogResponse> {
        CollectionNames::validate(collection)?;
        let mut query = vec![("after_lsn", after_lsn.to_string())];
        if limit > 0 {
            query.push(("limit", limit.to_string()));
        }
        self.transport
            .get_json(&[COLLECTIONS, collection, OPLOG], &query)
            .await
    }

    pub async fn get_oplog_status(&self, collection: &str) -> Result<OplogStatusResponse> {
        CollectionNames::validate(collection)?;
        self.transport
            .get_json(&[COLLECTIONS, collection, OPLOG, "status"], &[])
            .await
    }

    /// Heartbeat: report the last LSN a replica has applied.
    pub async fn update_replica_lsn(
        &self,
        collection: &str,
        replica_id: &str,
        lsn: u64,
    ) -> Result<UpdateReplicaLsnResponse> {
        CollectionNames::validate(collection)?;
        Identifiers::replica_id(replica_id)?;
        let body = UpdateReplicaLsnRequest { lsn };
        self.post(
            &[COLLECTIONS, collection, OPLOG, REPLICAS, replica_id, "lsn"],
            Some(&body),
        )
        .await
    }

    async fn post<B, T>(&self, segments: &[&str], body: Option<&B>) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.transport.send_json(Method::POST, segments, body).await
    }
}

fn require_file_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(ShilpError::Validation("file path must not be empty".into()));
    }
    Ok(())
}

impl ShilpClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
            http_client: None,
            user_agent: None,
        }
    }

    /// Populate the builder from `SHILP_*` environment variables using
    /// [`ClientConfig::from_env`]. Individual fields can still be overridden
    /// afterwards via the other builder methods.
    pub fn from_env() -> Result<Self> {
        let config = ClientConfig::from_env()?;
        Ok(Self::new().base_url(config.base_url).timeout(config.timeout))
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout_secs(self, secs: u64) -> Self {
        self.timeout(Duration::from_secs(secs))
    }

    /// Reuse an existing connection session instead of creating one.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Only applied when the builder creates the session itself.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Build a [`ShilpClient`] using the current builder configuration.
    pub fn build(self) -> Result<ShilpClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| ShilpError::Config("base url must be provided".into()))?;
        let base_url = ClientConfig {
            base_url,
            timeout: self.timeout,
        }
        .normalized_base_url()?;

        let http = match self.http_client {
            Some(client) => client,
            None => {
                let user_agent = self.user_agent.unwrap_or_else(|| {
                    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
                });
                reqwest::Client::builder()
                    .user_agent(user_agent)
                    .build()
                    .map_err(|e| ShilpError::Config(format!("failed to build http client: {e}")))?
            }
        };

        let transport = HttpTransport::new(&base_url, self.timeout, http)?;
        Ok(ShilpClient { transport })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_applies_timeout_and_trims_base_url() {
        let client = ShilpClient::builder()
            .base_url("http://localhost:3000/api//")
            .timeout_secs(7)
            .build()
            .unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000/api");
        assert_eq!(client.timeout(), Duration::from_secs(7));
    }

    #[test]
    fn default_timeout_comes_from_config() {
        let client = ShilpClient::new("http://localhost:3000").unwrap();
        assert_eq!(
            client.timeout(),
            Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn collection_handle_keeps_name() {
        let client = ShilpClient::new("http://localhost:3000").unwrap();
        assert_eq!(client.collection("docs").name(), "docs");
    }

    #[test]
    fn empty_upload_path_is_rejected() {
        assert!(matches!(
            require_file_path(Path::new("")),
            Err(ShilpError::Validation(_))
        ));
    }
}
