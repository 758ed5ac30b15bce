use std::io::Read;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::client::{ShilpClient, ShilpClientBuilder};
use crate::collection::Collection;
use crate::config::ClientConfig;
use crate::debug::{
    DebugDistanceResponse, DebugLevelsResponse, DebugNodeInfoResponse, DebugNodesAtLevelResponse,
    DebugReferenceNodeResponse, NeighborPage,
};
use crate::error::{Result, ShilpError};
use crate::oplog::{GetOplogResponse, OplogStatusResponse, UpdateReplicaLsnResponse};
use crate::sse::IngestStatsEvent;
use crate::transport::ExportStream;
use crate::types::{
    AddCollectionRequest, CollectionInfo, Fields, FileReaderOptions, GenericResponse,
    HealthResponse, IngestRequest, IngestResponse, InsertRecordRequest, InsertRecordResponse,
    ListCollectionsResponse, ListEmbeddingModelsResponse, ListIngestionSourcesResponse,
    ListStorageResponse, ReadDocumentResponse, SearchRequest, SearchResponse,
};

/// Shared inner state for synchronous wrappers.
///
/// Holds a Tokio runtime and the underlying async `ShilpClient`.
struct Inner {
    rt: tokio::runtime::Runtime,
    client: ShilpClient,
}

impl Inner {
    fn new(client: ShilpClient) -> Result<Arc<Self>> {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| ShilpError::Other(anyhow::Error::new(e)))?;
        Ok(Arc::new(Self { rt, client }))
    }
}

/// Blocking/synchronous wrapper around [`ShilpClient`].
///
/// This type is only available when the `sync` feature is enabled. Every call
/// runs to completion on the caller's thread via an internal Tokio runtime.
///
/// Note: do not call these blocking APIs from within an existing Tokio runtime;
/// `block_on` panics there. In async contexts, use [`ShilpClient`] directly.
#[derive(Clone)]
pub struct SyncShilpClient {
    inner: Arc<Inner>,
}

impl SyncShilpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder().base_url(base_url).build()
    }

    /// Build a synchronous client from a [`ClientConfig`].
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Self::wrap(ShilpClient::from_config(config)?)
    }

    /// Build a synchronous client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::wrap(ShilpClient::from_env()?)
    }

    /// Wrap an existing async client.
    pub fn wrap(client: ShilpClient) -> Result<Self> {
        Ok(Self {
            inner: Inner::new(client)?,
        })
    }

    /// Start building a [`SyncShilpClient`] using a fluent builder API.
    pub fn builder() -> SyncShilpClientBuilder {
        SyncShilpClientBuilder::new()
    }

    /// The wrapped async client.
    pub fn async_client(&self) -> &ShilpClient {
        &self.inner.client
    }

    pub fn collection(&self, name: impl Into<String>) -> SyncCollection {
        SyncCollection {
            inner: Arc::clone(&self.inner),
            collection: self.inner.client.collection(name),
        }
    }

    pub fn health_check(&self) -> Result<HealthResponse> {
        self.inner.rt.block_on(self.inner.client.health_check())
    }

    // Collections

    pub fn list_collections(&self) -> Result<ListCollectionsResponse> {
        self.inner.rt.block_on(self.inner.client.list_collections())
    }

    pub fn add_collection(&self, request: &AddCollectionRequest) -> Result<GenericResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.add_collection(request))
    }

    pub fn drop_collection(&self, name: &str) -> Result<GenericResponse> {
        self.inner.rt.block_on(self.inner.client.drop_collection(name))
    }

    pub fn rename_collection(&self, old_name: &str, new_name: &str) -> Result<GenericResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.rename_collection(old_name, new_name))
    }

    pub fn load_collection(&self, name: &str) -> Result<GenericResponse> {
        self.inner.rt.block_on(self.inner.client.load_collection(name))
    }

    pub fn unload_collection(&self, name: &str) -> Result<GenericResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.unload_collection(name))
    }

    pub fn flush_collection(&self, name: &str) -> Result<GenericResponse> {
        self.inner.rt.block_on(self.inner.client.flush_collection(name))
    }

    pub fn reindex_collection(&self, name: &str) -> Result<GenericResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.reindex_collection(name))
    }

    pub fn pq_train(&self, name: &str) -> Result<GenericResponse> {
        self.inner.rt.block_on(self.inner.client.pq_train(name))
    }

    pub fn export_collection(&self, name: &str) -> Result<SyncExportStream> {
        let stream = self
            .inner
            .rt
            .block_on(self.inner.client.export_collection(name))?;
        Ok(SyncExportStream::new(Arc::clone(&self.inner), stream))
    }

    pub fn import_collection(&self, file_path: impl AsRef<Path>) -> Result<GenericResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.import_collection(file_path))
    }

    // Records

    pub fn insert_record(&self, request: &InsertRecordRequest) -> Result<InsertRecordResponse> {
        self.inner.rt.block_on(self.inner.client.insert_record(request))
    }

    pub fn delete_record(&self, collection: &str, record_id: &str) -> Result<GenericResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.delete_record(collection, record_id))
    }

    pub fn ingest_data(&self, request: &IngestRequest) -> Result<IngestResponse> {
        self.inner.rt.block_on(self.inner.client.ingest_data(request))
    }

    pub fn expiry_cleanup(&self, collection: &str) -> Result<GenericResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.expiry_cleanup(collection))
    }

    pub fn search_data(&self, request: &SearchRequest) -> Result<SearchResponse> {
        self.inner.rt.block_on(self.inner.client.search_data(request))
    }

    // Storage

    pub fn list_storage(&self, path: &str, source: Option<&str>) -> Result<ListStorageResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.list_storage(path, source))
    }

    pub fn read_document(
        &self,
        path: &str,
        options: &FileReaderOptions,
    ) -> Result<ReadDocumentResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.read_document(path, options))
    }

    pub fn upload_data_file(&self, file_path: impl AsRef<Path>) -> Result<GenericResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.upload_data_file(file_path))
    }

    pub fn list_embedding_models(&self) -> Result<ListEmbeddingModelsResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.list_embedding_models())
    }

    pub fn list_ingest_sources(&self) -> Result<ListIngestionSourcesResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.list_ingest_sources())
    }

    /// Blocks until the stream ends, `on_event` breaks, or no data arrives
    /// within the timeout.
    pub fn stream_ingest_stats<F>(&self, collection: &str, on_event: F) -> Result<()>
    where
        F: FnMut(IngestStatsEvent) -> ControlFlow<()>,
    {
        self.inner
            .rt
            .block_on(self.inner.client.stream_ingest_stats(collection, on_event))
    }

    // Debug

    pub fn get_collection_levels(&self, collection: &str) -> Result<DebugLevelsResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.get_collection_levels(collection))
    }

    pub fn get_collection_nodes_at_level(
        &self,
        collection: &str,
        level: u32,
    ) -> Result<DebugNodesAtLevelResponse> {
        self.inner.rt.block_on(
            self.inner
                .client
                .get_collection_nodes_at_level(collection, level),
        )
    }

    pub fn get_collection_node_info(
        &self,
        collection: &str,
        field: &str,
        node_id: u64,
    ) -> Result<DebugNodeInfoResponse> {
        self.inner.rt.block_on(
            self.inner
                .client
                .get_collection_node_info(collection, field, node_id),
        )
    }

    pub fn get_collection_node_neighbors_at_level(
        &self,
        collection: &str,
        field: &str,
        node_id: u64,
        level: u32,
        page: NeighborPage,
    ) -> Result<DebugNodeInfoResponse> {
        self.inner.rt.block_on(
            self.inner
                .client
                .get_collection_node_neighbors_at_level(collection, field, node_id, level, page),
        )
    }

    pub fn get_collection_distance(
        &self,
        collection: &str,
        field: &str,
        node_id: u64,
        text: &str,
    ) -> Result<DebugDistanceResponse> {
        self.inner.rt.block_on(
            self.inner
                .client
                .get_collection_distance(collection, field, node_id, text),
        )
    }

    pub fn get_collection_node_by_reference_node_id(
        &self,
        collection: &str,
        node_id: u64,
    ) -> Result<DebugReferenceNodeResponse> {
        self.inner.rt.block_on(
            self.inner
                .client
                .get_collection_node_by_reference_node_id(collection, node_id),
        )
    }

    // Oplog

    pub fn register_replica(&self, replica_id: &str) -> Result<GenericResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.register_replica(replica_id))
    }

    pub fn unregister_replica(&self, replica_id: &str) -> Result<GenericResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.unregister_replica(replica_id))
    }

    pub fn get_oplog_entries(
        &self,
        collection: &str,
        after_lsn: u64,
        limit: u32,
    ) -> Result<GetOplogResponse> {
        self.inner.rt.block_on(
            self.inner
                .client
                .get_oplog_entries(collection, after_lsn, limit),
        )
    }

    pub fn get_oplog_status(&self, collection: &str) -> Result<OplogStatusResponse> {
        self.inner
            .rt
            .block_on(self.inner.client.get_oplog_status(collection))
    }

    pub fn update_replica_lsn(
        &self,
        collection: &str,
        replica_id: &str,
        lsn: u64,
    ) -> Result<UpdateReplicaLsnResponse> {
        self.inner.rt.block_on(
            self.inner
                .client
                .update_replica_lsn(collection, replica_id, lsn),
        )
    }
}

/// Builder for constructing a [`SyncShilpClient`].
pub struct SyncShilpClientBuilder {
    inner: ShilpClientBuilder,
}

impl SyncShilpClientBuilder {
    fn new() -> Self {
        Self {
            inner: ShilpClient::builder(),
        }
    }

    /// Populate the builder from `SHILP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            inner: ShilpClientBuilder::from_env()?,
        })
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.inner = self.inner.base_url(base_url);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.inner = self.inner.timeout(timeout);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.inner = self.inner.timeout_secs(secs);
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.inner = self.inner.http_client(client);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.inner = self.inner.user_agent(user_agent);
        self
    }

    /// Build a [`SyncShilpClient`] using the current builder configuration.
    pub fn build(self) -> Result<SyncShilpClient> {
        SyncShilpClient::wrap(self.inner.build()?)
    }
}

/// Blocking/synchronous wrapper around [`Collection`].
#[derive(Clone)]
pub struct SyncCollection {
    inner: Arc<Inner>,
    collection: Collection,
}

impl SyncCollection {
    pub fn name(&self) -> &str {
        self.collection.name()
    }

    pub fn info(&self) -> Result<Option<CollectionInfo>> {
        self.inner.rt.block_on(self.collection.info())
    }

    pub fn exists(&self) -> Result<bool> {
        self.inner.rt.block_on(self.collection.exists())
    }

    pub fn load(&self) -> Result<GenericResponse> {
        self.inner.rt.block_on(self.collection.load())
    }

    pub fn unload(&self) -> Result<GenericResponse> {
        self.inner.rt.block_on(self.collection.unload())
    }

    pub fn flush(&self) -> Result<GenericResponse> {
        self.inner.rt.block_on(self.collection.flush())
    }

    pub fn reindex(&self) -> Result<GenericResponse> {
        self.inner.rt.block_on(self.collection.reindex())
    }

    pub fn pq_train(&self) -> Result<GenericResponse> {
        self.inner.rt.block_on(self.collection.pq_train())
    }

    pub fn drop_collection(&self) -> Result<GenericResponse> {
        self.inner.rt.block_on(self.collection.drop_collection())
    }

    pub fn rename(&self, new_name: impl Into<String>) -> Result<SyncCollection> {
        let collection = self.inner.rt.block_on(self.collection.rename(new_name))?;
        Ok(SyncCollection {
            inner: Arc::clone(&self.inner),
            collection,
        })
    }

    pub fn export(&self) -> Result<SyncExportStream> {
        let stream = self.inner.rt.block_on(self.collection.export())?;
        Ok(SyncExportStream::new(Arc::clone(&self.inner), stream))
    }

    pub fn expiry_cleanup(&self) -> Result<GenericResponse> {
        self.inner.rt.block_on(self.collection.expiry_cleanup())
    }

    pub fn insert(&self, record: Fields) -> Result<InsertRecordResponse> {
        self.inner.rt.block_on(self.collection.insert(record))
    }

    pub fn insert_request(&self, request: InsertRecordRequest) -> Result<InsertRecordResponse> {
        self.inner
            .rt
            .block_on(self.collection.insert_request(request))
    }

    pub fn delete(&self, record_id: &str) -> Result<GenericResponse> {
        self.inner.rt.block_on(self.collection.delete(record_id))
    }

    pub fn ingest(
        &self,
        file_path: impl Into<PathBuf>,
        fields: Vec<String>,
    ) -> Result<IngestResponse> {
        self.inner
            .rt
            .block_on(self.collection.ingest(file_path, fields))
    }

    pub fn ingest_request(&self, request: IngestRequest) -> Result<IngestResponse> {
        self.inner
            .rt
            .block_on(self.collection.ingest_request(request))
    }

    pub fn search_request(&self, query: impl Into<String>) -> SearchRequest {
        self.collection.search_request(query)
    }

    pub fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        self.inner.rt.block_on(self.collection.search(request))
    }

    pub fn stream_ingest_stats<F>(&self, on_event: F) -> Result<()>
    where
        F: FnMut(IngestStatsEvent) -> ControlFlow<()>,
    {
        self.inner
            .rt
            .block_on(self.collection.stream_ingest_stats(on_event))
    }

    pub fn oplog(&self, after_lsn: u64, limit: u32) -> Result<GetOplogResponse> {
        self.inner
            .rt
            .block_on(self.collection.oplog(after_lsn, limit))
    }

    pub fn oplog_status(&self) -> Result<OplogStatusResponse> {
        self.inner.rt.block_on(self.collection.oplog_status())
    }
}

/// Blocking reader over a collection export.
///
/// Implements [`std::io::Read`]; each refill blocks on the next body chunk.
pub struct SyncExportStream {
    inner: Arc<Inner>,
    stream: ExportStream,
    buf: Vec<u8>,
    pos: usize,
}

impl SyncExportStream {
    fn new(inner: Arc<Inner>, stream: ExportStream) -> Self {
        Self {
            inner,
            stream,
            buf: Vec::new(),
            pos: 0,
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        self.stream.content_length()
    }

    /// Write the remaining body into a new file at `path`.
    pub fn save_to(mut self, path: impl AsRef<Path>) -> Result<u64> {
        let mut file = std::fs::File::create(path.as_ref())?;
        let written = std::io::copy(&mut self, &mut file)?;
        Ok(written)
    }
}

impl Read for SyncExportStream {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        while self.pos >= self.buf.len() {
            match self.inner.rt.block_on(self.stream.chunk()) {
                Ok(Some(chunk)) => {
                    self.buf = chunk;
                    self.pos = 0;
                }
                Ok(None) => return Ok(0),
                Err(e) => return Err(std::io::Error::other(e)),
            }
        }
        let n = out.len().min(self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
