use std::ops::ControlFlow;
use std::path::PathBuf;

use crate::client::ShilpClient;
use crate::debug::{DebugLevelsResponse, DebugNodesAtLevelResponse};
use crate::error::Result;
use crate::oplog::{GetOplogResponse, OplogStatusResponse};
use crate::sse::IngestStatsEvent;
use crate::transport::ExportStream;
use crate::types::{
    CollectionInfo, Fields, GenericResponse, IngestRequest, IngestResponse, InsertRecordRequest,
    InsertRecordResponse, SearchRequest, SearchResponse,
};

/// A collection name bound to a client.
///
/// Holds no server state; every method is a single call on the underlying
/// [`ShilpClient`] with the collection name filled in.
#[derive(Clone, Debug)]
pub struct Collection {
    client: ShilpClient,
    name: String,
}

impl Collection {
    pub(crate) fn new(client: ShilpClient, name: String) -> Self {
        Self { client, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &ShilpClient {
        &self.client
    }

    /// Server-side description of this collection, `None` if it does not exist.
    pub async fn info(&self) -> Result<Option<CollectionInfo>> {
        let list = self.client.list_collections().await?;
        Ok(list.find(&self.name).cloned())
    }

    pub async fn exists(&self) -> Result<bool> {
        Ok(self.info().await?.is_some())
    }

    // Lifecycle

    pub async fn load(&self) -> Result<GenericResponse> {
        self.client.load_collection(&self.name).await
    }

    pub async fn unload(&self) -> Result<GenericResponse> {
        self.client.unload_collection(&self.name).await
    }

    pub async fn flush(&self) -> Result<GenericResponse> {
        self.client.flush_collection(&self.name).await
    }

    pub async fn reindex(&self) -> Result<GenericResponse> {
        self.client.reindex_collection(&self.name).await
    }

    pub async fn pq_train(&self) -> Result<GenericResponse> {
        self.client.pq_train(&self.name).await
    }

    pub async fn drop_collection(&self) -> Result<GenericResponse> {
        self.client.drop_collection(&self.name).await
    }

    /// Rename on the server and return a handle for the new name.
    pub async fn rename(&self, new_name: impl Into<String>) -> Result<Collection> {
        let new_name = new_name.into();
        self.client.rename_collection(&self.name, &new_name).await?;
        Ok(Collection::new(self.client.clone(), new_name))
    }

    pub async fn export(&self) -> Result<ExportStream> {
        self.client.export_collection(&self.name).await
    }

    pub async fn expiry_cleanup(&self) -> Result<GenericResponse> {
        self.client.expiry_cleanup(&self.name).await
    }

    // Records

    /// Insert one record with default options.
    pub async fn insert(&self, record: Fields) -> Result<InsertRecordResponse> {
        self.insert_request(InsertRecordRequest::new(self.name.clone(), record))
            .await
    }

    /// Insert with full options; the request's collection is replaced by this one.
    pub async fn insert_request(
        &self,
        mut request: InsertRecordRequest,
    ) -> Result<InsertRecordResponse> {
        request.collection = self.name.clone();
        self.client.insert_record(&request).await
    }

    pub async fn delete(&self, record_id: &str) -> Result<GenericResponse> {
        self.client.delete_record(&self.name, record_id).await
    }

    /// Ingest a local file into this collection, embedding `fields`.
    pub async fn ingest(
        &self,
        file_path: impl Into<PathBuf>,
        fields: Vec<String>,
    ) -> Result<IngestResponse> {
        self.ingest_request(IngestRequest::new(self.name.clone(), file_path, fields))
            .await
    }

    pub async fn ingest_request(&self, mut request: IngestRequest) -> Result<IngestResponse> {
        request.collection_name = self.name.clone();
        self.client.ingest_data(&request).await
    }

    /// Start a search request against this collection.
    pub fn search_request(&self, query: impl Into<String>) -> SearchRequest {
        SearchRequest::new(self.name.clone(), query)
    }

    pub async fn search(&self, mut request: SearchRequest) -> Result<SearchResponse> {
        request.collection = self.name.clone();
        self.client.search_data(&request).await
    }

    pub async fn stream_ingest_stats<F>(&self, on_event: F) -> Result<()>
    where
        F: FnMut(IngestStatsEvent) -> ControlFlow<()>,
    {
        self.client.stream_ingest_stats(&self.name, on_event).await
    }

    // Diagnostics

    pub async fn levels(&self) -> Result<DebugLevelsResponse> {
        self.client.get_collection_levels(&self.name).await
    }

    pub async fn nodes_at_level(&self, level: u32) -> Result<DebugNodesAtLevelResponse> {
        self.client
            .get_collection_nodes_at_level(&self.name, level)
            .await
    }

    // Oplog

    pub async fn oplog(&self, after_lsn: u64, limit: u32) -> Result<GetOplogResponse> {
        self.client
            .get_oplog_entries(&self.name, after_lsn, limit)
            .await
    }

    pub async fn oplog_status(&self) -> Result<OplogStatusResponse> {
        self.client.get_oplog_status(&self.name).await
    }
}
