use std::sync::Arc;

use async_trait::async_trait;

use crate::client::ShilpClient;
use crate::error::{Result, ShilpError};
use crate::meta::Identifiers;
use crate::oplog::{GetOplogResponse, OplogStatusResponse, UpdateReplicaLsnResponse};
use crate::types::GenericResponse;

/// Oplog API used by replicas to follow a primary.
#[async_trait]
pub trait OplogApi {
    async fn register_replica(&self, replica_id: &str) -> Result<GenericResponse>;
    async fn unregister_replica(&self, replica_id: &str) -> Result<GenericResponse>;
    async fn get_oplog_entries(
        &self,
        collection: &str,
        after_lsn: u64,
        limit: u32,
    ) -> Result<GetOplogResponse>;
    async fn get_oplog_status(&self, collection: &str) -> Result<OplogStatusResponse>;
    async fn update_replica_lsn(
        &self,
        collection: &str,
        replica_id: &str,
        lsn: u64,
    ) -> Result<UpdateReplicaLsnResponse>;
}

#[async_trait]
impl OplogApi for ShilpClient {
    async fn register_replica(&self, replica_id: &str) -> Result<GenericResponse> {
        ShilpClient::register_replica(self, replica_id).await
    }

    async fn unregister_replica(&self, replica_id: &str) -> Result<GenericResponse> {
        ShilpClient::unregister_replica(self, replica_id).await
    }

    async fn get_oplog_entries(
        &self,
        collection: &str,
        after_lsn: u64,
        limit: u32,
    ) -> Result<GetOplogResponse> {
        ShilpClient::get_oplog_entries(self, collection, after_lsn, limit).await
    }

    async fn get_oplog_status(&self, collection: &str) -> Result<OplogStatusResponse> {
        ShilpClient::get_oplog_status(self, collection).await
    }

    async fn update_replica_lsn(
        &self,
        collection: &str,
        replica_id: &str,
        lsn: u64,
    ) -> Result<UpdateReplicaLsnResponse> {
        ShilpClient::update_replica_lsn(self, collection, replica_id, lsn).await
    }
}

/// Thin proxy bound to one replica id that delegates to an underlying ShilpClient.
#[derive(Clone, Debug)]
pub struct ReplicaClient {
    inner: Arc<ShilpClient>,
    replica_id: String,
}

impl ReplicaClient {
    pub fn new(inner: Arc<ShilpClient>, replica_id: impl Into<String>) -> Result<Self> {
        let replica_id = replica_id.into();
        Identifiers::replica_id(&replica_id)?;
        Ok(Self { inner, replica_id })
    }

    pub fn replica_id(&self) -> &str {
        &self.replica_id
    }

    pub async fn register(&self) -> Result<GenericResponse> {
        self.inner.register_replica(&self.replica_id).await
    }

    pub async fn unregister(&self) -> Result<GenericResponse> {
        self.inner.unregister_replica(&self.replica_id).await
    }

    /// Report `lsn` as applied for `collection`.
    pub async fn heartbeat(&self, collection: &str, lsn: u64) -> Result<UpdateReplicaLsnResponse> {
        self.inner
            .update_replica_lsn(collection, &self.replica_id, lsn)
            .await
    }

    fn ensure_bound(&self, replica_id: &str) -> Result<()> {
        if replica_id != self.replica_id {
            return Err(ShilpError::Validation(format!(
                "replica client is bound to {}, got {replica_id}",
                self.replica_id
            )));
        }
        Ok(())
    }

    /// Fetch the next page after `after_lsn` and acknowledge its last LSN.
    ///
    /// An empty page is returned as-is without a heartbeat.
    pub async fn pull(&self, collection: &str, after_lsn: u64, limit: u32) -> Result<GetOplogResponse> {
        let page = self
            .inner
            .get_oplog_entries(collection, after_lsn, limit)
            .await?;
        if let Some(last) = page.entries.last() {
            self.heartbeat(collection, last.lsn).await?;
        }
        Ok(page)
    }
}

#[async_trait]
/// Calls naming a replica only accept the bound id.
impl OplogApi for ReplicaClient {
    async fn register_replica(&self, replica_id: &str) -> Result<GenericResponse> {
        self.ensure_bound(replica_id)?;
        self.register().await
    }

    async fn unregister_replica(&self, replica_id: &str) -> Result<GenericResponse> {
        self.ensure_bound(replica_id)?;
        self.unregister().await
    }

    async fn get_oplog_entries(
        &self,
        collection: &str,
        after_lsn: u64,
        limit: u32,
    ) -> Result<GetOplogResponse> {
        self.inner
            .get_oplog_entries(collection, after_lsn, limit)
            .await
    }

    async fn get_oplog_status(&self, collection: &str) -> Result<OplogStatusResponse> {
        self.inner.get_oplog_status(collection).await
    }

    async fn update_replica_lsn(
        &self,
        collection: &str,
        replica_id: &str,
        lsn: u64,
    ) -> Result<UpdateReplicaLsnResponse> {
        self.ensure_bound(replica_id)?;
        self.heartbeat(collection, lsn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replica_id_must_not_be_empty() {
        let client = Arc::new(ShilpClient::new("http://localhost:3000").unwrap());
        assert!(ReplicaClient::new(client.clone(), "  ").is_err());
        let replica = ReplicaClient::new(client, "r1").unwrap();
        assert_eq!(replica.replica_id(), "r1");
    }

    #[tokio::test]
    async fn trait_calls_reject_other_replica_ids() {
        let client = Arc::new(ShilpClient::new("http://127.0.0.1:9").unwrap());
        let replica = ReplicaClient::new(client, "r1").unwrap();

        let err = replica.register_replica("r2").await.unwrap_err();
        assert!(matches!(err, ShilpError::Validation(_)), "got {err:?}");
        assert!(matches!(
            replica.unregister_replica("r2").await,
            Err(ShilpError::Validation(_))
        ));
        assert!(matches!(
            replica.update_replica_lsn("docs", "r2", 5).await,
            Err(ShilpError::Validation(_))
        ));
    }
}
