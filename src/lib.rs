//! Rust client SDK for the Shilp vector database HTTP API.
//!
//! [`ShilpClient`] is the async entry point; with the `sync` feature (on by
//! default) [`SyncShilpClient`] offers the same operations as blocking calls.

mod transport;

pub mod client;
pub mod collection;
pub mod config;
pub mod debug;
pub mod error;
pub mod filters;
pub mod meta;
pub mod oplog;
pub mod replica;
pub mod sse;
#[cfg(feature = "sync")]
pub mod sync;
pub mod types;

pub use crate::client::{ShilpClient, ShilpClientBuilder};
pub use crate::collection::Collection;
pub use crate::config::ClientConfig;
pub use crate::debug::NeighborPage;
pub use crate::error::{Result, ShilpError};
pub use crate::filters::{Filter, FilterCondition, FilterOp, Sort, SortKey, SortOrder};
pub use crate::meta::{CollectionNames, Identifiers};
pub use crate::oplog::{OpType, OplogEntry};
pub use crate::replica::{OplogApi, ReplicaClient};
pub use crate::sse::IngestStatsEvent;
pub use crate::transport::ExportStream;
pub use crate::types::{
    AddCollectionRequest, AttrType, Embedding, Fields, FileReaderOptions, IngestRequest,
    InsertRecordRequest, MetadataFields, SearchHit, SearchRequest, SearchResponse,
    StorageBackendType,
};

#[cfg(feature = "sync")]
pub use crate::sync::{SyncCollection, SyncExportStream, SyncShilpClient, SyncShilpClientBuilder};
