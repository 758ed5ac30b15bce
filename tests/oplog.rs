//! Replica registration and oplog catch-up against a mock Shilp server.

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use shilp_rs::{OpType, OplogApi, ReplicaClient, ShilpClient, ShilpError};
use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::ok_body;

fn status_body(last_lsn: u64, retention_lsn: u64, replicas: u64) -> serde_json::Value {
    json!({
        "success": true,
        "message": null,
        "last_lsn": last_lsn,
        "retention_lsn": retention_lsn,
        "replica_count": replicas
    })
}

#[tokio::test]
async fn register_status_heartbeat_scenario() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oplog/replicas/replica-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("registered")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/docs/oplog/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(42, 0, 1)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/oplog/replicas/replica-a/lsn"))
        .and(body_json(json!({"lsn": 42})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("updated")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/oplog/replicas/replica-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("unregistered")))
        .expect(1)
        .mount(&server)
        .await;

    let client = ShilpClient::new(server.uri())?;
    client.register_replica("replica-a").await?;

    let status = client.get_oplog_status("docs").await?;
    assert_eq!(status.last_lsn, 42);
    assert_eq!(status.replica_count, 1);

    let ack = client.update_replica_lsn("docs", "replica-a", status.last_lsn).await?;
    assert!(ack.success);

    client.unregister_replica("replica-a").await?;
    Ok(())
}

#[tokio::test]
async fn oplog_page_is_typed_and_limit_is_optional() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/docs/oplog"))
        .and(query_param("after_lsn", "10"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": null,
            "entries": [
                {
                    "lsn": 11,
                    "timestamp": "2026-03-01T12:00:00Z",
                    "collection": "docs",
                    "doc_id": "r1",
                    "op_type": "insert",
                    "fields": {"title": "hello"}
                },
                {
                    "lsn": 12,
                    "timestamp": "2026-03-01T12:00:05Z",
                    "collection": "docs",
                    "doc_id": "r1",
                    "op_type": "delete"
                }
            ],
            "last_lsn": 12,
            "count": 2
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/docs/oplog"))
        .and(query_param("after_lsn", "12"))
        .and(query_param_is_missing("limit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "entries": [],
            "last_lsn": 12,
            "count": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ShilpClient::new(server.uri())?;
    let page = client.get_oplog_entries("docs", 10, 2).await?;
    assert_eq!(page.count, 2);
    let ops: Vec<OpType> = page.entries.iter().map(|e| e.op_type).collect();
    assert_eq!(ops, vec![OpType::Insert, OpType::Delete]);
    assert_eq!(page.entries[0].fields.as_ref().and_then(|f| f.get("title")), Some(&json!("hello")));

    let rest = client.collection("docs").oplog(12, 0).await?;
    assert!(rest.entries.is_empty());
    Ok(())
}

#[tokio::test]
async fn replica_client_pull_acknowledges_last_lsn() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oplog/replicas/r-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("registered")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/docs/oplog"))
        .and(query_param("after_lsn", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "entries": [{
                "lsn": 5,
                "timestamp": "2026-03-01T12:00:00+01:00",
                "collection": "docs",
                "doc_id": "",
                "op_type": "rename_collection",
                "new_name": "docs2"
            }],
            "last_lsn": 5,
            "count": 1
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/oplog/replicas/r-7/lsn"))
        .and(body_json(json!({"lsn": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("updated")))
        .expect(1)
        .mount(&server)
        .await;

    let client = Arc::new(ShilpClient::new(server.uri())?);
    let replica = ReplicaClient::new(client, "r-7")?;
    replica.register().await?;

    let page = replica.pull("docs", 0, 100).await?;
    assert_eq!(page.entries[0].new_name.as_deref(), Some("docs2"));
    assert_eq!(page.entries[0].timestamp.to_rfc3339(), "2026-03-01T11:00:00+00:00");
    Ok(())
}

#[tokio::test]
async fn empty_pull_sends_no_heartbeat() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/docs/oplog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "entries": [],
            "last_lsn": 3,
            "count": 0
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("unexpected")))
        .expect(0)
        .mount(&server)
        .await;

    let client = Arc::new(ShilpClient::new(server.uri())?);
    let replica = ReplicaClient::new(client, "r-7")?;
    let page = replica.pull("docs", 3, 0).await?;
    assert_eq!(page.last_lsn, 3);
    Ok(())
}

async fn lag<A: OplogApi + Sync>(api: &A, collection: &str, applied: u64) -> Result<u64> {
    let status = api.get_oplog_status(collection).await?;
    Ok(status.last_lsn.saturating_sub(applied))
}

#[tokio::test]
async fn oplog_api_is_usable_generically() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/docs/oplog/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(100, 40, 2)))
        .expect(2)
        .mount(&server)
        .await;

    let client = ShilpClient::new(server.uri())?;
    assert_eq!(lag(&client, "docs", 60).await?, 40);

    let replica = ReplicaClient::new(Arc::new(client), "r-1")?;
    assert_eq!(lag(&replica, "docs", 100).await?, 0);
    Ok(())
}

#[tokio::test]
async fn blank_replica_id_is_rejected_locally() -> Result<()> {
    let client = ShilpClient::new("http://127.0.0.1:9")?;
    assert!(matches!(
        client.register_replica("").await,
        Err(ShilpError::Validation(_))
    ));
    assert!(matches!(
        client.update_replica_lsn("docs", " ", 1).await,
        Err(ShilpError::Validation(_))
    ));
    Ok(())
}
