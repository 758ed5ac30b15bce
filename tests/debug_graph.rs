//! Index-graph diagnostics against a mock Shilp server.

use anyhow::Result;
use serde_json::json;
use shilp_rs::{NeighborPage, ShilpClient, ShilpError};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn levels_and_nodes_at_level() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/docs/debug/levels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"title": [{"level": 0, "node_count": 120}, {"level": 1, "node_count": 9}]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/docs/debug/levels/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"title": [3, 17, 42]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ShilpClient::new(server.uri())?;
    let docs = client.collection("docs");

    let levels = docs.levels().await?;
    assert_eq!(levels.data["title"][1].node_count, 9);

    let nodes = docs.nodes_at_level(1).await?;
    assert_eq!(nodes.data["title"], vec![3, 17, 42]);
    Ok(())
}

#[tokio::test]
async fn node_info_and_neighbors() -> Result<()> {
    let node = json!({
        "node_id": 17,
        "vector_id": "r1",
        "field": "title",
        "level": 1,
        "metadata": null,
        "neighbors": [
            {"node_id": 3, "vector_id": "r9", "field": "title", "distance": 0.5}
        ]
    });
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/docs/debug/title/nodes/17"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": node.clone()})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/docs/debug/title/nodes/17/neighbors/1"))
        .and(query_param("limit", "10"))
        .and(query_param_is_missing("offset"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": node})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ShilpClient::new(server.uri())?;
    let info = client.get_collection_node_info("docs", "title", 17).await?;
    let info = info.data.expect("node info");
    assert_eq!(info.vector_id, "r1");
    assert_eq!(info.neighbors[0].node_id, 3);

    let page = NeighborPage {
        limit: Some(10),
        offset: None,
    };
    let neighbors = client
        .get_collection_node_neighbors_at_level("docs", "title", 17, 1, page)
        .await?;
    assert_eq!(neighbors.data.map(|n| n.neighbors.len()), Some(1));
    Ok(())
}

#[tokio::test]
async fn distance_and_reference_node() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/docs/debug/title/distance/17"))
        .and(query_param("text", "hello world"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"distance": 0.125, "node_id": 17}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/docs/debug/nodes/reference_node/17"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "id": "r1",
                "metadata": {"year": 2021},
                "nodes": [{"id": 17, "field": "title", "vector": [0.5, 0.5]}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ShilpClient::new(server.uri())?;
    let distance = client
        .get_collection_distance("docs", "title", 17, "hello world")
        .await?;
    assert_eq!(distance.data.get("distance"), Some(&json!(0.125)));

    let reference = client
        .get_collection_node_by_reference_node_id("docs", 17)
        .await?;
    let reference = reference.data.expect("reference node");
    assert_eq!(reference.id, "r1");
    assert_eq!(reference.nodes[0].vector, vec![0.5, 0.5]);
    Ok(())
}

#[tokio::test]
async fn blank_field_is_rejected_locally() -> Result<()> {
    let client = ShilpClient::new("http://127.0.0.1:9")?;
    let err = client
        .get_collection_node_info("docs", "", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ShilpError::Validation(_)));
    Ok(())
}
