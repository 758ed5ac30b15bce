//! Insert, delete and search flows against a mock Shilp server.

use anyhow::Result;
use serde_json::{Map, Value, json};
use shilp_rs::{
    AttrType, Filter, FilterCondition, InsertRecordRequest, SearchRequest, ShilpClient, ShilpError,
    Sort, SortKey,
};
use wiremock::matchers::{any, body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{init_tracing, ok_body};

fn record(title: &str, year: i64) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("title".into(), json!(title));
    fields.insert("year".into(), json!(year));
    fields
}

fn hits(ids: &[&str]) -> Value {
    let data: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "title": format!("doc {id}"), "dist": 0.25}))
        .collect();
    json!({"success": true, "message": null, "data": data})
}

#[tokio::test]
async fn add_insert_flush_search_finds_record() -> Result<()> {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/collections"))
        .and(body_partial_json(json!({"name": "docs"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("created")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/records"))
        .and(body_json(json!({
            "collection": "docs",
            "id": "r1",
            "record": {"title": "hello world", "year": 2021},
            "metadata_fields": {"year": 0},
            "fields": ["title"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "inserted",
            "record": {
                "id": "r1",
                "expiry": null,
                "fields": {"title": "hello world", "year": 2021}
            },
            "remaining_records": 99
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/flush"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("flushed")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/search"))
        .and(body_partial_json(json!({"collection": "docs", "query": "hello", "limit": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(&["r1"])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ShilpClient::new(server.uri())?;
    client
        .add_collection(&shilp_rs::AddCollectionRequest::new("docs"))
        .await?;

    let insert = InsertRecordRequest::new("docs", record("hello world", 2021))
        .id("r1")
        .metadata_field("year", AttrType::Int64)
        .fields(vec!["title".into()]);
    let inserted = client.insert_record(&insert).await?;
    assert_eq!(inserted.record.as_ref().map(|r| r.id.as_str()), Some("r1"));
    assert_eq!(inserted.remaining_records, Some(99));

    client.flush_collection("docs").await?;

    let found = client
        .search_data(&SearchRequest::new("docs", "hello").limit(5))
        .await?;
    assert!(found.contains("r1"));
    assert_eq!(found.data[0].distance(), Some(0.25));
    assert_eq!(found.data[0].get("title"), Some(&json!("doc r1")));
    Ok(())
}

#[tokio::test]
async fn deleted_record_is_absent_from_later_search() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/collections/docs/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(&["r1", "r2"])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/collections/docs/records/r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body("deleted")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(&["r2"])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ShilpClient::new(server.uri())?;
    let docs = client.collection("docs");

    let before = docs.search(docs.search_request("doc")).await?;
    assert_eq!(before.ids(), vec!["r1", "r2"]);

    docs.delete("r1").await?;

    let after = docs.search(docs.search_request("doc")).await?;
    assert!(!after.contains("r1"));
    assert!(after.contains("r2"));
    Ok(())
}

#[tokio::test]
async fn search_sends_filters_and_sorts_in_compound_form() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/search"))
        .and(body_partial_json(json!({
            "filters": {"and": [{"attribute": "year", "op": 3, "value": 2020}]},
            "sort": {"sorts": [{"attribute": "year", "order": 1}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(&["r1"])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/search"))
        .and(body_partial_json(json!({
            "filters": {"and": [
                {"attribute": "year", "op": 4, "value": 2024},
                {"attribute": "tag", "op": 6, "values": ["a", "b"]}
            ]},
            "sort": {"sorts": [
                {"attribute": "year", "order": 0},
                {"attribute": "title", "order": 1}
            ]},
            "weights": {"title": 0.5}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(&["r2"])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ShilpClient::new(server.uri())?;

    let single = SearchRequest::new("docs", "q")
        .filter(FilterCondition::gte("year", 2020)?)
        .sort(SortKey::desc("year")?);
    assert!(client.search_data(&single).await?.contains("r1"));

    let compound = SearchRequest::new("docs", "q")
        .filter(Filter::all([
            FilterCondition::lt("year", 2024)?,
            FilterCondition::is_in("tag", ["a", "b"])?,
        ])?)
        .sort(Sort::compound([SortKey::asc("year")?, SortKey::desc("title")?])?)
        .weight("title", 0.5);
    assert!(client.search_data(&compound).await?.contains("r2"));
    Ok(())
}

#[tokio::test]
async fn search_hit_without_id_is_decode_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{"title": "no id"}]
        })))
        .mount(&server)
        .await;

    let client = ShilpClient::new(server.uri())?;
    let err = client
        .search_data(&SearchRequest::new("docs", "q"))
        .await
        .unwrap_err();
    assert!(matches!(err, ShilpError::Decode(_)), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn empty_success_body_is_decode_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/collections/docs/records/r1"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = ShilpClient::new(server.uri())?;
    let err = client.delete_record("docs", "r1").await.unwrap_err();
    assert!(matches!(err, ShilpError::Decode(_)), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn invalid_requests_never_reach_the_server() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = ShilpClient::new(server.uri())?;

    let empty_record = InsertRecordRequest::new("docs", Map::new());
    assert!(matches!(
        client.insert_record(&empty_record).await,
        Err(ShilpError::Validation(_))
    ));

    let blank_id = InsertRecordRequest::new("docs", record("t", 1)).id(" ");
    assert!(matches!(
        client.insert_record(&blank_id).await,
        Err(ShilpError::Validation(_))
    ));

    assert!(matches!(
        client.delete_record("docs", "").await,
        Err(ShilpError::Validation(_))
    ));

    let no_query = SearchRequest::new("docs", "  ");
    assert!(matches!(
        client.search_data(&no_query).await,
        Err(ShilpError::Validation(_))
    ));

    let zero_limit = SearchRequest::new("docs", "q").limit(0);
    assert!(matches!(
        client.search_data(&zero_limit).await,
        Err(ShilpError::Validation(_))
    ));

    let negative_distance = SearchRequest::new("docs", "q").max_distance(-1.0);
    assert!(matches!(
        client.search_data(&negative_distance).await,
        Err(ShilpError::Validation(_))
    ));
    Ok(())
}

#[tokio::test]
async fn vector_only_search_is_allowed() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/docs/search"))
        .and(body_partial_json(json!({"query": "", "vector_query": [0.5, 0.25]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(&["v1"])))
        .expect(1)
        .mount(&server)
        .await;

    let client = ShilpClient::new(server.uri())?;
    let request = SearchRequest::new("docs", "").vector_query(vec![0.5, 0.25]);
    assert_eq!(client.search_data(&request).await?.ids(), vec!["v1"]);
    Ok(())
}

#[test]
fn invalid_filter_shapes_are_rejected_at_construction() {
    assert!(matches!(
        FilterCondition::is_in("tag", Vec::<String>::new()),
        Err(ShilpError::Validation(_))
    ));
    assert!(matches!(
        FilterCondition::eq("tag", json!(["a"])),
        Err(ShilpError::Validation(_))
    ));
    assert!(matches!(
        Filter::all(Vec::new()),
        Err(ShilpError::Validation(_))
    ));
    assert!(matches!(SortKey::asc(""), Err(ShilpError::Validation(_))));
}
