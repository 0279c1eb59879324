//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use crate::test_server::FakeServer;
use crate::{
    Cursor, DriverErrorCode, QueryRequest, ReplicationFactor, ShardRouter, ShardsRequest,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;
use std::error::Error;

fn random_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

async fn keys_of(cursor: &mut Cursor) -> Result<Vec<String>, Box<dyn Error>> {
    let mut keys = Vec::new();
    loop {
        match cursor.read_next().await {
            Ok(e) => keys.push(e.key().to_string()),
            Err(e) if e.is_no_more_documents() => return Ok(keys),
            Err(e) => return Err(e.into()),
        }
    }
}

#[tokio::test]
async fn shard_map() -> Result<(), Box<dyn Error>> {
    let server = FakeServer::new();
    server.create_collection("orders", 3);
    let handle = server.handle().await?;

    let shards = ShardsRequest::new("orders").execute(&handle).await?;
    assert_eq!(shards.name(), "orders");
    assert_eq!(shards.shard_ids(), vec!["s1001", "s1002", "s1003"]);
    assert_eq!(shards.number_of_shards(), 3);
    assert_eq!(shards.shard_keys(), ["_key".to_string()]);
    assert_eq!(shards.replication_factor(), Some(&ReplicationFactor::Count(2)));
    assert_eq!(shards.leader("s1002").map(String::as_str), Some("PRMR-2"));
    assert!(!shards.contains("s9999"));

    let err = ShardsRequest::new("nothing").execute(&handle).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn per_shard_union_matches_full_scan() -> Result<(), Box<dyn Error>> {
    let server = FakeServer::new();
    server.create_collection("orders", 4);
    let docs: Vec<_> = (0..200)
        .map(|i| json!({"_key": random_key(), "n": i}))
        .collect();
    server.insert("orders", docs);
    let handle = server.handle().await?;

    let mut all = QueryRequest::new("FOR o IN orders RETURN o")
        .batch_size(33)
        .execute(&handle)
        .await?;
    let mut expected = keys_of(&mut all).await?;
    assert_eq!(expected.len(), 200);

    let shards = ShardsRequest::new("orders").execute(&handle).await?;
    let routers = ShardRouter::per_shard(&shards);
    assert_eq!(routers.len(), 4);

    let mut union = Vec::new();
    for router in routers {
        let shard = router.shard_ids()[0].clone();
        let mut cursor = QueryRequest::new("FOR o IN orders RETURN o")
            .batch_size(33)
            .shard_router(router)
            .execute(&handle)
            .await?;
        let keys = keys_of(&mut cursor).await?;
        for k in &keys {
            assert_eq!(server.shard_of("orders", k), shard);
        }
        union.extend(keys);
    }
    union.sort();
    expected.sort();
    assert_eq!(union, expected);
    Ok(())
}

#[tokio::test]
async fn restriction_to_several_shards() -> Result<(), Box<dyn Error>> {
    let server = FakeServer::new();
    server.create_collection("orders", 3);
    let docs: Vec<_> = (0..60).map(|i| json!({"_key": format!("o{}", i)})).collect();
    server.insert("orders", docs);
    let handle = server.handle().await?;

    let mut cursor = QueryRequest::new("FOR o IN orders RETURN o")
        .shard_ids(&["s1001", "s1003", "s1001"])?
        .execute(&handle)
        .await?;
    let keys = keys_of(&mut cursor).await?;
    assert!(!keys.is_empty());
    for k in &keys {
        assert_ne!(server.shard_of("orders", k), "s1002");
    }
    Ok(())
}

#[tokio::test]
async fn unknown_shard_rejected_by_server() -> Result<(), Box<dyn Error>> {
    let server = FakeServer::new();
    server.create_collection("orders", 2);
    server.insert("orders", vec![json!({"_key": "a"})]);
    let handle = server.handle().await?;

    let err = QueryRequest::new("FOR o IN orders RETURN o")
        .shard_ids(&["s1001", "s4242"])?
        .execute(&handle)
        .await
        .unwrap_err();
    assert_eq!(err.code, DriverErrorCode::InvalidShardIdentifier);
    assert_eq!(err.error_num, 1203);
    assert!(err.message.contains("s4242"));
    Ok(())
}

#[tokio::test]
async fn unknown_shard_rejected_before_sending() -> Result<(), Box<dyn Error>> {
    let server = FakeServer::new();
    server.create_collection("orders", 2);
    let handle = server.handle().await?;
    let shards = ShardsRequest::new("orders").execute(&handle).await?;

    let router = ShardRouter::new(["s1002", "bogus"])?.with_known_shards(&shards);
    let err = QueryRequest::new("FOR o IN orders RETURN o")
        .shard_router(router)
        .execute(&handle)
        .await
        .unwrap_err();
    assert_eq!(err.code, DriverErrorCode::InvalidShardIdentifier);
    assert_eq!(server.requests("POST", "/_api/cursor"), 0);
    Ok(())
}

#[test]
fn router_validation() {
    let r = ShardRouter::new(["s2", "s1", "s2", "s3", "s1"]).unwrap();
    assert_eq!(r.shard_ids(), ["s2", "s1", "s3"]);

    let err = ShardRouter::new(Vec::<String>::new()).unwrap_err();
    assert_eq!(err.code, DriverErrorCode::IllegalArgument);
    let err = ShardRouter::new(["s1", ""]).unwrap_err();
    assert_eq!(err.code, DriverErrorCode::IllegalArgument);

    let err = QueryRequest::new("RETURN 1")
        .shard_ids::<&str>(&[])
        .unwrap_err();
    assert_eq!(err.code, DriverErrorCode::IllegalArgument);
}
