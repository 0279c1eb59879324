//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use reqwest::Method;
use serde_derive::Deserialize;
use std::collections::BTreeMap;
use std::result::Result;
use std::time::Duration;
use tracing::trace;

use crate::error::{ia_err, DriverError};
use crate::handle::{path_segment, Handle};
use crate::types::{ServerId, ShardId};

/// Struct used for fetching the shard layout of a collection.
#[derive(Default, Debug)]
pub struct ShardsRequest {
    pub(crate) collection: String,
    pub(crate) timeout: Option<Duration>,
}

/// How many copies of each shard are kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ReplicationFactor {
    Count(u32),
    /// e.g. `"satellite"`
    Named(String),
}

/// Struct representing the result of a [`ShardsRequest`] operation.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShardsResult {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) shards: BTreeMap<ShardId, Vec<ServerId>>,
    pub(crate) number_of_shards: u32,
    pub(crate) shard_keys: Vec<String>,
    pub(crate) sharding_strategy: String,
    pub(crate) replication_factor: Option<ReplicationFactor>,
    pub(crate) write_concern: u32,
}

impl ShardsRequest {
    pub fn new(collection: &str) -> ShardsRequest {
        ShardsRequest {
            collection: collection.to_string(),
            ..Default::default()
        }
    }

    /// Specify the timeout value for the request.
    ///
    /// This is optional.
    /// If set, it must be greater than or equal to 1 millisecond, otherwise an
    /// IllegalArgument error will be returned.
    /// If not set, the default timeout value configured for the [`Handle`](crate::HandleBuilder::timeout()) is used.
    pub fn timeout(mut self, t: &Duration) -> Self {
        self.timeout = Some(*t);
        self
    }

    pub async fn execute(&self, h: &Handle) -> Result<ShardsResult, DriverError> {
        if self.collection.is_empty() {
            return ia_err!("collection name must not be empty");
        }
        if let Some(t) = &self.timeout {
            if t.as_millis() == 0 {
                return ia_err!("timeout must be at least 1 millisecond");
            }
        }
        let path = format!("/_api/collection/{}/shards", path_segment(&self.collection)?);
        let req = h
            .request(Method::GET, &path, &self.timeout)?
            .param("details", true)
            .build()?;
        let resp = h.send(req).await?;
        let res: ShardsResult = serde_json::from_slice(&resp.body)?;
        trace!(
            "collection {} has {} shards",
            self.collection,
            res.shards.len()
        );
        Ok(res)
    }
}

impl ShardsResult {
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Map of shard id to the servers holding it. The first server is the leader.
    pub fn shards(&self) -> &BTreeMap<ShardId, Vec<ServerId>> {
        &self.shards
    }
    /// All shard ids, sorted.
    pub fn shard_ids(&self) -> Vec<ShardId> {
        self.shards.keys().cloned().collect()
    }
    pub fn contains(&self, shard: &str) -> bool {
        self.shards.contains_key(shard)
    }
    pub fn leader(&self, shard: &str) -> Option<&ServerId> {
        self.shards.get(shard).and_then(|s| s.first())
    }
    pub fn number_of_shards(&self) -> u32 {
        self.number_of_shards
    }
    pub fn shard_keys(&self) -> &[String] {
        &self.shard_keys
    }
    pub fn sharding_strategy(&self) -> &str {
        &self.sharding_strategy
    }
    pub fn replication_factor(&self) -> Option<&ReplicationFactor> {
        self.replication_factor.as_ref()
    }
    pub fn write_concern(&self) -> u32 {
        self.write_concern
    }
}
