//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use std::collections::BTreeSet;
use std::result::Result;

use crate::error::{ia_err, DriverError, DriverErrorCode, ErrorNum};
use crate::shards_request::ShardsResult;
use crate::types::ShardId;

/// Restricts a query to an explicit set of shards.
///
/// A query restricted to shards `{s1, s2}` returns exactly the documents
/// stored on those shards. Running one query per shard and concatenating the
/// results yields the same multiset as the unrestricted query; no merging or
/// re-sorting across shards is done. Naming a shard the collection does not
/// have fails the whole query with
/// [`InvalidShardIdentifier`](crate::DriverErrorCode::InvalidShardIdentifier)
/// before any result is returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardRouter {
    shard_ids: Vec<ShardId>,
    known: Option<BTreeSet<ShardId>>,
}

impl ShardRouter {
    /// Create a router for the given shard ids.
    ///
    /// The list must not be empty and no id may be empty. Duplicates are
    /// dropped, keeping the first occurrence.
    pub fn new<I, S>(shard_ids: I) -> Result<ShardRouter, DriverError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids: Vec<ShardId> = Vec::new();
        for s in shard_ids {
            let s = s.as_ref();
            if s.is_empty() {
                return ia_err!("shard id must not be empty");
            }
            if !ids.iter().any(|i| i == s) {
                ids.push(s.to_string());
            }
        }
        if ids.is_empty() {
            return ia_err!("shard restriction needs at least one shard id");
        }
        Ok(ShardRouter {
            shard_ids: ids,
            known: None,
        })
    }

    /// One router per shard of the collection, in shard id order.
    pub fn per_shard(shards: &ShardsResult) -> Vec<ShardRouter> {
        shards
            .shard_ids()
            .into_iter()
            .map(|s| ShardRouter {
                shard_ids: vec![s],
                known: None,
            }
            .with_known_shards(shards))
            .collect()
    }

    /// Check ids against the collection's shard map before sending.
    pub fn with_known_shards(mut self, shards: &ShardsResult) -> ShardRouter {
        self.known = Some(shards.shard_ids().into_iter().collect());
        self
    }

    pub fn shard_ids(&self) -> &[ShardId] {
        &self.shard_ids
    }

    pub(crate) fn validate(&self) -> Result<(), DriverError> {
        let Some(known) = &self.known else {
            return Ok(());
        };
        if let Some(unknown) = self.shard_ids.iter().find(|s| !known.contains(*s)) {
            return Err(DriverError::new(
                DriverErrorCode::InvalidShardIdentifier,
                &format!("unknown shard id '{}'", unknown),
            ));
        }
        Ok(())
    }

    /// Translate the server's "no such data source" answer to a
    /// shard-restricted query.
    pub(crate) fn map_server_error(&self, mut e: DriverError) -> DriverError {
        let shard_error = e.error_num == ErrorNum::DataSourceNotFound as i32
            || e.error_num == ErrorNum::ClusterShardGone as i32;
        if shard_error {
            e.code = DriverErrorCode::InvalidShardIdentifier;
            e.message = format!(
                "query restricted to shards {:?} was rejected: {}",
                self.shard_ids, e.message
            );
        }
        e
    }
}
