//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use serde::de::DeserializeOwned;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{DriverError, DriverErrorCode};

/// Opaque identifier of one shard of a collection.
pub type ShardId = String;

/// Opaque identifier of a server holding shard replicas.
pub type ServerId = String;

/// The system attributes every stored document carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(rename = "_key", default)]
    pub key: String,
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_rev", default)]
    pub rev: String,
}

/// A per-document failure inside a bulk response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemError {
    /// HTTP-equivalent status the server reported for this item, if any.
    pub code: u16,
    /// Server error number, e.g. 1202 for "document not found".
    pub error_num: i32,
    pub message: String,
}

impl ItemError {
    /// Convert into a [`DriverError`] of code [`DriverErrorCode::ItemFailure`].
    pub fn to_driver_error(&self) -> DriverError {
        DriverError {
            code: DriverErrorCode::ItemFailure,
            message: self.message.clone(),
            error_num: self.error_num,
            status: self.code,
        }
    }
}

/// Outcome of one element of a response.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EntryStatus {
    #[default]
    Success,
    Failed(ItemError),
}

/// One decoded element of a result stream.
///
/// Exactly one of two things is true of an entry: it succeeded, in which case
/// [`meta()`](ResultEntry::meta()) is populated and the payload accessors may
/// return data; or it failed, in which case [`error()`](ResultEntry::error())
/// returns the item error and the key is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultEntry {
    pub(crate) meta: DocumentMeta,
    pub(crate) document: Option<Value>,
    pub(crate) old: Option<Value>,
    pub(crate) new: Option<Value>,
    pub(crate) status: EntryStatus,
}

impl ResultEntry {
    pub(crate) fn failed(err: ItemError) -> ResultEntry {
        ResultEntry {
            status: EntryStatus::Failed(err),
            ..Default::default()
        }
    }

    pub fn meta(&self) -> &DocumentMeta {
        &self.meta
    }
    /// The document key. Empty for failed entries and silent writes.
    pub fn key(&self) -> &str {
        &self.meta.key
    }
    pub fn id(&self) -> &str {
        &self.meta.id
    }
    pub fn rev(&self) -> &str {
        &self.meta.rev
    }
    pub fn status(&self) -> &EntryStatus {
        &self.status
    }
    pub fn is_error(&self) -> bool {
        matches!(self.status, EntryStatus::Failed(_))
    }
    pub fn error(&self) -> Option<&ItemError> {
        match &self.status {
            EntryStatus::Failed(e) => Some(e),
            EntryStatus::Success => None,
        }
    }
    /// The item error as a [`DriverError`], for `?` propagation.
    pub fn as_error(&self) -> Option<DriverError> {
        self.error().map(ItemError::to_driver_error)
    }
    /// True if this entry failed because its document does not exist.
    pub fn is_not_found(&self) -> bool {
        self.error()
            .map(|e| e.to_driver_error().is_not_found())
            .unwrap_or(false)
    }

    /// The document body, for reads and query results.
    pub fn document(&self) -> Option<&Value> {
        self.document.as_ref()
    }
    /// The pre-modification snapshot, if one was requested.
    pub fn old(&self) -> Option<&Value> {
        self.old.as_ref()
    }
    /// The post-modification snapshot, if one was requested.
    pub fn new(&self) -> Option<&Value> {
        self.new.as_ref()
    }

    pub fn document_as<T: DeserializeOwned>(&self) -> Result<Option<T>, DriverError> {
        payload_as(&self.document)
    }
    pub fn old_as<T: DeserializeOwned>(&self) -> Result<Option<T>, DriverError> {
        payload_as(&self.old)
    }
    pub fn new_as<T: DeserializeOwned>(&self) -> Result<Option<T>, DriverError> {
        payload_as(&self.new)
    }
}

fn payload_as<T: DeserializeOwned>(v: &Option<Value>) -> Result<Option<T>, DriverError> {
    match v {
        Some(v) => Ok(Some(serde_json::from_value(v.clone())?)),
        None => Ok(None),
    }
}

/// Execution statistics of a query, accumulated over all batches fetched so far.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CursorStats {
    pub writes_executed: u64,
    pub writes_ignored: u64,
    pub scanned_full: u64,
    pub scanned_index: u64,
    pub cursors_created: u64,
    pub filtered: u64,
    pub http_requests: u64,
    /// Only reported when the query was run with `fullCount`.
    pub full_count: Option<u64>,
    pub execution_time: f64,
    pub peak_memory_usage: u64,
}

impl CursorStats {
    /// Fold the statistics of a later batch into these.
    pub(crate) fn add(&mut self, other: &CursorStats) {
        self.writes_executed += other.writes_executed;
        self.writes_ignored += other.writes_ignored;
        self.scanned_full += other.scanned_full;
        self.scanned_index += other.scanned_index;
        self.cursors_created += other.cursors_created;
        self.filtered += other.filtered;
        self.http_requests += other.http_requests;
        if other.full_count.is_some() {
            self.full_count = other.full_count;
        }
        self.execution_time += other.execution_time;
        self.peak_memory_usage = self.peak_memory_usage.max(other.peak_memory_usage);
    }
}

/// Execution plan of a query. Only returned when profiling level 2 or higher
/// was requested.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryPlan {
    /// Names of the optimizer rules that were applied.
    pub rules: Vec<String>,
    pub estimated_cost: f64,
    pub estimated_nr_items: u64,
    pub nodes: Vec<Value>,
    pub collections: Vec<PlanCollection>,
}

impl QueryPlan {
    pub fn has_rule(&self, rule: &str) -> bool {
        self.rules.iter().any(|r| r == rule)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlanCollection {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Time spent in each query phase, in seconds.
pub type QueryProfile = BTreeMap<String, f64>;

/// A non-fatal warning raised while executing a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryWarning {
    pub code: i32,
    pub message: String,
}
