//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use reqwest::Method;
use serde_json::Value;
use std::result::Result;
use std::time::Duration;

use crate::batch_stream::BatchResultStream;
use crate::error::{ia_err, ia_error, DriverError};
use crate::handle::{document_path, Handle};
use crate::response::OperationKind;

/// Struct used for partially updating documents in one round trip.
///
/// Every document must carry its `_key`. The given attributes are merged
/// into the stored document. The resulting [`BatchResultStream`] has one entry
/// per document, in document order; with
/// [`return_old`](UpdateDocumentsRequest::return_old()) and
/// [`return_new`](UpdateDocumentsRequest::return_new()) each entry carries the
/// document as it was before and after the update.
#[derive(Default, Debug)]
pub struct UpdateDocumentsRequest {
    pub(crate) collection: String,
    pub(crate) documents: Vec<Value>,
    pub(crate) return_old: bool,
    pub(crate) return_new: bool,
    pub(crate) silent: bool,
    pub(crate) keep_null: Option<bool>,
    pub(crate) merge_objects: Option<bool>,
    pub(crate) ignore_revs: Option<bool>,
    pub(crate) wait_for_sync: bool,
    pub(crate) timeout: Option<Duration>,
}

impl UpdateDocumentsRequest {
    pub fn new(collection: &str) -> UpdateDocumentsRequest {
        UpdateDocumentsRequest {
            collection: collection.to_string(),
            ..Default::default()
        }
    }

    /// Append one patch document. It must be an object with a non-empty `_key`.
    pub fn document(mut self, doc: &impl serde::Serialize) -> Result<Self, DriverError> {
        let v = serde_json::to_value(doc)
            .map_err(|e| ia_error!("cannot serialize document: {}", e.to_string()))?;
        match v.get("_key").and_then(Value::as_str) {
            Some(k) if !k.is_empty() => {}
            _ => return ia_err!("update document needs a non-empty '_key': {}", v),
        }
        self.documents.push(v);
        Ok(self)
    }

    pub fn documents<T: serde::Serialize>(mut self, docs: &[T]) -> Result<Self, DriverError> {
        for d in docs {
            self = self.document(d)?;
        }
        Ok(self)
    }

    pub fn return_old(mut self, return_old: bool) -> Self {
        self.return_old = return_old;
        self
    }

    pub fn return_new(mut self, return_new: bool) -> Self {
        self.return_new = return_new;
        self
    }

    /// Only report failures. See [`BatchResultStream::is_positional()`].
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// If false, attributes set to `null` in the patch are removed from the
    /// stored document.
    pub fn keep_null(mut self, keep_null: bool) -> Self {
        self.keep_null = Some(keep_null);
        self
    }

    /// If false, object attributes in the patch replace stored ones instead
    /// of being merged.
    pub fn merge_objects(mut self, merge: bool) -> Self {
        self.merge_objects = Some(merge);
        self
    }

    /// If false, a `_rev` in a patch document must match the stored revision.
    pub fn ignore_revs(mut self, ignore: bool) -> Self {
        self.ignore_revs = Some(ignore);
        self
    }

    pub fn wait_for_sync(mut self, wait: bool) -> Self {
        self.wait_for_sync = wait;
        self
    }

    pub fn timeout(mut self, t: &Duration) -> Self {
        self.timeout = Some(*t);
        self
    }

    pub async fn execute(&self, h: &Handle) -> Result<BatchResultStream, DriverError> {
        if let Some(t) = &self.timeout {
            if t.as_millis() == 0 {
                return ia_err!("timeout must be at least 1 millisecond");
            }
        }
        if self.documents.is_empty() {
            return Ok(BatchResultStream::new(Vec::new(), !self.silent));
        }
        let path = document_path(&self.collection, None)?;
        let body = serde_json::to_vec(&self.documents)
            .map_err(|e| ia_error!("cannot serialize documents: {}", e.to_string()))?;
        let req = h
            .request(Method::PATCH, &path, &self.timeout)?
            .param_opt("returnOld", self.return_old.then_some(true))
            .param_opt("returnNew", self.return_new.then_some(true))
            .param_opt("silent", self.silent.then_some(true))
            .param_opt("keepNull", self.keep_null)
            .param_opt("mergeObjects", self.merge_objects)
            .param_opt("ignoreRevs", self.ignore_revs)
            .param_opt("waitForSync", self.wait_for_sync.then_some(true))
            .body(body)
            .build()?;
        let resp = h.send(req).await?;
        BatchResultStream::from_response(
            OperationKind::WriteMany,
            &resp,
            self.documents.len(),
            self.silent,
        )
    }
}
