//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use reqwest::Method;
use std::result::Result;
use std::time::Duration;

use crate::batch_stream::BatchResultStream;
use crate::error::{ia_err, ia_error, DriverError};
use crate::handle::{document_path, Handle};
use crate::response::{decode_single, OperationKind};
use crate::types::ResultEntry;

/// Struct used for deleting a single document by key.
///
/// This request can be used to perform unconditional and conditional deletes:
///
/// - Delete the document whatever its revision. This is the default.
/// - Succeed only if the document's revision matches a specific revision. Use
///   [`if_match()`](DeleteDocumentRequest::if_match()) for this case.
///
/// The removed document can be returned with
/// [`return_old(true)`](DeleteDocumentRequest::return_old()). Deleting a
/// document that does not exist is an error of code
/// [`NotFound`](crate::DriverErrorCode::NotFound).
#[derive(Default, Debug)]
pub struct DeleteDocumentRequest {
    pub(crate) collection: String,
    pub(crate) key: String,
    pub(crate) timeout: Option<Duration>,
    pub(crate) return_old: bool,
    pub(crate) silent: bool,
    pub(crate) wait_for_sync: bool,
    match_rev: String,
}

impl DeleteDocumentRequest {
    /// Create a new `DeleteDocumentRequest`.
    pub fn new(collection: &str, key: &str) -> DeleteDocumentRequest {
        DeleteDocumentRequest {
            collection: collection.to_string(),
            key: key.to_string(),
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

    /// Only delete if the stored revision equals `rev`. A mismatch is an
    /// error of code [`Conflict`](crate::DriverErrorCode::Conflict).
    pub fn if_match(mut self, rev: &str) -> Self {
        self.match_rev = rev.to_string();
        self
    }

    /// Return the removed document in [`ResultEntry::old()`].
    pub fn return_old(mut self, val: bool) -> Self {
        self.return_old = val;
        self
    }

    /// Return nothing on success: the entry's key is empty.
    pub fn silent(mut self, val: bool) -> Self {
        self.silent = val;
        self
    }

    pub fn wait_for_sync(mut self, val: bool) -> Self {
        self.wait_for_sync = val;
        self
    }

    pub async fn execute(&self, h: &Handle) -> Result<ResultEntry, DriverError> {
        if let Some(t) = &self.timeout {
            if t.as_millis() == 0 {
                return ia_err!("timeout must be at least 1 millisecond");
            }
        }
        let path = document_path(&self.collection, Some(&self.key))?;
        let mut rb = h
            .request(Method::DELETE, &path, &self.timeout)?
            .param_opt("returnOld", self.return_old.then_some(true))
            .param_opt("silent", self.silent.then_some(true))
            .param_opt("waitForSync", self.wait_for_sync.then_some(true));
        if !self.match_rev.is_empty() {
            rb = rb.header("If-Match", &self.match_rev);
        }
        let resp = h.send(rb.build()?).await?;
        decode_single(OperationKind::WriteOne, &resp)
    }
}

/// Struct used for deleting many documents by key in one round trip.
///
/// The resulting [`BatchResultStream`] has one entry per key, in key order.
/// A key that does not exist yields an error entry (see
/// [`ResultEntry::is_not_found()`]) without affecting the others.
#[derive(Default, Debug)]
pub struct DeleteDocumentsRequest {
    pub(crate) collection: String,
    pub(crate) keys: Vec<String>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) return_old: bool,
    pub(crate) silent: bool,
    pub(crate) ignore_revs: Option<bool>,
    pub(crate) wait_for_sync: bool,
}

impl DeleteDocumentsRequest {
    pub fn new(collection: &str) -> DeleteDocumentsRequest {
        DeleteDocumentsRequest {
            collection: collection.to_string(),
            ..Default::default()
        }
    }

    /// Append keys to delete.
    pub fn keys<S: AsRef<str>>(mut self, keys: &[S]) -> Self {
        self.keys
            .extend(keys.iter().map(|k| k.as_ref().to_string()));
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.keys.push(key.to_string());
        self
    }

    pub fn timeout(mut self, t: &Duration) -> Self {
        self.timeout = Some(*t);
        self
    }

    pub fn return_old(mut self, val: bool) -> Self {
        self.return_old = val;
        self
    }

    /// Only report failures. See [`BatchResultStream::is_positional()`].
    pub fn silent(mut self, val: bool) -> Self {
        self.silent = val;
        self
    }

    pub fn ignore_revs(mut self, val: bool) -> Self {
        self.ignore_revs = Some(val);
        self
    }

    pub fn wait_for_sync(mut self, val: bool) -> Self {
        self.wait_for_sync = val;
        self
    }

    pub async fn execute(&self, h: &Handle) -> Result<BatchResultStream, DriverError> {
        if let Some(t) = &self.timeout {
            if t.as_millis() == 0 {
                return ia_err!("timeout must be at least 1 millisecond");
            }
        }
        if self.keys.iter().any(String::is_empty) {
            return ia_err!("document keys must not be empty");
        }
        if self.keys.is_empty() {
            return Ok(BatchResultStream::new(Vec::new(), !self.silent));
        }
        let path = document_path(&self.collection, None)?;
        let body = serde_json::to_vec(&self.keys)
            .map_err(|e| ia_error!("cannot serialize keys: {}", e.to_string()))?;
        let req = h
            .request(Method::DELETE, &path, &self.timeout)?
            .param_opt("returnOld", self.return_old.then_some(true))
            .param_opt("silent", self.silent.then_some(true))
            .param_opt("ignoreRevs", self.ignore_revs)
            .param_opt("waitForSync", self.wait_for_sync.then_some(true))
            .body(body)
            .build()?;
        let resp = h.send(req).await?;
        BatchResultStream::from_response(
            OperationKind::WriteMany,
            &resp,
            self.keys.len(),
            self.silent,
        )
    }
}
