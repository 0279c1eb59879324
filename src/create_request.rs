//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::result::Result;
use std::time::Duration;

use crate::batch_stream::BatchResultStream;
use crate::error::{ia_err, ia_error, DriverError};
use crate::handle::{document_path, Handle};
use crate::response::OperationKind;

/// What to do when a created document's key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteMode {
    /// Keep the existing document and report success.
    Ignore,
    /// Merge the new document into the existing one.
    Update,
    /// Replace the existing document.
    Replace,
    /// Report a unique constraint violation for that document.
    Conflict,
}

impl fmt::Display for OverwriteMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            OverwriteMode::Ignore => "ignore",
            OverwriteMode::Update => "update",
            OverwriteMode::Replace => "replace",
            OverwriteMode::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

/// Struct used for creating documents in one round trip.
///
/// The resulting [`BatchResultStream`] has one entry per document, in
/// document order, unless [`silent`](CreateDocumentsRequest::silent()) is
/// set.
///
/// Example:
/// ```no_run
/// use arangodb_rust_driver::{CreateDocumentsRequest, Handle};
/// use serde_json::json;
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// # let handle = Handle::builder().from_environment()?.build().await?;
/// let mut results = CreateDocumentsRequest::new("books")
///     .document(&json!({"_key": "b1", "title": "Dune"}))?
///     .document(&json!({"title": "Emma"}))?
///     .return_new(true)
///     .execute(&handle)
///     .await?;
/// for entry in results.by_ref() {
///     println!("created {} rev {}", entry.key(), entry.rev());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Default, Debug)]
pub struct CreateDocumentsRequest {
    pub(crate) collection: String,
    pub(crate) documents: Vec<Value>,
    pub(crate) return_new: bool,
    pub(crate) silent: bool,
    pub(crate) overwrite_mode: Option<OverwriteMode>,
    pub(crate) wait_for_sync: bool,
    pub(crate) timeout: Option<Duration>,
}

impl CreateDocumentsRequest {
    pub fn new(collection: &str) -> CreateDocumentsRequest {
        CreateDocumentsRequest {
            collection: collection.to_string(),
            ..Default::default()
        }
    }

    /// Append one document. It must serialize to a JSON object.
    pub fn document(mut self, doc: &impl serde::Serialize) -> Result<Self, DriverError> {
        let v = serde_json::to_value(doc)
            .map_err(|e| ia_error!("cannot serialize document: {}", e.to_string()))?;
        if !v.is_object() {
            return ia_err!("document must be an object, got {}", v);
        }
        self.documents.push(v);
        Ok(self)
    }

    /// Append documents.
    pub fn documents<T: serde::Serialize>(mut self, docs: &[T]) -> Result<Self, DriverError> {
        for d in docs {
            self = self.document(d)?;
        }
        Ok(self)
    }

    /// Return each created document in [`ResultEntry::new()`](crate::ResultEntry::new()).
    pub fn return_new(mut self, return_new: bool) -> Self {
        self.return_new = return_new;
        self
    }

    /// Only report failures. See [`BatchResultStream::is_positional()`].
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn overwrite_mode(mut self, mode: OverwriteMode) -> Self {
        self.overwrite_mode = Some(mode);
        self
    }

    /// Wait until the documents are synced to disk.
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
            .request(Method::POST, &path, &self.timeout)?
            .param_opt("returnNew", self.return_new.then_some(true))
            .param_opt("silent", self.silent.then_some(true))
            .param_opt("waitForSync", self.wait_for_sync.then_some(true))
            .param_opt("overwriteMode", self.overwrite_mode)
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
