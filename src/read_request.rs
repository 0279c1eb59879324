//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::result::Result;
use std::time::Duration;

use crate::batch_stream::BatchResultStream;
use crate::error::{ia_err, ia_error, DriverError};
use crate::handle::{document_path, Handle};
use crate::response::{decode_single, OperationKind};
use crate::types::ResultEntry;

/// Struct used for reading a single document by key.
///
/// A missing document is an error of code
/// [`NotFound`](crate::DriverErrorCode::NotFound).
#[derive(Default, Debug)]
pub struct ReadDocumentRequest {
    pub(crate) collection: String,
    pub(crate) key: String,
    pub(crate) timeout: Option<Duration>,
}

impl ReadDocumentRequest {
    pub fn new(collection: &str, key: &str) -> ReadDocumentRequest {
        ReadDocumentRequest {
            collection: collection.to_string(),
            key: key.to_string(),
            ..Default::default()
        }
    }

    /// Specify the timeout value for the request.
    ///
    /// If not set, the default timeout value configured for the [`Handle`](crate::HandleBuilder::timeout()) is used.
    pub fn timeout(mut self, t: &Duration) -> Self {
        self.timeout = Some(*t);
        self
    }

    /// Read the document. The returned entry carries it in
    /// [`document()`](ResultEntry::document()).
    pub async fn execute(&self, h: &Handle) -> Result<ResultEntry, DriverError> {
        if let Some(t) = &self.timeout {
            if t.as_millis() == 0 {
                return ia_err!("timeout must be at least 1 millisecond");
            }
        }
        let path = document_path(&self.collection, Some(&self.key))?;
        let req = h.request(Method::GET, &path, &self.timeout)?.build()?;
        let resp = h.send(req).await?;
        decode_single(OperationKind::ReadOne, &resp)
    }

    /// Read the document and deserialize it into `dest`.
    pub async fn execute_into<T: DeserializeOwned>(
        &self,
        h: &Handle,
        dest: &mut T,
    ) -> Result<ResultEntry, DriverError> {
        let e = self.execute(h).await?;
        if let Some(doc) = e.document_as::<T>()? {
            *dest = doc;
        }
        Ok(e)
    }
}

/// Struct used for reading many documents by key in one round trip.
///
/// The resulting [`BatchResultStream`] has one entry per key, in key order.
/// Keys that do not exist produce error entries.
#[derive(Default, Debug)]
pub struct ReadDocumentsRequest {
    pub(crate) collection: String,
    pub(crate) keys: Vec<String>,
    pub(crate) timeout: Option<Duration>,
}

impl ReadDocumentsRequest {
    pub fn new(collection: &str) -> ReadDocumentsRequest {
        ReadDocumentsRequest {
            collection: collection.to_string(),
            ..Default::default()
        }
    }

    /// Append keys to read.
    pub fn keys<S: AsRef<str>>(mut self, keys: &[S]) -> Self {
        self.keys
            .extend(keys.iter().map(|k| k.as_ref().to_string()));
        self
    }

    /// Append one key to read.
    pub fn key(mut self, key: &str) -> Self {
        self.keys.push(key.to_string());
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
        if self.keys.iter().any(String::is_empty) {
            return ia_err!("document keys must not be empty");
        }
        if self.keys.is_empty() {
            return Ok(BatchResultStream::new(Vec::new(), true));
        }
        let path = document_path(&self.collection, None)?;
        let body = serde_json::to_vec(&self.keys)
            .map_err(|e| ia_error!("cannot serialize keys: {}", e.to_string()))?;
        let req = h
            .request(Method::PUT, &path, &self.timeout)?
            .param("onlyget", true)
            .body(body)
            .build()?;
        let resp = h.send(req).await?;
        BatchResultStream::from_response(
            OperationKind::ReadMany,
            &resp,
            self.keys.len(),
            false,
        )
    }
}
