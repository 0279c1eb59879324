//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use serde::de::DeserializeOwned;
use std::result::Result;

use crate::error::{malformed_err, DriverError};
use crate::response::{decode_bulk, OperationKind};
use crate::transport::RawResponse;
use crate::types::ResultEntry;

/// The ordered results of one bulk document operation.
///
/// All entries are decoded when the stream is created; reading never touches
/// the network. Entries come back in the order of the keys or documents in
/// the request, one per input, with per-document failures reported inline
/// (see [`ResultEntry::is_error()`]). Once every entry has been read,
/// [`read_next()`](BatchResultStream::read_next()) returns the
/// [`NoMoreDocuments`](crate::DriverErrorCode::NoMoreDocuments) error, however
/// many times it is called.
///
/// Silent operations are the exception to the one-entry-per-input rule: the
/// server only reports the documents that failed, so the stream holds just
/// those (and is empty when everything succeeded). Use
/// [`is_positional()`](BatchResultStream::is_positional()) to tell the two
/// cases apart.
///
/// Example:
/// ```no_run
/// use arangodb_rust_driver::{DeleteDocumentsRequest, Handle};
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// # let handle = Handle::builder().from_environment()?.build().await?;
/// let mut results = DeleteDocumentsRequest::new("users")
///     .keys(&["alice", "bob"])
///     .return_old(true)
///     .execute(&handle)
///     .await?;
/// while let Ok(entry) = results.read_next() {
///     if let Some(err) = entry.error() {
///         println!("delete failed: {}", err.message);
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct BatchResultStream {
    entries: Vec<ResultEntry>,
    position: usize,
    positional: bool,
}

impl BatchResultStream {
    pub(crate) fn new(entries: Vec<ResultEntry>, positional: bool) -> BatchResultStream {
        BatchResultStream {
            entries,
            position: 0,
            positional,
        }
    }

    /// Decode a bulk response for `inputs` keys or documents. Unless the
    /// operation was silent, the server must answer with one entry per input.
    pub(crate) fn from_response(
        kind: OperationKind,
        resp: &RawResponse,
        inputs: usize,
        silent: bool,
    ) -> Result<BatchResultStream, DriverError> {
        let entries = decode_bulk(kind, resp)?;
        if !silent && entries.len() != inputs {
            return malformed_err!(
                "bulk response has {} entries for {} inputs",
                entries.len(),
                inputs
            );
        }
        Ok(BatchResultStream::new(entries, !silent))
    }

    /// Return the next entry, or the `NoMoreDocuments` error once all
    /// entries have been read.
    pub fn read_next(&mut self) -> Result<ResultEntry, DriverError> {
        if self.position >= self.entries.len() {
            return Err(DriverError::no_more_documents());
        }
        let e = std::mem::take(&mut self.entries[self.position]);
        self.position += 1;
        Ok(e)
    }

    /// Return the next entry, deserializing its document into `dest`.
    ///
    /// Only read results carry a document. For entries without one, such as
    /// item errors, `dest` is left unchanged.
    pub fn read_into<T: DeserializeOwned>(&mut self, dest: &mut T) -> Result<ResultEntry, DriverError> {
        let e = self.read_next()?;
        if let Some(doc) = e.document_as::<T>()? {
            *dest = doc;
        }
        Ok(e)
    }

    /// Total number of entries, read or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries not yet read.
    pub fn remaining(&self) -> usize {
        self.entries.len() - self.position
    }

    /// True if entry *i* corresponds to input *i*. False for silent
    /// operations, where only failures are reported.
    pub fn is_positional(&self) -> bool {
        self.positional
    }
}

impl Iterator for BatchResultStream {
    type Item = ResultEntry;

    fn next(&mut self) -> Option<ResultEntry> {
        self.read_next().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}
