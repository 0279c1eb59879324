//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use reqwest::Method;
use std::result::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use crate::error::{ia_err, ia_error, DriverError, DriverErrorCode};
use crate::handle_builder::HandleBuilder;
use crate::response::decode_error;
use crate::transport::{HttpTransport, RawResponse, Request, RequestBuilder, Transport};

/// **The main database handle**.
///
/// This should be created once and used
/// throughout the application lifetime, across all threads.
///
/// Note: there is no need to enclose this struct in an `Rc` or [`Arc`], as it uses an
/// [`Arc`] internally, so calling `.clone()` on this struct will always return the
/// same underlying handle.
#[derive(Clone, Debug)]
pub struct Handle {
    // Use an inner Arc so cloning keeps the same contents
    pub(crate) inner: Arc<HandleRef>,
}

#[derive(Debug)]
pub(crate) struct HandleRef {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) database: String,
    request_id: AtomicUsize,
    timeout: Duration,
}

impl Handle {
    /// Create a new [`HandleBuilder`].
    pub fn builder() -> HandleBuilder {
        HandleBuilder::new()
    }

    // Create the new Handle based on builder configuration
    pub(crate) async fn new(b: &HandleBuilder) -> Result<Handle, DriverError> {
        let builder = b;
        // default timeout to 30 seconds
        let timeout = builder.timeout.unwrap_or(Duration::new(30, 0));
        let database = if builder.database.is_empty() {
            "_system".to_string()
        } else {
            builder.database.clone()
        };

        let transport: Arc<dyn Transport> = match &builder.transport {
            Some(t) => t.clone(),
            None => {
                if builder.endpoint.is_empty() {
                    if builder.from_environment {
                        return ia_err!("can't determine endpoint: set ARANGODB_ENDPOINT or ARANGODB_CONFIG_FILE");
                    }
                    return ia_err!("can't determine endpoint: call HandleBuilder::endpoint()");
                }
                let c = {
                    if let Some(c) = &builder.client {
                        c.clone()
                    } else {
                        let mut cb = reqwest::Client::builder()
                            .timeout(timeout)
                            .connect_timeout(timeout)
                            .connection_verbose(true);
                        if let Some(cert) = &builder.add_cert {
                            cb = cb.add_root_certificate(cert.clone());
                        }
                        if builder.accept_invalid_certs {
                            cb = cb.danger_accept_invalid_certs(true);
                        }
                        cb.build()?
                    }
                };
                Arc::new(HttpTransport::new(
                    c,
                    &builder.endpoint,
                    builder.credentials.clone(),
                )?)
            }
        };
        debug!(
            "Creating new Handle: endpoint={}, database={}, timeout={:?}",
            builder.endpoint, database, timeout
        );
        Ok(Handle {
            inner: Arc::new(HandleRef {
                transport,
                database,
                request_id: AtomicUsize::new(1),
                timeout,
            }),
        })
    }

    /// The database this handle addresses.
    pub fn database(&self) -> &str {
        &self.inner.database
    }

    /// Start a request for `api_path` (e.g. `/_api/cursor`) in this handle's
    /// database, with the deadline already set.
    pub(crate) fn request(
        &self,
        method: Method,
        api_path: &str,
        timeout: &Option<Duration>,
    ) -> Result<RequestBuilder, DriverError> {
        let path = format!("/_db/{}{}", path_segment(&self.inner.database)?, api_path);
        Ok(RequestBuilder::default()
            .method(method)
            .path(path)
            .timeout(self.get_timeout(timeout)))
    }

    /// Execute one request, bounded by its deadline.
    ///
    /// Exactly one gateway call is made. A non-2xx response is turned into
    /// the matching [`DriverError`].
    pub(crate) async fn send(&self, req: Request) -> Result<RawResponse, DriverError> {
        let request_id = self.inner.request_id.fetch_add(1, Ordering::Relaxed);
        trace!("send {}: {} {}", request_id, req.method, req.path);
        let deadline = req.timeout;
        let resp = match tokio::time::timeout(deadline, self.inner.transport.execute(&req)).await
        {
            Ok(r) => r?,
            Err(_) => {
                trace!("send {}: deadline of {:?} elapsed", request_id, deadline);
                return Err(DriverError::new(
                    DriverErrorCode::RequestTimeout,
                    &format!(
                        "{} {} did not complete within {:?}",
                        req.method, req.path, deadline
                    ),
                ));
            }
        };
        trace!("send {}: status={}", request_id, resp.status);
        if !resp.is_success() {
            return Err(decode_error(&resp));
        }
        Ok(resp)
    }

    pub(crate) fn get_timeout(&self, t: &Option<Duration>) -> Duration {
        // if t is given, use that. If not, use handle's timeout
        if let Some(d) = t {
            return *d;
        }
        self.inner.timeout
    }
}

/// Percent-encode a single url path segment (database, collection, key or
/// cursor id).
pub(crate) fn path_segment(s: &str) -> Result<String, DriverError> {
    let mut u = Url::parse("http://localhost/")?;
    u.path_segments_mut()
        .map_err(|_| ia_error!("cannot build url path for '{}'", s))?
        .clear()
        .push(s);
    Ok(u.path().trim_start_matches('/').to_string())
}

/// Validate a collection name and key pair and return the document path.
pub(crate) fn document_path(collection: &str, key: Option<&str>) -> Result<String, DriverError> {
    if collection.is_empty() {
        return ia_err!("collection name must not be empty");
    }
    let mut p = format!("/_api/document/{}", path_segment(collection)?);
    if let Some(k) = key {
        if k.is_empty() {
            return ia_err!("document key must not be empty");
        }
        p.push('/');
        p.push_str(&path_segment(k)?);
    }
    Ok(p)
}
