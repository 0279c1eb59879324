//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! The gateway that carries one logical request to the server and brings back
//! its raw response.
//!
//! The driver talks to the server only through the [`Transport`] trait. The
//! default implementation is an http client built on [`reqwest`]; applications
//! (and tests) may supply their own with [`HandleBuilder::transport()`](crate::HandleBuilder::transport()).

use async_trait::async_trait;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use bytes::Bytes;
use derive_builder::Builder;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use std::fmt::Debug;
use std::result::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::trace;
use url::Url;

use crate::error::{ia_error, user_agent, DriverError};

/// One logical request, as handed to a [`Transport`].
///
/// `path` is absolute on the server (it already includes the `/_db/{name}`
/// database prefix). `timeout` is the deadline for this single call.
#[derive(Debug, Clone, Builder)]
#[builder(pattern = "owned", build_fn(error = "DriverError"))]
pub struct Request {
    #[builder(setter(into))]
    pub(crate) method: Method,
    #[builder(setter(into))]
    pub(crate) path: String,
    #[builder(default)]
    pub(crate) query: Vec<(String, String)>,
    #[builder(default)]
    pub(crate) headers: Vec<(String, String)>,
    #[builder(setter(into, strip_option), default)]
    pub(crate) body: Option<Bytes>,
    #[builder(default)]
    pub(crate) timeout: Duration,
}

impl From<derive_builder::UninitializedFieldError> for DriverError {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        ia_error!("incomplete request: {}", e.to_string())
    }
}

impl RequestBuilder {
    /// Append a query parameter.
    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.query
            .get_or_insert_with(Vec::new)
            .push((name.to_string(), value.to_string()));
        self
    }

    /// Append a query parameter only if `value` is `Some`.
    pub fn param_opt<T: ToString>(self, name: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.param(name, v),
            None => self,
        }
    }

    /// Append a request header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push((name.to_string(), value.to_string()));
        self
    }
}

impl Request {
    pub fn method(&self) -> &Method {
        &self.method
    }
    pub fn path(&self) -> &str {
        &self.path
    }
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }
    /// Get the value of a query parameter, if set.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// The raw, undecoded answer to a [`Request`].
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub(crate) status: u16,
    pub(crate) body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> RawResponse {
        RawResponse {
            status,
            body: body.into(),
        }
    }
    pub fn status(&self) -> u16 {
        self.status
    }
    pub fn body(&self) -> &Bytes {
        &self.body
    }
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait defining the transport gateway.
///
/// An implementation executes exactly one request per call and never retries
/// on its own behalf: a failed call is reported as a [`DriverError`] with code
/// [`TransportFailure`](crate::DriverErrorCode::TransportFailure) or
/// [`RequestTimeout`](crate::DriverErrorCode::RequestTimeout). Non-2xx
/// responses are *not* errors at this level; they are returned as-is and
/// interpreted by the caller.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn execute(&self, req: &Request) -> Result<RawResponse, DriverError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) enum Credentials {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Jwt(String),
}

impl Credentials {
    fn authorization(&self) -> Option<String> {
        match self {
            Credentials::None => None,
            Credentials::Basic { username, password } => {
                let up = format!("{}:{}", username, password);
                Some(format!("Basic {}", BASE64_STANDARD.encode(up)))
            }
            Credentials::Jwt(token) => Some(format!("bearer {}", token)),
        }
    }
}

/// The default [`Transport`]: http(s) via a shared [`reqwest::Client`].
#[derive(Debug)]
pub(crate) struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
    credentials: Credentials,
    request_id: AtomicUsize,
}

impl HttpTransport {
    pub(crate) fn new(
        client: reqwest::Client,
        endpoint: &str,
        credentials: Credentials,
    ) -> Result<HttpTransport, DriverError> {
        let endpoint = Url::parse(endpoint)?;
        if endpoint.cannot_be_a_base() {
            return Err(ia_error!("endpoint '{}' is not a base url", endpoint));
        }
        Ok(HttpTransport {
            client,
            endpoint,
            credentials,
            request_id: AtomicUsize::new(1),
        })
    }

    fn url_for(&self, path: &str) -> Url {
        let mut url = self.endpoint.clone();
        let base = self.endpoint.path().trim_end_matches('/');
        url.set_path(&format!("{}{}", base, path));
        url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, req: &Request) -> Result<RawResponse, DriverError> {
        let request_id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let mut headers = HeaderMap::new();
        headers.insert("x-arango-request-id", HeaderValue::from(request_id));
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert("User-Agent", HeaderValue::from_str(user_agent())?);
        if let Some(auth) = self.credentials.authorization() {
            headers.insert("Authorization", HeaderValue::from_str(&auth)?);
        }
        if req.body.is_some() {
            headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        }
        for (k, v) in &req.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|e| ia_error!("invalid header name '{}': {}", k, e.to_string()))?;
            headers.insert(name, HeaderValue::from_str(v)?);
        }

        let url = self.url_for(&req.path);
        trace!("request {}: {} {}", request_id, req.method, url);
        let mut rb = self
            .client
            .request(req.method.clone(), url)
            .query(&req.query)
            .headers(headers);
        if !req.timeout.is_zero() {
            rb = rb.timeout(req.timeout);
        }
        if let Some(body) = &req.body {
            rb = rb.body(body.clone());
        }
        let resp = rb.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        trace!(
            "response {}: status={} len={}",
            request_id,
            status,
            body.len()
        );
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_authorization_header() {
        assert_eq!(Credentials::None.authorization(), None);
        let basic = Credentials::Basic {
            username: "root".to_string(),
            password: "openSesame".to_string(),
        };
        assert_eq!(
            basic.authorization().as_deref(),
            Some("Basic cm9vdDpvcGVuU2VzYW1l")
        );
        let jwt = Credentials::Jwt("abc.def.ghi".to_string());
        assert_eq!(jwt.authorization().as_deref(), Some("bearer abc.def.ghi"));
    }

    #[test]
    fn test_url_for() {
        let t = HttpTransport::new(
            reqwest::Client::new(),
            "http://localhost:8529/proxy/",
            Credentials::None,
        )
        .unwrap();
        assert_eq!(
            t.url_for("/_db/_system/_api/cursor").as_str(),
            "http://localhost:8529/proxy/_db/_system/_api/cursor"
        );
        assert!(HttpTransport::new(reqwest::Client::new(), "mailto:x@y", Credentials::None).is_err());
    }

    #[test]
    fn test_request_builder() {
        let req = RequestBuilder::default()
            .method(Method::PUT)
            .path("/_db/x/_api/document/c")
            .param("onlyget", true)
            .param_opt("silent", None::<bool>)
            .param_opt("keepNull", Some(false))
            .header("If-Match", "_r1")
            .body(b"[\"a\"]".to_vec())
            .build()
            .unwrap();
        assert_eq!(req.param("onlyget"), Some("true"));
        assert_eq!(req.param("silent"), None);
        assert_eq!(req.param("keepNull"), Some("false"));
        assert_eq!(req.headers().len(), 1);
        assert_eq!(req.body().map(|b| b.len()), Some(5));
        assert!(req.timeout().is_zero());

        let err = RequestBuilder::default().path("/x").build().unwrap_err();
        assert_eq!(err.code, crate::DriverErrorCode::IllegalArgument);
    }
}
