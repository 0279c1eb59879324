//
// Copyright (c) 2024 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use num_enum::TryFromPrimitive;

include!(concat!(env!("OUT_DIR"), "/ua.rs"));

pub(crate) fn driver_version() -> &'static str {
    DRIVER_VERSION
}

pub(crate) fn user_agent() -> &'static str {
    USER_AGENT
}

/// Error type returned by every fallible operation in this library.
///
/// `code` classifies the failure from the client's point of view. For errors that
/// originate in a server response, `error_num` carries the server error number
/// (see [`ErrorNum`]) and `status` the HTTP status code; both are zero otherwise.
#[derive(Debug, Clone)]
pub struct DriverError {
    pub code: DriverErrorCode,
    pub message: String,
    pub error_num: i32,
    pub status: u16,
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.error_num != 0 {
            return write!(
                f,
                "code={:?} errorNum={} message=\"{}\"",
                self.code, self.error_num, self.message
            );
        }
        write!(f, "code={:?} message=\"{}\"", self.code, self.message)
    }
}

impl DriverError {
    pub fn new(code: DriverErrorCode, msg: &str) -> DriverError {
        DriverError {
            code,
            message: msg.to_string(),
            error_num: 0,
            status: 0,
        }
    }

    /// Create an error from a server error response.
    ///
    /// The client-side code is derived from the server error number: missing
    /// documents map to [`DriverErrorCode::NotFound`], revision and unique key
    /// clashes to [`DriverErrorCode::Conflict`], everything else to
    /// [`DriverErrorCode::ServerError`].
    pub fn from_server(status: u16, error_num: i32, msg: &str) -> DriverError {
        let code = match ErrorNum::try_from(error_num) {
            Ok(ErrorNum::DocumentNotFound)
            | Ok(ErrorNum::DataSourceNotFound)
            | Ok(ErrorNum::CursorNotFound) => DriverErrorCode::NotFound,
            Ok(ErrorNum::Conflict) | Ok(ErrorNum::UniqueConstraintViolated) => {
                DriverErrorCode::Conflict
            }
            _ => {
                if status == 404 {
                    DriverErrorCode::NotFound
                } else {
                    DriverErrorCode::ServerError
                }
            }
        };
        DriverError {
            code,
            message: msg.to_string(),
            error_num,
            status,
        }
    }

    /// The sentinel returned by every stream once it has been fully consumed.
    pub(crate) fn no_more_documents() -> DriverError {
        DriverError::new(DriverErrorCode::NoMoreDocuments, "no more documents")
    }

    /// True if this is the exhaustion sentinel rather than a real failure.
    pub fn is_no_more_documents(&self) -> bool {
        self.code == DriverErrorCode::NoMoreDocuments
    }

    /// True if the server reported that the addressed document, collection or
    /// cursor does not exist.
    pub fn is_not_found(&self) -> bool {
        if self.code == DriverErrorCode::NotFound {
            return true;
        }
        self.error_num == ErrorNum::DocumentNotFound as i32
    }

    /// True if the server rejected the operation because of a revision or
    /// unique-key conflict.
    pub fn is_conflict(&self) -> bool {
        if self.code == DriverErrorCode::Conflict {
            return true;
        }
        self.error_num == ErrorNum::Conflict as i32
            || self.error_num == ErrorNum::UniqueConstraintViolated as i32
    }

    /// True if the request never produced a usable response: it could not be
    /// sent, timed out, or was abandoned mid-flight.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.code,
            DriverErrorCode::TransportFailure
                | DriverErrorCode::RequestTimeout
                | DriverErrorCode::RequestCanceled
        )
    }
}

macro_rules! ia_error {
    ($($t:tt)*) => {{
        let m = format!($($t)*);
        DriverError {
            code: crate::error::DriverErrorCode::IllegalArgument,
            message: format!("{} ({})", m, crate::error::driver_version()),
            error_num: 0,
            status: 0,
        }
    }};
}

pub(crate) use ia_error;

macro_rules! ia_err {
    ($($t:tt)*) => {{
        let m = format!($($t)*);
        Err(DriverError {
            code: crate::error::DriverErrorCode::IllegalArgument,
            message: format!("{} ({})", m, crate::error::driver_version()),
            error_num: 0,
            status: 0,
        })
    }};
}

pub(crate) use ia_err;

macro_rules! malformed_err {
    ($($t:tt)*) => {{
        let m = format!($($t)*);
        Err(DriverError {
            code: crate::error::DriverErrorCode::MalformedResponse,
            message: format!("{} ({})", m, crate::error::driver_version()),
            error_num: 0,
            status: 0,
        })
    }};
}

pub(crate) use malformed_err;

impl From<reqwest::Error> for DriverError {
    fn from(e: reqwest::Error) -> Self {
        let mut code = DriverErrorCode::TransportFailure;
        if e.is_timeout() {
            code = DriverErrorCode::RequestTimeout;
        } else if e.is_decode() {
            code = DriverErrorCode::MalformedResponse;
        }
        DriverError {
            code: code,
            message: format!(
                "reqwest error: {} ({})",
                e.to_string(),
                crate::error::driver_version()
            ),
            error_num: 0,
            status: 0,
        }
    }
}

impl From<reqwest::header::InvalidHeaderValue> for DriverError {
    fn from(e: reqwest::header::InvalidHeaderValue) -> Self {
        ia_error!("invalid header value: {}", e.to_string())
    }
}

impl From<url::ParseError> for DriverError {
    fn from(e: url::ParseError) -> Self {
        ia_error!("error parsing url: {}", e.to_string())
    }
}

impl From<ini::Error> for DriverError {
    fn from(e: ini::Error) -> Self {
        ia_error!("error reading config file: {}", e.to_string())
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(e: serde_json::Error) -> Self {
        DriverError {
            code: DriverErrorCode::MalformedResponse,
            message: format!(
                "error decoding response: {} ({})",
                e.to_string(),
                crate::error::driver_version()
            ),
            error_num: 0,
            status: 0,
        }
    }
}

/// Client-side classification of a [`DriverError`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive)]
#[repr(i32)]
pub enum DriverErrorCode {
    /// IllegalArgument error represents the application provided an illegal
    /// argument for the operation, such as an empty document key, a malformed
    /// optimizer rule or an unusable configuration value.
    IllegalArgument = 1,

    /// TransportFailure error represents a request that could not be sent, or
    /// for which no response was received. The core never retries these.
    TransportFailure = 2,

    /// RequestTimeout error represents a request whose deadline elapsed while
    /// waiting for the server.
    RequestTimeout = 3,

    /// RequestCanceled error represents a cursor fetch that was abandoned
    /// before its response was installed.
    RequestCanceled = 4,

    /// MalformedResponse error represents a response that was received but
    /// could not be decoded into the expected shape.
    MalformedResponse = 5,

    /// ItemFailure error represents a per-document failure reported inside an
    /// otherwise successful bulk response.
    ItemFailure = 6,

    /// NoMoreDocuments is the exhaustion sentinel: the stream has been fully
    /// consumed. It is not a failure.
    NoMoreDocuments = 7,

    /// InvalidShardIdentifier error represents a query restricted to a shard
    /// that the collection does not have.
    InvalidShardIdentifier = 8,

    /// NotFound error represents a whole request addressing a document,
    /// collection or cursor that does not exist.
    NotFound = 20,

    /// Conflict error represents a whole request rejected because of a
    /// revision mismatch or unique constraint violation.
    Conflict = 21,

    /// ServerError represents any other error response from the server.
    /// `DriverError::error_num` holds the server's error number.
    ServerError = 100,
}

/// Server error numbers this library interprets.
///
/// Error numbers not listed here are still preserved in
/// [`DriverError::error_num`] and [`ItemError::error_num`](crate::types::ItemError).
#[derive(Debug, Clone, Copy, Eq, PartialEq, TryFromPrimitive)]
#[repr(i32)]
pub enum ErrorNum {
    /// Internal server error.
    Internal = 4,

    /// Bad request parameter.
    BadParameter = 10,

    /// Write-write conflict or revision mismatch.
    Conflict = 1200,

    /// The addressed document does not exist.
    DocumentNotFound = 1202,

    /// The addressed collection, view or shard does not exist.
    DataSourceNotFound = 1203,

    /// The document key is invalid.
    DocumentKeyBad = 1221,

    /// Unique constraint violated.
    UniqueConstraintViolated = 1210,

    /// Query string could not be parsed.
    QueryParse = 1501,

    /// Query was killed or timed out on the server.
    QueryKilled = 1500,

    /// The addressed cursor does not exist or has expired.
    CursorNotFound = 1600,

    /// A shard that the request depends on is gone.
    ClusterShardGone = 1467,
}
