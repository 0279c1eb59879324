//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use reqwest::Method;
use serde_derive::Serialize;
use serde_json::{Map, Value};
use std::result::Result;
use std::time::Duration;
use tracing::debug;

use crate::cursor::Cursor;
use crate::error::{ia_err, ia_error, DriverError};
use crate::handle::Handle;
use crate::optimizer::OptimizerRules;
use crate::response::decode_cursor_response;
use crate::shard_router::ShardRouter;
use crate::types::ShardId;

/// Encapsulates a query and the options it is run with.
///
/// Executing a query returns a [`Cursor`] holding the first batch of results.
/// Further batches are fetched as the cursor is read.
///
/// ## Simple Example
/// Here is a simple example of running a query that will return every document
/// in a collection named `users`:
///
/// ```no_run
/// # use arangodb_rust_driver::{Handle, QueryRequest};
/// # #[tokio::main]
/// # pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let handle = Handle::builder().from_environment()?.build().await?;
/// let mut cursor = QueryRequest::new("FOR u IN @@col RETURN u")
///     .bind_var("@col", "users")?
///     .execute(&handle)
///     .await?;
/// while let Ok(entry) = cursor.read_next().await {
///     println!("user = {:?}", entry.document());
/// }
/// # Ok(())
/// # }
/// ```
///
/// ## Shard-restricted queries
/// On a cluster, a query can be limited to some shards of a collection, for
/// example to read each shard separately:
///
/// ```no_run
/// # use arangodb_rust_driver::{Handle, QueryRequest, ShardRouter, ShardsRequest};
/// # #[tokio::main]
/// # pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let handle = Handle::builder().from_environment()?.build().await?;
/// let shards = ShardsRequest::new("users").execute(&handle).await?;
/// for router in ShardRouter::per_shard(&shards) {
///     let mut cursor = QueryRequest::new("FOR u IN users RETURN u")
///         .shard_router(router)
///         .execute(&handle)
///         .await?;
///     while let Ok(entry) = cursor.read_next().await {
///         println!("{}", entry.key());
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Default, Debug, Clone)]
pub struct QueryRequest {
    pub(crate) query: String,
    pub(crate) bind_vars: Map<String, Value>,
    pub(crate) batch_size: u32,
    pub(crate) count: bool,
    pub(crate) full_count: bool,
    pub(crate) ttl: Option<Duration>,
    pub(crate) stream: bool,
    pub(crate) profile: u8,
    pub(crate) optimizer_rules: OptimizerRules,
    pub(crate) router: Option<ShardRouter>,
    pub(crate) timeout: Option<Duration>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCursorBody<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "no_bind_vars")]
    bind_vars: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_size: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    count: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<f64>,
    options: CursorOptions<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CursorOptions<'a> {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    full_count: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "is_zero")]
    profile: u8,
    #[serde(skip_serializing_if = "no_shards")]
    shard_ids: &'a [ShardId],
    #[serde(skip_serializing_if = "Option::is_none")]
    optimizer: Option<OptimizerOptions>,
}

#[derive(Serialize)]
struct OptimizerOptions {
    rules: Vec<String>,
}

fn is_zero(v: &u8) -> bool {
    *v == 0
}

fn no_bind_vars(v: &&Map<String, Value>) -> bool {
    v.is_empty()
}

fn no_shards(v: &&[ShardId]) -> bool {
    v.is_empty()
}

impl QueryRequest {
    /// Create a new QueryRequest from a query string.
    pub fn new(query: &str) -> Self {
        QueryRequest {
            query: query.to_string(),
            ..Default::default()
        }
    }

    /// Set a named bind variable.
    ///
    /// Collection bind variables are named with a leading `@`, e.g. `@col` for
    /// a query referring to `@@col`.
    pub fn bind_var(mut self, name: &str, value: impl serde::Serialize) -> Result<Self, DriverError> {
        if name.is_empty() {
            return ia_err!("bind variable name must not be empty");
        }
        let v = serde_json::to_value(value)
            .map_err(|e| ia_error!("cannot serialize bind variable '{}': {}", name, e.to_string()))?;
        self.bind_vars.insert(name.to_string(), v);
        Ok(self)
    }

    /// Set the maximum number of results returned per server round trip.
    ///
    /// The value bounds each batch, not the total number of results. If not
    /// set, the server default is used.
    pub fn batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    /// Ask the server to report the total number of results. See [`Cursor::count()`].
    pub fn count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    /// Ask the server to report how many results there would have been
    /// without the query's final `LIMIT`.
    pub fn full_count(mut self, full_count: bool) -> Self {
        self.full_count = full_count;
        self
    }

    /// Set how long the server keeps an idle cursor alive.
    pub fn ttl(mut self, ttl: &Duration) -> Self {
        self.ttl = Some(*ttl);
        self
    }

    /// Compute results lazily on the server as batches are requested.
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Set the profiling level.
    ///
    /// Level 1 returns per-phase timings, level 2 and above additionally
    /// returns the execution plan (see [`Cursor::plan()`]).
    pub fn profile(mut self, level: u8) -> Self {
        self.profile = level;
        self
    }

    /// Set optimizer rule toggles from `+rule`/`-rule` strings.
    ///
    /// The toggles are applied left to right. See [`OptimizerRules`].
    pub fn optimizer_rules<S: AsRef<str>>(mut self, rules: &[S]) -> Result<Self, DriverError> {
        self.optimizer_rules = OptimizerRules::parse(rules)?;
        Ok(self)
    }

    /// Restrict the query to the given shards.
    ///
    /// See [`ShardRouter::new()`] for validation rules.
    pub fn shard_ids<S: AsRef<str>>(mut self, ids: &[S]) -> Result<Self, DriverError> {
        self.router = Some(ShardRouter::new(ids)?);
        Ok(self)
    }

    /// Restrict the query with a prepared [`ShardRouter`].
    pub fn shard_router(mut self, router: ShardRouter) -> Self {
        self.router = Some(router);
        self
    }

    /// Specify the timeout value for the request.
    ///
    /// This is optional.
    /// If set, it must be greater than or equal to 1 millisecond, otherwise an
    /// IllegalArgument error will be returned.
    /// If not set, the default timeout value configured for the [`Handle`](crate::HandleBuilder::timeout()) is used.
    ///
    /// The timeout applies to each round trip, including the ones the
    /// resulting [`Cursor`] makes to fetch further batches.
    pub fn timeout(mut self, t: &Duration) -> Self {
        self.timeout = Some(*t);
        self
    }

    fn validate(&self) -> Result<(), DriverError> {
        if self.query.trim().is_empty() {
            return ia_err!("query must not be empty");
        }
        if let Some(t) = &self.timeout {
            if t.as_millis() == 0 {
                return ia_err!("timeout must be at least 1 millisecond");
            }
        }
        if let Some(r) = &self.router {
            r.validate()?;
        }
        Ok(())
    }

    fn body(&self) -> Result<Vec<u8>, DriverError> {
        let shard_ids: &[ShardId] = match &self.router {
            Some(r) => r.shard_ids(),
            None => &[],
        };
        let optimizer = if self.optimizer_rules.is_empty() {
            None
        } else {
            Some(OptimizerOptions {
                rules: self.optimizer_rules.to_strings(),
            })
        };
        let body = CreateCursorBody {
            query: &self.query,
            bind_vars: &self.bind_vars,
            batch_size: if self.batch_size > 0 {
                Some(self.batch_size)
            } else {
                None
            },
            count: self.count,
            ttl: self.ttl.map(|t| t.as_secs_f64()),
            options: CursorOptions {
                full_count: self.full_count,
                stream: self.stream,
                profile: self.profile,
                shard_ids,
                optimizer,
            },
        };
        serde_json::to_vec(&body)
            .map_err(|e| ia_error!("cannot serialize query request: {}", e.to_string()))
    }

    /// Execute the query, returning a [`Cursor`] positioned at the first result.
    ///
    /// A query restricted to an unknown shard fails here, before any result
    /// is returned.
    pub async fn execute(&self, h: &Handle) -> Result<Cursor, DriverError> {
        self.validate()?;
        let req = h
            .request(Method::POST, "/_api/cursor", &self.timeout)?
            .body(self.body()?)
            .build()?;
        let resp = match h.send(req).await {
            Ok(r) => r,
            Err(e) => {
                return Err(match &self.router {
                    Some(r) => r.map_server_error(e),
                    None => e,
                });
            }
        };
        let env = decode_cursor_response(&resp)?;
        debug!(
            "created cursor id={:?}: {} results, has_more={}",
            env.id,
            env.result.len(),
            env.has_more
        );
        Ok(Cursor::new(h, env, self.timeout))
    }
}
