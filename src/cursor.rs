//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use async_recursion::async_recursion;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::VecDeque;
use std::result::Result;
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::{DriverError, DriverErrorCode};
use crate::handle::{path_segment, Handle};
use crate::response::{cursor_item, decode_cursor_response, CursorEnvelope};
use crate::types::{CursorStats, QueryPlan, QueryProfile, QueryWarning, ResultEntry};

/// Lifecycle of a [`Cursor`].
///
/// ```text
///  Open <-> AwaitingNextBatch -> Fetching -> Open | Exhausted | Failed
///  Open | AwaitingNextBatch --close()--> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Items of the current batch are available.
    Open,
    /// The current batch is drained and the server has more.
    AwaitingNextBatch,
    /// A next-batch request is in flight.
    Fetching,
    /// Every result has been read.
    Exhausted,
    /// Closed by the caller.
    Closed,
    /// A fetch failed. The cursor cannot be used further.
    Failed,
}

/// Paginated results of a query.
///
/// A cursor holds one batch of results at a time. When the batch is drained
/// and the server reported more results, the next call to
/// [`read_next()`](Cursor::read_next()) fetches exactly one more batch. No
/// work happens in the background and nothing is prefetched.
///
/// A cursor is meant for one sequential reader; all reading methods take
/// `&mut self`.
///
/// A server-side cursor that is not read to the end should be released with
/// [`close()`](Cursor::close()). Otherwise it is kept on the server until its
/// time-to-live expires.
///
/// Example:
/// ```no_run
/// use arangodb_rust_driver::{Handle, QueryRequest};
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// # let handle = Handle::builder().from_environment()?.build().await?;
/// let mut cursor = QueryRequest::new("FOR u IN users FILTER u.age > @age RETURN u")
///     .bind_var("age", 30)?
///     .batch_size(100)
///     .execute(&handle)
///     .await?;
/// loop {
///     match cursor.read_next().await {
///         Ok(entry) => println!("{}: {:?}", entry.key(), entry.document()),
///         Err(e) if e.is_no_more_documents() => break,
///         Err(e) => return Err(e.into()),
///     }
/// }
/// cursor.close().await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Cursor {
    handle: Handle,
    id: Option<String>,
    state: CursorState,
    batch: VecDeque<Value>,
    has_more: bool,
    count: Option<u64>,
    cached: bool,
    stats: CursorStats,
    profile: Option<QueryProfile>,
    plan: Option<QueryPlan>,
    warnings: Vec<QueryWarning>,
    round_trips: usize,
    timeout: Option<Duration>,
    failure: Option<DriverError>,
}

impl Cursor {
    pub(crate) fn new(handle: &Handle, first: CursorEnvelope, timeout: Option<Duration>) -> Cursor {
        let mut c = Cursor {
            handle: handle.clone(),
            id: None,
            state: CursorState::Open,
            batch: VecDeque::new(),
            has_more: false,
            count: None,
            cached: first.cached,
            stats: CursorStats::default(),
            profile: None,
            plan: None,
            warnings: Vec::new(),
            round_trips: 1,
            timeout,
            failure: None,
        };
        c.install(first);
        c
    }

    fn install(&mut self, env: CursorEnvelope) {
        if env.id.is_some() {
            self.id = env.id;
        }
        self.has_more = env.has_more;
        if env.count.is_some() {
            self.count = env.count;
        }
        if let Some(s) = &env.stats {
            self.stats.add(s);
        }
        if env.profile.is_some() {
            self.profile = env.profile;
        }
        if self.plan.is_none() {
            self.plan = env.plan;
        }
        self.warnings.extend(env.warnings);
        self.batch = env.result.into();
        self.state = if !self.batch.is_empty() {
            CursorState::Open
        } else if self.has_more {
            CursorState::AwaitingNextBatch
        } else {
            CursorState::Exhausted
        };
    }

    fn fail(&mut self, e: &DriverError) {
        debug!("cursor {:?} failed: {}", self.id, e);
        self.batch.clear();
        self.state = CursorState::Failed;
        self.failure = Some(e.clone());
    }

    /// Return the next result.
    ///
    /// Returns the [`NoMoreDocuments`](crate::DriverErrorCode::NoMoreDocuments)
    /// error once every result has been read, and after [`close()`](Cursor::close()).
    /// If fetching a batch fails, that error is returned, the cursor moves to
    /// [`CursorState::Failed`] and every later call returns the same error.
    ///
    /// If a call is dropped while it is fetching (for example because the
    /// caller wrapped it in a timeout), the next call fails with
    /// [`RequestCanceled`](crate::DriverErrorCode::RequestCanceled).
    #[async_recursion]
    pub async fn read_next(&mut self) -> Result<ResultEntry, DriverError> {
        match self.state {
            CursorState::Exhausted | CursorState::Closed => {
                return Err(DriverError::no_more_documents());
            }
            CursorState::Failed => {
                return Err(self.failure.clone().unwrap_or_else(|| {
                    DriverError::new(DriverErrorCode::TransportFailure, "cursor failed")
                }));
            }
            CursorState::Fetching => {
                let e = DriverError::new(
                    DriverErrorCode::RequestCanceled,
                    "cursor fetch was abandoned before its response arrived",
                );
                self.fail(&e);
                return Err(e);
            }
            CursorState::Open | CursorState::AwaitingNextBatch => {}
        }
        if let Some(v) = self.batch.pop_front() {
            if self.batch.is_empty() {
                self.state = if self.has_more {
                    CursorState::AwaitingNextBatch
                } else {
                    CursorState::Exhausted
                };
            }
            return Ok(cursor_item(v));
        }
        if !self.has_more {
            self.state = CursorState::Exhausted;
            return Err(DriverError::no_more_documents());
        }
        self.fetch_next_batch().await?;
        self.read_next().await
    }

    /// Return the next result, deserializing it into `dest`.
    pub async fn read_document<T: DeserializeOwned>(
        &mut self,
        dest: &mut T,
    ) -> Result<ResultEntry, DriverError> {
        let e = self.read_next().await?;
        if let Some(doc) = e.document_as::<T>()? {
            *dest = doc;
        }
        Ok(e)
    }

    async fn fetch_next_batch(&mut self) -> Result<(), DriverError> {
        let Some(id) = self.id.clone() else {
            let e = DriverError::new(
                DriverErrorCode::MalformedResponse,
                "cursor reported more results without a cursor id",
            );
            self.fail(&e);
            return Err(e);
        };
        let req = match path_segment(&id).and_then(|seg| {
            self.handle
                .request(Method::PUT, &format!("/_api/cursor/{}", seg), &self.timeout)?
                .build()
        }) {
            Ok(r) => r,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };
        trace!("fetching next batch of cursor {}", id);
        self.state = CursorState::Fetching;
        let res = match self.handle.send(req).await {
            Ok(resp) => decode_cursor_response(&resp),
            Err(e) => Err(e),
        };
        match res {
            Ok(env) => {
                self.round_trips += 1;
                trace!(
                    "cursor {}: batch of {} results, has_more={}",
                    id,
                    env.result.len(),
                    env.has_more
                );
                self.install(env);
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    /// Release the cursor.
    ///
    /// If the server still holds results for it, a delete request is sent.
    /// Failure of that request is logged and otherwise ignored. Afterwards
    /// every read returns
    /// [`NoMoreDocuments`](crate::DriverErrorCode::NoMoreDocuments). Calling
    /// `close()` again has no effect.
    pub async fn close(&mut self) {
        let live = matches!(
            self.state,
            CursorState::Open | CursorState::AwaitingNextBatch
        );
        self.state = CursorState::Closed;
        self.batch.clear();
        if !live || !self.has_more {
            return;
        }
        let Some(id) = self.id.clone() else {
            return;
        };
        self.has_more = false;
        let res = match path_segment(&id).and_then(|seg| {
            self.handle
                .request(Method::DELETE, &format!("/_api/cursor/{}", seg), &self.timeout)?
                .build()
        }) {
            Ok(req) => self.handle.send(req).await.map(|_| ()),
            Err(e) => Err(e),
        };
        match res {
            Ok(()) => trace!("disposed cursor {}", id),
            Err(e) => debug!("ignoring error disposing cursor {}: {}", id, e),
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Server-side cursor id. `None` if all results fit in the first batch.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// True if the server holds results that have not been fetched yet.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Total number of results. Only set if the query was run with
    /// [`count`](crate::QueryRequest::count()).
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    /// True if the results came from the server's query cache.
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    /// Execution statistics accumulated over the batches fetched so far.
    pub fn statistics(&self) -> &CursorStats {
        &self.stats
    }

    /// The execution plan, if the query was run with profiling level 2 or
    /// higher. Never triggers a fetch.
    pub fn plan(&self) -> Option<&QueryPlan> {
        self.plan.as_ref()
    }

    /// Per-phase timings, if the query was run with profiling.
    pub fn profile(&self) -> Option<&QueryProfile> {
        self.profile.as_ref()
    }

    pub fn warnings(&self) -> &[QueryWarning] {
        &self.warnings
    }

    /// Number of server round trips made so far, including the one that
    /// created the cursor.
    pub fn round_trips(&self) -> usize {
        self.round_trips
    }

    /// Number of results in the current batch not yet read.
    pub fn buffered(&self) -> usize {
        self.batch.len()
    }
}
