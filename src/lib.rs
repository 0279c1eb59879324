//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! ArangoDB Rust Driver
//!
//! This is a Rust client for the result-producing operations of an ArangoDB
//! database: reading, creating, updating and deleting documents in bulk, and
//! running AQL queries whose results are paged in from a server-side cursor.
//!
//! This driver supplies and uses Rust `async` methods throughout, using the [tokio](https://crates.io/crates/tokio) runtime. There is currently no blocking support.
//!
//! The general flow for an application is:
//! - Create a [`HandleBuilder`] with all needed parameters
//! - Create a [`Handle`] from the [`HandleBuilder`] that will be used throughout the application, across all threads
//! - Interact with the database using the [`Handle`] and Request structs such as [`ReadDocumentsRequest`], [`DeleteDocumentsRequest`], [`QueryRequest`], etc.
//!
//! Every request produces one of two result streams:
//! - A [`BatchResultStream`] for bulk document operations. It is fully
//!   materialized from one response, yields one [`ResultEntry`] per input in
//!   input order, and reports per-document failures inline instead of failing
//!   the whole call.
//! - A [`Cursor`] for queries. It holds one batch at a time and fetches the
//!   next batch from the server only when the current one is drained.
//!
//! Both end with an error of code
//! [`NoMoreDocuments`](DriverErrorCode::NoMoreDocuments), which
//! [`DriverError::is_no_more_documents()`] tests for.
//!
//! ## Simple Example
//! The following code creates a [`Handle`] from values in the current environment and then reads a few documents by key.
//! ```no_run
//! use arangodb_rust_driver::{Handle, ReadDocumentsRequest};
//! use std::error::Error;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn Error>> {
//!     let handle = Handle::builder()
//! #       .endpoint("http://localhost:8529")?
//!         .from_environment()?
//!         .build().await?;
//!     let mut results = ReadDocumentsRequest::new("users")
//!         .keys(&["alice", "bob", "carol"])
//!         .execute(&handle)
//!         .await?;
//!     while let Ok(entry) = results.read_next() {
//!         if entry.is_not_found() {
//!             println!("missing");
//!         } else {
//!             println!("{} = {:?}", entry.key(), entry.document());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Queries
//!
//! ```no_run
//! use arangodb_rust_driver::{Handle, QueryRequest};
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! # let handle = Handle::builder().from_environment()?.build().await?;
//! let mut cursor = QueryRequest::new("FOR d IN @@col SORT d._key RETURN d")
//!     .bind_var("@col", "users")?
//!     .batch_size(500)
//!     .optimizer_rules(&["-all", "+use-indexes"])?
//!     .execute(&handle)
//!     .await?;
//! loop {
//!     match cursor.read_next().await {
//!         Ok(entry) => println!("{:?}", entry.document()),
//!         Err(e) if e.is_no_more_documents() => break,
//!         Err(e) => return Err(e.into()),
//!     }
//! }
//! println!("{} round trips", cursor.round_trips());
//! # Ok(())
//! # }
//! ```
//!
//! A query can be restricted to some shards of a clustered collection with
//! [`QueryRequest::shard_ids()`] or a [`ShardRouter`]. [`ShardsRequest`]
//! returns the collection's shard map, and [`ShardRouter::per_shard()`] turns
//! it into one router per shard so a large collection can be read shard by
//! shard.
//!
//! ## Configuring the driver
//!
//! The [`HandleBuilder`] takes its settings from method calls, from a config
//! file, or from the environment:
//!
//! ```no_run
//! # use arangodb_rust_driver::Handle;
//! # use std::time::Duration;
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//!     let handle = Handle::builder()
//!         .endpoint("https://db.example.com:8529")?
//!         .database("shop")?
//!         .basic_auth("app", "secret")?
//!         .add_cert_from_pemfile("~/certs/ca.pem")?
//!         .timeout(Duration::from_secs(10))?
//!         .build().await?;
//! # Ok(())
//! # }
//! ```
//!
//! A config file is an INI file with one section per profile:
//!
//! ```ini
//! [DEFAULT]
//! endpoint=http://localhost:8529
//! database=_system
//! username=root
//! password=<password>
//! timeout_ms=20000
//! ```
//!
//! See [`HandleBuilder::from_config_file()`] and
//! [`HandleBuilder::from_environment()`] for the recognized keys and
//! environment variables.
//!
//! ## Logging
//!
//! The driver logs through [tracing](https://crates.io/crates/tracing). It
//! does not install a subscriber; applications that want output should set
//! one up, for example with `tracing-subscriber` and `RUST_LOG=debug`.
//!
//! ## License
//!
//! Copyright (C) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//!
//! This driver is licensed under the Universal Permissive License 1.0. See
//! LICENSE.txt for details.
//!

pub(crate) mod batch_stream;
pub use crate::batch_stream::BatchResultStream;

pub(crate) mod config_file;
pub(crate) mod create_request;
pub use crate::create_request::{CreateDocumentsRequest, OverwriteMode};

pub(crate) mod cursor;
pub use crate::cursor::{Cursor, CursorState};

pub(crate) mod delete_request;
pub use crate::delete_request::{DeleteDocumentRequest, DeleteDocumentsRequest};

pub(crate) mod error;
pub use crate::error::{DriverError, DriverErrorCode, ErrorNum};

pub(crate) mod handle;
pub use crate::handle::Handle;

pub(crate) mod handle_builder;
pub use crate::handle_builder::HandleBuilder;

pub(crate) mod optimizer;
pub use crate::optimizer::{OptimizerRules, RuleInfo, RuleToggle, ALL_RULES};

pub(crate) mod query_request;
pub use crate::query_request::QueryRequest;

pub(crate) mod read_request;
pub use crate::read_request::{ReadDocumentRequest, ReadDocumentsRequest};

pub(crate) mod response;
pub(crate) mod shard_router;
pub use crate::shard_router::ShardRouter;

#[cfg(test)]
pub(crate) mod shard_tests;
pub(crate) mod shards_request;
pub use crate::shards_request::{ReplicationFactor, ShardsRequest, ShardsResult};

#[cfg(test)]
pub(crate) mod test_server;
pub(crate) mod transport;
pub use crate::transport::{RawResponse, Request, RequestBuilder, Transport};

pub mod types;
pub use crate::types::{
    CursorStats, DocumentMeta, EntryStatus, ItemError, QueryPlan, ResultEntry, ServerId, ShardId,
};

pub(crate) mod update_request;
pub use crate::update_request::UpdateDocumentsRequest;
