//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
use serde_derive::Deserialize;
use serde_json::{Map, Value};
use std::result::Result;

use crate::error::{malformed_err, DriverError, DriverErrorCode};
use crate::transport::RawResponse;
use crate::types::{
    CursorStats, DocumentMeta, ItemError, QueryPlan, QueryProfile, QueryWarning, ResultEntry,
};

/// What the request asked for. Determines the shape the response is decoded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperationKind {
    /// One document read: the body is the document.
    ReadOne,
    /// One document write: the body is its metadata plus optional snapshots.
    WriteOne,
    /// Many documents read: an array of documents or item errors.
    ReadMany,
    /// Many documents written: an array of metadata objects or item errors.
    WriteMany,
    Cursor,
}

#[derive(Debug)]
pub(crate) enum Envelope {
    Single(ResultEntry),
    Bulk(Vec<ResultEntry>),
    Cursor(CursorEnvelope),
}

/// One batch of query results plus the cursor bookkeeping around it.
#[derive(Debug, Default)]
pub(crate) struct CursorEnvelope {
    pub(crate) id: Option<String>,
    pub(crate) result: Vec<Value>,
    pub(crate) has_more: bool,
    pub(crate) count: Option<u64>,
    pub(crate) cached: bool,
    pub(crate) stats: Option<CursorStats>,
    pub(crate) profile: Option<QueryProfile>,
    pub(crate) plan: Option<QueryPlan>,
    pub(crate) warnings: Vec<QueryWarning>,
}

#[derive(Debug, Deserialize)]
struct CursorBody {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    result: Vec<Value>,
    #[serde(rename = "hasMore", default)]
    has_more: bool,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    cached: bool,
    #[serde(default)]
    extra: Option<CursorExtra>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CursorExtra {
    stats: Option<CursorStats>,
    profile: Option<QueryProfile>,
    plan: Option<QueryPlan>,
    warnings: Vec<QueryWarning>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: bool,
    #[serde(default)]
    code: u16,
    #[serde(rename = "errorNum")]
    error_num: i32,
    #[serde(rename = "errorMessage", default)]
    error_message: String,
}

pub(crate) fn decode(kind: OperationKind, resp: &RawResponse) -> Result<Envelope, DriverError> {
    let v = parse_body(resp)?;
    match kind {
        OperationKind::ReadOne => Ok(Envelope::Single(decode_entry(v, true)?)),
        OperationKind::WriteOne => Ok(Envelope::Single(decode_entry(v, false)?)),
        OperationKind::ReadMany => Ok(Envelope::Bulk(decode_entries(v, true)?)),
        OperationKind::WriteMany => Ok(Envelope::Bulk(decode_entries(v, false)?)),
        OperationKind::Cursor => Ok(Envelope::Cursor(decode_cursor(v)?)),
    }
}

pub(crate) fn decode_single(kind: OperationKind, resp: &RawResponse) -> Result<ResultEntry, DriverError> {
    match decode(kind, resp)? {
        Envelope::Single(e) => Ok(e),
        other => malformed_err!("expected a single result, got {:?}", other),
    }
}

pub(crate) fn decode_bulk(kind: OperationKind, resp: &RawResponse) -> Result<Vec<ResultEntry>, DriverError> {
    match decode(kind, resp)? {
        Envelope::Bulk(v) => Ok(v),
        other => malformed_err!("expected a result array, got {:?}", other),
    }
}

pub(crate) fn decode_cursor_response(resp: &RawResponse) -> Result<CursorEnvelope, DriverError> {
    match decode(OperationKind::Cursor, resp)? {
        Envelope::Cursor(c) => Ok(c),
        other => malformed_err!("expected a cursor batch, got {:?}", other),
    }
}

/// Map a non-2xx response to the error it carries.
///
/// The result always has `status` set. An error body that cannot be decoded
/// yields [`DriverErrorCode::MalformedResponse`].
pub(crate) fn decode_error(resp: &RawResponse) -> DriverError {
    match serde_json::from_slice::<ErrorBody>(&resp.body) {
        Ok(eb) if eb.error => {
            let status = if eb.code != 0 { eb.code } else { resp.status };
            DriverError::from_server(status, eb.error_num, &eb.error_message)
        }
        _ => {
            let mut e = DriverError::new(
                DriverErrorCode::MalformedResponse,
                &format!(
                    "http status {} with undecodable body: {}",
                    resp.status,
                    String::from_utf8_lossy(&resp.body)
                ),
            );
            e.status = resp.status;
            e
        }
    }
}

fn parse_body(resp: &RawResponse) -> Result<Value, DriverError> {
    if resp.body.is_empty() {
        return malformed_err!("empty response body (http status {})", resp.status);
    }
    Ok(serde_json::from_slice(&resp.body)?)
}

fn decode_entries(v: Value, read: bool) -> Result<Vec<ResultEntry>, DriverError> {
    match v {
        Value::Array(items) => items.into_iter().map(|i| decode_entry(i, read)).collect(),
        // silent bulk writes that fully succeeded
        Value::Object(m) if m.is_empty() => Ok(Vec::new()),
        other => malformed_err!("expected an array of results, got {}", kind_of(&other)),
    }
}

fn decode_entry(v: Value, read: bool) -> Result<ResultEntry, DriverError> {
    let mut obj = match v {
        Value::Object(obj) => obj,
        other => return malformed_err!("expected a result object, got {}", kind_of(&other)),
    };
    if obj.get("error") == Some(&Value::Bool(true)) {
        return Ok(ResultEntry::failed(item_error(&obj)?));
    }
    let meta = meta_of(&obj)?;
    if read {
        return Ok(ResultEntry {
            meta,
            document: Some(Value::Object(obj)),
            ..Default::default()
        });
    }
    Ok(ResultEntry {
        meta,
        old: obj.remove("old"),
        new: obj.remove("new"),
        ..Default::default()
    })
}

/// Wrap one query result item. Query results are arbitrary values: only
/// string-valued `_key`, `_id` and `_rev` attributes become metadata.
pub(crate) fn cursor_item(v: Value) -> ResultEntry {
    let meta = match &v {
        Value::Object(obj) => {
            let field = |name: &str| {
                obj.get(name)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            DocumentMeta {
                key: field("_key"),
                id: field("_id"),
                rev: field("_rev"),
            }
        }
        _ => DocumentMeta::default(),
    };
    ResultEntry {
        meta,
        document: Some(v),
        ..Default::default()
    }
}

fn item_error(obj: &Map<String, Value>) -> Result<ItemError, DriverError> {
    let Some(error_num) = obj.get("errorNum").and_then(Value::as_i64) else {
        return malformed_err!("item error without a numeric errorNum: {:?}", obj);
    };
    let code = obj.get("code").and_then(Value::as_u64).unwrap_or(0);
    Ok(ItemError {
        code: u16::try_from(code).unwrap_or(0),
        error_num: i32::try_from(error_num).unwrap_or(i32::MAX),
        message: obj
            .get("errorMessage")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

fn meta_of(obj: &Map<String, Value>) -> Result<DocumentMeta, DriverError> {
    let field = |name: &str| -> Result<String, DriverError> {
        match obj.get(name) {
            None | Some(Value::Null) => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => malformed_err!("'{}' must be a string, got {}", name, kind_of(other)),
        }
    };
    Ok(DocumentMeta {
        key: field("_key")?,
        id: field("_id")?,
        rev: field("_rev")?,
    })
}

fn decode_cursor(v: Value) -> Result<CursorEnvelope, DriverError> {
    let body: CursorBody = serde_json::from_value(v)?;
    let id = body.id.filter(|s| !s.is_empty());
    if body.has_more && id.is_none() {
        return malformed_err!("cursor response has more results but no cursor id");
    }
    let extra = body.extra.unwrap_or_default();
    Ok(CursorEnvelope {
        id,
        result: body.result,
        has_more: body.has_more,
        count: body.count,
        cached: body.cached,
        stats: extra.stats,
        profile: extra.profile,
        plan: extra.plan,
        warnings: extra.warnings,
    })
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
