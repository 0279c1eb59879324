//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
// In-memory server used by the unit tests. It speaks enough of the document,
// collection and cursor http api to drive the public request types end to
// end, and can be told to misbehave on the next cursor fetch or dispose.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{DriverError, DriverErrorCode};
use crate::optimizer::{OptimizerRules, RuleInfo};
use crate::transport::{RawResponse, Request, Transport};
use crate::Handle;

pub(crate) const DATABASE: &str = "testdb";

/// Optimizer rules known to the fake server: (name, enabled by default, can be disabled).
pub(crate) const RULES: &[(&str, bool, bool)] = &[
    ("move-calculations-up", true, true),
    ("remove-unnecessary-filters", true, true),
    ("use-indexes", true, true),
    ("remove-redundant-sorts", true, true),
    ("reduce-extraction-to-projection", true, true),
    ("splice-subqueries", true, false),
    ("async-prefetch", false, true),
];

pub(crate) fn rule_catalog() -> Vec<RuleInfo> {
    RULES
        .iter()
        .map(|(n, d, c)| RuleInfo {
            name: n.to_string(),
            enabled_by_default: *d,
            can_be_disabled: *c,
        })
        .collect()
}

/// How the next affected request misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    /// The transport reports a failure.
    Transport,
    /// A 200 response whose body is not json.
    Garbage,
    /// The request never completes.
    Hang,
}

#[derive(Debug, Default)]
pub(crate) struct FakeServer {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<String, Collection>,
    cursors: HashMap<String, FakeCursor>,
    next_id: u64,
    requests: Vec<(String, String)>,
    fetch_fault: Option<Fault>,
    dispose_fault: Option<Fault>,
}

#[derive(Debug, Default)]
struct Collection {
    docs: Vec<Map<String, Value>>,
    shards: Vec<String>,
}

#[derive(Debug)]
struct FakeCursor {
    pending: VecDeque<Value>,
    batch_size: usize,
}

enum Outcome {
    Reply(u16, Value),
    Fail(Fault),
}

fn error_body(code: u16, error_num: i32, msg: &str) -> Value {
    json!({"error": true, "code": code, "errorNum": error_num, "errorMessage": msg})
}

fn item_error(error_num: i32, msg: &str) -> Value {
    json!({"error": true, "errorNum": error_num, "errorMessage": msg})
}

fn shard_index(key: &str, n: usize) -> usize {
    let h = key
        .bytes()
        .fold(7u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32));
    (h as usize) % n
}

impl Collection {
    fn find(&self, key: &str) -> Option<usize> {
        self.docs
            .iter()
            .position(|d| d.get("_key").and_then(Value::as_str) == Some(key))
    }

    fn shard_of(&self, key: &str) -> &str {
        &self.shards[shard_index(key, self.shards.len())]
    }

    fn meta(d: &Map<String, Value>) -> Map<String, Value> {
        let mut m = Map::new();
        for k in ["_key", "_id", "_rev"] {
            if let Some(v) = d.get(k) {
                m.insert(k.to_string(), v.clone());
            }
        }
        m
    }
}

impl FakeServer {
    pub(crate) fn new() -> Arc<FakeServer> {
        Arc::new(FakeServer::default())
    }

    /// A handle that talks to this server.
    pub(crate) async fn handle(self: &Arc<Self>) -> Result<Handle, DriverError> {
        self.handle_with_timeout(Duration::from_secs(30)).await
    }

    pub(crate) async fn handle_with_timeout(
        self: &Arc<Self>,
        timeout: Duration,
    ) -> Result<Handle, DriverError> {
        let transport: Arc<dyn Transport> = self.clone();
        Handle::builder()
            .database(DATABASE)?
            .timeout(timeout)?
            .transport(transport)?
            .build()
            .await
    }

    pub(crate) fn create_collection(&self, name: &str, number_of_shards: usize) {
        let mut st = self.state.lock().unwrap();
        let shards = (0..number_of_shards.max(1))
            .map(|i| format!("s{}", 1001 + i))
            .collect();
        st.collections.insert(
            name.to_string(),
            Collection {
                docs: Vec::new(),
                shards,
            },
        );
    }

    /// Store documents directly, assigning `_id` and `_rev`.
    pub(crate) fn insert(&self, collection: &str, docs: Vec<Value>) {
        let mut st = self.state.lock().unwrap();
        for d in docs {
            let Value::Object(d) = d else {
                panic!("fake server documents must be objects");
            };
            let res = st.store(collection, d);
            assert!(res.get("error").is_none(), "insert failed: {}", res);
        }
    }

    pub(crate) fn shard_of(&self, collection: &str, key: &str) -> String {
        let st = self.state.lock().unwrap();
        st.collections[collection].shard_of(key).to_string()
    }

    pub(crate) fn fail_next_fetch(&self, f: Fault) {
        self.state.lock().unwrap().fetch_fault = Some(f);
    }

    pub(crate) fn fail_next_dispose(&self, f: Fault) {
        self.state.lock().unwrap().dispose_fault = Some(f);
    }

    /// Number of requests received with `method` whose path contains `fragment`.
    pub(crate) fn requests(&self, method: &str, fragment: &str) -> usize {
        let st = self.state.lock().unwrap();
        st.requests
            .iter()
            .filter(|(m, p)| m == method && p.contains(fragment))
            .count()
    }

    /// Number of server-side cursors still holding results.
    pub(crate) fn live_cursors(&self) -> usize {
        self.state.lock().unwrap().cursors.len()
    }
}

#[async_trait]
impl Transport for FakeServer {
    async fn execute(&self, req: &Request) -> Result<RawResponse, DriverError> {
        let outcome = {
            let mut st = self.state.lock().unwrap();
            st.route(req)
        };
        match outcome {
            Outcome::Reply(status, body) => Ok(RawResponse::new(status, body.to_string())),
            Outcome::Fail(Fault::Transport) => Err(DriverError::new(
                DriverErrorCode::TransportFailure,
                "connection reset by peer",
            )),
            Outcome::Fail(Fault::Garbage) => Ok(RawResponse::new(200, "{\"result\": [1, 2")),
            Outcome::Fail(Fault::Hang) => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(DriverError::new(
                    DriverErrorCode::TransportFailure,
                    "request hung",
                ))
            }
        }
    }
}

impl State {
    fn route(&mut self, req: &Request) -> Outcome {
        let method = req.method().as_str().to_string();
        self.requests.push((method.clone(), req.path().to_string()));

        let prefix = format!("/_db/{}/", DATABASE);
        let Some(api) = req.path().strip_prefix(&prefix) else {
            return Outcome::Reply(404, error_body(404, 1228, "database not found"));
        };
        let parts: Vec<&str> = api.split('/').collect();
        let body: Value = match req.body() {
            Some(b) => match serde_json::from_slice(b) {
                Ok(v) => v,
                Err(_) => return Outcome::Reply(400, error_body(400, 600, "invalid json")),
            },
            None => Value::Null,
        };
        match (method.as_str(), parts.as_slice()) {
            ("GET", ["_api", "document", col, key]) => self.read_one(col, key),
            ("PUT", ["_api", "document", col]) if req.param("onlyget") == Some("true") => {
                self.read_many(col, &body)
            }
            ("POST", ["_api", "document", col]) => self.create(col, &body, req),
            ("PATCH", ["_api", "document", col]) => self.update(col, &body, req),
            ("DELETE", ["_api", "document", col, key]) => self.delete_one(col, key, req),
            ("DELETE", ["_api", "document", col]) => self.delete_many(col, &body, req),
            ("GET", ["_api", "collection", col, "shards"]) => self.shards(col),
            ("POST", ["_api", "cursor"]) => self.create_cursor(&body),
            ("PUT", ["_api", "cursor", id]) => {
                if let Some(f) = self.fetch_fault.take() {
                    return Outcome::Fail(f);
                }
                self.next_batch(id)
            }
            ("DELETE", ["_api", "cursor", id]) => {
                if let Some(f) = self.dispose_fault.take() {
                    return Outcome::Fail(f);
                }
                match self.cursors.remove(*id) {
                    Some(_) => Outcome::Reply(202, json!({"id": id, "error": false, "code": 202})),
                    None => Outcome::Reply(404, error_body(404, 1600, "cursor not found")),
                }
            }
            _ => Outcome::Reply(405, error_body(405, 405, "method not supported")),
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn collection_missing(col: &str) -> Outcome {
        Outcome::Reply(
            404,
            error_body(404, 1203, &format!("collection or view not found: {}", col)),
        )
    }

    /// Insert one document, returning its metadata or an item error.
    fn store(&mut self, col: &str, mut d: Map<String, Value>) -> Value {
        let id = self.next_id();
        let Some(c) = self.collections.get_mut(col) else {
            return item_error(1203, "collection not found");
        };
        let key = match d.get("_key").and_then(Value::as_str) {
            Some(k) => k.to_string(),
            None => id.to_string(),
        };
        if c.find(&key).is_some() {
            return item_error(1210, "unique constraint violated");
        }
        d.insert("_key".to_string(), json!(key));
        d.insert("_id".to_string(), json!(format!("{}/{}", col, key)));
        d.insert("_rev".to_string(), json!(format!("_r{}", id)));
        let meta = Collection::meta(&d);
        c.docs.push(d);
        Value::Object(meta)
    }

    fn read_one(&self, col: &str, key: &str) -> Outcome {
        let Some(c) = self.collections.get(col) else {
            return Self::collection_missing(col);
        };
        match c.find(key) {
            Some(i) => Outcome::Reply(200, Value::Object(c.docs[i].clone())),
            None => Outcome::Reply(404, error_body(404, 1202, "document not found")),
        }
    }

    fn read_many(&self, col: &str, body: &Value) -> Outcome {
        let Some(c) = self.collections.get(col) else {
            return Self::collection_missing(col);
        };
        let keys = body.as_array().cloned().unwrap_or_default();
        let out: Vec<Value> = keys
            .iter()
            .map(|k| match k.as_str().and_then(|k| c.find(k)) {
                Some(i) => Value::Object(c.docs[i].clone()),
                None => item_error(1202, "document not found"),
            })
            .collect();
        Outcome::Reply(200, Value::Array(out))
    }

    fn create(&mut self, col: &str, body: &Value, req: &Request) -> Outcome {
        if !self.collections.contains_key(col) {
            return Self::collection_missing(col);
        }
        let return_new = req.param("returnNew") == Some("true");
        let silent = req.param("silent") == Some("true");
        let docs = body.as_array().cloned().unwrap_or_default();
        let mut out = Vec::new();
        for d in docs {
            let Value::Object(d) = d else {
                out.push(item_error(1227, "document must be an object"));
                continue;
            };
            let mut res = self.store(col, d);
            if res.get("error").is_none() && return_new {
                if let Some(key) = res.get("_key").and_then(Value::as_str) {
                    let c = &self.collections[col];
                    let stored = c.find(key).map(|i| Value::Object(c.docs[i].clone()));
                    res["new"] = stored.unwrap_or(Value::Null);
                }
            }
            if !silent || res.get("error").is_some() {
                out.push(res);
            }
        }
        Outcome::Reply(202, Value::Array(out))
    }

    fn update(&mut self, col: &str, body: &Value, req: &Request) -> Outcome {
        if !self.collections.contains_key(col) {
            return Self::collection_missing(col);
        }
        let return_old = req.param("returnOld") == Some("true");
        let return_new = req.param("returnNew") == Some("true");
        let silent = req.param("silent") == Some("true");
        let keep_null = req.param("keepNull") != Some("false");
        let patches = body.as_array().cloned().unwrap_or_default();
        let mut out = Vec::new();
        for p in patches {
            let rev = format!("_r{}", self.next_id());
            let c = self.collections.get_mut(col).unwrap();
            let found = p
                .get("_key")
                .and_then(Value::as_str)
                .and_then(|k| c.find(k));
            let Some(i) = found else {
                out.push(item_error(1202, "document not found"));
                continue;
            };
            let old = c.docs[i].clone();
            let doc = &mut c.docs[i];
            if let Value::Object(p) = p {
                for (k, v) in p {
                    if k.starts_with('_') {
                        continue;
                    }
                    if v.is_null() && !keep_null {
                        doc.remove(&k);
                    } else {
                        doc.insert(k, v);
                    }
                }
            }
            let old_rev = doc.get("_rev").cloned().unwrap_or(Value::Null);
            doc.insert("_rev".to_string(), json!(rev));
            let mut res = Collection::meta(doc);
            res.insert("_oldRev".to_string(), old_rev);
            if return_old {
                res.insert("old".to_string(), Value::Object(old));
            }
            if return_new {
                res.insert("new".to_string(), Value::Object(doc.clone()));
            }
            if !silent {
                out.push(Value::Object(res));
            }
        }
        Outcome::Reply(202, Value::Array(out))
    }

    fn delete_one(&mut self, col: &str, key: &str, req: &Request) -> Outcome {
        let Some(c) = self.collections.get_mut(col) else {
            return Self::collection_missing(col);
        };
        let Some(i) = c.find(key) else {
            return Outcome::Reply(404, error_body(404, 1202, "document not found"));
        };
        let if_match = req
            .headers()
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("if-match"))
            .map(|(_, v)| v.as_str());
        if let Some(rev) = if_match {
            if c.docs[i].get("_rev").and_then(Value::as_str) != Some(rev) {
                return Outcome::Reply(412, error_body(412, 1200, "conflict, _rev values do not match"));
            }
        }
        let old = c.docs.remove(i);
        if req.param("silent") == Some("true") {
            return Outcome::Reply(200, json!({}));
        }
        let mut res = Collection::meta(&old);
        if req.param("returnOld") == Some("true") {
            res.insert("old".to_string(), Value::Object(old));
        }
        Outcome::Reply(200, Value::Object(res))
    }

    fn delete_many(&mut self, col: &str, body: &Value, req: &Request) -> Outcome {
        let Some(c) = self.collections.get_mut(col) else {
            return Self::collection_missing(col);
        };
        let return_old = req.param("returnOld") == Some("true");
        let silent = req.param("silent") == Some("true");
        let keys = body.as_array().cloned().unwrap_or_default();
        let mut out = Vec::new();
        for k in keys {
            let key = match &k {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => o.get("_key").and_then(Value::as_str).map(str::to_string),
                _ => None,
            };
            let Some(i) = key.and_then(|k| c.find(&k)) else {
                out.push(item_error(1202, "document not found"));
                continue;
            };
            let old = c.docs.remove(i);
            if silent {
                continue;
            }
            let mut res = Collection::meta(&old);
            if return_old {
                res.insert("old".to_string(), Value::Object(old));
            }
            out.push(Value::Object(res));
        }
        Outcome::Reply(200, Value::Array(out))
    }

    fn shards(&self, col: &str) -> Outcome {
        let Some(c) = self.collections.get(col) else {
            return Self::collection_missing(col);
        };
        let mut shards = Map::new();
        for (i, s) in c.shards.iter().enumerate() {
            shards.insert(
                s.clone(),
                json!([format!("PRMR-{}", i + 1), format!("PRMR-{}", i + 2)]),
            );
        }
        Outcome::Reply(
            200,
            json!({
                "error": false,
                "code": 200,
                "id": "4711",
                "name": col,
                "shards": shards,
                "numberOfShards": c.shards.len(),
                "shardKeys": ["_key"],
                "shardingStrategy": "hash",
                "replicationFactor": 2,
                "writeConcern": 1,
            }),
        )
    }

    fn create_cursor(&mut self, body: &Value) -> Outcome {
        let query = body["query"].as_str().unwrap_or_default();
        let bind_vars = body.get("bindVars").cloned().unwrap_or(json!({}));
        let col = match bind_vars.get("@col").and_then(Value::as_str) {
            Some(c) => c.to_string(),
            None => {
                // "FOR d IN name ..."
                let words: Vec<&str> = query.split_whitespace().collect();
                match words.iter().position(|w| w.eq_ignore_ascii_case("IN")) {
                    Some(i) if i + 1 < words.len() => words[i + 1].to_string(),
                    _ => return Outcome::Reply(400, error_body(400, 1501, "syntax error")),
                }
            }
        };
        let Some(c) = self.collections.get(&col) else {
            return Self::collection_missing(&col);
        };
        let options = body.get("options").cloned().unwrap_or(json!({}));

        let shard_ids: Vec<String> = options
            .get("shardIds")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(|s| s.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        if let Some(bad) = shard_ids.iter().find(|s| !c.shards.contains(*s)) {
            return Self::collection_missing(bad);
        }

        let rules: Vec<String> = options["optimizer"]["rules"]
            .as_array()
            .map(|a| a.iter().filter_map(|s| s.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let rules = match OptimizerRules::parse(&rules) {
            Ok(r) => r,
            Err(e) => return Outcome::Reply(400, error_body(400, 10, &e.message)),
        };
        let profile = options["profile"].as_u64().unwrap_or(0);

        let attr = bind_vars.get("attr").and_then(Value::as_str);
        let results: VecDeque<Value> = c
            .docs
            .iter()
            .filter(|d| {
                if shard_ids.is_empty() {
                    return true;
                }
                let key = d.get("_key").and_then(Value::as_str).unwrap_or_default();
                shard_ids.iter().any(|s| s == c.shard_of(key))
            })
            .map(|d| match attr {
                Some(a) => d.get(a).cloned().unwrap_or(Value::Null),
                None => Value::Object(d.clone()),
            })
            .collect();
        let total = results.len();

        let mut extra = Map::new();
        if profile >= 1 {
            extra.insert(
                "profile".to_string(),
                json!({"initializing": 0.0001, "parsing": 0.0002, "executing": 0.001}),
            );
        }
        if profile >= 2 {
            let catalog = rule_catalog();
            extra.insert(
                "plan".to_string(),
                json!({
                    "rules": rules.apply(&catalog),
                    "estimatedCost": total as f64 + 1.0,
                    "estimatedNrItems": total,
                    "nodes": [{"type": "SingletonNode"}, {"type": "EnumerateCollectionNode"}],
                    "collections": [{"name": col, "type": "read"}],
                }),
            );
        }
        extra.insert("warnings".to_string(), json!([]));

        let batch_size = body["batchSize"].as_u64().unwrap_or(1000).max(1) as usize;
        let mut cursor = FakeCursor {
            pending: results,
            batch_size,
        };
        let id = if cursor.pending.len() > batch_size {
            Some(self.next_id().to_string())
        } else {
            None
        };
        let mut reply = Self::batch(id.as_deref(), &mut cursor, extra);
        if body["count"].as_bool() == Some(true) {
            reply["count"] = json!(total);
        }
        if let Some(id) = id {
            self.cursors.insert(id, cursor);
        }
        Outcome::Reply(201, reply)
    }

    fn next_batch(&mut self, id: &str) -> Outcome {
        let Some(cursor) = self.cursors.get_mut(id) else {
            return Outcome::Reply(404, error_body(404, 1600, "cursor not found"));
        };
        let reply = Self::batch(Some(id), cursor, Map::new());
        if cursor.pending.is_empty() {
            self.cursors.remove(id);
        }
        Outcome::Reply(200, reply)
    }

    fn batch(id: Option<&str>, cursor: &mut FakeCursor, mut extra: Map<String, Value>) -> Value {
        let n = cursor.batch_size.min(cursor.pending.len());
        let result: Vec<Value> = cursor.pending.drain(..n).collect();
        let has_more = !cursor.pending.is_empty();
        extra.insert(
            "stats".to_string(),
            json!({"writesExecuted": 0, "writesIgnored": 0, "scannedFull": n, "scannedIndex": 0,
                   "filtered": 0, "httpRequests": 0, "executionTime": 0.0005, "peakMemoryUsage": 2048}),
        );
        let mut reply = json!({
            "result": result,
            "hasMore": has_more,
            "cached": false,
            "extra": extra,
            "error": false,
            "code": 201,
        });
        if let Some(id) = id {
            reply["id"] = json!(id);
        }
        reply
    }
}
