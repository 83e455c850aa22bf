//! Stand-in search targets and transports shared by the integration tests.

#![allow(dead_code)]

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use restpose::client::{Request, Response, Transport};
use restpose::error::{RestPoseError, Result};
use restpose::query::{QueryTarget, RawSearchResults, SearchRequest};

/// Upper bound reported on top of the real count when counting stops early.
const UPPER_BOUND_SLACK: u64 = 7;

/// An in-memory target holding documents numbered `0..count`.
///
/// Each document looks like `{"num": [n], "id": ["n"], "type": ["num"]}`.
/// Understands match-all, match-nothing, `is` and `range` on `num`, and
/// `and`/`or` combinations; ordering by `num` in either direction.
#[derive(Debug)]
pub struct NumTarget {
    count: u64,
    page_size: u64,
    requests: Mutex<Vec<Value>>,
}

impl NumTarget {
    pub fn new(count: u64) -> Arc<Self> {
        Self::with_page_size(count, 10)
    }

    pub fn with_page_size(count: u64, page_size: u64) -> Arc<Self> {
        Arc::new(NumTarget {
            count,
            page_size,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Value {
        self.requests.lock().last().cloned().unwrap_or(Value::Null)
    }

    fn doc(num: u64) -> Map<String, Value> {
        let Value::Object(map) = json!({
            "num": [num],
            "id": [num.to_string()],
            "type": ["num"],
        }) else {
            unreachable!()
        };
        map
    }

    fn ordered_matches(&self, request: &Value) -> Vec<u64> {
        let mut nums: Vec<u64> = (0..self.count)
            .filter(|num| matches(&request["query"], *num))
            .collect();
        let descending = request["order_by"]
            .as_array()
            .and_then(|keys| keys.first())
            .is_some_and(|key| key["field"] == "num" && key["ascending"] == false);
        if descending {
            nums.reverse();
        }
        nums
    }
}

fn num_values(value: &Value) -> Vec<u64> {
    match value {
        Value::Array(values) => values.iter().filter_map(Value::as_u64).collect(),
        other => other.as_u64().into_iter().collect(),
    }
}

fn matches(query: &Value, num: u64) -> bool {
    if query.get("matchall").is_some() {
        return true;
    }
    if query.get("matchnothing").is_some() {
        return false;
    }
    if let Some(children) = query.get("and").and_then(Value::as_array) {
        return children.iter().all(|child| matches(child, num));
    }
    if let Some(children) = query.get("or").and_then(Value::as_array) {
        return children.iter().any(|child| matches(child, num));
    }
    if let Some(field) = query.get("field").and_then(Value::as_array) {
        if field.first().and_then(Value::as_str) != Some("num") {
            return false;
        }
        return match field.get(1).and_then(Value::as_str) {
            Some("is") => num_values(&field[2]).contains(&num),
            Some("range") => {
                let bounds = num_values(&field[2]);
                bounds.len() == 2 && bounds[0] <= num && num <= bounds[1]
            }
            _ => false,
        };
    }
    false
}

impl QueryTarget for NumTarget {
    fn search(&self, request: &SearchRequest) -> Result<RawSearchResults> {
        let wire = serde_json::to_value(request)?;
        self.requests.lock().push(wire.clone());

        let nums = self.ordered_matches(&wire);
        let total = nums.len() as u64;
        let size = request.size.unwrap_or(10);

        let start = match &request.fromdoc {
            Some(fromdoc) => {
                let anchor = nums
                    .iter()
                    .position(|num| num.to_string() == fromdoc.id)
                    .ok_or_else(|| {
                        RestPoseError::request_failed(400, format!("document {} not found", fromdoc.id))
                    })?;
                (anchor as i64 + fromdoc.from).max(0) as u64
            }
            None => request.offset(),
        };
        let end = start.saturating_add(size).min(total);
        let items = nums
            .iter()
            .skip(start as usize)
            .take(end.saturating_sub(start) as usize)
            .map(|num| Self::doc(*num))
            .collect();

        let check_at_least = request.check_at_least_or_default();
        let exact = check_at_least < 0 || check_at_least as u64 >= total;
        let (lower, upper) = if exact {
            (total, total)
        } else {
            ((check_at_least as u64).max(end).min(total), total + UPPER_BOUND_SLACK)
        };

        Ok(RawSearchResults {
            total_docs: self.count,
            from: start,
            size_requested: size,
            check_at_least,
            matches_lower_bound: lower,
            matches_estimated: total,
            matches_upper_bound: upper,
            items,
            info: Vec::new(),
        })
    }

    fn page_size(&self) -> u64 {
        self.page_size
    }
}

type Handler = Box<dyn Fn(&Request) -> Response + Send + Sync>;

/// A transport answering every request with a handler, recording each one.
pub struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        Arc::new(MockTransport {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.requests.lock().len())
            .finish()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        self.requests.lock().push(request.clone());
        Ok((self.handler)(request))
    }
}
