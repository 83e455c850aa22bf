//! HTTP access to server resources.
//!
//! Requests go through a [`Transport`], so that the client can be pointed at
//! something other than a live server. [`HttpTransport`] is the blocking
//! `reqwest` implementation used by default.

use std::fmt;
use std::sync::Arc;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::{ClientConfig, WaitMode};
use crate::error::{RestPoseError, Result};

const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP methods used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request for a server resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Path below the server's base address, starting with `/`.
    pub path: String,
    /// Query string parameters.
    pub params: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Request {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// The value of the query parameter `name`, if present.
    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A response from the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl Response {
    /// A JSON response, mostly useful for stand-in transports.
    pub fn json_body(status: u16, body: &Value) -> Self {
        Response {
            status,
            content_type: Some(JSON_CONTENT_TYPE.to_string()),
            body: body.to_string(),
        }
    }

    fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|content_type| content_type.starts_with(JSON_CONTENT_TYPE))
    }

    /// The error message carried by a JSON error body.
    fn error_message(&self) -> String {
        if self.is_json() {
            if let Ok(body) = serde_json::from_str::<Value>(&self.body) {
                if let Some(message) = body.get("err").and_then(Value::as_str) {
                    return message.to_string();
                }
            }
        }
        format!("Unexpected return status: {}", self.status)
    }

    /// Fail unless the status is one of `expected`.
    pub fn expect_status(self, expected: &[u16]) -> Result<Self> {
        if expected.contains(&self.status) {
            return Ok(self);
        }
        let message = self.error_message();
        if self.status == 404 {
            return Err(RestPoseError::ResourceNotFound(message));
        }
        Err(RestPoseError::request_failed(self.status, message))
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if !self.is_json() {
            return Err(RestPoseError::UnexpectedContentType(
                self.content_type.clone().unwrap_or_default(),
            ));
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Sends requests to a server.
pub trait Transport: Send + Sync + fmt::Debug {
    fn send(&self, request: &Request) -> Result<Response>;
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    client: Client,
    uri: String,
    user_agent: String,
}

impl HttpTransport {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }
        // The blocking client defaults to a 30s timeout; keep it unbounded
        // unless one is configured.
        builder = builder.timeout(config.request_timeout());
        let client = builder.build()?;
        Ok(HttpTransport {
            client,
            uri: config.uri.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        })
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("uri", &self.uri)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        let url = format!("{}{}", self.uri, request.path);
        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
            Method::Delete => self.client.delete(&url),
        };
        let mut builder = builder
            .query(&request.params)
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .header(USER_AGENT, &self.user_agent);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text()?;
        Ok(Response {
            status,
            content_type,
            body,
        })
    }
}

/// Sends requests for resources below a server's base address.
#[derive(Debug, Clone)]
pub struct RestPoseResource {
    transport: Arc<dyn Transport>,
    wait: WaitMode,
}

impl RestPoseResource {
    pub fn new(transport: Arc<dyn Transport>, wait: WaitMode) -> Self {
        RestPoseResource { transport, wait }
    }

    /// The wait mode used for writes when none is given.
    pub fn default_wait(&self) -> WaitMode {
        self.wait
    }

    pub fn send(&self, request: Request) -> Result<Response> {
        debug!(method = %request.method, path = %request.path, "sending request");
        self.transport.send(&request)
    }

    pub fn get(&self, path: &str) -> Result<Response> {
        self.send(Request::new(Method::Get, path))
    }

    /// Send a write request with a wait parameter.
    pub fn write(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        wait: Option<WaitMode>,
    ) -> Result<Response> {
        let mut request = Request::new(method, path)
            .param("wait", wait.unwrap_or(self.wait).as_str());
        request.body = body;
        self.send(request)
    }
}
