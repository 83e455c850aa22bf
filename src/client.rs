//! Access to a RestPose server and its collections.
//!
//! # Examples
//!
//! ```no_run
//! use restpose::client::Server;
//! use restpose::query::TargetExt;
//!
//! # fn main() -> restpose::error::Result<()> {
//! let server = Server::new("http://127.0.0.1:7777")?;
//! let coll = server.collection("test_coll");
//! coll.add_doc(&serde_json::json!({"text": "Hello world"}), Some("blurb"), Some("1"), None)?;
//! coll.checkpoint(true, None)?.wait()?;
//!
//! let results = coll.field("text").text("hello").slice(0..10)?;
//! println!("{} matches", results.len()?);
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod collection;
pub mod resource;
pub mod taxonomy;

use std::sync::Arc;

use serde_json::Value;

pub use checkpoint::{CheckPoint, CheckPointState, CheckPointStatus, WaitOptions};
pub use collection::{Collection, Document, DocumentType};
pub use resource::{HttpTransport, Method, Request, Response, RestPoseResource, Transport};
pub use taxonomy::Taxonomy;

use crate::config::{ClientConfig, WaitMode};
use crate::error::Result;

/// A connection to a RestPose server.
#[derive(Debug, Clone)]
pub struct Server {
    config: ClientConfig,
    resource: RestPoseResource,
}

impl Server {
    /// Connect to the server at `uri` with default settings.
    pub fn new(uri: impl Into<String>) -> Result<Self> {
        Server::with_config(ClientConfig::default().with_uri(uri))
    }

    /// Connect over HTTP with the given settings.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::from_config(&config)?);
        Ok(Server::with_transport(config, transport))
    }

    /// Send requests through `transport` instead of HTTP.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let resource = RestPoseResource::new(transport, config.wait);
        Server { config, resource }
    }

    pub fn uri(&self) -> &str {
        &self.config.uri
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Default wait mode for writes.
    pub fn wait(&self) -> WaitMode {
        self.config.wait
    }

    /// Server status, including queue and task information.
    pub fn status(&self) -> Result<Value> {
        self.resource.get("/status")?.expect_status(&[200])?.json()
    }

    /// Names of the collections on the server.
    pub fn collections(&self) -> Result<Vec<String>> {
        let body: serde_json::Map<String, Value> =
            self.resource.get("/coll")?.expect_status(&[200])?.json()?;
        Ok(body.keys().cloned().collect())
    }

    /// A handle on the collection `name`; it need not exist yet.
    pub fn collection(&self, name: &str) -> Arc<Collection> {
        Arc::new(Collection::new(
            name,
            self.resource.clone(),
            self.config.page_size,
            self.config.checkpoint_poll_interval(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::resource::testing::ScriptedTransport;
    use serde_json::json;

    #[test]
    fn test_collections() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(200, json!({"a": {}, "b": {}}));
        let server = Server::with_transport(ClientConfig::default(), transport.clone());

        assert_eq!(server.collections().unwrap(), vec!["a", "b"]);
        assert_eq!(transport.requests()[0].path, "/coll");
    }

    #[test]
    fn test_invalid_uri_rejected() {
        assert!(Server::new("ftp://example.com").is_err());
    }

    #[test]
    fn test_collection_uses_config() {
        let transport = Arc::new(ScriptedTransport::default());
        let config = ClientConfig::default().with_page_size(7);
        let server = Server::with_transport(config, transport);
        let coll = server.collection("c");
        assert_eq!(coll.basepath(), "/coll/c");
        assert_eq!(crate::query::QueryTarget::page_size(&*coll), 7);
    }
}
