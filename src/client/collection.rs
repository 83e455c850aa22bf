//! Collections, document types and stored documents.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::client::checkpoint::CheckPoint;
use crate::client::resource::{Method, Request, RestPoseResource};
use crate::client::taxonomy::Taxonomy;
use crate::config::WaitMode;
#[cfg_attr(not(test), allow(unused_imports))]
use crate::error::{RestPoseError, Result};
use crate::query::request::SearchRequest;
use crate::query::results::{RawSearchResults, Realiser, SearchResults};
use crate::query::target::QueryTarget;

fn post_search(
    resource: &RestPoseResource,
    basepath: &str,
    body: Value,
) -> Result<RawSearchResults> {
    let request = Request::new(Method::Post, format!("{basepath}/search")).body(body);
    resource.send(request)?.expect_status(&[200])?.json()
}

/// A named collection of documents on a server.
pub struct Collection {
    name: String,
    basepath: String,
    resource: RestPoseResource,
    page_size: u64,
    poll_interval: Duration,
    realiser: RwLock<Option<Realiser>>,
}

impl Collection {
    pub(crate) fn new(
        name: &str,
        resource: RestPoseResource,
        page_size: u64,
        poll_interval: Duration,
    ) -> Self {
        Collection {
            name: name.to_string(),
            basepath: format!("/coll/{name}"),
            resource,
            page_size,
            poll_interval,
            realiser: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of this collection below the server address.
    pub fn basepath(&self) -> &str {
        &self.basepath
    }

    /// Set the realiser applied to results of searches on this collection.
    ///
    /// Document types obtained afterwards start with the same realiser.
    pub fn set_realiser(&self, realiser: Option<Realiser>) {
        *self.realiser.write() = realiser;
    }

    /// A document type within this collection.
    pub fn doc_type(&self, doc_type: &str) -> Arc<DocumentType> {
        Arc::new(DocumentType {
            name: doc_type.to_string(),
            basepath: format!("{}/type/{doc_type}", self.basepath),
            resource: self.resource.clone(),
            page_size: self.page_size,
            realiser: RwLock::new(self.realiser.read().clone()),
        })
    }

    /// Status of the collection, such as its document count.
    pub fn status(&self) -> Result<Value> {
        self.resource.get(&self.basepath)?.expect_status(&[200])?.json()
    }

    pub fn config(&self) -> Result<Value> {
        self.resource
            .get(&format!("{}/config", self.basepath))?
            .expect_status(&[200])?
            .json()
    }

    pub fn set_config(&self, config: &Value) -> Result<Value> {
        self.resource
            .write(
                Method::Put,
                &format!("{}/config", self.basepath),
                Some(config.clone()),
                None,
            )?
            .expect_status(&[202])?
            .json()
    }

    /// Add or replace a document.
    ///
    /// With both a type and an id the document is stored at that address;
    /// otherwise the server takes them from the document's own fields.
    pub fn add_doc(
        &self,
        doc: &Value,
        doc_type: Option<&str>,
        doc_id: Option<&str>,
        wait: Option<WaitMode>,
    ) -> Result<Value> {
        let mut path = self.basepath.clone();
        if let Some(doc_type) = doc_type {
            path.push_str(&format!("/type/{doc_type}"));
        }
        if let Some(doc_id) = doc_id {
            path.push_str(&format!("/id/{doc_id}"));
        }
        let method = if doc_type.is_some() && doc_id.is_some() {
            Method::Put
        } else {
            Method::Post
        };
        self.resource
            .write(method, &path, Some(doc.clone()), wait)?
            .expect_status(&[202])?
            .json()
    }

    pub fn delete_doc(&self, doc_type: &str, doc_id: &str, wait: Option<WaitMode>) -> Result<Value> {
        let path = format!("{}/type/{doc_type}/id/{doc_id}", self.basepath);
        self.resource
            .write(Method::Delete, &path, None, wait)?
            .expect_status(&[202])?
            .json()
    }

    /// A stored document; nothing is fetched until its contents are read.
    pub fn get_doc(&self, doc_type: &str, doc_id: &str) -> Document {
        Document::new(
            self.resource.clone(),
            format!("{}/type/{doc_type}/id/{doc_id}", self.basepath),
        )
    }

    /// Create a checkpoint after all changes sent so far.
    ///
    /// With `commit`, the changes are also committed to disk when the
    /// checkpoint is reached.
    pub fn checkpoint(&self, commit: bool, wait: Option<WaitMode>) -> Result<CheckPoint> {
        #[derive(Deserialize)]
        struct Created {
            checkid: String,
        }

        let wait = wait.unwrap_or(self.resource.default_wait());
        let request = Request::new(Method::Post, format!("{}/checkpoint", self.basepath))
            .param("wait", wait.as_str())
            .param("commit", if commit { "1" } else { "0" });
        let created: Created = self.resource.send(request)?.expect_status(&[201])?.json()?;
        Ok(CheckPoint::new(
            created.checkid,
            &self.basepath,
            self.resource.clone(),
            self.poll_interval,
        ))
    }

    pub fn taxonomies(&self) -> Result<Value> {
        self.resource
            .get(&format!("{}/taxonomy", self.basepath))?
            .expect_status(&[200])?
            .json()
    }

    pub fn taxonomy(&self, name: &str) -> Taxonomy {
        Taxonomy::new(self.resource.clone(), &self.basepath, name)
    }

    /// Delete the collection and everything in it.
    pub fn delete(&self) -> Result<Value> {
        self.resource
            .send(Request::new(Method::Delete, self.basepath.clone()))?
            .expect_status(&[202])?
            .json()
    }

    /// Run a search given directly in wire form.
    pub fn search_raw(&self, body: &Value) -> Result<Arc<SearchResults>> {
        let raw = post_search(&self.resource, &self.basepath, body.clone())?;
        Ok(SearchResults::new(raw, self.realiser()))
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("page_size", &self.page_size)
            .field("has_realiser", &self.realiser.read().is_some())
            .finish()
    }
}

impl QueryTarget for Collection {
    fn search(&self, request: &SearchRequest) -> Result<RawSearchResults> {
        post_search(&self.resource, &self.basepath, serde_json::to_value(request)?)
    }

    fn realiser(&self) -> Option<Realiser> {
        self.realiser.read().clone()
    }

    fn page_size(&self) -> u64 {
        self.page_size
    }
}

/// Documents of one type within a collection.
pub struct DocumentType {
    name: String,
    basepath: String,
    resource: RestPoseResource,
    page_size: u64,
    realiser: RwLock<Option<Realiser>>,
}

impl DocumentType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_realiser(&self, realiser: Option<Realiser>) {
        *self.realiser.write() = realiser;
    }

    /// Add or replace a document of this type.
    pub fn add_doc(&self, doc: &Value, doc_id: Option<&str>, wait: Option<WaitMode>) -> Result<Value> {
        let (method, path) = match doc_id {
            Some(doc_id) => (Method::Put, format!("{}/id/{doc_id}", self.basepath)),
            None => (Method::Post, self.basepath.clone()),
        };
        self.resource
            .write(method, &path, Some(doc.clone()), wait)?
            .expect_status(&[202])?
            .json()
    }

    pub fn delete_doc(&self, doc_id: &str, wait: Option<WaitMode>) -> Result<Value> {
        let path = format!("{}/id/{doc_id}", self.basepath);
        self.resource
            .write(Method::Delete, &path, None, wait)?
            .expect_status(&[202])?
            .json()
    }

    pub fn get_doc(&self, doc_id: &str) -> Document {
        Document::new(
            self.resource.clone(),
            format!("{}/id/{doc_id}", self.basepath),
        )
    }
}

impl fmt::Debug for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentType")
            .field("name", &self.name)
            .field("basepath", &self.basepath)
            .finish()
    }
}

impl QueryTarget for DocumentType {
    fn search(&self, request: &SearchRequest) -> Result<RawSearchResults> {
        post_search(&self.resource, &self.basepath, serde_json::to_value(request)?)
    }

    fn realiser(&self) -> Option<Realiser> {
        self.realiser.read().clone()
    }

    fn page_size(&self) -> u64 {
        self.page_size
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct StoredDocument {
    data: Map<String, Value>,
    terms: Map<String, Value>,
    values: Map<String, Value>,
}

/// A document stored on the server, fetched on first access.
#[derive(Debug)]
pub struct Document {
    resource: RestPoseResource,
    path: String,
    stored: Mutex<Option<StoredDocument>>,
}

impl Document {
    fn new(resource: RestPoseResource, path: String) -> Self {
        Document {
            resource,
            path,
            stored: Mutex::new(None),
        }
    }

    fn fetch(&self) -> Result<StoredDocument> {
        let mut stored = self.stored.lock();
        if let Some(document) = stored.as_ref() {
            return Ok(document.clone());
        }
        let document: StoredDocument = self.resource.get(&self.path)?.expect_status(&[200])?.json()?;
        *stored = Some(document.clone());
        Ok(document)
    }

    /// Stored field values.
    pub fn data(&self) -> Result<Map<String, Value>> {
        Ok(self.fetch()?.data)
    }

    /// Indexed terms, with their positions and frequencies.
    pub fn terms(&self) -> Result<Map<String, Value>> {
        Ok(self.fetch()?.terms)
    }

    /// Values stored in slots for sorting and faceting.
    pub fn values(&self) -> Result<Map<String, Value>> {
        Ok(self.fetch()?.values)
    }
}
