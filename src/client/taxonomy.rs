//! Category hierarchies used by `is_descendant` queries.

use serde_json::Value;

use crate::client::resource::{Method, RestPoseResource};
use crate::config::WaitMode;
use crate::error::Result;

/// A named taxonomy within a collection.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    name: String,
    basepath: String,
    resource: RestPoseResource,
}

impl Taxonomy {
    pub(crate) fn new(resource: RestPoseResource, collection_path: &str, name: &str) -> Self {
        Taxonomy {
            name: name.to_string(),
            basepath: format!("{collection_path}/taxonomy/{name}"),
            resource,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn read(&self, path: &str) -> Result<Value> {
        self.resource.get(path)?.expect_status(&[200])?.json()
    }

    fn write(&self, method: Method, path: &str, wait: Option<WaitMode>) -> Result<Value> {
        self.resource
            .write(method, path, None, wait)?
            .expect_status(&[202])?
            .json()
    }

    /// Every category, with its parents.
    pub fn all(&self) -> Result<Value> {
        self.read(&self.basepath)
    }

    /// The categories with no parents.
    pub fn top(&self) -> Result<Value> {
        self.read(&format!("{}/top", self.basepath))
    }

    /// The parents, ancestors, children and descendants of a category.
    pub fn get_category(&self, category: &str) -> Result<Value> {
        self.read(&format!("{}/id/{category}", self.basepath))
    }

    pub fn add_category(&self, category: &str, wait: Option<WaitMode>) -> Result<Value> {
        self.write(Method::Put, &format!("{}/id/{category}", self.basepath), wait)
    }

    pub fn remove_category(&self, category: &str, wait: Option<WaitMode>) -> Result<Value> {
        self.write(Method::Delete, &format!("{}/id/{category}", self.basepath), wait)
    }

    pub fn add_parent(&self, category: &str, parent: &str, wait: Option<WaitMode>) -> Result<Value> {
        let path = format!("{}/id/{category}/parent/{parent}", self.basepath);
        self.write(Method::Put, &path, wait)
    }

    pub fn remove_parent(
        &self,
        category: &str,
        parent: &str,
        wait: Option<WaitMode>,
    ) -> Result<Value> {
        let path = format!("{}/id/{category}/parent/{parent}", self.basepath);
        self.write(Method::Delete, &path, wait)
    }

    /// Remove the whole taxonomy.
    pub fn remove(&self, wait: Option<WaitMode>) -> Result<Value> {
        self.write(Method::Delete, &self.basepath, wait)
    }
}
