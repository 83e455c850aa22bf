//! Search request bodies as sent to the server.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::query::expression::QueryNode;

/// The body of a search request.
///
/// Optional members are omitted from the JSON when unset; `from` and
/// `check_at_least` are also omitted when zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: QueryNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_at_least: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fromdoc: Option<FromDoc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Vec<InfoRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<OrderKey>>,
}

impl SearchRequest {
    /// A request for `query` with every other member unset.
    pub fn new(query: QueryNode) -> Self {
        SearchRequest {
            query,
            from: None,
            size: None,
            check_at_least: None,
            fromdoc: None,
            info: None,
            order_by: None,
        }
    }

    /// Requested offset, treating an absent value as zero.
    pub fn offset(&self) -> u64 {
        self.from.unwrap_or(0)
    }

    /// Requested check-at-least, treating an absent value as zero.
    pub fn check_at_least_or_default(&self) -> i64 {
        self.check_at_least.unwrap_or(0)
    }
}

/// Anchors a result window at a document rather than at an absolute rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FromDoc {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub id: String,
    pub from: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagesize: Option<u64>,
}

/// Facet counting over the values of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCountRequest {
    pub field: String,
    pub doc_limit: Option<u64>,
    pub result_limit: Option<u64>,
}

/// Term occurrence or co-occurrence counting within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermOccurRequest {
    pub group: String,
    pub prefix: String,
    pub doc_limit: Option<u64>,
    pub result_limit: Option<u64>,
    pub get_termfreqs: bool,
    pub stopwords: Vec<String>,
}

/// Optional parameters of occurrence and co-occurrence counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccurOptions {
    pub doc_limit: Option<u64>,
    pub result_limit: Option<u64>,
    pub get_termfreqs: bool,
    pub stopwords: Vec<String>,
}

impl OccurOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop after examining this many matching documents.
    pub fn doc_limit(mut self, limit: u64) -> Self {
        self.doc_limit = Some(limit);
        self
    }

    /// Return at most this many counts.
    pub fn result_limit(mut self, limit: u64) -> Self {
        self.result_limit = Some(limit);
        self
    }

    /// Also return within-document frequencies.
    pub fn get_termfreqs(mut self, get_termfreqs: bool) -> Self {
        self.get_termfreqs = get_termfreqs;
        self
    }

    /// Terms (without prefix) to leave out of the counts.
    pub fn stopwords<I, S>(mut self, stopwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stopwords = stopwords.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn into_request(self, group: String, prefix: String) -> TermOccurRequest {
        TermOccurRequest {
            group,
            prefix,
            doc_limit: self.doc_limit,
            result_limit: self.result_limit,
            get_termfreqs: self.get_termfreqs,
            stopwords: self.stopwords,
        }
    }
}

/// An additional computation requested alongside a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoRequest {
    FacetCount(FacetCountRequest),
    Occur(TermOccurRequest),
    Cooccur(TermOccurRequest),
}

/// What to sort results by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    /// Relevance weight.
    Relevance,
    /// The stored value of a field.
    Field(String),
}

impl From<&str> for OrderBy {
    fn from(field: &str) -> Self {
        OrderBy::Field(field.to_string())
    }
}

impl From<String> for OrderBy {
    fn from(field: String) -> Self {
        OrderBy::Field(field)
    }
}

/// One key of a result ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub by: OrderBy,
    /// Sort direction; the server's default is used when `None`.
    pub ascending: Option<bool>,
}

impl OrderKey {
    pub fn new(by: impl Into<OrderBy>, ascending: Option<bool>) -> Self {
        OrderKey {
            by: by.into(),
            ascending,
        }
    }

    /// Order by the value of `field`.
    pub fn field(field: impl Into<String>) -> Self {
        OrderKey::new(OrderBy::Field(field.into()), None)
    }

    /// Order by relevance.
    pub fn relevance() -> Self {
        OrderKey::new(OrderBy::Relevance, None)
    }

    pub fn ascending(mut self, ascending: bool) -> Self {
        self.ascending = Some(ascending);
        self
    }
}

impl Serialize for OrderKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.ascending.is_some() { 2 } else { 1 };
        let mut map = serializer.serialize_map(Some(len))?;
        match &self.by {
            OrderBy::Relevance => map.serialize_entry("score", "weight")?,
            OrderBy::Field(field) => map.serialize_entry("field", field)?,
        }
        if let Some(ascending) = self.ascending {
            map.serialize_entry("ascending", &ascending)?;
        }
        map.end()
    }
}
