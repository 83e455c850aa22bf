//! A page of search results returned by the server.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{RestPoseError, Result};

/// Stored field values of a result, by field name.
pub type FieldData = BTreeMap<String, Vec<Value>>;

/// An application object associated with a result.
pub type RealisedObject = Arc<dyn Any + Send + Sync>;

/// Produces the objects associated with results.
///
/// Called with the results that must be given an object and the results
/// for which an object would be useful (for bulk lookups). It assigns
/// objects with [`SearchResult::set_object`].
pub type Realiser = Arc<dyn Fn(&[SearchResult], &[SearchResult]) -> Result<()> + Send + Sync>;

/// Wrap a closure as a [`Realiser`].
pub fn realiser<F>(f: F) -> Realiser
where
    F: Fn(&[SearchResult], &[SearchResult]) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A result page exactly as returned by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSearchResults {
    pub total_docs: u64,
    pub from: u64,
    pub size_requested: u64,
    pub check_at_least: i64,
    pub matches_lower_bound: u64,
    pub matches_estimated: u64,
    pub matches_upper_bound: u64,
    pub items: Vec<Map<String, Value>>,
    pub info: Vec<Value>,
}

struct ResultItem {
    rank: u64,
    data: FieldData,
    object: Mutex<Option<RealisedObject>>,
}

fn field_data(raw: Map<String, Value>) -> FieldData {
    raw.into_iter()
        .map(|(name, value)| match value {
            Value::Array(values) => (name, values),
            other => (name, vec![other]),
        })
        .collect()
}

/// One page of results, with match count estimates.
///
/// Pages are immutable once built, apart from the objects realised for
/// their items.
pub struct SearchResults {
    total_docs: u64,
    offset: u64,
    size_requested: u64,
    check_at_least: i64,
    matches_lower_bound: u64,
    matches_estimated: u64,
    matches_upper_bound: u64,
    items: Vec<ResultItem>,
    info: Vec<Value>,
    realiser: Option<Realiser>,
}

impl SearchResults {
    /// Build a page from the server's response.
    pub fn new(raw: RawSearchResults, realiser: Option<Realiser>) -> Arc<Self> {
        let offset = raw.from;
        let items = raw
            .items
            .into_iter()
            .enumerate()
            .map(|(index, data)| ResultItem {
                rank: offset.saturating_add(index as u64),
                data: field_data(data),
                object: Mutex::new(None),
            })
            .collect();
        Arc::new(SearchResults {
            total_docs: raw.total_docs,
            offset,
            size_requested: raw.size_requested,
            check_at_least: raw.check_at_least,
            matches_lower_bound: raw.matches_lower_bound,
            matches_estimated: raw.matches_estimated,
            matches_upper_bound: raw.matches_upper_bound,
            items,
            info: raw.info,
            realiser,
        })
    }

    /// Number of documents searched.
    pub fn total_docs(&self) -> u64 {
        self.total_docs
    }

    /// Rank of the first item.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size_requested(&self) -> u64 {
        self.size_requested
    }

    pub fn check_at_least(&self) -> i64 {
        self.check_at_least
    }

    pub fn matches_lower_bound(&self) -> u64 {
        self.matches_lower_bound
    }

    pub fn matches_estimated(&self) -> u64 {
        self.matches_estimated
    }

    pub fn matches_upper_bound(&self) -> u64 {
        self.matches_upper_bound
    }

    /// True if the match count is known exactly.
    pub fn estimate_is_exact(&self) -> bool {
        self.matches_lower_bound == self.matches_upper_bound
    }

    /// Number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Info blocks, in the order they were requested.
    pub fn info(&self) -> &[Value] {
        &self.info
    }

    /// Info blocks parsed into their known shapes.
    pub fn info_blocks(&self) -> Vec<InfoBlock> {
        self.info.iter().map(InfoBlock::from_value).collect()
    }

    /// True if `rank` lies inside the window this page was requested for.
    pub fn covers_rank(&self, rank: u64) -> bool {
        rank >= self.offset && rank < self.offset.saturating_add(self.size_requested)
    }

    /// The item at position `index` on this page.
    pub fn item(self: &Arc<Self>, index: usize) -> Result<SearchResult> {
        if index >= self.items.len() {
            return Err(RestPoseError::out_of_range(format!(
                "index {index} beyond {} items on page",
                self.items.len()
            )));
        }
        Ok(SearchResult {
            page: Arc::clone(self),
            index,
        })
    }

    /// The item with the given absolute rank.
    pub fn at_rank(self: &Arc<Self>, rank: u64) -> Result<SearchResult> {
        if rank < self.offset {
            return Err(RestPoseError::out_of_range(format!(
                "rank {rank} before page offset {}",
                self.offset
            )));
        }
        let index = usize::try_from(rank - self.offset)
            .map_err(|_| RestPoseError::out_of_range(format!("rank {rank} too large")))?;
        self.item(index)
    }

    /// Handles for every item on this page.
    pub fn items(self: &Arc<Self>) -> Vec<SearchResult> {
        (0..self.items.len())
            .map(|index| SearchResult {
                page: Arc::clone(self),
                index,
            })
            .collect()
    }

    fn realise(self: &Arc<Self>, index: usize) -> Result<()> {
        let Some(realiser) = self.realiser.clone() else {
            return Err(RestPoseError::realisation("no realiser set for results"));
        };
        let needed = vec![SearchResult {
            page: Arc::clone(self),
            index,
        }];
        let wanted: Vec<SearchResult> = self
            .items()
            .into_iter()
            .filter(|result| !result.has_object())
            .collect();
        realiser(&needed, &wanted)
    }
}

impl fmt::Debug for SearchResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchResults")
            .field("total_docs", &self.total_docs)
            .field("offset", &self.offset)
            .field("size_requested", &self.size_requested)
            .field("check_at_least", &self.check_at_least)
            .field("matches_lower_bound", &self.matches_lower_bound)
            .field("matches_estimated", &self.matches_estimated)
            .field("matches_upper_bound", &self.matches_upper_bound)
            .field("items", &self.items.len())
            .field("info", &self.info)
            .finish()
    }
}

impl fmt::Display for SearchResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SearchResults(offset={}, size_requested={}, check_at_least={}, \
             matches_lower_bound={}, matches_estimated={}, matches_upper_bound={}, items=[",
            self.offset,
            self.size_requested,
            self.check_at_least,
            self.matches_lower_bound,
            self.matches_estimated,
            self.matches_upper_bound,
        )?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "SearchResult(rank={}, data={:?})", item.rank, item.data)?;
        }
        write!(f, "]")?;
        if !self.info.is_empty() {
            write!(f, ", info={}", Value::Array(self.info.clone()))?;
        }
        write!(f, ")")
    }
}

/// A handle on one result item.
///
/// Handles keep their page alive; cloning one is cheap.
#[derive(Clone)]
pub struct SearchResult {
    page: Arc<SearchResults>,
    index: usize,
}

impl SearchResult {
    fn item(&self) -> &ResultItem {
        &self.page.items[self.index]
    }

    /// Absolute position of this result in the full result set.
    pub fn rank(&self) -> u64 {
        self.item().rank
    }

    /// Stored field values.
    pub fn data(&self) -> &FieldData {
        &self.item().data
    }

    /// The values stored for `field`, if any.
    pub fn field(&self, field: &str) -> Option<&[Value]> {
        self.item().data.get(field).map(Vec::as_slice)
    }

    /// True if an object has been associated with this result.
    pub fn has_object(&self) -> bool {
        self.item().object.lock().is_some()
    }

    /// Associate an object with this result.
    pub fn set_object(&self, object: RealisedObject) {
        *self.item().object.lock() = Some(object);
    }

    /// The object associated with this result, realising it if needed.
    pub fn object(&self) -> Result<RealisedObject> {
        if let Some(object) = self.item().object.lock().clone() {
            return Ok(object);
        }
        self.page.realise(self.index)?;
        self.item().object.lock().clone().ok_or_else(|| {
            RestPoseError::realisation(format!("no object realised for rank {}", self.rank()))
        })
    }

    /// The associated object, downcast to `T`.
    pub fn object_as<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.object()?.downcast::<T>().map_err(|_| {
            RestPoseError::realisation(format!(
                "object for rank {} is not a {}",
                self.rank(),
                std::any::type_name::<T>()
            ))
        })
    }
}

impl fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchResult")
            .field("rank", &self.rank())
            .field("data", self.data())
            .finish()
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SearchResult(rank={}, data={:?})", self.rank(), self.data())
    }
}

/// Facet counts for one field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FacetCountInfo {
    pub fieldname: String,
    #[serde(default)]
    pub counts: Vec<Vec<Value>>,
    #[serde(default)]
    pub docs_seen: u64,
    #[serde(default)]
    pub values_seen: u64,
}

/// Term occurrence or co-occurrence counts within a group.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TermOccurInfo {
    pub group: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub counts: Vec<Vec<Value>>,
    #[serde(default)]
    pub docs_seen: u64,
    #[serde(default)]
    pub terms_seen: u64,
}

/// An info block returned alongside a page of results.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoBlock {
    FacetCount(FacetCountInfo),
    Occur(TermOccurInfo),
    Cooccur(TermOccurInfo),
    /// A block of a type this client does not know, or a malformed one.
    Other(Value),
}

impl InfoBlock {
    pub fn from_value(value: &Value) -> Self {
        let parsed = match value.get("type").and_then(Value::as_str) {
            Some("facet_count") => serde_json::from_value(value.clone())
                .ok()
                .map(InfoBlock::FacetCount),
            Some("occur") => serde_json::from_value(value.clone())
                .ok()
                .map(InfoBlock::Occur),
            Some("cooccur") => serde_json::from_value(value.clone())
                .ok()
                .map(InfoBlock::Cooccur),
            _ => None,
        };
        parsed.unwrap_or_else(|| InfoBlock::Other(value.clone()))
    }
}
