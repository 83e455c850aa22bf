//! Lazily evaluated, paginated views of a query's results.
//!
//! A [`Searchable`] carries a query, its target, a result window and the
//! extra computations to request with it. Nothing is sent to the server
//! until data is asked for; the most recent result page is then cached and
//! reused for any later request it can answer.
//!
//! # Cache validity
//!
//! A cached page answers a request for `size` results at `offset` with a
//! given check-at-least value when:
//!
//! - `offset >= page.offset` and `offset + size <= page.offset + page.size_requested`
//! - for an exact count (`check_at_least == -1`), the page's count is exact
//! - otherwise, the page was computed with at least that check-at-least value
//!
//! # Examples
//!
//! ```no_run
//! use restpose::client::Server;
//! use restpose::query::TargetExt;
//!
//! # fn main() -> restpose::error::Result<()> {
//! let coll = Server::new("http://127.0.0.1:7777")?.collection("test_coll");
//! let page = coll.field("tag").equals("A tag").slice(10..20)?;
//! for result in page.iter() {
//!     println!("{}", result?.rank());
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{RestPoseError, Result};
use crate::query::expression::{Query, QueryNode};
use crate::query::request::{
    FacetCountRequest, FromDoc, InfoRequest, OccurOptions, OrderBy, OrderKey, SearchRequest,
};
use crate::query::results::{InfoBlock, Realiser, SearchResult, SearchResults};
use crate::query::target::SharedTarget;

/// Page size used when neither the searchable nor its target sets one.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Check-at-least value requesting an exact match count.
pub const EXACT_COUNT: i64 = -1;

/// Largest result position a window may start at.
const MAX_RANK: u64 = i64::MAX as u64;

/// Check-at-least value asking the server to count one match past `end`.
fn count_past(end: u64) -> i64 {
    i64::try_from(end)
        .ok()
        .and_then(|end| end.checked_add(1))
        .unwrap_or(i64::MAX)
}

/// A half-open range of result positions, relative to the current window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    pub fn new(start: Option<i64>, stop: Option<i64>) -> Self {
        Slice {
            start,
            stop,
            step: None,
        }
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }
}

impl From<Range<i64>> for Slice {
    fn from(range: Range<i64>) -> Self {
        Slice::new(Some(range.start), Some(range.end))
    }
}

impl From<RangeFrom<i64>> for Slice {
    fn from(range: RangeFrom<i64>) -> Self {
        Slice::new(Some(range.start), None)
    }
}

impl From<RangeTo<i64>> for Slice {
    fn from(range: RangeTo<i64>) -> Self {
        Slice::new(None, Some(range.end))
    }
}

impl From<RangeFull> for Slice {
    fn from(_: RangeFull) -> Self {
        Slice::default()
    }
}

/// A query together with a result window, ordering and info requests.
///
/// Configuration methods return new searchables; the receiver is never
/// modified and the new value starts with an empty cache.
pub struct Searchable {
    query: QueryNode,
    target: Option<SharedTarget>,
    offset: u64,
    size: Option<u64>,
    check_at_least: i64,
    fromdoc: Option<FromDoc>,
    info: Vec<InfoRequest>,
    order_by: Option<Vec<OrderKey>>,
    realiser: Option<Realiser>,
    page_size: Option<u64>,
    results: Mutex<Option<Arc<SearchResults>>>,
}

impl Searchable {
    pub fn new(query: QueryNode, target: Option<SharedTarget>) -> Self {
        Searchable {
            query,
            target,
            offset: 0,
            size: None,
            check_at_least: 0,
            fromdoc: None,
            info: Vec::new(),
            order_by: None,
            realiser: None,
            page_size: None,
            results: Mutex::new(None),
        }
    }

    /// A copy of the configuration, with no cached results.
    fn derive(&self) -> Self {
        Searchable {
            query: self.query.clone(),
            target: self.target.clone(),
            offset: self.offset,
            size: self.size,
            check_at_least: self.check_at_least,
            fromdoc: self.fromdoc.clone(),
            info: self.info.clone(),
            order_by: self.order_by.clone(),
            realiser: self.realiser.clone(),
            page_size: self.page_size,
            results: Mutex::new(None),
        }
    }

    /// The query expression.
    pub fn query(&self) -> &QueryNode {
        &self.query
    }

    pub fn target(&self) -> Option<&SharedTarget> {
        self.target.as_ref()
    }

    /// Rank of the first result in the window.
    ///
    /// Windows anchored at a document have no absolute offset.
    pub fn offset(&self) -> Result<u64> {
        if self.fromdoc.is_some() {
            return Err(RestPoseError::invalid_operation(
                "offset is not known for a window anchored at a document",
            ));
        }
        Ok(self.offset)
    }

    /// Number of results in the window, or `None` if unbounded.
    pub fn size_requested(&self) -> Option<u64> {
        self.size
    }

    /// The configured check-at-least value.
    pub fn check_at_least_value(&self) -> i64 {
        self.check_at_least
    }

    /// The most recently fetched page, if any.
    pub fn cached_results(&self) -> Option<Arc<SearchResults>> {
        self.results.lock().clone()
    }

    fn page_size(&self) -> u64 {
        self.page_size
            .or_else(|| self.target.as_ref().map(|target| target.page_size()))
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    fn effective_realiser(&self) -> Option<Realiser> {
        self.realiser
            .clone()
            .or_else(|| self.target.as_ref().and_then(|target| target.realiser()))
    }

    /// Bind to `target`.
    pub fn with_target(&self, target: SharedTarget) -> Searchable {
        let mut result = self.derive();
        result.target = Some(target);
        result
    }

    /// Use `realiser` for result objects instead of the target's realiser.
    pub fn with_realiser(&self, realiser: Realiser) -> Searchable {
        let mut result = self.derive();
        result.realiser = Some(realiser);
        result
    }

    /// Fetch `page_size` results at a time when the window is unbounded.
    pub fn with_page_size(&self, page_size: u64) -> Result<Searchable> {
        if page_size == 0 {
            return Err(RestPoseError::invalid_argument("page size must be positive"));
        }
        let mut result = self.derive();
        result.page_size = Some(page_size);
        Ok(result)
    }

    /// Restrict the window, relative to the current one.
    ///
    /// Only a step of 1 is supported, and negative bounds are rejected.
    /// Slicing composes: taking `[a, b)` and then `[c, d)` of that gives
    /// `[a + c, min(a + d, b))`.
    pub fn slice(&self, slice: impl Into<Slice>) -> Result<Searchable> {
        let slice = slice.into();
        if let Some(step) = slice.step {
            if step != 1 {
                return Err(RestPoseError::invalid_slice(format!(
                    "only a step size of 1 is supported, got {step}"
                )));
            }
        }
        let start = slice.start.unwrap_or(0);
        if start < 0 || slice.stop.is_some_and(|stop| stop < 0) {
            return Err(RestPoseError::out_of_range(
                "negative indexing is not supported",
            ));
        }
        let start = start as u64;
        let stop = slice.stop.map(|stop| stop as u64);

        let mut result = self.derive();
        match result.fromdoc.as_mut() {
            Some(fromdoc) => {
                fromdoc.from = fromdoc
                    .from
                    .checked_add(start as i64)
                    .ok_or_else(|| RestPoseError::out_of_range("slice start overflows the window"))?;
            }
            None => {
                result.offset = self
                    .offset
                    .checked_add(start)
                    .filter(|offset| *offset <= MAX_RANK)
                    .ok_or_else(|| RestPoseError::out_of_range("slice start overflows the window"))?;
            }
        }
        result.size = match (self.size, stop) {
            (Some(size), None) => Some(size.saturating_sub(start)),
            (None, None) => None,
            (Some(size), Some(stop)) => Some(size.min(stop).saturating_sub(start)),
            (None, Some(stop)) => Some(stop.saturating_sub(start)),
        };
        Ok(result)
    }

    /// Ask the server to examine at least this many matches, for more
    /// accurate counts and info. `-1` examines every match.
    pub fn check_at_least(&self, check_at_least: i64) -> Result<Searchable> {
        if check_at_least < EXACT_COUNT {
            return Err(RestPoseError::invalid_argument(format!(
                "check_at_least must be -1 or greater, got {check_at_least}"
            )));
        }
        let mut result = self.derive();
        result.check_at_least = check_at_least;
        Ok(result)
    }

    /// Append an ordering key.
    pub fn order_by(&self, by: impl Into<OrderBy>, ascending: Option<bool>) -> Searchable {
        let mut result = self.derive();
        result
            .order_by
            .get_or_insert_with(Vec::new)
            .push(OrderKey::new(by, ascending));
        result
    }

    /// Replace the ordering with `keys`.
    pub fn order_by_multiple(&self, keys: impl IntoIterator<Item = OrderKey>) -> Searchable {
        let mut result = self.derive();
        result.order_by = Some(keys.into_iter().collect());
        result
    }

    /// Anchor the window at a document.
    ///
    /// Results start `offset` positions from the document with the given
    /// type and id (negative offsets start before it), and `size` results
    /// are returned. `pagesize` is a hint for how far the server should
    /// look for the document.
    ///
    /// Fails if the window has already been sliced.
    pub fn fromdoc(
        &self,
        doc_type: impl Into<String>,
        doc_id: impl Into<String>,
        offset: i64,
        size: u64,
        pagesize: Option<u64>,
    ) -> Result<Searchable> {
        if self.offset != 0 || self.size.is_some() {
            return Err(RestPoseError::invalid_operation(
                "fromdoc can not be used with a sliced result set",
            ));
        }
        let mut result = self.derive();
        result.fromdoc = Some(FromDoc {
            doc_type: doc_type.into(),
            id: doc_id.into(),
            from: offset,
            pagesize,
        });
        result.size = Some(size);
        Ok(result)
    }

    /// Request counts of the values of `field` in matching documents.
    pub fn calc_facet_count(
        &self,
        field: impl Into<String>,
        doc_limit: Option<u64>,
        result_limit: Option<u64>,
    ) -> Searchable {
        let mut result = self.derive();
        result.info.push(InfoRequest::FacetCount(FacetCountRequest {
            field: field.into(),
            doc_limit,
            result_limit,
        }));
        result
    }

    /// Request occurrence counts of terms in `group` starting with `prefix`.
    pub fn calc_occur(
        &self,
        group: impl Into<String>,
        prefix: impl Into<String>,
        options: OccurOptions,
    ) -> Searchable {
        let mut result = self.derive();
        result.info.push(InfoRequest::Occur(
            options.into_request(group.into(), prefix.into()),
        ));
        result
    }

    /// Request co-occurrence counts of term pairs in `group`.
    pub fn calc_cooccur(
        &self,
        group: impl Into<String>,
        prefix: impl Into<String>,
        options: OccurOptions,
    ) -> Searchable {
        let mut result = self.derive();
        result.info.push(InfoRequest::Cooccur(
            options.into_request(group.into(), prefix.into()),
        ));
        result
    }

    fn request_for(&self, offset: u64, size: Option<u64>, check_at_least: i64) -> SearchRequest {
        let mut request = SearchRequest::new(self.query.clone());
        request.from = (offset != 0).then_some(offset);
        request.size = size;
        request.check_at_least = (check_at_least != 0).then_some(check_at_least);
        request.fromdoc = self.fromdoc.clone();
        request.info = (!self.info.is_empty()).then(|| self.info.clone());
        request.order_by = self.order_by.clone();
        request
    }

    /// The request that [`search`](Self::search) would send.
    pub fn build_request(&self) -> SearchRequest {
        self.request_for(self.offset, self.size, self.check_at_least)
    }

    fn run(&self, request: &SearchRequest) -> Result<Arc<SearchResults>> {
        let target = self.target.as_ref().ok_or(RestPoseError::MissingTarget)?;
        debug!(
            from = request.offset(),
            size = ?request.size,
            check_at_least = request.check_at_least_or_default(),
            "issuing search request"
        );
        let raw = target.search(request)?;
        let page = SearchResults::new(raw, self.effective_realiser());
        *self.results.lock() = Some(Arc::clone(&page));
        Ok(page)
    }

    /// Perform the search as configured, replacing any cached page.
    pub fn search(&self) -> Result<Arc<SearchResults>> {
        self.run(&self.build_request())
    }

    fn cache_satisfies(
        page: &SearchResults,
        offset: u64,
        size: u64,
        check_at_least: i64,
    ) -> bool {
        if offset < page.offset()
            || offset.saturating_add(size)
                > page.offset().saturating_add(page.size_requested())
        {
            return false;
        }
        if check_at_least == EXACT_COUNT {
            return page.estimate_is_exact();
        }
        page.check_at_least() == EXACT_COUNT || page.check_at_least() >= check_at_least
    }

    /// Make sure the cache holds a page answering the given request.
    fn ensure_results(
        &self,
        offset: u64,
        size: Option<u64>,
        check_at_least: i64,
    ) -> Result<Arc<SearchResults>> {
        if self.target.is_none() {
            return Err(RestPoseError::MissingTarget);
        }
        let size = size.unwrap_or_else(|| self.page_size());
        if let Some(page) = self.cached_results() {
            if Self::cache_satisfies(&page, offset, size, check_at_least) {
                trace!(offset, size, check_at_least, "using cached results");
                return Ok(page);
            }
        }
        // Counts are only useful past the end of the requested window.
        let end = offset.saturating_add(size);
        let check_at_least = if check_at_least >= 0 && check_at_least as u64 <= end {
            count_past(end)
        } else {
            check_at_least
        };
        self.run(&self.request_for(offset, Some(size), check_at_least))
    }

    /// Any page with this searchable's statistics.
    fn ensure_stats(&self) -> Result<Arc<SearchResults>> {
        if let Some(page) = self.cached_results() {
            return Ok(page);
        }
        self.ensure_results(self.offset, self.size, self.check_at_least)
    }

    fn ensure_results_contain(&self, rank: u64) -> Result<Arc<SearchResults>> {
        if rank < self.offset {
            return Err(RestPoseError::out_of_range(format!(
                "rank {rank} before start of window"
            )));
        }
        if let Some(size) = self.size {
            if rank >= self.offset.saturating_add(size) {
                return Err(RestPoseError::out_of_range(format!(
                    "rank {rank} after end of window"
                )));
            }
        }
        if let Some(page) = self.cached_results() {
            if page.covers_rank(rank) {
                trace!(rank, "rank covered by cached results");
                return Ok(page);
            }
        }
        match self.size {
            Some(size) => self.ensure_results(self.offset, Some(size), self.check_at_least),
            None => {
                let page_size = self.page_size();
                let page_num = (rank - self.offset) / page_size;
                self.ensure_results(
                    self.offset + page_num * page_size,
                    Some(page_size),
                    self.check_at_least,
                )
            }
        }
    }

    /// Number of documents searched.
    pub fn total_docs(&self) -> Result<u64> {
        Ok(self.ensure_stats()?.total_docs())
    }

    pub fn matches_lower_bound(&self) -> Result<u64> {
        Ok(self.ensure_stats()?.matches_lower_bound())
    }

    pub fn matches_estimated(&self) -> Result<u64> {
        Ok(self.ensure_stats()?.matches_estimated())
    }

    pub fn matches_upper_bound(&self) -> Result<u64> {
        Ok(self.ensure_stats()?.matches_upper_bound())
    }

    /// True if the match count is known exactly.
    pub fn estimate_is_exact(&self) -> Result<bool> {
        Ok(self.ensure_stats()?.estimate_is_exact())
    }

    /// Info blocks requested with [`calc_facet_count`](Self::calc_facet_count) etc.
    pub fn info(&self) -> Result<Vec<Value>> {
        Ok(self.ensure_stats()?.info().to_vec())
    }

    /// Info blocks parsed into their known shapes.
    pub fn info_blocks(&self) -> Result<Vec<InfoBlock>> {
        Ok(self.ensure_stats()?.info_blocks())
    }

    /// True if there are matching results beyond the end of the window.
    ///
    /// Always false for an unbounded window.
    pub fn has_more(&self) -> Result<bool> {
        let Some(size) = self.size else {
            return Ok(false);
        };
        let end = self.offset.saturating_add(size);
        let page = self.ensure_stats()?;
        if page.matches_lower_bound() > end {
            return Ok(true);
        }
        if page.matches_upper_bound() <= end {
            return Ok(false);
        }
        let page = self.ensure_results(self.offset, Some(size), count_past(end))?;
        Ok(page.matches_lower_bound() > end)
    }

    /// Exact number of results in the window.
    ///
    /// May force the server to count every match.
    pub fn len(&self) -> Result<u64> {
        let page = match self.cached_results() {
            Some(page) if page.estimate_is_exact() => page,
            _ => self.ensure_results(self.offset, self.size, EXACT_COUNT)?,
        };
        let total = page.matches_estimated();
        if total < self.offset {
            return Ok(0);
        }
        let available = total - self.offset;
        Ok(self.size.map_or(available, |size| available.min(size)))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// The result at position `index` within the window.
    pub fn get(&self, index: i64) -> Result<SearchResult> {
        if index < 0 {
            return Err(RestPoseError::out_of_range(
                "negative indexing is not supported",
            ));
        }
        let index = index as u64;
        if let Some(size) = self.size {
            if index >= size {
                return Err(RestPoseError::out_of_range(format!(
                    "index {index} beyond window of {size} results"
                )));
            }
        }
        if self.fromdoc.is_some() {
            // Every page of an anchored window holds the same items.
            let page = match self.cached_results() {
                Some(page) => page,
                None => self.ensure_results(0, self.size, self.check_at_least)?,
            };
            let index = usize::try_from(index)
                .map_err(|_| RestPoseError::out_of_range(format!("index {index} too large")))?;
            return page.item(index);
        }
        let rank = self.offset.checked_add(index).ok_or_else(|| {
            RestPoseError::out_of_range(format!("index {index} too large"))
        })?;
        self.ensure_results_contain(rank)?.at_rank(rank)
    }

    /// Iterate over the results in the window, fetching pages as needed.
    pub fn iter(&self) -> SearchableIter<'_> {
        SearchableIter {
            searchable: self,
            index: 0,
            done: false,
        }
    }
}

impl Clone for Searchable {
    fn clone(&self) -> Self {
        self.derive()
    }
}

impl From<&Query> for Searchable {
    fn from(query: &Query) -> Self {
        Searchable::new(query.node().clone(), query.target().cloned())
    }
}

impl From<Query> for Searchable {
    fn from(query: Query) -> Self {
        Searchable::from(&query)
    }
}

impl fmt::Debug for Searchable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Searchable")
            .field("request", &self.build_request())
            .field("has_target", &self.target.is_some())
            .field("has_realiser", &self.realiser.is_some())
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl fmt::Display for Searchable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(&self.build_request()) {
            Ok(json) => write!(f, "<Query({json})>"),
            Err(_) => write!(f, "<Query>"),
        }
    }
}

/// Iterator over the results of a [`Searchable`].
///
/// Ends at the first out-of-range position. Any other error is yielded
/// once, after which the iterator is exhausted.
pub struct SearchableIter<'a> {
    searchable: &'a Searchable,
    index: i64,
    done: bool,
}

impl Iterator for SearchableIter<'_> {
    type Item = Result<SearchResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.searchable.get(self.index) {
            Ok(result) => {
                self.index += 1;
                Some(Ok(result))
            }
            Err(err) if err.is_out_of_range() => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<'a> IntoIterator for &'a Searchable {
    type Item = Result<SearchResult>;
    type IntoIter = SearchableIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
