//! Targets that queries are run against.
//!
//! Anything that can execute a [`SearchRequest`] implements [`QueryTarget`].
//! The client's collections and document types do so by posting to the
//! server; tests use in-memory targets.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use crate::error::Result;
use crate::query::expression::Query;
use crate::query::field::FieldQuerySource;
use crate::query::request::SearchRequest;
use crate::query::results::{RawSearchResults, Realiser, SearchResults};
use crate::query::searchable::{DEFAULT_PAGE_SIZE, Searchable};

/// Something a search can be performed against.
pub trait QueryTarget: Send + Sync + fmt::Debug {
    /// Execute a search and return the server's raw result page.
    fn search(&self, request: &SearchRequest) -> Result<RawSearchResults>;

    /// Realiser applied to results from this target, if any.
    fn realiser(&self) -> Option<Realiser> {
        None
    }

    /// Number of results fetched per page when no size has been requested.
    fn page_size(&self) -> u64 {
        DEFAULT_PAGE_SIZE
    }
}

/// A shared handle to a target.
pub type SharedTarget = Arc<dyn QueryTarget>;

/// Targets are compared by identity, not by value.
pub(crate) fn same_target(a: &SharedTarget, b: &SharedTarget) -> bool {
    ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Query builders bound to a target.
pub trait TargetExt {
    /// Queries on the field `name`, bound to this target.
    fn field(&self, name: &str) -> FieldQuerySource;

    /// Queries across every field, bound to this target.
    fn any_field(&self) -> FieldQuerySource;

    /// A query matching every document in this target.
    fn all(&self) -> Query;

    /// A query matching no documents in this target.
    fn none(&self) -> Query;

    /// Bind `query` to this target.
    fn find(&self, query: &Query) -> Query;

    /// Run `searchable` against this target, ignoring any cached page.
    fn search_with(&self, searchable: &Searchable) -> Result<Arc<SearchResults>>;
}

impl<T: QueryTarget + 'static> TargetExt for Arc<T> {
    fn field(&self, name: &str) -> FieldQuerySource {
        FieldQuerySource::new(Some(name.to_string()), Some(self.clone()))
    }

    fn any_field(&self) -> FieldQuerySource {
        FieldQuerySource::new(None, Some(self.clone()))
    }

    fn all(&self) -> Query {
        Query::all().with_target(self.clone())
    }

    fn none(&self) -> Query {
        Query::none().with_target(self.clone())
    }

    fn find(&self, query: &Query) -> Query {
        query.with_target(self.clone())
    }

    fn search_with(&self, searchable: &Searchable) -> Result<Arc<SearchResults>> {
        searchable.with_target(self.clone()).search()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RestPoseError;

    #[derive(Debug, Default)]
    struct EmptyTarget;

    impl QueryTarget for EmptyTarget {
        fn search(&self, _request: &SearchRequest) -> Result<RawSearchResults> {
            Ok(RawSearchResults::default())
        }
    }

    #[test]
    fn test_bound_queries_share_target() {
        let target = Arc::new(EmptyTarget);
        let left = target.field("tag").equals("a");
        let right = target.any_field().exists();
        assert!(left.and(right).unwrap().target().is_some());
    }

    #[test]
    fn test_different_targets_are_inconsistent() {
        let first = Arc::new(EmptyTarget);
        let second = Arc::new(EmptyTarget);
        let err = first.all().or(second.all()).unwrap_err();
        assert!(matches!(err, RestPoseError::InconsistentTarget));
    }

    #[test]
    fn test_unbound_operand_adopts_target() {
        let target = Arc::new(EmptyTarget);
        let query = crate::query::field::field("tag")
            .equals("a")
            .and(target.all())
            .unwrap();
        let shared: SharedTarget = target.clone();
        assert!(same_target(query.target().unwrap(), &shared));
    }

    #[test]
    fn test_search_with_binds_target() {
        let target = Arc::new(EmptyTarget);
        let searchable = Query::all().searchable();
        let results = target.search_with(&searchable).unwrap();
        assert_eq!(results.total_docs(), 0);
    }
}
