//! Query construction and lazily evaluated search results.
//!
//! Queries are built from [`field`] and [`any_field`] sources (or from a
//! target's bound sources, see [`TargetExt`]), combined with operators, and
//! turned into a [`Searchable`] to fetch results.

pub mod expression;
pub mod field;
pub mod request;
pub mod results;
pub mod searchable;
pub mod target;

pub use expression::{CombineOp, FieldOp, MetaKind, Query, QueryNode, QueryOperand};
pub use field::{FieldQuerySource, LonLat, ParseOp, TextOp, any_field, field};
pub use request::{
    FacetCountRequest, FromDoc, InfoRequest, OccurOptions, OrderBy, OrderKey, SearchRequest,
    TermOccurRequest,
};
pub use results::{
    FacetCountInfo, FieldData, InfoBlock, RawSearchResults, RealisedObject, Realiser,
    SearchResult, SearchResults, TermOccurInfo, realiser,
};
pub use searchable::{DEFAULT_PAGE_SIZE, EXACT_COUNT, Searchable, SearchableIter, Slice};
pub use target::{QueryTarget, SharedTarget, TargetExt};
