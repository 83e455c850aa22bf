//! # RestPose
//!
//! A client library for the RestPose search server.
//!
//! ## Features
//!
//! - Composable query expressions with operator overloading
//! - Lazily evaluated, paginated result views with caching
//! - Realisation of application objects from search results
//! - Checkpoints for tracking indexing progress
//! - Collections, document types and taxonomies over HTTP

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod query;

pub mod prelude {
    pub use crate::client::{CheckPoint, Collection, DocumentType, Server, WaitOptions};
    pub use crate::config::{ClientConfig, WaitMode};
    pub use crate::error::{RestPoseError, Result};
    pub use crate::query::{
        OrderKey, Query, QueryTarget, SearchResult, SearchResults, Searchable, TargetExt,
        any_field, field,
    };
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
