//! Core types for Sourcing Hub.
//!
//! This module provides the domain vocabulary shared by the gateway and its
//! callers: which sources exist, what a normalized product looks like, and
//! how an aggregated search result is shaped.

pub mod product;
pub mod search;
pub mod source;

pub use product::NormalizedProduct;
pub use search::{AggregatedSearchResult, SearchRequest, SourceContribution};
pub use source::{SourceId, SourceIdParseError};
