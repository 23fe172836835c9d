//! Search request and aggregated result shapes.
//!
//! Both sides of the aggregator's contract are ephemeral: requests arrive,
//! results are assembled per call, nothing here is ever persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::product::NormalizedProduct;
use super::source::SourceId;

/// One logical search as received from the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Free-text query; blank queries short-circuit to an empty result.
    pub query: String,
    /// Which sources to fan out to.
    pub sources: Vec<SourceId>,
    /// Per-search result limit; the gateway default applies when absent.
    pub limit: Option<u32>,
}

/// What one source contributed to an aggregated search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceContribution {
    /// Products in the upstream's own ordering.
    pub products: Vec<NormalizedProduct>,
    /// True when the source exhausted its retries and contributed nothing.
    /// Callers render a degraded source exactly like an empty one, but the
    /// distinction is preserved so "source failed" and "source genuinely
    /// found nothing" remain tellable apart.
    pub degraded: bool,
}

impl SourceContribution {
    /// A successful contribution carrying `products`.
    #[must_use]
    pub const fn from_products(products: Vec<NormalizedProduct>) -> Self {
        Self {
            products,
            degraded: false,
        }
    }

    /// The empty contribution recorded after a source's retries ran out.
    #[must_use]
    pub const fn degraded() -> Self {
        Self {
            products: Vec::new(),
            degraded: true,
        }
    }
}

/// The combined outcome of one multi-source search.
///
/// Every selected source appears as a key - a failed source maps to an
/// empty contribution rather than going missing from the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedSearchResult {
    /// The (trimmed) query that produced this result.
    pub query: String,
    /// Per-source contributions, keyed by wire name.
    pub results: BTreeMap<SourceId, SourceContribution>,
    /// Wall-clock duration of the whole fan-out, in milliseconds.
    pub elapsed_ms: u64,
}

impl AggregatedSearchResult {
    /// Total number of products across every source.
    #[must_use]
    pub fn total_products(&self) -> usize {
        self.results.values().map(|c| c.products.len()).sum()
    }
}
