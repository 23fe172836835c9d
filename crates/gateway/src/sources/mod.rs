//! Upstream source connectors and the search aggregation pipeline.
//!
//! # Architecture
//!
//! - One [`SourceConnector`] per upstream marketplace (Alibaba,
//!   Made-in-China, CJ Dropshipping, Shopify's global catalog)
//! - Bearer tokens flow through a two-tier [`credentials::CredentialCache`]
//!   shared by every connector
//! - [`retry`] wraps each connector call with exponential backoff; repeated
//!   failure degrades that source to an empty contribution
//! - [`normalize`] maps each connector's raw response shape into the shared
//!   [`NormalizedProduct`](sourcing_hub_core::NormalizedProduct) model
//! - [`aggregator::SourcingService`] fans a query out to the selected
//!   connectors concurrently and assembles the per-source result
//!
//! # Failure policy
//!
//! Degrade, don't fail: everything below the aggregator is absorbed into an
//! empty per-source contribution. Only caller mistakes (no sources
//! selected) surface as errors, and those are rejected before any I/O.

pub mod aggregator;
pub mod alibaba;
pub mod cj_dropshipping;
pub mod credentials;
pub mod made_in_china;
pub mod normalize;
pub mod retry;
pub mod shopify_catalog;

pub use aggregator::{SearchRequestError, SourcingService};
pub use credentials::{CachedCredential, CredentialCache};
pub use normalize::RawProductBatch;
pub use retry::{RetryPolicy, SourceOutcome};

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;

use sourcing_hub_core::SourceId;

/// Errors raised at or below a source connector.
///
/// None of these reach the aggregator's caller - the retry executor absorbs
/// them into a degraded (empty) contribution for the failing source.
#[derive(Debug)]
pub enum SourceError {
    /// HTTP request failed, including connect and read timeouts.
    Http(reqwest::Error),

    /// The source's credentials are not configured.
    Configuration { source: SourceId },

    /// Token exchange with the source's auth endpoint failed.
    Authentication { source: SourceId, message: String },

    /// The upstream answered with a non-success status or an error payload.
    Source { source: SourceId, message: String },

    /// The upstream response could not be decoded.
    Parse { source: SourceId, message: String },
}

// `SourceError` is hand-implemented rather than `#[derive(thiserror::Error)]`:
// the data-carrying `source` fields collide with thiserror's convention of
// treating a field named `source` as the error's `Error::source()` cause
// (which would require `SourceId: std::error::Error`). These impls reproduce
// exactly what the derive would otherwise generate.
impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => write!(f, "HTTP error: {err}"),
            Self::Configuration { source } => {
                write!(f, "{source} credentials are not configured")
            }
            Self::Authentication { source, message } => {
                write!(f, "authentication failed for {source}: {message}")
            }
            Self::Source { source, message } => {
                write!(f, "{source} returned an error: {message}")
            }
            Self::Parse { source, message } => {
                write!(f, "failed to parse {source} response: {message}")
            }
        }
    }
}

impl StdError for SourceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

/// One upstream supplier marketplace or catalog API.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Which source this connector speaks to.
    fn source(&self) -> SourceId;

    /// Run a product search against the upstream.
    ///
    /// Blank queries and missing credentials short-circuit to an empty
    /// batch without any network call. Upstream failures surface as
    /// [`SourceError`] for the retry executor to absorb; they are never
    /// propagated raw to the aggregator's caller.
    async fn search(&self, query: &str, limit: u32) -> Result<RawProductBatch, SourceError>;

    /// Whether this source's authentication currently succeeds.
    async fn health_check(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_display() {
        let err = SourceError::Configuration {
            source: SourceId::Alibaba,
        };
        assert_eq!(err.to_string(), "alibaba credentials are not configured");

        let err = SourceError::Source {
            source: SourceId::CjDropshipping,
            message: "quota exceeded".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cj-dropshipping returned an error: quota exceeded"
        );

        let err = SourceError::Authentication {
            source: SourceId::MadeInChina,
            message: "invalid client credentials".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "authentication failed for made-in-china: invalid client credentials"
        );
    }
}
