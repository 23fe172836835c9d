//! Identifiers for the upstream supplier sources the gateway can query.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One upstream supplier marketplace or catalog API.
///
/// The wire form is the kebab-case name (`"alibaba"`, `"made-in-china"`,
/// `"cj-dropshipping"`, `"shopify-catalog"`), used both in request source
/// selections and as the per-source key in aggregated results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum SourceId {
    Alibaba,
    MadeInChina,
    CjDropshipping,
    ShopifyCatalog,
}

impl SourceId {
    /// Every source the gateway knows about.
    pub const ALL: [Self; 4] = [
        Self::Alibaba,
        Self::MadeInChina,
        Self::CjDropshipping,
        Self::ShopifyCatalog,
    ];

    /// The stable wire name for this source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alibaba => "alibaba",
            Self::MadeInChina => "made-in-china",
            Self::CjDropshipping => "cj-dropshipping",
            Self::ShopifyCatalog => "shopify-catalog",
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source name that did not match any known source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source: {0}")]
pub struct SourceIdParseError(pub String);

impl std::str::FromStr for SourceId {
    type Err = SourceIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alibaba" => Ok(Self::Alibaba),
            "made-in-china" => Ok(Self::MadeInChina),
            "cj-dropshipping" => Ok(Self::CjDropshipping),
            "shopify-catalog" => Ok(Self::ShopifyCatalog),
            other => Err(SourceIdParseError(other.to_string())),
        }
    }
}
