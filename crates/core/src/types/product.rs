//! The shared product model produced by the result normalizer.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::source::SourceId;

/// A product discovered on an upstream source, in the shared shape.
///
/// Only `id`, `title`, and `source` are guaranteed; everything else is
/// best-effort from whatever the upstream exposed. Instances are immutable
/// value objects - callers filter, sort, and display them, never mutate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedProduct {
    /// Identifier unique within `source`; synthesized when the upstream
    /// omits one.
    pub id: String,
    /// Non-empty display title (falls back to a placeholder).
    pub title: String,
    /// Long-form description, when the source provides one.
    pub description: Option<String>,
    /// Unit price, strictly positive. `None` when the source omitted a
    /// price or it failed to parse - never zero-as-unknown.
    pub price: Option<Decimal>,
    /// ISO 4217 currency code; `"USD"` when the source does not say.
    pub currency: String,
    /// Primary product image.
    pub image_url: Option<String>,
    /// Supplier or vendor name.
    pub supplier_name: Option<String>,
    /// Link to the product on the upstream marketplace.
    pub source_url: Option<String>,
    /// Minimum order quantity; 1 when absent or unparsable.
    pub minimum_order_quantity: u32,
    /// Average review rating on the source's own scale.
    pub rating: Option<f64>,
    /// Number of reviews behind `rating`.
    pub review_count: Option<u64>,
    /// Which connector produced this product.
    pub source: SourceId,
}
