//! Result normalization into the shared product model.
//!
//! Every upstream has its own response shape; the connectors return those
//! shapes untouched and this module performs the one explicit, total
//! mapping into [`NormalizedProduct`]. "Guess the field name" logic lives
//! here and nowhere else.
//!
//! Normalization is a pure function and never fails: a malformed record is
//! converted with documented defaults rather than dropped, and one bad
//! record never sinks its batch.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;

use sourcing_hub_core::{NormalizedProduct, SourceId};

use super::alibaba::AlibabaProduct;
use super::cj_dropshipping::CjProduct;
use super::made_in_china::MicProduct;
use super::shopify_catalog::{CatalogPriceRange, CatalogProduct};

/// Currency assumed when the source does not specify one.
const DEFAULT_CURRENCY: &str = "USD";

/// Title used when the source omits one.
const FALLBACK_TITLE: &str = "Untitled product";

/// Raw, per-source product records as returned by a connector.
///
/// The tagged union confines knowledge of each upstream's record shape to
/// the connector that produced it and the mapping below that consumes it.
#[derive(Debug, Clone)]
pub enum RawProductBatch {
    Alibaba(Vec<AlibabaProduct>),
    MadeInChina(Vec<MicProduct>),
    CjDropshipping(Vec<CjProduct>),
    ShopifyCatalog(Vec<CatalogProduct>),
}

impl RawProductBatch {
    /// An empty batch tagged with the source it came from.
    #[must_use]
    pub const fn empty(source: SourceId) -> Self {
        match source {
            SourceId::Alibaba => Self::Alibaba(Vec::new()),
            SourceId::MadeInChina => Self::MadeInChina(Vec::new()),
            SourceId::CjDropshipping => Self::CjDropshipping(Vec::new()),
            SourceId::ShopifyCatalog => Self::ShopifyCatalog(Vec::new()),
        }
    }

    /// Which source produced this batch.
    #[must_use]
    pub const fn source(&self) -> SourceId {
        match self {
            Self::Alibaba(_) => SourceId::Alibaba,
            Self::MadeInChina(_) => SourceId::MadeInChina,
            Self::CjDropshipping(_) => SourceId::CjDropshipping,
            Self::ShopifyCatalog(_) => SourceId::ShopifyCatalog,
        }
    }

    /// Number of raw records in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Alibaba(records) => records.len(),
            Self::MadeInChina(records) => records.len(),
            Self::CjDropshipping(records) => records.len(),
            Self::ShopifyCatalog(records) => records.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Map a raw batch into the shared product model.
///
/// Upstream ordering is preserved. Defaults: absent price stays absent
/// (never zero), MOQ falls back to 1, missing titles get a placeholder,
/// missing ids are synthesized from source and batch position, currency
/// defaults to USD.
#[must_use]
pub fn normalize(batch: RawProductBatch) -> Vec<NormalizedProduct> {
    match batch {
        RawProductBatch::Alibaba(records) => records
            .into_iter()
            .enumerate()
            .map(|(index, record)| normalize_alibaba(index, record))
            .collect(),
        RawProductBatch::MadeInChina(records) => records
            .into_iter()
            .enumerate()
            .map(|(index, record)| normalize_made_in_china(index, record))
            .collect(),
        RawProductBatch::CjDropshipping(records) => records
            .into_iter()
            .enumerate()
            .map(|(index, record)| normalize_cj(index, record))
            .collect(),
        RawProductBatch::ShopifyCatalog(records) => records
            .into_iter()
            .enumerate()
            .map(|(index, record)| normalize_catalog(index, record))
            .collect(),
    }
}

fn normalize_alibaba(index: usize, record: AlibabaProduct) -> NormalizedProduct {
    NormalizedProduct {
        id: coerce_string(record.product_id)
            .unwrap_or_else(|| synthesize_id(SourceId::Alibaba, index)),
        title: fallback_title(record.subject),
        description: nonblank(record.description),
        price: parse_price(record.price.as_ref()),
        currency: currency_or_default(record.currency),
        image_url: nonblank(record.image_url),
        supplier_name: nonblank(record.company_name),
        source_url: nonblank(record.detail_url),
        minimum_order_quantity: parse_quantity(record.min_order_quantity.as_ref()),
        rating: parse_f64(record.score.as_ref()),
        review_count: parse_count(record.review_count.as_ref()),
        source: SourceId::Alibaba,
    }
}

fn normalize_made_in_china(index: usize, record: MicProduct) -> NormalizedProduct {
    NormalizedProduct {
        id: coerce_string(record.prod_id)
            .unwrap_or_else(|| synthesize_id(SourceId::MadeInChina, index)),
        title: fallback_title(record.prod_name),
        description: nonblank(record.brief_desc),
        price: parse_price(record.price.as_ref()),
        currency: currency_or_default(record.currency),
        image_url: nonblank(record.pic_url),
        supplier_name: nonblank(record.com_name),
        source_url: nonblank(record.prod_url),
        minimum_order_quantity: parse_quantity(record.moq.as_ref()),
        rating: None,
        review_count: None,
        source: SourceId::MadeInChina,
    }
}

fn normalize_cj(index: usize, record: CjProduct) -> NormalizedProduct {
    NormalizedProduct {
        id: coerce_string(record.pid)
            .unwrap_or_else(|| synthesize_id(SourceId::CjDropshipping, index)),
        title: fallback_title(record.product_name_en),
        description: nonblank(record.remark),
        price: parse_price(record.sell_price.as_ref()),
        currency: currency_or_default(record.currency),
        image_url: nonblank(record.product_image),
        supplier_name: nonblank(record.supplier_name),
        source_url: nonblank(record.product_url),
        minimum_order_quantity: parse_quantity(record.moq.as_ref()),
        rating: parse_f64(record.score.as_ref()),
        review_count: None,
        source: SourceId::CjDropshipping,
    }
}

fn normalize_catalog(index: usize, record: CatalogProduct) -> NormalizedProduct {
    let (price, currency) = match record.price_range {
        Some(CatalogPriceRange { min, max, currency }) => {
            // The low end of the range wins, matching the other sources.
            let price = parse_price(min.as_ref()).or_else(|| parse_price(max.as_ref()));
            (price, currency)
        }
        None => (None, None),
    };

    NormalizedProduct {
        id: coerce_string(record.product_id)
            .unwrap_or_else(|| synthesize_id(SourceId::ShopifyCatalog, index)),
        title: fallback_title(record.title),
        description: nonblank(record.description),
        price,
        currency: currency_or_default(currency),
        image_url: nonblank(record.image_url),
        supplier_name: nonblank(record.vendor),
        source_url: nonblank(record.url),
        minimum_order_quantity: 1,
        rating: parse_f64(record.rating.as_ref()),
        review_count: parse_count(record.review_count.as_ref()),
        source: SourceId::ShopifyCatalog,
    }
}

// =============================================================================
// Coercion helpers
// =============================================================================

fn synthesize_id(source: SourceId, index: usize) -> String {
    format!("{source}-{index}")
}

fn fallback_title(title: Option<String>) -> String {
    match nonblank(title) {
        Some(title) => title,
        None => FALLBACK_TITLE.to_string(),
    }
}

fn currency_or_default(currency: Option<String>) -> String {
    nonblank(currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

/// Trim and drop empty strings.
fn nonblank(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == value.len() {
        Some(value)
    } else {
        Some(trimmed.to_string())
    }
}

/// Coerce an id-ish value that arrives as a string or a number.
fn coerce_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => nonblank(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a price that may arrive as a number, a numeric string, or a range
/// string like `"US $1.20 - 3.50"` (the low end wins). Anything that is
/// not strictly positive is treated as absent, never as zero.
fn parse_price(value: Option<&Value>) -> Option<Decimal> {
    let parsed = match value? {
        Value::Number(n) => Decimal::from_f64(n.as_f64()?),
        Value::String(s) => parse_price_str(s),
        _ => None,
    }?;

    (parsed > Decimal::ZERO).then_some(parsed)
}

fn parse_price_str(raw: &str) -> Option<Decimal> {
    // Low end of a range, then strip currency symbols and separators.
    let low = raw.split('-').next().unwrap_or(raw);
    let cleaned: String = low
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Parse an MOQ; anything absent, unparsable, or below 1 becomes 1.
fn parse_quantity(value: Option<&Value>) -> u32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };

    match parsed {
        Some(quantity) if quantity >= 1 => quantity,
        _ => 1,
    }
}

fn parse_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => s.trim().parse().ok().filter(|f: &f64| f.is_finite()),
        _ => None,
    }
}

fn parse_count(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alibaba_record(value: Value) -> AlibabaProduct {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_fully_populated_alibaba_record() {
        let batch = RawProductBatch::Alibaba(vec![alibaba_record(json!({
            "productId": 60012345,
            "subject": "Wireless Earbuds TWS",
            "description": "Bluetooth 5.3, noise cancelling",
            "price": "US $3.20 - 5.80",
            "currency": "USD",
            "imageUrl": "https://img.example.com/p/60012345.jpg",
            "companyName": "Shenzhen Audio Co.",
            "detailUrl": "https://www.alibaba.com/product/60012345",
            "minOrderQuantity": "50",
            "score": 4.6,
            "reviewCount": 213,
        }))]);

        let products = normalize(batch);
        assert_eq!(products.len(), 1);

        let product = &products[0];
        assert_eq!(product.id, "60012345");
        assert_eq!(product.title, "Wireless Earbuds TWS");
        assert_eq!(product.price, Some("3.20".parse().unwrap()));
        assert_eq!(product.currency, "USD");
        assert_eq!(product.supplier_name.as_deref(), Some("Shenzhen Audio Co."));
        assert_eq!(product.minimum_order_quantity, 50);
        assert_eq!(product.rating, Some(4.6));
        assert_eq!(product.review_count, Some(213));
        assert_eq!(product.source, SourceId::Alibaba);
    }

    #[test]
    fn test_empty_record_gets_documented_defaults() {
        let batch = RawProductBatch::Alibaba(vec![alibaba_record(json!({}))]);

        let products = normalize(batch);
        let product = &products[0];

        assert_eq!(product.id, "alibaba-0");
        assert_eq!(product.title, "Untitled product");
        assert_eq!(product.price, None, "absent price must stay absent, not zero");
        assert_eq!(product.currency, "USD");
        assert_eq!(product.minimum_order_quantity, 1);
        assert_eq!(product.rating, None);
        assert_eq!(product.review_count, None);
    }

    #[test]
    fn test_malformed_fields_never_fail_the_batch() {
        // price as a bool, moq as an object, id as an array - all garbage
        let batch = RawProductBatch::Alibaba(vec![
            alibaba_record(json!({
                "productId": ["not", "an", "id"],
                "price": true,
                "minOrderQuantity": {"value": 10},
                "score": "not-a-number",
            })),
            alibaba_record(json!({"subject": "Survivor", "price": 2.5})),
        ]);

        let products = normalize(batch);
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].price, None);
        assert_eq!(products[0].minimum_order_quantity, 1);
        assert_eq!(products[0].id, "alibaba-0");
        assert_eq!(products[1].title, "Survivor");
        assert_eq!(products[1].price, Some("2.5".parse().unwrap()));
    }

    #[test]
    fn test_zero_and_negative_prices_are_absent() {
        let batch = RawProductBatch::Alibaba(vec![
            alibaba_record(json!({"price": 0})),
            alibaba_record(json!({"price": "-4.50"})),
            alibaba_record(json!({"price": "0.00"})),
        ]);

        for product in normalize(batch) {
            assert_eq!(product.price, None);
        }
    }

    #[test]
    fn test_supplier_field_aliases_resolve() {
        let with_company = alibaba_record(json!({"companyName": "Acme"}));
        let with_supplier = alibaba_record(json!({"supplierName": "Acme"}));

        let products = normalize(RawProductBatch::Alibaba(vec![with_company, with_supplier]));
        assert_eq!(products[0].supplier_name.as_deref(), Some("Acme"));
        assert_eq!(products[1].supplier_name.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_made_in_china_field_mapping() {
        let record: MicProduct = serde_json::from_value(json!({
            "prodId": "mic-889",
            "productName": "Steel Bottle",
            "price": "1,280.00",
            "comName": "Ningbo Homeware",
            "moq": 100,
        }))
        .unwrap();

        let products = normalize(RawProductBatch::MadeInChina(vec![record]));
        let product = &products[0];

        assert_eq!(product.id, "mic-889");
        assert_eq!(product.title, "Steel Bottle");
        assert_eq!(product.price, Some("1280.00".parse().unwrap()));
        assert_eq!(product.supplier_name.as_deref(), Some("Ningbo Homeware"));
        assert_eq!(product.minimum_order_quantity, 100);
        assert_eq!(product.source, SourceId::MadeInChina);
    }

    #[test]
    fn test_cj_string_price_and_synthesized_id() {
        let record: CjProduct = serde_json::from_value(json!({
            "productNameEn": "Phone Stand",
            "sellPrice": "1.99",
        }))
        .unwrap();

        let products = normalize(RawProductBatch::CjDropshipping(vec![record]));
        let product = &products[0];

        assert_eq!(product.id, "cj-dropshipping-0");
        assert_eq!(product.price, Some("1.99".parse().unwrap()));
        assert_eq!(product.source, SourceId::CjDropshipping);
    }

    #[test]
    fn test_catalog_price_range_uses_low_end() {
        let record: CatalogProduct = serde_json::from_value(json!({
            "product_id": "gid://shopify/Product/42",
            "title": "Canvas Tote",
            "price_range": {"min": "14.00", "max": "22.00", "currency": "EUR"},
        }))
        .unwrap();

        let products = normalize(RawProductBatch::ShopifyCatalog(vec![record]));
        let product = &products[0];

        assert_eq!(product.price, Some("14.00".parse().unwrap()));
        assert_eq!(product.currency, "EUR");
        assert_eq!(product.minimum_order_quantity, 1);
        assert_eq!(product.source, SourceId::ShopifyCatalog);
    }

    #[test]
    fn test_blank_title_falls_back() {
        let batch = RawProductBatch::Alibaba(vec![alibaba_record(json!({"subject": "   "}))]);
        assert_eq!(normalize(batch)[0].title, "Untitled product");
    }

    #[test]
    fn test_empty_batch_constructor_round_trips_source() {
        for source in SourceId::ALL {
            let batch = RawProductBatch::empty(source);
            assert_eq!(batch.source(), source);
            assert!(batch.is_empty());
            assert!(normalize(batch).is_empty());
        }
    }
}
