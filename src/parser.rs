use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use serde_with::{serde_as, DefaultOnNull};
use tracing::{debug, warn};

use crate::currency::parse_float_prefix;
use crate::models::{ProductData, ReviewSummary, Seller, Sentiment};

pub const DEFAULT_CURRENCY: &str = "INR";

/// Model answers that don't decode are not errors; they are shown as text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(ProductData),
    Unparsed { raw_text: String, reason: String },
}

/// Strip everything around the JSON payload.
///
/// In order: drop code-fence markers, keep only the span from the first `{` to
/// the last `}`, then remove every control character (0x00-0x1F and 0x7F).
/// Tabs and newlines go too, so unescaped line breaks inside string values are
/// joined rather than preserved.
pub fn sanitize(raw: &str) -> String {
    let cleaned = raw.replace("```json", "").replace("```", "");

    let sliced = match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(first), Some(last)) if first <= last => &cleaned[first..=last],
        _ => cleaned.as_str(),
    };

    sliced
        .chars()
        .filter(|c| !matches!(*c as u32, 0x00..=0x1F | 0x7F))
        .collect()
}

pub fn parse_product(raw: &str) -> ParseOutcome {
    let cleaned = sanitize(raw);
    match decode_product(&cleaned) {
        Ok(product) => {
            debug!(
                product = %product.product_name,
                sellers = product.sellers.len(),
                "Parsed product data"
            );
            ParseOutcome::Parsed(product)
        }
        Err(reason) => {
            warn!(%reason, "Failed to parse JSON from model response, falling back to raw text");
            ParseOutcome::Unparsed {
                raw_text: raw.to_string(),
                reason,
            }
        }
    }
}

fn decode_product(cleaned: &str) -> Result<ProductData, String> {
    let value: Value = serde_json::from_str(cleaned).map_err(|e| e.to_string())?;
    if !value.is_object() {
        return Err(format!("expected a JSON object, found {}", kind_of(&value)));
    }
    let wire: WireProduct = serde_json::from_value(value).map_err(|e| e.to_string())?;
    Ok(wire.into())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// --- Wire shapes ---

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProduct {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    product_name: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    brand: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    category: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    description: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    key_features: Vec<String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    sellers: Vec<Option<WireSeller>>,
    #[serde(default)]
    reviews: Option<WireReviews>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSeller {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    name: String,
    #[serde(default, deserialize_with = "loose_string")]
    price: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    currency: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    link: String,
    #[serde(default, deserialize_with = "loose_bool")]
    in_stock: bool,
    #[serde(default)]
    offers: Option<String>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReviews {
    #[serde(default, deserialize_with = "loose_rating")]
    average_rating: f64,
    #[serde(default, deserialize_with = "loose_string")]
    total_reviews: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    sentiment: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pros: Vec<String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    cons: Vec<String>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    summary: String,
}

impl From<WireProduct> for ProductData {
    fn from(w: WireProduct) -> Self {
        let sellers = w
            .sellers
            .into_iter()
            .flatten()
            .filter(|s| !s.name.trim().is_empty() || !s.price.trim().is_empty())
            .map(Seller::from)
            .collect();

        ProductData {
            product_name: w.product_name,
            brand: w.brand,
            category: w.category,
            description: w.description,
            key_features: w.key_features,
            sellers,
            reviews: w.reviews.map(ReviewSummary::from).unwrap_or_default(),
        }
    }
}

impl From<WireSeller> for Seller {
    fn from(w: WireSeller) -> Self {
        let currency = if w.currency.trim().is_empty() {
            DEFAULT_CURRENCY.to_string()
        } else {
            w.currency.trim().to_uppercase()
        };
        Seller {
            name: w.name,
            price: w.price,
            currency,
            link: w.link.trim().to_string(),
            in_stock: w.in_stock,
            offers: w.offers.filter(|o| !o.trim().is_empty()),
        }
    }
}

impl From<WireReviews> for ReviewSummary {
    fn from(w: WireReviews) -> Self {
        ReviewSummary {
            average_rating: w.average_rating,
            total_reviews: w.total_reviews,
            sentiment: Sentiment::from_label(&w.sentiment),
            pros: w.pros,
            cons: w.cons,
            summary: w.summary,
        }
    }
}

/// String field that the model sometimes emits as a bare number.
fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string or number, found {}",
            kind_of(&other)
        ))),
    }
}

fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(b),
        Some(Value::String(s)) => Ok(matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "in stock" | "available"
        )),
        Some(other) => Err(de::Error::custom(format!(
            "expected a boolean, found {}",
            kind_of(&other)
        ))),
    }
}

/// Rating as a number or numeric string ("4.3/5"), clamped to [0, 5].
fn loose_rating<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let rating = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => 0.0,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_float_prefix(s.trim()).unwrap_or(0.0),
        Some(other) => {
            return Err(de::Error::custom(format!(
                "expected a number, found {}",
                kind_of(&other)
            )))
        }
    };
    Ok(rating.clamp(0.0, 5.0))
}
