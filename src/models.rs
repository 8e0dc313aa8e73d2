use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Shown when neither a parsed product nor any raw text came back.
pub const NOT_IDENTIFIED_NOTICE: &str = "Could not identify product. Try a clearer angle.";

/// One user action: a text query, a photo, or both.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub text_query: Option<String>,
    pub image: Option<Bytes>,
}

impl AnalysisRequest {
    pub fn new(text_query: Option<String>, image: Option<Bytes>) -> Self {
        let text_query = text_query.map(|q| q.trim().to_string()).filter(|q| !q.is_empty());
        let image = image.filter(|b| !b.is_empty());
        Self { text_query, image }
    }

    pub fn is_empty(&self) -> bool {
        self.text_query.is_none() && self.image.is_none()
    }
}

/// Normalized image ready to be attached to a generation call as inline data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportImagePart {
    pub encoded_data: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GroundingSource {
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

/// Text and citations returned by one successful generation call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResponse {
    pub text: String,
    pub grounding_references: Vec<GroundingSource>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    /// Case-insensitive match; anything unrecognised reads as neutral.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Seller {
    pub name: String,
    /// As reported by the model, e.g. "₹ 1,49,999". Normalize before comparing.
    pub price: String,
    pub currency: String,
    pub link: String,
    pub in_stock: bool,
    pub offers: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ReviewSummary {
    /// Always within [0, 5].
    pub average_rating: f64,
    /// Free text such as "1,200+".
    pub total_reviews: String,
    pub sentiment: Sentiment,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct ProductData {
    pub product_name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub key_features: Vec<String>,
    pub sellers: Vec<Seller>,
    pub reviews: ReviewSummary,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisResult {
    pub product_data: Option<ProductData>,
    pub sources: Vec<GroundingSource>,
    pub raw_text: Option<String>,
}

/// What the calling layer should show for a finished analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Presentation<'a> {
    Product(&'a ProductData),
    Raw(&'a str),
    Empty,
}

impl AnalysisResult {
    pub fn presentation(&self) -> Presentation<'_> {
        if let Some(product) = &self.product_data {
            return Presentation::Product(product);
        }
        match self.raw_text.as_deref() {
            Some(text) if !text.trim().is_empty() => Presentation::Raw(text),
            _ => Presentation::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn request_drops_blank_query_and_empty_image() {
        let req = AnalysisRequest::new(Some("   ".into()), Some(Bytes::new()));
        assert!(req.is_empty());

        let req = AnalysisRequest::new(Some("  iPhone 15 ".into()), None);
        assert_eq!(req.text_query.as_deref(), Some("iPhone 15"));
    }

    #[test]
    fn presentation_prefers_product_then_raw_then_notice() {
        let mut result = AnalysisResult {
            product_data: Some(ProductData::default()),
            sources: vec![],
            raw_text: Some("{}".into()),
        };
        assert!(matches!(result.presentation(), Presentation::Product(_)));

        result.product_data = None;
        assert_eq!(result.presentation(), Presentation::Raw("{}"));

        result.raw_text = Some("  \n".into());
        assert_eq!(result.presentation(), Presentation::Empty);

        result.raw_text = None;
        assert_eq!(result.presentation(), Presentation::Empty);
    }

    #[test]
    fn sentiment_labels_are_case_insensitive() {
        assert_eq!(Sentiment::from_label("Positive"), Sentiment::Positive);
        assert_eq!(Sentiment::from_label(" NEGATIVE "), Sentiment::Negative);
        assert_eq!(Sentiment::from_label("mixed"), Sentiment::Neutral);
    }
}
