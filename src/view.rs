use serde::Serialize;

use crate::currency::{format_currency, parse_amount};
use crate::links::{classify, resolve_seller_link, RetailerClass};
use crate::models::{
    AnalysisResult, GroundingSource, Presentation, ProductData, ReviewSummary, Seller, Sentiment,
    NOT_IDENTIFIED_NOTICE,
};

pub const FEATURED_SOURCES: usize = 3;
const UNKNOWN_STORE: &str = "Unknown Store";
const NO_SUMMARY: &str = "No summary available.";

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Product,
    Raw,
    Empty,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct AnalysisView {
    pub kind: ViewKind,
    pub product: Option<ProductView>,
    pub raw_text: Option<String>,
    pub notice: Option<String>,
    pub sources: Vec<GroundingSource>,
    pub featured_sources: Vec<GroundingSource>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ProductView {
    pub product_name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub key_features: Vec<String>,
    /// Cheapest first.
    pub sellers: Vec<SellerRow>,
    pub reviews: ReviewView,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SellerRow {
    pub name: String,
    pub price: String,
    pub formatted_price: String,
    pub currency: String,
    pub link: String,
    pub retailer_class: RetailerClass,
    pub in_stock: bool,
    pub offers: Option<String>,
    pub best_price: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ReviewView {
    pub average_rating: f64,
    pub total_reviews: String,
    pub sentiment: Sentiment,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub summary: String,
    /// Rating mapped onto 0..=100 for the sentiment chart.
    pub positive_share: f64,
    pub negative_share: f64,
}

impl From<&AnalysisResult> for AnalysisView {
    fn from(result: &AnalysisResult) -> Self {
        let (kind, product, raw_text, notice) = match result.presentation() {
            Presentation::Product(p) => (ViewKind::Product, Some(ProductView::from(p)), None, None),
            Presentation::Raw(text) => (ViewKind::Raw, None, Some(text.to_string()), None),
            Presentation::Empty => (ViewKind::Empty, None, None, Some(NOT_IDENTIFIED_NOTICE.to_string())),
        };
        AnalysisView {
            kind,
            product,
            raw_text,
            notice,
            featured_sources: result.sources.iter().take(FEATURED_SOURCES).cloned().collect(),
            sources: result.sources.clone(),
        }
    }
}

impl From<&ProductData> for ProductView {
    fn from(p: &ProductData) -> Self {
        ProductView {
            product_name: p.product_name.clone(),
            brand: p.brand.clone(),
            category: p.category.clone(),
            description: p.description.clone(),
            key_features: p.key_features.clone(),
            sellers: seller_rows(&p.sellers, &p.product_name),
            reviews: ReviewView::from(&p.reviews),
        }
    }
}

/// Numeric price used for ordering; anything unreadable sorts as 0.
pub fn price_value(seller: &Seller) -> f64 {
    parse_amount(&seller.price).unwrap_or(0.0)
}

pub fn seller_rows(sellers: &[Seller], product_name: &str) -> Vec<SellerRow> {
    let mut sorted: Vec<&Seller> = sellers.iter().collect();
    sorted.sort_by(|a, b| price_value(a).total_cmp(&price_value(b)));

    sorted
        .into_iter()
        .enumerate()
        .map(|(idx, s)| SellerRow {
            name: if s.name.trim().is_empty() { UNKNOWN_STORE.to_string() } else { s.name.clone() },
            price: s.price.clone(),
            formatted_price: format_currency(&s.price, &s.currency),
            currency: s.currency.clone(),
            link: resolve_seller_link(s, product_name),
            retailer_class: classify(s),
            in_stock: s.in_stock,
            offers: s.offers.clone(),
            best_price: idx == 0,
        })
        .collect()
}

impl From<&ReviewSummary> for ReviewView {
    fn from(r: &ReviewSummary) -> Self {
        let positive_share = r.average_rating * 20.0;
        ReviewView {
            average_rating: r.average_rating,
            total_reviews: if r.total_reviews.is_empty() { "0".to_string() } else { r.total_reviews.clone() },
            sentiment: r.sentiment,
            pros: r.pros.clone(),
            cons: r.cons.clone(),
            summary: if r.summary.trim().is_empty() { NO_SUMMARY.to_string() } else { r.summary.clone() },
            positive_share,
            negative_share: (100.0 - positive_share).max(0.0),
        }
    }
}
