pub const PRIORITY_RETAILERS: &[&str] = &[
    "Amazon.in",
    "Flipkart",
    "JioMart",
    "Croma",
    "Reliance Digital",
    "Vijay Sales",
    "Tata Cliq",
    "Myntra",
    "Ajio",
];

pub const QUICK_COMMERCE_RETAILERS: &[&str] = &["Blinkit", "Zepto", "Swiggy Instamart"];

pub const MIN_SELLERS: usize = 6;
pub const MAX_SELLERS: usize = 8;

const OUTPUT_CONTRACT: &str = r#"{
  "productName": "Concise product name for search (Brand + Model + Key Spec, max 5-6 words)",
  "brand": "Brand Name",
  "category": "Product Category",
  "description": "A detailed technical description of the product features.",
  "keyFeatures": ["Feature 1", "Feature 2", "Feature 3"],
  "sellers": [
    {
      "name": "Store Name",
      "price": "Price value in INR (e.g. 19999)",
      "currency": "INR",
      "link": "Direct URL to the product page (if found, otherwise leave blank)",
      "inStock": true,
      "offers": "Specific bank offers (HDFC/SBI/ICICI) or coupons"
    }
  ],
  "reviews": {
    "averageRating": 4.5,
    "totalReviews": "1,200+",
    "sentiment": "positive",
    "pros": ["Pro 1", "Pro 2"],
    "cons": ["Con 1", "Con 2"],
    "summary": "A brief summary of what Indian users are saying."
  }
}"#;

/// Compose the instruction for one analysis.
///
/// Search grounding can't be combined with a response schema, so this text
/// alone shapes the answer.
pub fn build_prompt(query: Option<&str>, has_image: bool) -> String {
    let mut prompt = String::new();

    if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
        prompt.push_str(&format!("User Query: \"{q}\"\n"));
    }
    if has_image {
        prompt.push_str("Analyze the product shown in the image.\n");
    } else {
        prompt.push_str("Analyze the product mentioned in the query.\n");
    }

    prompt.push_str(&format!(
        "\nPerform a comprehensive search using Google Search to find real-time details, prices, available offers, and reviews for this product specifically in the **INDIAN MARKET**.

RETURN ONLY A VALID JSON OBJECT. Do not include markdown formatting or extra text outside the JSON.
Escape all newlines in strings with \\n. Do not use control characters.

The JSON structure must be exactly this:
{OUTPUT_CONTRACT}

STRICT REQUIREMENTS:
1. **REGION**: Search ONLY for India. Prices must be in Indian Rupees (₹).
2. **SOURCES**: You MUST find prices from {MIN_SELLERS} to {MAX_SELLERS} DIFFERENT Indian sellers.
   - Priority List: **{priority}**.
   - Quick Commerce (if available): **{quick}**.
3. **LINKS**: Try to find direct links, but if unsure, prioritize accurate store names so we can search for it.
4. **ACCURACY**: Ensure the product model matches exactly across all sellers.
",
        priority = PRIORITY_RETAILERS.join(", "),
        quick = QUICK_COMMERCE_RETAILERS.join(", "),
    ));

    prompt
}
