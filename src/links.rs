use serde::Serialize;

use crate::models::Seller;

/// AI-supplied links this short are not trusted.
const MIN_TRUSTED_LINK_LEN: usize = 15;

const SEARCH_ENGINE_MARKERS: &[&str] = &[
    "google.com/search",
    "bing.com/search",
    "duckduckgo.com/?",
    "search.yahoo.com",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetailerClass {
    MajorCatalog,
    QuickCommerce,
    Other,
}

struct Retailer {
    /// Lowercase substrings looked for in the seller's declared name.
    name_needles: &'static [&'static str],
    /// Lowercase substrings looked for in the seller's declared link.
    link_needles: &'static [&'static str],
    class: RetailerClass,
    /// Search URL with `{q}` standing in for the encoded product name.
    search_template: &'static str,
}

impl Retailer {
    fn matches(&self, name: &str, link: &str) -> bool {
        self.name_needles.iter().any(|n| name.contains(n))
            || self.link_needles.iter().any(|n| link.contains(n))
    }
}

// Order matters: the first match wins when a seller hits more than one entry.
const RETAILERS: &[Retailer] = &[
    Retailer {
        name_needles: &["amazon"],
        link_needles: &["amazon"],
        class: RetailerClass::MajorCatalog,
        search_template: "https://www.amazon.in/s?k={q}",
    },
    Retailer {
        name_needles: &["flipkart"],
        link_needles: &["flipkart"],
        class: RetailerClass::MajorCatalog,
        search_template: "https://www.flipkart.com/search?q={q}",
    },
    Retailer {
        name_needles: &["croma"],
        link_needles: &["croma"],
        class: RetailerClass::MajorCatalog,
        search_template: "https://www.croma.com/search/?text={q}",
    },
    Retailer {
        name_needles: &["reliance"],
        link_needles: &["reliancedigital"],
        class: RetailerClass::MajorCatalog,
        search_template: "https://www.reliancedigital.in/search?q={q}",
    },
    Retailer {
        name_needles: &["vijay"],
        link_needles: &["vijaysales"],
        class: RetailerClass::MajorCatalog,
        search_template: "https://www.vijaysales.com/search/{q}",
    },
    Retailer {
        name_needles: &["tata"],
        link_needles: &["tatacliq"],
        class: RetailerClass::MajorCatalog,
        search_template: "https://www.tatacliq.com/search/?searchCategory=all&text={q}",
    },
    Retailer {
        name_needles: &["jiomart"],
        link_needles: &["jiomart"],
        class: RetailerClass::MajorCatalog,
        search_template: "https://www.jiomart.com/search/{q}",
    },
    Retailer {
        name_needles: &["myntra"],
        link_needles: &["myntra"],
        class: RetailerClass::MajorCatalog,
        search_template: "https://www.myntra.com/{q}",
    },
    Retailer {
        name_needles: &["ajio"],
        link_needles: &["ajio"],
        class: RetailerClass::MajorCatalog,
        search_template: "https://www.ajio.com/search/?text={q}",
    },
    Retailer {
        name_needles: &["blinkit"],
        link_needles: &["blinkit"],
        class: RetailerClass::QuickCommerce,
        search_template: "https://blinkit.com/s/?q={q}",
    },
    Retailer {
        name_needles: &["zepto"],
        link_needles: &["zepto"],
        class: RetailerClass::QuickCommerce,
        search_template: "https://zeptonow.com/search?q={q}",
    },
    Retailer {
        name_needles: &["bigbasket"],
        link_needles: &["bigbasket"],
        class: RetailerClass::QuickCommerce,
        search_template: "https://www.bigbasket.com/ps/?q={q}",
    },
    Retailer {
        name_needles: &["swiggy", "instamart"],
        link_needles: &["swiggy"],
        class: RetailerClass::QuickCommerce,
        search_template: "https://www.swiggy.com/instamart/search?query={q}",
    },
];

fn lookup(seller: &Seller) -> Option<&'static Retailer> {
    let name = seller.name.to_lowercase();
    let link = seller.link.to_lowercase();
    RETAILERS.iter().find(|r| r.matches(&name, &link))
}

pub fn classify(seller: &Seller) -> RetailerClass {
    lookup(seller).map_or(RetailerClass::Other, |r| r.class)
}

pub fn is_search_engine_url(link: &str) -> bool {
    let link = link.to_lowercase();
    SEARCH_ENGINE_MARKERS.iter().any(|m| link.contains(m))
}

/// Product name reduced to a search term: the part before the first `(`,
/// punctuation turned into spaces, trimmed.
pub fn clean_search_term(product_name: &str) -> String {
    let head = product_name.split('(').next().unwrap_or_default();
    head.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Navigable URL for a seller row.
///
/// Known stores get their own search page; other sellers keep a link only when
/// it looks specific enough.
pub fn resolve_seller_link(seller: &Seller, product_name: &str) -> String {
    let retailer = lookup(seller);

    let link = seller.link.trim();
    if retailer.is_none()
        && link.chars().count() > MIN_TRUSTED_LINK_LEN
        && !is_search_engine_url(link)
    {
        return link.to_string();
    }

    let query = urlencoding::encode(&clean_search_term(product_name)).into_owned();
    match retailer {
        Some(r) => r.search_template.replace("{q}", &query),
        None => format!(
            "https://www.google.com/search?q={query}+{}+price+india",
            seller.name
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PRODUCT: &str = "Apple iPhone 15 (128 GB) - Black";

    fn seller(name: &str, link: &str) -> Seller {
        Seller {
            name: name.into(),
            price: "69900".into(),
            currency: "INR".into(),
            link: link.into(),
            in_stock: true,
            offers: None,
        }
    }

    #[test]
    fn search_term_is_cleaned_and_encoded() {
        assert_eq!(clean_search_term(PRODUCT), "Apple iPhone 15");
        assert_eq!(clean_search_term("Boat Airdopes 141 - TWS/Earbuds!"), "Boat Airdopes 141   TWS Earbuds");
        assert_eq!(clean_search_term(""), "");
    }

    #[test]
    fn major_retailer_links_are_replaced_with_search() {
        let s = seller("Amazon.in", "https://www.amazon.in/Apple-iPhone-15-128-GB/dp/B0CHX1W1XY");
        assert_eq!(resolve_seller_link(&s, PRODUCT), "https://www.amazon.in/s?k=Apple%20iPhone%2015");

        let s = seller("Flipkart", "https://www.flipkart.com/apple-iphone-15/p/itm6ac6485515ae4");
        assert_eq!(
            resolve_seller_link(&s, PRODUCT),
            "https://www.flipkart.com/search?q=Apple%20iPhone%2015"
        );
    }

    #[test]
    fn major_retailer_detected_from_link_alone() {
        let s = seller("Official Store", "https://www.tatacliq.com/apple-iphone-15/p-mp000000019");
        assert_eq!(classify(&s), RetailerClass::MajorCatalog);
        assert_eq!(
            resolve_seller_link(&s, PRODUCT),
            "https://www.tatacliq.com/search/?searchCategory=all&text=Apple%20iPhone%2015"
        );
    }

    #[test]
    fn every_major_retailer_gets_its_template() {
        let cases = [
            ("Croma", "https://www.croma.com/search/?text="),
            ("Reliance Digital", "https://www.reliancedigital.in/search?q="),
            ("Vijay Sales", "https://www.vijaysales.com/search/"),
            ("Tata CLiQ", "https://www.tatacliq.com/search/?searchCategory=all&text="),
            ("JioMart", "https://www.jiomart.com/search/"),
            ("Myntra", "https://www.myntra.com/"),
            ("AJIO", "https://www.ajio.com/search/?text="),
        ];
        for (name, prefix) in cases {
            let s = seller(name, "https://some-very-long-direct-link.example/product/123");
            let url = resolve_seller_link(&s, PRODUCT);
            assert_eq!(url, format!("{prefix}Apple%20iPhone%2015"), "{name}");
        }
    }

    #[test]
    fn quick_commerce_uses_app_search() {
        let s = seller("Blinkit", "https://blinkit.com/prn/x/prid/123456");
        assert_eq!(classify(&s), RetailerClass::QuickCommerce);
        assert_eq!(resolve_seller_link(&s, "Amul Butter"), "https://blinkit.com/s/?q=Amul%20Butter");

        let s = seller("Zepto", "");
        assert_eq!(resolve_seller_link(&s, "Amul Butter"), "https://zeptonow.com/search?q=Amul%20Butter");

        let s = seller("Swiggy Instamart", "");
        assert_eq!(
            resolve_seller_link(&s, "Amul Butter"),
            "https://www.swiggy.com/instamart/search?query=Amul%20Butter"
        );
    }

    #[test]
    fn specific_link_from_unknown_seller_is_trusted() {
        let link = "https://www.poorvika.com/apple-iphone-15-128gb-black/p";
        let s = seller("Poorvika", link);
        assert_eq!(classify(&s), RetailerClass::Other);
        assert_eq!(resolve_seller_link(&s, PRODUCT), link);
    }

    #[test]
    fn short_or_search_engine_links_fall_back_to_web_search() {
        let expected = "https://www.google.com/search?q=Apple%20iPhone%2015+Poorvika+price+india";

        let s = seller("Poorvika", "poorvika.com");
        assert_eq!(resolve_seller_link(&s, PRODUCT), expected);

        let s = seller("Poorvika", "https://www.google.com/search?q=iphone+15+poorvika");
        assert_eq!(resolve_seller_link(&s, PRODUCT), expected);

        let s = seller("Poorvika", "");
        assert_eq!(resolve_seller_link(&s, PRODUCT), expected);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let s = seller("FLIPKART", "");
        assert_eq!(classify(&s), RetailerClass::MajorCatalog);
        let s = seller("Seller", "HTTPS://WWW.AMAZON.IN/DP/B0CHX1W1XY");
        assert_eq!(classify(&s), RetailerClass::MajorCatalog);
    }
}
