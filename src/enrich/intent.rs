//! Does a question want the live price?

use regex::Regex;
use std::sync::LazyLock;

static PRICE_INTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(doge\s*coin|doge|price|worth|value|market|cost|trading|trend)\b")
        .expect("price intent pattern is valid")
});

/// True when the question names the asset or asks about its market
pub fn is_price_query(query: &str) -> bool {
    PRICE_INTENT.is_match(query)
}
