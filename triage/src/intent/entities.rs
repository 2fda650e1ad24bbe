//! Best-effort entity extraction
//!
//! Scans raw customer text for the handful of entities downstream stages
//! care about. Nothing here fails; an unmatched pattern just leaves the key
//! out of the map.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Digits following an "order" token: `order #12345`, `order no. 123`, `order number: 9876`
static ORDER_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\border\b\s*(?:number|num|no\.?|id)?\s*[:#]?\s*#?\s*(\d{3,})")
        .expect("ORDER_NUMBER_RE regex should compile")
});

/// Bare hash reference: `#12345`
static HASH_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s?(\d{3,})").expect("HASH_NUMBER_RE regex should compile"));

/// Dollar amount: `$150`, `$1,200.50`
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s?(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?")
        .expect("AMOUNT_RE regex should compile")
});

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b")
        .expect("EMAIL_RE regex should compile")
});

pub const ORDER_NUMBER: &str = "order_number";
pub const AMOUNT: &str = "amount";
pub const EMAIL: &str = "email";

/// Extract entities from raw text. May return an empty map.
pub fn extract_entities(text: &str) -> BTreeMap<String, String> {
    let mut entities = BTreeMap::new();

    let order = ORDER_NUMBER_RE
        .captures(text)
        .or_else(|| HASH_NUMBER_RE.captures(text))
        .and_then(|c| c.get(1));
    if let Some(m) = order {
        entities.insert(ORDER_NUMBER.to_string(), m.as_str().to_string());
    }

    if let Some(caps) = AMOUNT_RE.captures(text) {
        let whole = caps[1].replace(',', "");
        let cents = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        entities.insert(AMOUNT.to_string(), format!("{}.{:0<2}", whole, cents));
    }

    if let Some(m) = EMAIL_RE.find(text) {
        entities.insert(EMAIL.to_string(), m.as_str().to_lowercase());
    }

    entities
}

/// Parse the `amount` entity back into a number.
pub fn parse_amount(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}
