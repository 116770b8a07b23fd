use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::extract::Candidate;
use crate::config::{self, Config};

/// Sentinel for "price could not be parsed". Larger than any valid price so
/// the range filter and the price-drop rule both treat it as out of range.
pub const PRICE_UNKNOWN: i64 = i64::MAX;

static NON_DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\D").unwrap());

/// A candidate that survived all three filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub asin: String,
    pub title: String,
    pub price_minor: i64,
    pub link: String,
}

impl Listing {
    pub fn price_known(&self) -> bool {
        self.price_minor != PRICE_UNKNOWN
    }
}

/// Apply the ad, keyword, and price predicates in that fixed order, with
/// short-circuit: an ad never reaches the keyword or price checks, so
/// sponsored placements cannot leak through on matching text. Page order is
/// preserved.
pub fn apply_filters(candidates: Vec<Candidate>, cfg: &Config) -> Vec<Listing> {
    candidates
        .into_iter()
        .filter_map(|c| {
            if is_ad(&c, &cfg.ad_phrases) {
                debug!("dropped ad placement {}", c.asin);
                return None;
            }
            if !matches_keyword(&c.title, &cfg.keywords) {
                debug!("dropped off-topic listing {} ({})", c.asin, c.title);
                return None;
            }
            let price_minor = c
                .price_text
                .as_deref()
                .map_or(PRICE_UNKNOWN, parse_price_minor);
            if !price_accepted(price_minor, cfg) {
                debug!("dropped out-of-range listing {} (price {})", c.asin, price_minor);
                return None;
            }
            Some(Listing {
                link: config::listing_url(&c.asin),
                asin: c.asin,
                title: c.title,
                price_minor,
            })
        })
        .collect()
}

/// Keep only the first occurrence of each ASIN within this run.
pub fn dedup_by_asin(items: Vec<Listing>) -> Vec<Listing> {
    let mut seen: HashSet<String> = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.asin.clone()))
        .collect()
}

fn is_ad(c: &Candidate, ad_phrases: &[String]) -> bool {
    if c.ad_attribute || c.sponsored_label {
        return true;
    }
    let text = c.text.to_lowercase();
    ad_phrases.iter().any(|phrase| text.contains(phrase))
}

fn matches_keyword(title: &str, keywords: &[String]) -> bool {
    let title = title.to_lowercase();
    keywords.iter().any(|kw| title.contains(kw))
}

fn price_accepted(price_minor: i64, cfg: &Config) -> bool {
    if price_minor == PRICE_UNKNOWN {
        return cfg.allow_unknown_price;
    }
    cfg.min_price <= price_minor && price_minor <= cfg.max_price
}

/// Strip currency symbols, separators, and anything else non-digit; what
/// remains is the price in yen. No digits at all means the sentinel.
pub fn parse_price_minor(fragment: &str) -> i64 {
    let digits = NON_DIGIT_RE.replace_all(fragment, "");
    if digits.is_empty() {
        return PRICE_UNKNOWN;
    }
    digits.parse().unwrap_or(PRICE_UNKNOWN)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(asin: &str, title: &str, price: Option<&str>) -> Candidate {
        Candidate {
            asin: asin.to_string(),
            title: title.to_string(),
            ad_attribute: false,
            sponsored_label: false,
            text: title.to_string(),
            price_text: price.map(str::to_string),
        }
    }

    fn cfg(min: i64, max: i64) -> Config {
        Config {
            min_price: min,
            max_price: max,
            ..Config::default()
        }
    }

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price_minor("1,580"), 1580);
        assert_eq!(parse_price_minor("¥2,480"), 2480);
        assert_eq!(parse_price_minor("980"), 980);
        assert_eq!(parse_price_minor("価格情報なし"), PRICE_UNKNOWN);
        assert_eq!(parse_price_minor(""), PRICE_UNKNOWN);
    }

    #[test]
    fn price_boundaries_inclusive() {
        let cfg = cfg(100, 1000);
        let run = |price: &str| {
            apply_filters(vec![candidate("B000000001", "Hot Wheels Car", Some(price))], &cfg)
        };
        assert!(run("99").is_empty(), "min - 1 must be excluded");
        assert_eq!(run("100").len(), 1, "min is inclusive");
        assert_eq!(run("1000").len(), 1, "max is inclusive");
        assert!(run("1001").is_empty(), "max + 1 must be excluded");
    }

    #[test]
    fn unknown_price_fails_unless_allowed() {
        let mut cfg = cfg(100, 1000);
        let items = vec![candidate("B000000001", "Hot Wheels Car", None)];
        assert!(apply_filters(items.clone(), &cfg).is_empty());

        cfg.allow_unknown_price = true;
        let kept = apply_filters(items, &cfg);
        assert_eq!(kept.len(), 1);
        assert!(!kept[0].price_known());
    }

    #[test]
    fn ad_short_circuits_keyword_and_price() {
        let cfg = cfg(100, 1000);
        // Keyword matches and price is in range; each ad marker alone must
        // still reject the candidate.
        let mut by_attr = candidate("B000000001", "Hot Wheels Racer", Some("500"));
        by_attr.ad_attribute = true;
        let mut by_label = candidate("B000000002", "Hot Wheels Racer", Some("500"));
        by_label.sponsored_label = true;
        let mut by_text = candidate("B000000003", "Hot Wheels Racer", Some("500"));
        by_text.text = "Sponsored Hot Wheels Racer ¥500".to_string();
        let mut by_jp_text = candidate("B000000004", "Hot Wheels Racer", Some("500"));
        by_jp_text.text = "スポンサー Hot Wheels Racer".to_string();

        assert!(apply_filters(vec![by_attr, by_label, by_text, by_jp_text], &cfg).is_empty());
    }

    #[test]
    fn keyword_match_is_case_insensitive_and_multilocale() {
        let cfg = cfg(100, 1000);
        let kept = apply_filters(
            vec![
                candidate("B000000001", "HOT WHEELS Monster Truck", Some("500")),
                candidate("B000000002", "ホットウィール ベーシック", Some("500")),
                candidate("B000000003", "Tomica Premium", Some("500")),
            ],
            &cfg,
        );
        let asins: Vec<&str> = kept.iter().map(|l| l.asin.as_str()).collect();
        assert_eq!(asins, ["B000000001", "B000000002"]);
    }

    #[test]
    fn link_derived_from_asin() {
        let cfg = cfg(100, 1000);
        let kept = apply_filters(vec![candidate("B0HWCAR001", "Hot Wheels Car", Some("500"))], &cfg);
        assert_eq!(kept[0].link, "https://www.amazon.co.jp/dp/B0HWCAR001");
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let cfg = cfg(100, 5000);
        let items = apply_filters(
            vec![
                candidate("B000000001", "Hot Wheels A", Some("500")),
                candidate("B000000002", "Hot Wheels B", Some("600")),
                candidate("B000000001", "Hot Wheels A restock", Some("700")),
            ],
            &cfg,
        );
        let unique = dedup_by_asin(items);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].asin, "B000000001");
        assert_eq!(unique[0].price_minor, 500, "first occurrence wins");
        assert_eq!(unique[1].asin, "B000000002");
    }
}
