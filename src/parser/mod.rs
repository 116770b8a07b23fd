pub mod extract;
pub mod filter;

pub use filter::{Listing, PRICE_UNKNOWN};

use crate::config::Config;

/// One parsed page: how many raw candidates the extractor saw (zero means
/// the page layout was unrecognized or empty) and the filtered, deduplicated
/// items in page order.
pub struct PageSnapshot {
    pub candidate_count: usize,
    pub items: Vec<Listing>,
}

/// Full snapshot pipeline: extract -> classify -> dedup.
pub fn process_document(html: &str, cfg: &Config) -> PageSnapshot {
    let candidates = extract::extract_candidates(html);
    let candidate_count = candidates.len();
    let items = filter::dedup_by_asin(filter::apply_filters(candidates, cfg));
    PageSnapshot {
        candidate_count,
        items,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/search_results.html").unwrap()
    }

    fn cfg(min: i64, max: i64) -> Config {
        Config {
            min_price: min,
            max_price: max,
            ..Config::default()
        }
    }

    #[test]
    fn fixture_pipeline_end_to_end() {
        let snapshot = process_document(&fixture(), &cfg(800, 3000));
        assert_eq!(snapshot.candidate_count, 7);

        let asins: Vec<&str> = snapshot.items.iter().map(|l| l.asin.as_str()).collect();
        // 002 and 003 are ads, the Tomica misses the keywords, 005 has no
        // parseable price, and the duplicate 001 is removed.
        assert_eq!(asins, ["B0HWCAR001", "B0HWCAR006"]);
        assert_eq!(snapshot.items[0].price_minor, 1580);
        assert_eq!(snapshot.items[1].price_minor, 2480);
    }

    #[test]
    fn forwarded_ids_are_distinct_and_filtered() {
        // Dedup law: pairwise-distinct ASINs, all of which passed the filters.
        let snapshot = process_document(&fixture(), &cfg(0, 5000));
        let mut asins: Vec<&str> = snapshot.items.iter().map(|l| l.asin.as_str()).collect();
        let before = asins.len();
        asins.sort_unstable();
        asins.dedup();
        assert_eq!(asins.len(), before);
    }

    #[test]
    fn scenario_three_items_one_novel_candidate() {
        // A passes, B is a sponsored placement, C misses the keyword set.
        let html = r#"
        <div data-component-type="s-search-result" data-asin="B00000000A">
          <h2><a><span>Hot Wheels Racer</span></a></h2>
          <span class="a-price"><span class="a-price-whole">500</span></span>
        </div>
        <div data-component-type="s-search-result" data-asin="B00000000B" data-ad-details="x">
          <h2><a><span>Sponsored Hot Wheels Racer</span></a></h2>
          <span class="a-price"><span class="a-price-whole">300</span></span>
        </div>
        <div data-component-type="s-search-result" data-asin="B00000000C">
          <h2><a><span>Random Toy</span></a></h2>
          <span class="a-price"><span class="a-price-whole">400</span></span>
        </div>"#;

        let cfg = Config {
            min_price: 100,
            max_price: 1000,
            keywords: vec!["hot wheels".to_string()],
            ..Config::default()
        };
        let snapshot = process_document(html, &cfg);
        assert_eq!(snapshot.candidate_count, 3);
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.items[0].asin, "B00000000A");
        assert_eq!(snapshot.items[0].price_minor, 500);
    }
}
