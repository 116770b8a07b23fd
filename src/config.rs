use std::path::PathBuf;

pub const DEFAULT_SEARCH_URL: &str =
    "https://www.amazon.co.jp/s?k=hot+wheels&s=date-desc-rank";
pub const DEFAULT_STATE_PATH: &str = "data/seen_items.json";

/// Product links are derived from the ASIN alone.
pub const LISTING_URL_BASE: &str = "https://www.amazon.co.jp/dp/";

/// Relevance keywords (lowercase). A title must contain at least one.
pub const DEFAULT_KEYWORDS: &[&str] = &["hot wheels", "ホットウィール", "hotwheels"];

/// Phrases that mark a listing as sponsored when they appear in its rendered text.
pub const DEFAULT_AD_PHRASES: &[&str] = &["sponsored", "スポンサー", "広告", "advertisement"];

/// Per-run settings, loaded once in `main` and passed through the pipeline
/// explicitly. Keyword and ad-phrase lists are stored lowercased.
#[derive(Debug, Clone)]
pub struct Config {
    pub search_url: String,
    pub keywords: Vec<String>,
    pub ad_phrases: Vec<String>,
    /// Inclusive price bounds, in yen.
    pub min_price: i64,
    pub max_price: i64,
    /// Let items with an unparseable price through the price filter.
    pub allow_unknown_price: bool,
    /// Max remembered items; oldest-inserted evicted first.
    pub memory_capacity: usize,
    /// Liveness ping every this many automatic runs.
    pub heartbeat_every: u32,
    pub state_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            keywords: DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            ad_phrases: DEFAULT_AD_PHRASES.iter().map(|s| s.to_string()).collect(),
            min_price: 0,
            max_price: 5000,
            allow_unknown_price: false,
            memory_capacity: 50,
            heartbeat_every: 12,
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
        }
    }
}

pub fn listing_url(asin: &str) -> String {
    format!("{}{}", LISTING_URL_BASE, asin)
}
