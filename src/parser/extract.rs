use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// One way of locating result containers in the document. Strategies are
/// tried in order; the first one that matches anything wins.
struct ContainerStrategy {
    name: &'static str,
    selector: Selector,
}

static CONTAINER_STRATEGIES: LazyLock<Vec<ContainerStrategy>> = LazyLock::new(|| {
    [
        ("search-result", "div[data-component-type='s-search-result']"),
        ("result-item", "div.s-result-item[data-asin]"),
        ("any-asin", "div[data-asin]"),
    ]
    .into_iter()
    .map(|(name, css)| ContainerStrategy {
        name,
        selector: Selector::parse(css).expect("static selector"),
    })
    .collect()
});

/// Title lookups within a container, tightest first.
static TITLE_STRATEGIES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["h2 a span", "h2 span", "h2"]
        .into_iter()
        .map(|css| Selector::parse(css).expect("static selector"))
        .collect()
});

static PRICE_STRATEGIES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["span.a-price-whole", "span.a-price span.a-offscreen"]
        .into_iter()
        .map(|css| Selector::parse(css).expect("static selector"))
        .collect()
});

static SPONSORED_LABEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.puis-sponsored-label-text").expect("static selector"));

/// A raw result container before classification. Carries everything the
/// filters need: identity, title, ad markers, and the price fragment.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub asin: String,
    pub title: String,
    /// Container carried an explicit ad-details attribute.
    pub ad_attribute: bool,
    /// A sponsored-label element was present inside the container.
    pub sponsored_label: bool,
    /// Rendered text of the whole container, for phrase scanning.
    pub text: String,
    pub price_text: Option<String>,
}

/// Parse a raw document into candidates. Never fails; an unrecognized page
/// simply yields an empty list.
pub fn extract_candidates(html: &str) -> Vec<Candidate> {
    let doc = Html::parse_document(html);
    find_containers(&doc)
        .into_iter()
        .filter_map(candidate_from)
        .collect()
}

fn find_containers(doc: &Html) -> Vec<ElementRef<'_>> {
    for strategy in CONTAINER_STRATEGIES.iter() {
        let found: Vec<_> = doc.select(&strategy.selector).collect();
        if !found.is_empty() {
            debug!("container strategy '{}' matched {} nodes", strategy.name, found.len());
            return found;
        }
    }
    Vec::new()
}

fn candidate_from(el: ElementRef<'_>) -> Option<Candidate> {
    let asin = el.value().attr("data-asin")?.trim().to_string();
    if !is_valid_asin(&asin) {
        return None;
    }

    let title = TITLE_STRATEGIES
        .iter()
        .find_map(|sel| {
            let text = el.select(sel).next().map(element_text)?;
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| format!("Listing {}", asin));

    let price_text = PRICE_STRATEGIES.iter().find_map(|sel| {
        let text = el.select(sel).next().map(element_text)?;
        (!text.is_empty()).then_some(text)
    });

    Some(Candidate {
        ad_attribute: el.value().attr("data-ad-details").is_some(),
        sponsored_label: el.select(&SPONSORED_LABEL).next().is_some(),
        text: element_text(el),
        asin,
        title,
        price_text,
    })
}

/// ASINs are fixed-length alphanumeric tokens.
fn is_valid_asin(asin: &str) -> bool {
    asin.len() == 10 && asin.chars().all(|c| c.is_ascii_alphanumeric())
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

// ── Tests ──
