use tracing::debug;

use crate::config::Config;
use crate::notify::NotificationEvent;
use crate::parser::Listing;
use crate::state::MemoryState;

/// Why an item is worth notifying about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Novelty {
    /// ASIN not present in memory.
    Unseen,
    /// Known ASIN whose remembered price was above the cap and whose current
    /// price is back inside the accepted range.
    PriceDrop,
}

/// An unseen id is novel; a previously-too-expensive id that now fits the
/// price range re-triggers. Everything else is old news.
pub fn classify_novelty(item: &Listing, state: &MemoryState, cfg: &Config) -> Option<Novelty> {
    match state.price_of(&item.asin) {
        None => Some(Novelty::Unseen),
        Some(last) if last > cfg.max_price && item.price_minor <= cfg.max_price => {
            Some(Novelty::PriceDrop)
        }
        Some(_) => None,
    }
}

/// One event per novel item, in page order. Pacing is the notifier's job.
pub fn novelty_events(
    items: &[Listing],
    state: &MemoryState,
    cfg: &Config,
) -> Vec<NotificationEvent> {
    items
        .iter()
        .filter_map(|item| match classify_novelty(item, state, cfg)? {
            Novelty::Unseen => Some(NotificationEvent::new_item(item)),
            Novelty::PriceDrop => Some(NotificationEvent::price_drop(item)),
        })
        .collect()
}

/// Merge this run's items into memory (latest price wins, insertion position
/// kept), then evict oldest-first down to capacity.
pub fn commit(items: &[Listing], state: &mut MemoryState, capacity: usize) {
    for item in items {
        state.remember(&item.asin, item.price_minor);
    }
    state.enforce_capacity(capacity);
    debug!("memory now holds {} items", state.len());
}

/// Count one completed automatic run. Returns true when the liveness ping is
/// due; the counter wraps to zero at that point.
pub fn advance_heartbeat(state: &mut MemoryState, every: u32) -> bool {
    state.run_count += 1;
    if every > 0 && state.run_count >= every {
        state.run_count = 0;
        return true;
    }
    false
}

// ── Tests ──
