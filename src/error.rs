use thiserror::Error;

/// Abort reasons for a single run. Both leave the persisted id map untouched;
/// a blocked run still advances the heartbeat counter so a sustained block
/// cannot silently suppress the liveness signal.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("blocked by challenge page (matched {signature:?})")]
    Blocked { signature: &'static str },
}
