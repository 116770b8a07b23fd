use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::RunError;

const FETCH_TIMEOUT_SECS: u64 = 30;
const MAX_RETRIES: u32 = 2;
const BASE_BACKOFF_MS: u64 = 2000;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Challenge-page markers. Any of these in a 2xx body means the request was
/// served an interstitial instead of search results.
const BLOCK_SIGNATURES: &[&str] = &[
    "api-services-support@amazon.com",
    "Enter the characters you see below",
    "validateCaptcha",
    "To discuss automated access",
];

/// Classification of a fetch outcome, decided before extraction runs.
#[derive(Debug, PartialEq, Eq)]
pub enum FetchClass {
    Ok,
    NonOk { status: u16 },
    Blocked { signature: &'static str },
}

pub fn classify(status: u16, body: &str) -> FetchClass {
    if !(200..300).contains(&status) {
        return FetchClass::NonOk { status };
    }
    match block_signature(body) {
        Some(signature) => FetchClass::Blocked { signature },
        None => FetchClass::Ok,
    }
}

pub fn block_signature(body: &str) -> Option<&'static str> {
    BLOCK_SIGNATURES.iter().copied().find(|sig| body.contains(sig))
}

pub fn build_client() -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
            .parse()
            .expect("static header value"),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        "ja,en-US;q=0.9,en;q=0.8".parse().expect("static header value"),
    );

    Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .context("Failed to create HTTP client")
}

/// Fetch the search-results page, retrying transient failures with backoff.
/// Returns the usable body, or the abort reason for this run.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, RunError> {
    for attempt in 0..=MAX_RETRIES {
        match fetch_once(client, url).await {
            Ok((status, body)) => match classify(status, &body) {
                FetchClass::Ok => {
                    debug!("fetched {} ({} bytes)", url, body.len());
                    return Ok(body);
                }
                FetchClass::Blocked { signature } => {
                    return Err(RunError::Blocked { signature });
                }
                FetchClass::NonOk { status } => {
                    if !retryable(status) || attempt == MAX_RETRIES {
                        return Err(RunError::FetchFailed(format!("HTTP {} for {}", status, url)));
                    }
                    backoff(attempt, &format!("HTTP {}", status)).await;
                }
            },
            Err(e) => {
                if attempt == MAX_RETRIES {
                    return Err(RunError::FetchFailed(e.to_string()));
                }
                backoff(attempt, &e.to_string()).await;
            }
        }
    }
    Err(RunError::FetchFailed("retries exhausted".to_string()))
}

fn retryable(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

async fn backoff(attempt: u32, reason: &str) {
    let delay = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
    warn!(
        "Fetch attempt {}/{} failed ({}), backing off {:.1}s",
        attempt + 1,
        MAX_RETRIES + 1,
        reason,
        delay.as_secs_f64()
    );
    tokio::time::sleep(delay).await;
}

async fn fetch_once(client: &Client, url: &str) -> reqwest::Result<(u16, String)> {
    let response = client.get(url).send().await?;
    let status = response.status().as_u16();
    let body = response.text().await?;
    Ok((status, body))
}

// ── Tests ──
