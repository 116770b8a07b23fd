use std::env;
use std::time::Duration;

use chrono::Local;
use tracing::{info, warn};

use crate::parser::Listing;

/// Pause between consecutive Telegram messages (their bot API rate limit).
const PACING_DELAY_MS: u64 = 2000;

/// Everything the monitor can tell the outside world. Produced in run order,
/// consumed once, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    NewItem {
        title: String,
        price_display: Option<String>,
        link: String,
    },
    PriceDrop {
        title: String,
        price_display: Option<String>,
        link: String,
    },
    StatusReport {
        summary: String,
    },
    Liveness {
        runs: u32,
    },
    Error {
        message: String,
    },
}

impl NotificationEvent {
    pub fn new_item(item: &Listing) -> Self {
        Self::NewItem {
            title: item.title.clone(),
            price_display: price_display(item),
            link: item.link.clone(),
        }
    }

    pub fn price_drop(item: &Listing) -> Self {
        Self::PriceDrop {
            title: item.title.clone(),
            price_display: price_display(item),
            link: item.link.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::NewItem { .. } => "new-item",
            Self::PriceDrop { .. } => "price-drop",
            Self::StatusReport { .. } => "status-report",
            Self::Liveness { .. } => "liveness",
            Self::Error { .. } => "error",
        }
    }

    /// Telegram HTML message body.
    pub fn render(&self) -> String {
        let now = Local::now().format("%Y-%m-%d %H:%M");
        match self {
            Self::NewItem { title, price_display, link } => format!(
                "🚨 <b>New listing @ {}</b>\n{}\n💰 <b>{}</b>\n🔗 <a href=\"{}\">Open listing</a>",
                now,
                escape_html(title),
                price_display.as_deref().unwrap_or("price unknown"),
                link,
            ),
            Self::PriceDrop { title, price_display, link } => format!(
                "📉 <b>Back in range @ {}</b>\n{}\n💰 <b>{}</b>\n🔗 <a href=\"{}\">Open listing</a>",
                now,
                escape_html(title),
                price_display.as_deref().unwrap_or("price unknown"),
                link,
            ),
            Self::StatusReport { summary } => {
                format!("💤 <b>[{}]</b> {}", now, escape_html(summary))
            }
            Self::Liveness { runs } => format!(
                "✅ <b>[{}]</b> Monitor alive, {} automatic runs completed.",
                now, runs
            ),
            Self::Error { message } => {
                format!("⚠️ <b>[{}] Run failed:</b> {}", now, escape_html(message))
            }
        }
    }
}

fn price_display(item: &Listing) -> Option<String> {
    item.price_known().then(|| format!("¥{}", item.price_minor))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Telegram sink. Without credentials in the environment it degrades to
/// logging each event, which keeps manual checks usable on a dev box.
pub struct Notifier {
    client: reqwest::Client,
    target: Option<Target>,
}

struct Target {
    token: String,
    chat_id: String,
}

impl Notifier {
    pub fn from_env() -> Self {
        let target = match (env::var("TELEGRAM_BOT_TOKEN"), env::var("TELEGRAM_CHAT_ID")) {
            (Ok(token), Ok(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Some(Target { token, chat_id })
            }
            _ => {
                warn!("TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set; logging events instead");
                None
            }
        };
        Self {
            client: reqwest::Client::new(),
            target,
        }
    }

    /// Deliver events in order with a pacing delay between messages.
    /// Delivery is best-effort: transport failures are logged, not fatal,
    /// and never roll back persisted state.
    pub async fn send_all(&self, events: &[NotificationEvent]) {
        for (i, event) in events.iter().enumerate() {
            let Some(target) = &self.target else {
                info!("[{}] {}", event.kind(), event.render());
                continue;
            };
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(PACING_DELAY_MS)).await;
            }
            if let Err(e) = self.send_message(target, &event.render()).await {
                warn!("Failed to deliver {} event: {}", event.kind(), e);
            }
        }
    }

    async fn send_message(&self, target: &Target, text: &str) -> anyhow::Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", target.token);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "chat_id": target.chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": true,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Telegram sendMessage returned HTTP {}", status);
        }
        Ok(())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PRICE_UNKNOWN;

    fn listing(price_minor: i64) -> Listing {
        Listing {
            asin: "B0HWCAR001".to_string(),
            title: "Hot Wheels <Limited> & Rare".to_string(),
            price_minor,
            link: "https://www.amazon.co.jp/dp/B0HWCAR001".to_string(),
        }
    }

    #[test]
    fn new_item_renders_price_and_escaped_title() {
        let rendered = NotificationEvent::new_item(&listing(1580)).render();
        assert!(rendered.contains("¥1580"));
        assert!(rendered.contains("Hot Wheels &lt;Limited&gt; &amp; Rare"));
        assert!(rendered.contains("https://www.amazon.co.jp/dp/B0HWCAR001"));
    }

    #[test]
    fn unknown_price_renders_placeholder() {
        let event = NotificationEvent::new_item(&listing(PRICE_UNKNOWN));
        assert!(matches!(&event, NotificationEvent::NewItem { price_display: None, .. }));
        assert!(event.render().contains("price unknown"));
    }

    #[test]
    fn event_kinds() {
        assert_eq!(NotificationEvent::new_item(&listing(1)).kind(), "new-item");
        assert_eq!(NotificationEvent::price_drop(&listing(1)).kind(), "price-drop");
        assert_eq!(NotificationEvent::Liveness { runs: 12 }.kind(), "liveness");
        assert_eq!(
            NotificationEvent::StatusReport { summary: String::new() }.kind(),
            "status-report"
        );
        assert_eq!(
            NotificationEvent::Error { message: String::new() }.kind(),
            "error"
        );
    }
}
