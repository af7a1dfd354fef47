use super::config::ServiceLabels;
use anyhow::{Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const QUEUE_CAPACITY: usize = 256;
const DISCORD_CONTENT_LIMIT: usize = 2000;
const REDACTED: &str = "[REDACTED]";

#[derive(Clone, Debug)]
pub(crate) struct AlertRecord {
    pub(crate) level: Level,
    pub(crate) at: DateTime<Utc>,
    pub(crate) target: String,
    pub(crate) location: Option<String>,
    pub(crate) message: Option<String>,
    pub(crate) fields: BTreeMap<String, String>,
}

/// Forwards events at or above `min_level` to the Discord sink task.
pub(crate) struct AlertLayer {
    tx: mpsc::Sender<AlertRecord>,
    min_level: Level,
}

impl AlertLayer {
    pub(crate) fn spawn(webhook_url: url::Url, labels: ServiceLabels, min_level: Level) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(run_discord_sink(webhook_url, labels, rx));
        Self { tx, min_level }
    }
}

impl<S: Subscriber> Layer<S> for AlertLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > self.min_level || metadata.target() == module_path!() {
            return;
        }

        let mut visitor = RedactingVisitor::default();
        event.record(&mut visitor);
        let message = visitor.fields.remove("message");

        let record = AlertRecord {
            level: *metadata.level(),
            at: Utc::now(),
            target: metadata.target().to_string(),
            location: metadata
                .file()
                .zip(metadata.line())
                .map(|(file, line)| format!("{file}:{line}")),
            message,
            fields: visitor.fields,
        };

        if self.tx.try_send(record).is_err() {
            warn!("alerts: queue unavailable, dropping record");
        }
    }
}

#[derive(Default)]
struct RedactingVisitor {
    fields: BTreeMap<String, String>,
}

impl RedactingVisitor {
    fn put(&mut self, field: &Field, value: String) {
        let name = field.name();
        let value = if is_sensitive(name) {
            REDACTED.to_string()
        } else {
            value
        };
        self.fields.insert(name.to_string(), value);
    }
}

impl Visit for RedactingVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

pub(crate) fn is_sensitive(field_name: &str) -> bool {
    let field = field_name.to_ascii_lowercase();
    [
        "secret",
        "token",
        "password",
        "authorization",
        "webhook",
        "signature",
        "jwt",
    ]
    .iter()
    .any(|needle| field.contains(needle))
}

async fn run_discord_sink(
    webhook_url: url::Url,
    labels: ServiceLabels,
    mut rx: mpsc::Receiver<AlertRecord>,
) {
    let client = Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .unwrap_or_else(|_| Client::new());

    while let Some(record) = rx.recv().await {
        let content = render(&labels, &record);
        if let Err(err) = post(&client, &webhook_url, content).await {
            warn!(error = %err, "alerts: discord delivery failed");
        }
    }
}

async fn post(client: &Client, webhook_url: &url::Url, content: String) -> Result<()> {
    let response = client
        .post(webhook_url.clone())
        .json(&json!({ "content": content }))
        .send()
        .await
        // reqwest errors carry the URL, which embeds the webhook token.
        .map_err(|err| anyhow!("discord request failed (timeout: {})", err.is_timeout()))?;

    if !response.status().is_success() {
        return Err(anyhow!("discord returned {}", response.status()));
    }
    Ok(())
}

pub(crate) fn render(labels: &ServiceLabels, record: &AlertRecord) -> String {
    let mut lines = vec![
        format!(
            "**{}** `{}` `{}` `{}`",
            labels.service, labels.stage, labels.component, record.level
        ),
        format!(
            "`{}` `{}`{}",
            record.at.to_rfc3339_opts(SecondsFormat::Secs, true),
            record.target,
            record
                .location
                .as_ref()
                .map(|location| format!(" `{location}`"))
                .unwrap_or_default()
        ),
    ];

    if let Some(message) = record.message.as_deref().map(str::trim) {
        if !message.is_empty() {
            lines.push(format!("> {message}"));
        }
    }

    for (key, value) in &record.fields {
        lines.push(format!("- `{key}` = `{value}`"));
    }

    truncate(lines.join("\n"))
}

fn truncate(content: String) -> String {
    const SUFFIX: &str = "\n... (truncated)";

    if content.chars().count() <= DISCORD_CONTENT_LIMIT {
        return content;
    }

    let keep = DISCORD_CONTENT_LIMIT - SUFFIX.len();
    let mut truncated: String = content.chars().take(keep).collect();
    truncated.push_str(SUFFIX);
    truncated
}
