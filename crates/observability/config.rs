use std::env;
use tracing::Level;
use url::Url;

#[derive(Clone, Debug)]
pub(crate) struct ServiceLabels {
    pub(crate) service: String,
    pub(crate) stage: String,
    pub(crate) component: String,
}

#[derive(Clone, Debug)]
pub(crate) struct AlertSinkConfig {
    pub(crate) webhook_url: Url,
    pub(crate) min_level: Level,
}

#[derive(Clone, Debug)]
pub(crate) struct ObservabilityConfig {
    pub(crate) labels: ServiceLabels,
    pub(crate) alerts: Option<AlertSinkConfig>,
    /// Logged once tracing is up.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        let component = component.trim().to_string();
        let labels = ServiceLabels {
            service: non_empty_var("SERVICE_NAME").unwrap_or_else(|| component.clone()),
            stage: non_empty_var("STAGE").unwrap_or_else(|| "local".to_string()),
            component,
        };

        let (alerts, warnings) = alert_sink_from(
            non_empty_var("DISCORD_NOTIFY_ENABLED").as_deref(),
            non_empty_var("DISCORD_WEBHOOK_URL").as_deref(),
            non_empty_var("DISCORD_NOTIFY_LEVEL").as_deref(),
        );

        Self {
            labels,
            alerts,
            warnings,
        }
    }
}

pub(crate) fn alert_sink_from(
    enabled: Option<&str>,
    webhook_url: Option<&str>,
    level: Option<&str>,
) -> (Option<AlertSinkConfig>, Vec<String>) {
    let mut warnings = Vec::new();

    if !enabled.and_then(parse_bool).unwrap_or(true) {
        return (None, warnings);
    }

    let Some(raw_url) = webhook_url else {
        return (None, warnings);
    };

    let webhook_url = match Url::parse(raw_url) {
        Ok(url) => url,
        Err(err) => {
            // The raw URL embeds a token, only the parse error is reported.
            warnings.push(format!(
                "DISCORD_WEBHOOK_URL is invalid, alerts disabled ({err})"
            ));
            return (None, warnings);
        }
    };

    let min_level = match level {
        None => Level::ERROR,
        Some(raw) => parse_level(raw).unwrap_or_else(|| {
            warnings.push(format!(
                "DISCORD_NOTIFY_LEVEL `{raw}` is not a level, using ERROR"
            ));
            Level::ERROR
        }),
    };

    (
        Some(AlertSinkConfig {
            webhook_url,
            min_level,
        }),
        warnings,
    )
}

fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://discord.com/api/webhooks/1/abc";

    #[test]
    fn alerts_disabled_without_url() {
        let (sink, warnings) = alert_sink_from(None, None, None);
        assert!(sink.is_none());
        assert!(warnings.is_empty());
    }

    #[test]
    fn alerts_disabled_by_flag() {
        let (sink, _) = alert_sink_from(Some("false"), Some(URL), None);
        assert!(sink.is_none());
    }

    #[test]
    fn invalid_url_warns_without_leaking_it() {
        let (sink, warnings) = alert_sink_from(None, Some("not a url/secret"), None);
        assert!(sink.is_none());
        assert_eq!(warnings.len(), 1);
        assert!(!warnings[0].contains("secret"));
    }

    #[test]
    fn level_defaults_to_error() {
        let (sink, warnings) = alert_sink_from(None, Some(URL), Some("loud"));
        assert_eq!(sink.unwrap().min_level, Level::ERROR);
        assert_eq!(warnings.len(), 1);

        let (sink, _) = alert_sink_from(Some("yes"), Some(URL), Some("warn"));
        assert_eq!(sink.unwrap().min_level, Level::WARN);
    }
}
