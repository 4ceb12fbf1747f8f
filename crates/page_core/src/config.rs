use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context};
use serde::Deserialize;
use url::Url;

use crate::{
    delivery::{DeliveryStrategy, RelayDelivery, SimulatedDelivery},
    toast::DEFAULT_TOAST_TTL,
};

pub const SETTINGS_FILE: &str = "portfolio.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryKind {
    Simulated,
    Relay,
}

impl DeliveryKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "simulated" => Some(Self::Simulated),
            "relay" => Some(Self::Relay),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Overrides every section's own stagger interval when set.
    pub stagger_interval: Option<Duration>,
    pub toast_ttl: Duration,
    pub delivery: DeliveryKind,
    pub simulated_latency: Duration,
    pub relay_endpoint: Option<String>,
    pub relay_redirect_url: Option<String>,
    pub relay_disable_captcha: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stagger_interval: None,
            toast_ttl: DEFAULT_TOAST_TTL,
            delivery: DeliveryKind::Simulated,
            simulated_latency: crate::delivery::DEFAULT_SIMULATED_LATENCY,
            relay_endpoint: None,
            relay_redirect_url: None,
            relay_disable_captcha: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    stagger_interval_ms: Option<u64>,
    toast_ttl_ms: Option<u64>,
    delivery_strategy: Option<DeliveryKind>,
    simulated_latency_ms: Option<u64>,
    relay_endpoint: Option<String>,
    relay_redirect_url: Option<String>,
    relay_disable_captcha: Option<bool>,
}

/// Defaults, then `portfolio.toml` in the working directory (when present),
/// then `APP__*` environment variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    let default_path = PathBuf::from(SETTINGS_FILE);
    let path = default_path.exists().then_some(default_path);
    load_settings_from(path.as_deref())
}

pub fn load_settings_from(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();
    if let Some(path) = path {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?;
    }
    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.stagger_interval_ms {
        settings.stagger_interval = Some(Duration::from_millis(v));
    }
    if let Some(v) = file.toast_ttl_ms {
        settings.toast_ttl = Duration::from_millis(v);
    }
    if let Some(v) = file.delivery_strategy {
        settings.delivery = v;
    }
    if let Some(v) = file.simulated_latency_ms {
        settings.simulated_latency = Duration::from_millis(v);
    }
    if let Some(v) = file.relay_endpoint {
        settings.relay_endpoint = Some(v);
    }
    if let Some(v) = file.relay_redirect_url {
        settings.relay_redirect_url = Some(v);
    }
    if let Some(v) = file.relay_disable_captcha {
        settings.relay_disable_captcha = v;
    }
    Ok(())
}

fn parse_millis(key: &str, raw: &str) -> anyhow::Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .with_context(|| format!("{key} must be a whole number of milliseconds, got '{raw}'"))
}

fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("APP__STAGGER_INTERVAL_MS") {
        settings.stagger_interval = Some(parse_millis("APP__STAGGER_INTERVAL_MS", &v)?);
    }
    if let Some(v) = lookup("APP__TOAST_TTL_MS") {
        settings.toast_ttl = parse_millis("APP__TOAST_TTL_MS", &v)?;
    }
    if let Some(v) = lookup("APP__DELIVERY_STRATEGY") {
        let Some(kind) = DeliveryKind::parse(&v) else {
            bail!("APP__DELIVERY_STRATEGY must be 'simulated' or 'relay', got '{v}'");
        };
        settings.delivery = kind;
    }
    if let Some(v) = lookup("APP__SIMULATED_LATENCY_MS") {
        settings.simulated_latency = parse_millis("APP__SIMULATED_LATENCY_MS", &v)?;
    }
    if let Some(v) = lookup("APP__RELAY_ENDPOINT") {
        settings.relay_endpoint = Some(v);
    }
    if let Some(v) = lookup("APP__RELAY_REDIRECT_URL") {
        settings.relay_redirect_url = Some(v);
    }
    if let Some(v) = lookup("APP__RELAY_DISABLE_CAPTCHA") {
        settings.relay_disable_captcha = matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        );
    }
    Ok(())
}

pub fn build_delivery(settings: &Settings) -> anyhow::Result<Arc<dyn DeliveryStrategy>> {
    match settings.delivery {
        DeliveryKind::Simulated => Ok(Arc::new(SimulatedDelivery::new(settings.simulated_latency))),
        DeliveryKind::Relay => {
            let Some(raw_endpoint) = settings.relay_endpoint.as_deref() else {
                bail!("relay delivery needs relay_endpoint to be configured");
            };
            let endpoint = Url::parse(raw_endpoint)
                .with_context(|| format!("invalid relay endpoint '{raw_endpoint}'"))?;
            let mut relay = RelayDelivery::new(endpoint)
                .context("failed to build relay HTTP client")?
                .with_captcha_disabled(settings.relay_disable_captcha);
            if let Some(raw_redirect) = settings.relay_redirect_url.as_deref() {
                let redirect = Url::parse(raw_redirect)
                    .with_context(|| format!("invalid relay redirect url '{raw_redirect}'"))?;
                relay = relay.with_redirect(redirect);
            }
            Ok(Arc::new(relay))
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
