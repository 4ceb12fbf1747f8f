use super::*;
use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_use_simulated_delivery() {
    let settings = Settings::default();
    assert_eq!(settings.delivery, DeliveryKind::Simulated);
    assert_eq!(settings.simulated_latency, Duration::from_millis(1500));
    assert_eq!(settings.toast_ttl, DEFAULT_TOAST_TTL);
    assert_eq!(settings.stagger_interval, None);
    assert!(settings.relay_disable_captcha);
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file(
        &mut settings,
        r#"
            stagger_interval_ms = 120
            toast_ttl_ms = 8000
            delivery_strategy = "relay"
            relay_endpoint = "https://relay.example.com/inbox"
            relay_disable_captcha = false
        "#,
    )
    .expect("valid toml");

    assert_eq!(settings.stagger_interval, Some(Duration::from_millis(120)));
    assert_eq!(settings.toast_ttl, Duration::from_secs(8));
    assert_eq!(settings.delivery, DeliveryKind::Relay);
    assert_eq!(
        settings.relay_endpoint.as_deref(),
        Some("https://relay.example.com/inbox")
    );
    assert!(!settings.relay_disable_captcha);
    assert_eq!(settings.simulated_latency, Duration::from_millis(1500));
}

#[test]
fn env_overrides_file_values() {
    let mut settings = Settings::default();
    apply_file(&mut settings, "toast_ttl_ms = 8000").expect("toml");
    apply_env(
        &mut settings,
        env_from(&[
            ("APP__TOAST_TTL_MS", "2000"),
            ("APP__DELIVERY_STRATEGY", "Relay"),
            ("APP__RELAY_DISABLE_CAPTCHA", "no"),
        ]),
    )
    .expect("env");
    assert_eq!(settings.toast_ttl, Duration::from_secs(2));
    assert_eq!(settings.delivery, DeliveryKind::Relay);
    assert!(!settings.relay_disable_captcha);
}

#[test]
fn malformed_env_values_are_errors() {
    let mut settings = Settings::default();
    assert!(apply_env(&mut settings, env_from(&[("APP__TOAST_TTL_MS", "soon")])).is_err());
    assert!(apply_env(&mut settings, env_from(&[("APP__DELIVERY_STRATEGY", "pigeon")])).is_err());
}

#[test]
fn unknown_strategy_in_file_is_an_error() {
    let mut settings = Settings::default();
    assert!(apply_file(&mut settings, "delivery_strategy = \"pigeon\"").is_err());
}

#[test]
fn loads_settings_from_explicit_file() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("portfolio_settings_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");
    let path = temp_root.join(SETTINGS_FILE);
    fs::write(&path, "simulated_latency_ms = 250\n").expect("write settings");

    let settings = load_settings_from(Some(&path)).expect("load");
    assert_eq!(settings.simulated_latency, Duration::from_millis(250));

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let path = env::temp_dir().join("portfolio_settings_missing_test").join(SETTINGS_FILE);
    assert!(load_settings_from(Some(&path)).is_err());
}

#[test]
fn relay_strategy_requires_a_valid_endpoint() {
    let mut settings = Settings {
        delivery: DeliveryKind::Relay,
        ..Settings::default()
    };
    assert!(build_delivery(&settings).is_err());

    settings.relay_endpoint = Some("not a url".into());
    assert!(build_delivery(&settings).is_err());

    settings.relay_endpoint = Some("https://relay.example.com/inbox".into());
    settings.relay_redirect_url = Some("https://example.com/thank-you".into());
    let strategy = build_delivery(&settings).expect("relay");
    assert_eq!(strategy.name(), "relay");
}

#[test]
fn simulated_strategy_is_the_default() {
    let strategy = build_delivery(&Settings::default()).expect("simulated");
    assert_eq!(strategy.name(), "simulated");
}
