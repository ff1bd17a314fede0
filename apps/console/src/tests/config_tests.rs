use super::{load_settings, resolve_settings, Settings};

use std::{
    collections::HashMap,
    env, fs,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_without_file_or_env() {
    let settings = resolve_settings(None, env_of(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.poll_interval(), Duration::from_secs(2));
    assert_eq!(settings.poll_timeout(), Some(Duration::from_secs(300)));
}

#[test]
fn file_overrides_defaults_and_env_overrides_file() {
    let file = r#"
        server_url = "http://trips.internal:9000"
        poll_interval_ms = 1500
        date_format = "%Y-%m-%d"
    "#;
    let settings = resolve_settings(
        Some(file),
        env_of(&[("APP__POLL_INTERVAL_MS", "3000"), ("APP__NOTICE_TTL_SECS", "8")]),
    );

    assert_eq!(settings.server_url, "http://trips.internal:9000");
    assert_eq!(settings.poll_interval_ms, 3000);
    assert_eq!(settings.notice_ttl_secs, 8);
    assert_eq!(settings.date_format, "%Y-%m-%d");
}

#[test]
fn app_server_url_wins_over_legacy_name() {
    let settings = resolve_settings(
        None,
        env_of(&[
            ("TRIP_CONSOLE_SERVER_URL", "http://legacy:1"),
            ("APP__SERVER_URL", "http://current:2"),
        ]),
    );
    assert_eq!(settings.server_url, "http://current:2");
}

#[test]
fn malformed_values_are_ignored() {
    let settings = resolve_settings(
        Some("poll_interval_ms = \"fast\""),
        env_of(&[("APP__POLL_TIMEOUT_SECS", "soon")]),
    );
    assert_eq!(settings, Settings::default());
}

#[test]
fn zero_disables_timeouts_and_interval_is_floored() {
    let settings = resolve_settings(
        None,
        env_of(&[
            ("APP__POLL_TIMEOUT_SECS", "0"),
            ("APP__REQUEST_TIMEOUT_SECS", "0"),
            ("APP__POLL_INTERVAL_MS", "1"),
        ]),
    );
    assert_eq!(settings.poll_timeout(), None);
    assert_eq!(settings.request_timeout(), None);
    assert_eq!(settings.poll_interval(), Duration::from_millis(100));

    let options = settings.console_options();
    assert_eq!(options.poll.timeout, None);
    assert_eq!(options.poll.interval, Duration::from_millis(100));
}

#[test]
fn loads_settings_file_from_disk() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("trip_console_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp dir");
    let path = temp_root.join("trip_console.toml");
    fs::write(&path, "notice_ttl_secs = 12\n").expect("write config");

    let settings = load_settings(&path);
    assert_eq!(settings.notice_ttl_secs, 12);

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let settings = load_settings(&env::temp_dir().join("trip_console_does_not_exist.toml"));
    assert_eq!(settings.poll_timeout_secs, Settings::default().poll_timeout_secs);
}
