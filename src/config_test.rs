use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| vars.get(key).cloned()
}

const REQUIRED: [(&str, &str); 3] = [
    ("SUPABASE_URL", "https://project.supabase.co/"),
    ("SUPABASE_ANON_KEY", "anon"),
    ("DATABASE_URL", "postgres://localhost/portal"),
];

#[test]
fn defaults_apply() {
    let cfg = PortalConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
    assert_eq!(cfg.platform.url, "https://project.supabase.co");
    assert_eq!(cfg.platform.avatar_bucket, DEFAULT_AVATAR_BUCKET);
    assert_eq!(
        cfg.platform.timeouts,
        PlatformTimeouts {
            request_secs: DEFAULT_PLATFORM_REQUEST_TIMEOUT_SECS,
            connect_secs: DEFAULT_PLATFORM_CONNECT_TIMEOUT_SECS,
        }
    );
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
}

#[test]
fn overrides_apply() {
    let mut pairs = REQUIRED.to_vec();
    pairs.extend([
        ("PORT", "8080"),
        ("DB_MAX_CONNECTIONS", "12"),
        ("PLATFORM_REQUEST_TIMEOUT_SECS", "5"),
        ("PLATFORM_CONNECT_TIMEOUT_SECS", "2"),
        ("AVATAR_BUCKET", "faces"),
    ]);
    let cfg = PortalConfig::from_lookup(lookup_from(&pairs)).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.db_max_connections, 12);
    assert_eq!(cfg.platform.timeouts, PlatformTimeouts { request_secs: 5, connect_secs: 2 });
    assert_eq!(cfg.platform.avatar_bucket, "faces");
}

#[test]
fn missing_required_variable() {
    for skip in 0..REQUIRED.len() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, pair)| *pair)
            .collect();
        assert_eq!(
            PortalConfig::from_lookup(lookup_from(&pairs)),
            Err(ConfigError::Missing(REQUIRED[skip].0))
        );
    }
}

#[test]
fn blank_required_variable_counts_as_missing() {
    let mut pairs = REQUIRED.to_vec();
    pairs[1] = ("SUPABASE_ANON_KEY", "  ");
    assert_eq!(
        PortalConfig::from_lookup(lookup_from(&pairs)),
        Err(ConfigError::Missing("SUPABASE_ANON_KEY"))
    );
}

#[test]
fn invalid_port_is_an_error() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("PORT", "eighty"));
    assert!(matches!(
        PortalConfig::from_lookup(lookup_from(&pairs)),
        Err(ConfigError::Invalid { var: "PORT", .. })
    ));
}

#[test]
fn malformed_numbers_fall_back_to_defaults() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("DB_MAX_CONNECTIONS", "lots"));
    let cfg = PortalConfig::from_lookup(lookup_from(&pairs)).unwrap();
    assert_eq!(cfg.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
}

#[test]
fn platform_url_needs_scheme() {
    let mut pairs = REQUIRED.to_vec();
    pairs[0] = ("SUPABASE_URL", "project.supabase.co");
    assert!(matches!(
        PortalConfig::from_lookup(lookup_from(&pairs)),
        Err(ConfigError::Invalid { var: "SUPABASE_URL", .. })
    ));
}

#[test]
fn debug_output_hides_secrets() {
    let cfg = PortalConfig::from_lookup(lookup_from(&REQUIRED)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("anon\""));
    assert!(!rendered.contains("postgres://"));
}
