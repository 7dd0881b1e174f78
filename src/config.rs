//! Runtime configuration parsed from environment variables.
//!
//! Every value has a default so a bare `cargo run` starts a usable server
//! backed by the in-memory store. Setting `DATABASE_URL` switches both the
//! vehicle store and the credential verifier to Postgres.

use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_AUTH_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_NEARBY_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Outbound buffer per connection. Events beyond it are dropped.
    pub client_channel_capacity: usize,
    pub auth_timeout: Duration,
    pub nearby_default_radius_km: f64,
    /// Reject `track-vehicle` for ids the store does not know.
    pub require_known_vehicle: bool,
    /// CORS origin. Any origin is allowed when unset.
    pub frontend_url: Option<String>,
    /// `(token, subject)` pairs accepted when no database is configured.
    pub dev_tokens: Vec<(String, String)>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
            auth_timeout: Duration::from_millis(DEFAULT_AUTH_TIMEOUT_MS),
            nearby_default_radius_km: DEFAULT_NEARBY_RADIUS_KM,
            require_known_vehicle: false,
            frontend_url: None,
            dev_tokens: Vec::new(),
        }
    }
}

impl TrackingConfig {
    /// Build config from the process environment.
    ///
    /// Optional:
    /// - `PORT`: default 3001
    /// - `DATABASE_URL`: in-memory store when absent
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `CLIENT_CHANNEL_CAPACITY`: default 256
    /// - `AUTH_TIMEOUT_MS`: default 5000
    /// - `NEARBY_DEFAULT_RADIUS_KM`: default 5
    /// - `TRACK_REQUIRE_KNOWN_VEHICLE`: default false
    /// - `FRONTEND_URL`: CORS origin
    /// - `DEV_TOKENS`: `token:subject,token:subject`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("PORT", defaults.port),
            database_url: env_string("DATABASE_URL"),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", defaults.db_max_connections),
            client_channel_capacity: env_parse("CLIENT_CHANNEL_CAPACITY", defaults.client_channel_capacity).max(1),
            auth_timeout: Duration::from_millis(env_parse("AUTH_TIMEOUT_MS", DEFAULT_AUTH_TIMEOUT_MS)),
            nearby_default_radius_km: env_parse("NEARBY_DEFAULT_RADIUS_KM", defaults.nearby_default_radius_km),
            require_known_vehicle: env_bool("TRACK_REQUIRE_KNOWN_VEHICLE").unwrap_or(defaults.require_known_vehicle),
            frontend_url: env_string("FRONTEND_URL"),
            dev_tokens: env_string("DEV_TOKENS")
                .map(|raw| parse_dev_tokens(&raw))
                .unwrap_or_default(),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

/// Parse `token:subject` pairs. Malformed entries are skipped.
pub(crate) fn parse_dev_tokens(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|entry| {
            let (token, subject) = entry.trim().split_once(':')?;
            let (token, subject) = (token.trim(), subject.trim());
            if token.is_empty() || subject.is_empty() {
                return None;
            }
            Some((token.to_owned(), subject.to_owned()))
        })
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
