//! Portal configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_PLATFORM_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PLATFORM_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_AVATAR_BUCKET: &str = "avatars";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Where the hosted platform lives and how to reach it.
#[derive(Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub url: String,
    pub anon_key: String,
    pub avatar_bucket: String,
    pub timeouts: PlatformTimeouts,
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .field("avatar_bucket", &self.avatar_bucket)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub platform: PlatformConfig,
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
}

impl std::fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalConfig")
            .field("platform", &self.platform)
            .field("database_url", &"<redacted>")
            .field("port", &self.port)
            .field("db_max_connections", &self.db_max_connections)
            .finish()
    }
}

impl PortalConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`, `SUPABASE_ANON_KEY`
    /// - `DATABASE_URL` (service connection used by the reset endpoint)
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `PLATFORM_REQUEST_TIMEOUT_SECS`: default 30
    /// - `PLATFORM_CONNECT_TIMEOUT_SECS`: default 10
    /// - `AVATAR_BUCKET`: default `avatars`
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] over an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing or malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let url = required("SUPABASE_URL")?;
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::Invalid { var: "SUPABASE_URL", value: url });
        }
        let anon_key = required("SUPABASE_ANON_KEY")?;
        let database_url = required("DATABASE_URL")?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { var: "PORT", value: raw })?,
            None => DEFAULT_PORT,
        };

        let avatar_bucket = lookup("AVATAR_BUCKET")
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_AVATAR_BUCKET.to_owned());
        let timeouts = PlatformTimeouts {
            request_secs: parse_or(&lookup, "PLATFORM_REQUEST_TIMEOUT_SECS", DEFAULT_PLATFORM_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_or(&lookup, "PLATFORM_CONNECT_TIMEOUT_SECS", DEFAULT_PLATFORM_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            platform: PlatformConfig {
                url: url.trim_end_matches('/').to_owned(),
                anon_key,
                avatar_bucket,
                timeouts,
            },
            database_url,
            port,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
        })
    }
}

/// Parsed value, or `default` when absent or unparseable.
fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
