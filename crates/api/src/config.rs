//! Process configuration, read once from the environment at startup.
//!
//! A `.env` file in the working directory is honored (via `dotenvy`) but real
//! environment variables take precedence.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_JWT_TTL_MINUTES: i64 = 60;
const DEFAULT_JWT_REFRESH_TTL_MINUTES: i64 = 7 * 24 * 60;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is required when {because}")]
    Missing { var: &'static str, because: &'static str },

    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Credentials of the account created (or promoted to admin) at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdminBootstrap").field("email", &self.email).finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    /// Lifetime of the `refresh_token` cookie issued at login.
    pub jwt_refresh_ttl: Duration,
    pub bind_addr: SocketAddr,
    /// `Some` when documents should be persisted in Postgres.
    pub database_url: Option<String>,
    /// `None` keeps cached collections until this process changes them.
    pub cache_ttl: Option<Duration>,
    /// Largest request body the access control layer buffers for filtering.
    pub max_body_bytes: usize,
    pub admin: Option<AdminBootstrap>,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("jwt_ttl", &self.jwt_ttl)
            .field("jwt_refresh_ttl", &self.jwt_refresh_ttl)
            .field("bind_addr", &self.bind_addr)
            .field("persistent", &self.database_url.is_some())
            .field("cache_ttl", &self.cache_ttl)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("admin", &self.admin)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// In-memory configuration with the given signing secret.
    pub fn for_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_ttl: Duration::minutes(DEFAULT_JWT_TTL_MINUTES),
            jwt_refresh_ttl: Duration::minutes(DEFAULT_JWT_REFRESH_TTL_MINUTES),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: None,
            cache_ttl: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            admin: None,
        }
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let jwt_ttl = match var("JWT_TTL_MINUTES") {
            Some(raw) => Duration::minutes(parse_positive("JWT_TTL_MINUTES", &raw)?),
            None => Duration::minutes(DEFAULT_JWT_TTL_MINUTES),
        };

        let jwt_refresh_ttl = match var("JWT_REFRESH_TTL_MINUTES") {
            Some(raw) => Duration::minutes(parse_positive("JWT_REFRESH_TTL_MINUTES", &raw)?),
            None => Duration::minutes(DEFAULT_JWT_REFRESH_TTL_MINUTES),
        };
        if jwt_refresh_ttl <= jwt_ttl {
            return Err(ConfigError::Invalid {
                var: "JWT_REFRESH_TTL_MINUTES",
                value: jwt_refresh_ttl.num_minutes().to_string(),
                reason: "must be longer than JWT_TTL_MINUTES".to_string(),
            });
        }

        let bind_raw = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            var: "BIND_ADDR",
            value: bind_raw.clone(),
            reason: e.to_string(),
        })?;

        let persistent = match var("USE_PERSISTENT_STORES") {
            Some(raw) => parse_flag("USE_PERSISTENT_STORES", &raw)?,
            None => false,
        };
        let database_url = if persistent {
            Some(var("DATABASE_URL").ok_or(ConfigError::Missing {
                var: "DATABASE_URL",
                because: "USE_PERSISTENT_STORES is enabled",
            })?)
        } else {
            None
        };

        let cache_ttl = var("CACHE_TTL_SECONDS")
            .map(|raw| parse_positive("CACHE_TTL_SECONDS", &raw).map(Duration::seconds))
            .transpose()?;

        let max_body_bytes = match var("MAX_BODY_BYTES") {
            Some(raw) => raw.parse::<usize>().map_err(|e| ConfigError::Invalid {
                var: "MAX_BODY_BYTES",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            (Some(_), None) => {
                return Err(ConfigError::Missing {
                    var: "ADMIN_PASSWORD",
                    because: "ADMIN_EMAIL is set",
                });
            }
            _ => None,
        };

        Ok(Self {
            jwt_secret,
            jwt_ttl,
            jwt_refresh_ttl,
            bind_addr,
            database_url,
            cache_ttl,
            max_body_bytes,
            admin,
        })
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<i64, ConfigError> {
    match raw.parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        Err(e) => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.jwt_ttl, Duration::minutes(60));
        assert_eq!(cfg.jwt_refresh_ttl, Duration::days(7));
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert!(cfg.database_url.is_none());
        assert!(cfg.cache_ttl.is_none());
        assert_eq!(cfg.max_body_bytes, 1024 * 1024);
        assert!(cfg.admin.is_none());
    }

    #[test]
    fn persistent_stores_require_a_database_url() {
        let err = config(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { var: "DATABASE_URL", .. }));

        let cfg = config(&[
            ("USE_PERSISTENT_STORES", "1"),
            ("DATABASE_URL", "postgres://localhost/aula"),
        ])
        .unwrap();
        assert_eq!(cfg.database_url.as_deref(), Some("postgres://localhost/aula"));
    }

    #[test]
    fn numeric_settings_are_validated() {
        assert!(matches!(
            config(&[("CACHE_TTL_SECONDS", "0")]),
            Err(ConfigError::Invalid { var: "CACHE_TTL_SECONDS", .. })
        ));
        assert!(matches!(
            config(&[("JWT_TTL_MINUTES", "soon")]),
            Err(ConfigError::Invalid { var: "JWT_TTL_MINUTES", .. })
        ));

        let cfg = config(&[("CACHE_TTL_SECONDS", "30"), ("MAX_BODY_BYTES", "2048")]).unwrap();
        assert_eq!(cfg.cache_ttl, Some(Duration::seconds(30)));
        assert_eq!(cfg.max_body_bytes, 2048);
    }

    #[test]
    fn refresh_lifetime_must_exceed_access_lifetime() {
        assert!(matches!(
            config(&[("JWT_TTL_MINUTES", "120"), ("JWT_REFRESH_TTL_MINUTES", "60")]),
            Err(ConfigError::Invalid { var: "JWT_REFRESH_TTL_MINUTES", .. })
        ));
        let cfg = config(&[("JWT_REFRESH_TTL_MINUTES", "1440")]).unwrap();
        assert_eq!(cfg.jwt_refresh_ttl, Duration::days(1));
    }

    #[test]
    fn admin_email_without_password_is_rejected() {
        assert!(matches!(
            config(&[("ADMIN_EMAIL", "root@aula.dev")]),
            Err(ConfigError::Missing { var: "ADMIN_PASSWORD", .. })
        ));
    }
}
