//! Process configuration read from `CATALOG_*` environment variables.

use thiserror::Error;

pub use catalog_observability::LogFormat;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_MEDIA_BASE_URL: &str = "/media/";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be set when CATALOG_STORE=postgres")]
    Missing { name: &'static str },

    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Which catalog store backs the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres { url: String, max_connections: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub store: StoreBackend,
    /// Prefix joined onto relative image paths.
    pub media_base_url: String,
    /// Seed the demo catalog on startup.
    pub seed: bool,
    pub log_format: LogFormat,
    pub log_level: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            store: StoreBackend::Memory,
            media_base_url: DEFAULT_MEDIA_BASE_URL.to_string(),
            seed: false,
            log_format: LogFormat::Json,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl CatalogConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let store = match get("CATALOG_STORE").as_deref() {
            None | Some("memory") => StoreBackend::Memory,
            Some("postgres") => {
                let url = get("DATABASE_URL").ok_or(ConfigError::Missing { name: "DATABASE_URL" })?;
                let max_connections = match get("CATALOG_DB_MAX_CONNECTIONS") {
                    None => DEFAULT_MAX_CONNECTIONS,
                    Some(raw) => match raw.parse::<u32>() {
                        Ok(n) if n > 0 => n,
                        _ => {
                            return Err(ConfigError::Invalid {
                                name: "CATALOG_DB_MAX_CONNECTIONS",
                                value: raw,
                                reason: "expected a positive integer",
                            });
                        }
                    },
                };
                StoreBackend::Postgres { url, max_connections }
            }
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "CATALOG_STORE",
                    value: other.to_string(),
                    reason: "expected memory or postgres",
                });
            }
        };

        let seed = match get("CATALOG_SEED").as_deref() {
            None => false,
            Some("true" | "1" | "yes") => true,
            Some("false" | "0" | "no") => false,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "CATALOG_SEED",
                    value: other.to_string(),
                    reason: "expected true or false",
                });
            }
        };

        let log_format = match get("CATALOG_LOG_FORMAT").as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("pretty") => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "CATALOG_LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected json or pretty",
                });
            }
        };

        Ok(Self {
            store,
            media_base_url: get("CATALOG_MEDIA_BASE_URL").unwrap_or_else(|| DEFAULT_MEDIA_BASE_URL.to_string()),
            seed,
            log_format,
            log_level: get("CATALOG_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<CatalogConfig, ConfigError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        CatalogConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_to_memory() {
        assert_eq!(config(&[]).unwrap(), CatalogConfig::default());
    }

    #[test]
    fn postgres_needs_database_url() {
        let err = config(&[("CATALOG_STORE", "postgres")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing { name: "DATABASE_URL" });

        let cfg = config(&[
            ("CATALOG_STORE", "postgres"),
            ("DATABASE_URL", "postgres://localhost/catalog"),
            ("CATALOG_DB_MAX_CONNECTIONS", "12"),
        ])
        .unwrap();
        assert_eq!(
            cfg.store,
            StoreBackend::Postgres {
                url: "postgres://localhost/catalog".to_string(),
                max_connections: 12
            }
        );
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = config(&[("CATALOG_STORE", "sqlite")]).unwrap_err();
        assert!(err.to_string().contains("CATALOG_STORE"));

        let err = config(&[("CATALOG_SEED", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("CATALOG_SEED"));

        let err = config(&[
            ("CATALOG_STORE", "postgres"),
            ("DATABASE_URL", "postgres://x"),
            ("CATALOG_DB_MAX_CONNECTIONS", "0"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("CATALOG_DB_MAX_CONNECTIONS"));
    }

    #[test]
    fn reads_presentation_settings() {
        let cfg = config(&[
            ("CATALOG_MEDIA_BASE_URL", "https://cdn.example.com/media"),
            ("CATALOG_SEED", "true"),
            ("CATALOG_LOG_FORMAT", "pretty"),
            ("CATALOG_LOG_LEVEL", "debug"),
        ])
        .unwrap();
        assert_eq!(cfg.media_base_url, "https://cdn.example.com/media");
        assert!(cfg.seed);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.log_level, "debug");
    }
}
