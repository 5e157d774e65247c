//! Facet and store configuration, loaded from the environment.

use std::env;

/// Configuration for a `Facet` instance.
#[derive(Debug, Clone)]
pub struct FacetConfig {
    /// Name used to tag every record this facet writes (and to reject
    /// records belonging to a different facet on read).
    pub facet_name: String,
    /// Store connection configuration.
    pub store: StoreConfig,
}

/// Configuration for the backing store.
///
/// Only meaningful when the `dynamodb` feature is in use; the
/// in-memory backend ignores it, but it still loads so a single
/// `FacetConfig::from_env()` call works regardless of which backend a
/// binary ultimately wires up.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// DynamoDB table name holding state/inbound/outbound rows.
    pub table_name: String,
    /// AWS region to connect to.
    pub region: String,
    /// Maximum retries for a transactional write before giving up.
    pub max_retries: u32,
}

/// Errors produced while loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable held a value that failed to parse.
    #[error("invalid {key}: {value}")]
    Invalid {
        /// The environment variable name.
        key: String,
        /// The value that failed to parse.
        value: String,
    },
}

impl FacetConfig {
    /// Load configuration from environment variables, reading a `.env`
    /// file first if one is present.
    pub fn from_env(facet_name: impl Into<String>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Ok(Self { facet_name: facet_name.into(), store: StoreConfig::from_env()? })
    }

    /// A configuration suitable for tests: the in-memory backend never
    /// reads `store`, so its values are placeholders.
    pub fn test(facet_name: impl Into<String>) -> Self {
        Self { facet_name: facet_name.into(), store: StoreConfig::test() }
    }
}

impl StoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let table_name = env::var("FACETSTORE_TABLE_NAME").unwrap_or_else(|_| "facetstore".to_string());
        let region = env::var("FACETSTORE_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let max_retries_str = env::var("FACETSTORE_MAX_RETRIES").unwrap_or_else(|_| "3".to_string());
        let max_retries = max_retries_str
            .parse()
            .map_err(|_| ConfigError::Invalid { key: "FACETSTORE_MAX_RETRIES".into(), value: max_retries_str })?;

        Ok(Self { table_name, region, max_retries })
    }

    /// A configuration suitable for tests against the in-memory backend.
    pub fn test() -> Self {
        Self { table_name: "facetstore-test".to_string(), region: "us-east-1".to_string(), max_retries: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_has_stable_defaults() {
        let config = FacetConfig::test("widget");
        assert_eq!(config.facet_name, "widget");
        assert_eq!(config.store.table_name, "facetstore-test");
        assert_eq!(config.store.max_retries, 3);
    }
}
