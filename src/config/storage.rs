//! Storage configuration

use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Which subscription store backs the service
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Dynamodb,
    /// Process-local tables, lost on restart
    Memory,
}

/// Storage configuration (DynamoDB)
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// AWS region
    #[serde(default = "default_region")]
    pub region: String,

    /// Table holding normalized subscription records
    #[serde(default = "default_subscriptions_table")]
    pub subscriptions_table: String,

    /// Legacy subscribers table
    #[serde(default = "default_subscribers_table")]
    pub subscribers_table: String,

    /// Endpoint override, e.g. DynamoDB Local
    pub endpoint_url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            region: default_region(),
            subscriptions_table: default_subscriptions_table(),
            subscribers_table: default_subscribers_table(),
            endpoint_url: None,
        }
    }
}

fn default_region() -> String {
    "eu-north-1".to_string()
}

fn default_subscriptions_table() -> String {
    "stj_subscriptions".to_string()
}

fn default_subscribers_table() -> String {
    "stj_subscribers".to_string()
}

impl StorageConfig {
    /// Validate storage configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.backend == StorageBackend::Memory && *environment == Environment::Production {
            return Err(ValidationError::InMemoryStorageInProduction);
        }
        if self.region.trim().is_empty() {
            return Err(ValidationError::MissingRequired("STORAGE_REGION"));
        }
        if self.subscriptions_table.trim().is_empty() {
            return Err(ValidationError::MissingRequired("STORAGE_SUBSCRIPTIONS_TABLE"));
        }
        if self.subscribers_table.trim().is_empty() {
            return Err(ValidationError::MissingRequired("STORAGE_SUBSCRIBERS_TABLE"));
        }
        if let Some(url) = &self.endpoint_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidEndpointUrl);
            }
        }
        Ok(())
    }
}
