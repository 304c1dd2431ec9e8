//! AWS Secrets Manager integration.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;

use crate::{Error, Result};

/// Cached secrets with lazy initialization.
static SECRETS_CACHE: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

fn get_cache() -> &'static RwLock<HashMap<String, String>> {
    SECRETS_CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// The three secrets the action server cannot start without.
#[derive(Deserialize)]
pub struct AssistantSecrets {
    pub jwt_key: String,
    pub encryption_key: String,
    pub openai_api_key: String,
}

impl AssistantSecrets {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("jwt_key", &self.jwt_key),
            ("encryption_key", &self.encryption_key),
            ("openai_api_key", &self.openai_api_key),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} is empty", name)));
            }
        }
        Ok(())
    }
}

/// Get a secret value from Secrets Manager with caching.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    // Check cache first
    {
        let cache = get_cache().read().await;
        if let Some(value) = cache.get(secret_arn) {
            return Ok(value.clone());
        }
    }

    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    let secret_string = response
        .secret_string()
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))?
        .to_string();

    {
        let mut cache = get_cache().write().await;
        cache.insert(secret_arn.to_string(), secret_string.clone());
    }

    Ok(secret_string)
}

/// Get the assistant's secrets bundle from Secrets Manager.
pub async fn get_assistant_secrets(
    client: &SecretsClient,
    secret_arn: &str,
) -> Result<AssistantSecrets> {
    let secret_string = get_secret(client, secret_arn).await?;
    parse_assistant_secrets(&secret_string)
}

fn parse_assistant_secrets(secret_string: &str) -> Result<AssistantSecrets> {
    serde_json::from_str(secret_string)
        .map_err(|e| Error::Config(format!("Failed to parse assistant secrets: {}", e)))
}
