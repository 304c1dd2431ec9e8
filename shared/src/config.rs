//! Configuration management for the action server.
//!
//! Everything is read once at startup into an immutable [`Config`] that is
//! then passed by reference into component constructors.

use std::env;
use std::time::Duration;

use reqwest::Url;

use crate::secrets::AssistantSecrets;
use crate::{Error, Result};

pub const DEFAULT_IMAGE_URL: &str =
    "https://cdn.pixabay.com/photo/2015/11/03/08/56/question-mark-1019820_1280.jpg";

/// Secrets used by the identity pipeline.
#[derive(Clone)]
pub struct SecurityConfig {
    /// HS256 signing secret shared with the token issuer
    pub signing_secret: String,
    /// Secret whose MD5 digest keys the claim cipher
    pub encryption_secret: String,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig").finish_non_exhaustive()
    }
}

/// Embedding and chat-completion provider settings.
#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub api_base: String,
    pub embedding_model: String,
    pub chat_model: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_base", &self.api_base)
            .field("embedding_model", &self.embedding_model)
            .field("chat_model", &self.chat_model)
            .finish_non_exhaustive()
    }
}

/// Vector store connection settings.
#[derive(Clone)]
pub struct MilvusConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub collection: String,
}

impl std::fmt::Debug for MilvusConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MilvusConfig")
            .field("uri", &self.uri)
            .field("username", &self.username)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub security: SecurityConfig,
    pub openai: OpenAiConfig,
    pub milvus: MilvusConfig,
    /// Placeholder image used when an answer has none
    pub default_image: String,
    /// Upper bound on every outbound call
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration, pulling secrets from Secrets Manager when
    /// `ASSISTANT_SECRET_ARN` is set and from the environment otherwise.
    pub async fn load() -> Result<Self> {
        match env::var("ASSISTANT_SECRET_ARN") {
            Ok(arn) if !arn.trim().is_empty() => {
                let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
                let client = aws_sdk_secretsmanager::Client::new(&aws);
                let secrets = crate::secrets::get_assistant_secrets(&client, &arn).await?;
                Self::from_parts(secrets, |key| env::var(key).ok())
            }
            _ => Self::from_env(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secrets = AssistantSecrets {
            jwt_key: required(&lookup, "JWT_KEY")?,
            encryption_key: required(&lookup, "ENCRYPTION_KEY")?,
            openai_api_key: required(&lookup, "OPENAI_API_KEY")?,
        };
        Self::from_parts(secrets, lookup)
    }

    fn from_parts<F>(secrets: AssistantSecrets, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        secrets.validate()?;

        let or = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let http_timeout = match lookup("HTTP_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    Error::Config(format!("HTTP_TIMEOUT_SECS is not a number: {}", raw))
                })?;
                if secs == 0 {
                    return Err(Error::Config("HTTP_TIMEOUT_SECS must be positive".to_string()));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(10),
        };

        let default_image = or("DEFAULT_IMAGE_URL", DEFAULT_IMAGE_URL);
        Url::parse(&default_image)
            .map_err(|e| Error::Config(format!("DEFAULT_IMAGE_URL is not a URL: {}", e)))?;

        Ok(Self {
            security: SecurityConfig {
                signing_secret: secrets.jwt_key,
                encryption_secret: secrets.encryption_key,
            },
            openai: OpenAiConfig {
                api_key: secrets.openai_api_key,
                api_base: or("OPENAI_API_BASE", "https://api.openai.com/v1"),
                embedding_model: or("OPENAI_EMBEDDING_MODEL", "text-embedding-3-small"),
                chat_model: or("OPENAI_CHAT_MODEL", "gpt-4o-mini"),
            },
            milvus: MilvusConfig {
                uri: or("MILVUS_URI", "http://milvus-standalone-rasa:19530"),
                username: or("MILVUS_USER", "rasabot"),
                password: or("MILVUS_PASSWORD", "rasabot"),
                collection: or("MILVUS_COLLECTION", "rasa"),
            },
            default_image,
            http_timeout,
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("{} is not set", key)))
}
