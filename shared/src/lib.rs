//! Shared library for the assistant action server.
//!
//! Holds the two pipelines behind the assistant's actions: token-based
//! identity (verify + decrypt claims) and knowledge search (embed, retrieve,
//! prompt, complete, parse), plus configuration and wire types.

pub mod actions;
pub mod answer;
pub mod auth;
pub mod claims;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod openai;
pub mod prompt;
pub mod search;
pub mod secrets;
pub mod vector;

pub use answer::parse_reply;
pub use auth::{Authenticator, AuthError, EncryptedClaims, Identity, TokenError, TokenVerifier};
pub use claims::{ClaimCipher, DecryptError};
pub use config::{Config, MilvusConfig, OpenAiConfig, SecurityConfig};
pub use error::{ApiError, Error, ParseError, Result};
pub use models::{ActionRequest, ActionResponse, AnswerResult, RetrievedDocument, SearchQuery};
pub use openai::OpenAiClient;
pub use prompt::PromptBuilder;
pub use search::{CompletionClient, KnowledgeSearch, QueryEmbedder, VectorRetriever};
pub use vector::MilvusRetriever;
