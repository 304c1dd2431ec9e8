//! OpenAI client for query embeddings and chat completions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;
use crate::error::ParseError;
use crate::http::post_json;
use crate::models::EmbeddingVector;
use crate::search::{CompletionClient, QueryEmbedder};
use crate::Result;

const EMBEDDINGS: &str = "embeddings";
const COMPLETION: &str = "chat completion";

/// Embedding request body.
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Embedding response envelope.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Chat completion request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    response_format: ResponseFormat,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Chat completion response envelope.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the embeddings and chat-completions endpoints.
pub struct OpenAiClient {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a new client around a shared, timeout-bounded HTTP client.
    pub fn new(http: reqwest::Client, config: OpenAiConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http
            .post(self.endpoint(path))
            .bearer_auth(&self.config.api_key)
    }
}

#[async_trait]
impl QueryEmbedder for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: text,
        };
        let response: EmbeddingResponse = post_json(EMBEDDINGS, self.post("embeddings"), &request).await?;
        first_embedding(response)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = chat_request(&self.config.chat_model, prompt);
        let response: ChatResponse =
            post_json(COMPLETION, self.post("chat/completions"), &request).await?;
        first_content(response)
    }
}

fn chat_request<'a>(model: &'a str, prompt: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        response_format: ResponseFormat {
            format_type: "json_object",
        },
        messages: [ChatMessage {
            role: "user",
            content: prompt,
        }],
    }
}

fn first_embedding(response: EmbeddingResponse) -> Result<EmbeddingVector> {
    response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            ParseError::Envelope {
                service: EMBEDDINGS,
                message: "no embedding in response".to_string(),
            }
            .into()
        })
}

fn first_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| {
            ParseError::Envelope {
                service: COMPLETION,
                message: "no message content in response".to_string(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::decode_envelope;
    use crate::Error;
    use serde_json::json;

    #[test]
    fn test_chat_request_shape() {
        let body = serde_json::to_value(chat_request("gpt-4o-mini", "PROMPT")).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "gpt-4o-mini",
                "response_format": {"type": "json_object"},
                "messages": [{"role": "user", "content": "PROMPT"}]
            })
        );
    }

    #[test]
    fn test_embedding_request_shape() {
        let body = serde_json::to_value(EmbeddingRequest {
            model: "text-embedding-3-small",
            input: "hello",
        })
        .unwrap();
        assert_eq!(body, json!({"model": "text-embedding-3-small", "input": "hello"}));
    }

    #[test]
    fn test_first_embedding() {
        let response: EmbeddingResponse = decode_envelope(
            EMBEDDINGS,
            r#"{"object":"list","data":[{"object":"embedding","index":0,"embedding":[0.5,-0.25]}],"model":"m"}"#,
        )
        .unwrap();
        assert_eq!(first_embedding(response).unwrap(), vec![0.5, -0.25]);

        let empty: EmbeddingResponse = decode_envelope(EMBEDDINGS, r#"{"data":[]}"#).unwrap();
        assert!(matches!(first_embedding(empty), Err(Error::Parse(_))));
    }

    #[test]
    fn test_first_content() {
        let response: ChatResponse = decode_envelope(
            COMPLETION,
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"{\"text\":\"hi\"}"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_content(response).unwrap(), r#"{"text":"hi"}"#);

        let refused: ChatResponse =
            decode_envelope(COMPLETION, r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(matches!(first_content(refused), Err(Error::Parse(_))));
    }

    #[test]
    fn test_endpoint_joins_base() {
        let client = OpenAiClient::new(
            reqwest::Client::new(),
            OpenAiConfig {
                api_key: "sk".to_string(),
                api_base: "https://api.openai.com/v1/".to_string(),
                embedding_model: "e".to_string(),
                chat_model: "c".to_string(),
            },
        );
        assert_eq!(client.endpoint("embeddings"), "https://api.openai.com/v1/embeddings");
    }
}
