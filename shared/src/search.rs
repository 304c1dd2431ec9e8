//! Retrieval-generation pipeline: embed, retrieve, prompt, complete, parse.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::answer::parse_reply;
use crate::models::{AnswerResult, EmbeddingVector, RetrievedDocument, SearchQuery, TOP_K};
use crate::prompt::PromptBuilder;
use crate::{Error, Result};

/// Turns query text into an embedding vector.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;
}

/// Role-filtered nearest-neighbour search over the knowledge base.
#[async_trait]
pub trait VectorRetriever: Send + Sync {
    /// Return at most `k` documents whose permission set contains `role`,
    /// best match first.
    async fn search(&self, vector: &[f32], role: &str, k: usize) -> Result<Vec<RetrievedDocument>>;
}

/// Sends a prompt to the chat model and returns its raw reply.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// The composed pipeline. Cheap to clone and safe to share across turns.
#[derive(Clone)]
pub struct KnowledgeSearch {
    embedder: Arc<dyn QueryEmbedder>,
    retriever: Arc<dyn VectorRetriever>,
    completion: Arc<dyn CompletionClient>,
    prompt: PromptBuilder,
    default_image: String,
}

impl KnowledgeSearch {
    pub fn new(
        embedder: Arc<dyn QueryEmbedder>,
        retriever: Arc<dyn VectorRetriever>,
        completion: Arc<dyn CompletionClient>,
        default_image: impl Into<String>,
    ) -> Self {
        let default_image = default_image.into();
        Self {
            embedder,
            retriever,
            completion,
            prompt: PromptBuilder::new(default_image.clone()),
            default_image,
        }
    }

    /// Answer one question. Every stage failure is returned, never panics.
    pub async fn answer(&self, query: &SearchQuery) -> Result<AnswerResult> {
        validate(query)?;

        let vector = self.embedder.embed(&query.text).await?;

        let mut documents = self.retriever.search(&vector, &query.role, TOP_K).await?;
        documents.truncate(TOP_K);
        info!(
            "Retrieved {} documents for role {}",
            documents.len(),
            query.role
        );

        let prompt = self.prompt.build(&documents, &query.text, &query.language);
        let reply = self.completion.complete(&prompt).await?;

        parse_reply(&reply, &self.default_image).map_err(|e| {
            error!("Unusable model reply: {} (raw: {})", e, reply);
            Error::from(e)
        })
    }
}

fn validate(query: &SearchQuery) -> Result<()> {
    for (field, value) in [
        ("text", &query.text),
        ("role", &query.role),
        ("language", &query.language),
    ] {
        if value.trim().is_empty() {
            return Err(Error::Validation(format!("search query is missing {}", field)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEmbedder;

    #[async_trait]
    impl QueryEmbedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<EmbeddingVector> {
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    /// Ignores `k`, to prove the pipeline caps the result itself.
    struct OverflowingRetriever;

    #[async_trait]
    impl VectorRetriever for OverflowingRetriever {
        async fn search(&self, _vector: &[f32], _role: &str, _k: usize) -> Result<Vec<RetrievedDocument>> {
            Ok((1..=5)
                .map(|i| RetrievedDocument {
                    text: format!("doc {}", i),
                })
                .collect())
        }
    }

    struct RecordingCompletion {
        calls: AtomicUsize,
        reply: String,
    }

    #[async_trait]
    impl CompletionClient for RecordingCompletion {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(!prompt.contains("4. {}"), "prompt held more than TOP_K documents");
            Ok(self.reply.clone())
        }
    }

    fn pipeline(reply: &str) -> (KnowledgeSearch, Arc<RecordingCompletion>) {
        let completion = Arc::new(RecordingCompletion {
            calls: AtomicUsize::new(0),
            reply: reply.to_string(),
        });
        let search = KnowledgeSearch::new(
            Arc::new(FixedEmbedder),
            Arc::new(OverflowingRetriever),
            completion.clone(),
            "https://img/default.png",
        );
        (search, completion)
    }

    fn query(text: &str) -> SearchQuery {
        SearchQuery {
            text: text.to_string(),
            role: "customer".to_string(),
            language: "English".to_string(),
        }
    }

    #[tokio::test]
    async fn test_caps_documents_at_top_k() {
        let (search, completion) = pipeline(r#"{"text": "ok", "image_url": ""}"#);
        let answer = search.answer(&query("hello")).await.unwrap();

        assert_eq!(answer.image_url, "https://img/default.png");
        assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected_before_any_call() {
        let (search, completion) = pipeline(r#"{"text": "ok"}"#);
        let err = search.answer(&query("   ")).await.unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unparsable_reply_is_parse_error() {
        let (search, _) = pipeline("not json");
        let err = search.answer(&query("hello")).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
