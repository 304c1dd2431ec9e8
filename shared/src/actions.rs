//! The two actions the dialogue manager can invoke.
//!
//! This is the pipeline boundary: whatever happens inside, each action
//! returns an [`ActionResponse`]. Failures are logged in full and reach the
//! caller only as one fixed, non-technical utterance.

use tracing::{error, info};

use crate::auth::Authenticator;
use crate::error::AUTH_FAILED_MESSAGE;
use crate::models::{ActionEvent, ActionResponse, BotMessage, SearchQuery, Tracker};
use crate::search::KnowledgeSearch;
use crate::{Error, Result};

pub const INIT_BOT: &str = "action_init_bot";
pub const KNOWLEDGE_SEARCH: &str = "action_milvus_search";

/// Names of every action this server can run.
pub const ACTION_NAMES: [&str; 2] = [INIT_BOT, KNOWLEDGE_SEARCH];

/// Verify the token carried in the latest message and store the identity in slots.
pub fn init_bot(authenticator: &Authenticator, tracker: &Tracker) -> ActionResponse {
    let token = tracker
        .latest_message
        .entities
        .first()
        .and_then(|e| e.value.as_str())
        .filter(|t| !t.trim().is_empty());

    let Some(token) = token else {
        error!("{}: no token entity in latest message", INIT_BOT);
        return ActionResponse::utter(BotMessage::text(AUTH_FAILED_MESSAGE));
    };

    match authenticator.authenticate(token) {
        Ok(identity) => ActionResponse::events(vec![
            ActionEvent::slot("user_account", identity.account),
            ActionEvent::slot("user_role", identity.role),
            ActionEvent::slot("user_auth", true),
        ]),
        Err(e) => {
            let e = Error::from(e);
            error!("{}: {}", INIT_BOT, e);
            ActionResponse::utter(BotMessage::text(e.user_message()))
        }
    }
}

/// Answer the latest message from the knowledge base.
pub async fn knowledge_search(search: &KnowledgeSearch, tracker: &Tracker) -> ActionResponse {
    let outcome = match search_query(tracker) {
        Ok(query) => search.answer(&query).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(answer) => {
            info!("{}: answered with image {}", KNOWLEDGE_SEARCH, answer.image_url);
            ActionResponse::utter(BotMessage {
                text: answer.text,
                image: Some(answer.image_url),
            })
        }
        Err(e) => {
            error!("{}: {}", KNOWLEDGE_SEARCH, e);
            ActionResponse::utter(BotMessage::text(e.user_message()))
        }
    }
}

fn search_query(tracker: &Tracker) -> Result<SearchQuery> {
    let text = tracker
        .latest_message
        .text
        .as_deref()
        .filter(|t| !t.trim().is_empty());

    match (text, tracker.slot_str("user_role"), tracker.slot_str("language")) {
        (Some(text), Some(role), Some(language)) => Ok(SearchQuery {
            text: text.to_string(),
            role: role.to_string(),
            language: language.to_string(),
        }),
        _ => Err(Error::Validation(
            "missing required input: message text, user_role or language".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;
    use crate::error::SEARCH_FAILED_MESSAGE;
    use crate::models::{EmbeddingVector, RetrievedDocument};
    use crate::search::{CompletionClient, QueryEmbedder, VectorRetriever};
    use async_trait::async_trait;
    use std::sync::Arc;
    use serde_json::{json, Value};

    fn tracker(value: Value) -> Tracker {
        serde_json::from_value(value).unwrap()
    }

    fn authenticator() -> Authenticator {
        Authenticator::new(&SecurityConfig {
            signing_secret: "jwt".to_string(),
            encryption_secret: "enc".to_string(),
        })
    }

    #[test]
    fn test_init_bot_without_token() {
        let response = init_bot(&authenticator(), &tracker(json!({"latest_message": {"text": "/init"}})));
        assert!(response.events.is_empty());
        assert_eq!(response.responses, vec![BotMessage::text(AUTH_FAILED_MESSAGE)]);
    }

    #[test]
    fn test_init_bot_bad_token_is_generic() {
        let response = init_bot(
            &authenticator(),
            &tracker(json!({"latest_message": {"entities": [{"entity": "token", "value": "a.b.c"}]}})),
        );
        assert!(response.events.is_empty());
        assert_eq!(response.responses, vec![BotMessage::text(AUTH_FAILED_MESSAGE)]);
    }

    #[test]
    fn test_search_query_requires_all_inputs() {
        let full = tracker(json!({
            "slots": {"user_role": "staff", "language": "English"},
            "latest_message": {"text": "hi"}
        }));
        assert_eq!(
            search_query(&full).unwrap(),
            SearchQuery {
                text: "hi".to_string(),
                role: "staff".to_string(),
                language: "English".to_string()
            }
        );

        let no_role = tracker(json!({
            "slots": {"language": "English"},
            "latest_message": {"text": "hi"}
        }));
        assert!(matches!(search_query(&no_role), Err(Error::Validation(_))));
    }

    struct Unreachable;

    #[async_trait]
    impl QueryEmbedder for Unreachable {
        async fn embed(&self, _text: &str) -> Result<EmbeddingVector> {
            panic!("embedder must not be called")
        }
    }

    #[async_trait]
    impl VectorRetriever for Unreachable {
        async fn search(&self, _v: &[f32], _role: &str, _k: usize) -> Result<Vec<RetrievedDocument>> {
            panic!("retriever must not be called")
        }
    }

    #[async_trait]
    impl CompletionClient for Unreachable {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            panic!("completion must not be called")
        }
    }

    #[tokio::test]
    async fn test_knowledge_search_failure_uses_user_message() {
        let unreachable = Arc::new(Unreachable);
        let search = KnowledgeSearch::new(
            unreachable.clone(),
            unreachable.clone(),
            unreachable,
            "https://img/default.png",
        );
        let no_language = tracker(json!({
            "slots": {"user_role": "staff"},
            "latest_message": {"text": "hi"}
        }));

        let response = knowledge_search(&search, &no_language).await;

        let expected = Error::Validation(String::new()).user_message();
        assert_eq!(expected, SEARCH_FAILED_MESSAGE);
        assert!(response.events.is_empty());
        assert_eq!(response.responses, vec![BotMessage::text(expected)]);
    }
}
