//! Action Server Lambda - Runs assistant actions for the dialogue manager.
//!
//! The dialogue manager POSTs to `/webhook` naming the action to run and
//! carrying the conversation tracker. Two actions are served:
//! `action_init_bot` (token -> identity slots) and `action_milvus_search`
//! (question -> grounded answer with image).

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use serde::Serialize;
use shared::actions::{self, ACTION_NAMES, INIT_BOT, KNOWLEDGE_SEARCH};
use shared::http::{build_client, error_response, json_response};
use shared::{parse_body, ActionRequest, Authenticator, Config, KnowledgeSearch, MilvusRetriever, OpenAiClient};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state shared across requests.
struct AppState {
    authenticator: Authenticator,
    search: KnowledgeSearch,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::load().await?;
        info!(
            "Loaded configuration: openai={:?} milvus={:?}",
            config.openai, config.milvus
        );

        let http = build_client(config.http_timeout)?;
        let openai = Arc::new(OpenAiClient::new(http.clone(), config.openai.clone()));
        let retriever = Arc::new(MilvusRetriever::new(http, config.milvus.clone()));

        Ok(Self {
            authenticator: Authenticator::new(&config.security),
            search: KnowledgeSearch::new(openai.clone(), retriever, openai, config.default_image),
        })
    }
}

#[derive(Debug, Serialize)]
struct ActionInfo {
    name: &'static str,
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let path = event.uri().path();
    let method = event.method().as_str();

    info!("Received request: method={}, path={}", method, path);

    match (method, path) {
        ("GET", "/health") => json_response(200, &serde_json::json!({"status": "ok"})),
        ("GET", "/actions") => {
            let names: Vec<ActionInfo> = ACTION_NAMES.iter().map(|&name| ActionInfo { name }).collect();
            json_response(200, &names)
        }
        ("POST", "/webhook") => {
            let request: ActionRequest = parse_body!(event.body());
            info!(
                "Running {} for sender {}",
                request.next_action,
                request.sender_id.as_deref().unwrap_or("unknown")
            );

            let response = match request.next_action.as_str() {
                INIT_BOT => actions::init_bot(&state.authenticator, &request.tracker),
                KNOWLEDGE_SEARCH => actions::knowledge_search(&state.search, &request.tracker).await,
                other => {
                    warn!("No registered action found for name '{}'", other);
                    return error_response(
                        404,
                        other,
                        format!("No registered action found for name '{}'.", other),
                    );
                }
            };

            json_response(200, &response)
        }
        _ => error_response(404, "", "Not found"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
