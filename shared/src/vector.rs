//! Milvus vector search over the knowledge-base collection.
//!
//! Talks to the Milvus RESTful v2 API through the shared pooled HTTP client,
//! so no per-call session has to be opened or torn down.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MilvusConfig;
use crate::error::ApiError;
use crate::http::post_json;
use crate::models::RetrievedDocument;
use crate::search::VectorRetriever;
use crate::Result;

const SERVICE: &str = "vector search";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    collection_name: &'a str,
    data: [&'a [f32]; 1],
    anns_field: &'static str,
    filter: String,
    limit: usize,
    output_fields: [&'static str; 1],
    search_params: SearchParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    metric_type: &'static str,
    params: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    text: String,
    #[serde(default)]
    distance: Option<f32>,
}

/// Milvus-backed [`VectorRetriever`].
pub struct MilvusRetriever {
    http: reqwest::Client,
    config: MilvusConfig,
}

impl MilvusRetriever {
    pub fn new(http: reqwest::Client, config: MilvusConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl VectorRetriever for MilvusRetriever {
    async fn search(&self, vector: &[f32], role: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        let url = format!(
            "{}/v2/vectordb/entities/search",
            self.config.uri.trim_end_matches('/')
        );
        let request = search_request(&self.config.collection, vector, role, k);

        let response: SearchResponse = post_json(
            SERVICE,
            self.http.post(url).bearer_auth(format!(
                "{}:{}",
                self.config.username, self.config.password
            )),
            &request,
        )
        .await?;

        into_documents(response, k)
    }
}

fn search_request<'a>(collection: &'a str, vector: &'a [f32], role: &str, k: usize) -> SearchRequest<'a> {
    SearchRequest {
        collection_name: collection,
        data: [vector],
        anns_field: "vector",
        filter: permission_filter(role),
        limit: k,
        output_fields: ["text"],
        search_params: SearchParams {
            metric_type: "L2",
            params: serde_json::Map::new(),
        },
    }
}

/// Server-side predicate: the document's `permission` array contains `role`.
pub fn permission_filter(role: &str) -> String {
    let escaped = role.replace('\\', "\\\\").replace('\'', "\\'");
    format!("ARRAY_CONTAINS(permission, '{}')", escaped)
}

fn into_documents(response: SearchResponse, k: usize) -> Result<Vec<RetrievedDocument>> {
    if response.code != 0 {
        return Err(ApiError::Rejected {
            service: SERVICE,
            code: response.code,
            message: response.message.unwrap_or_default(),
        }
        .into());
    }

    Ok(response
        .data
        .into_iter()
        .take(k)
        .map(|hit| {
            debug!("Hit at distance {:?}", hit.distance);
            RetrievedDocument { text: hit.text }
        })
        .collect())
}
