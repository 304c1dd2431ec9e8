//! Interpretation of the completion model's JSON reply.

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::ParseError;
use crate::models::AnswerResult;

#[derive(Debug, Deserialize)]
struct ModelAnswer {
    #[serde(default)]
    image_url: Option<Value>,
    #[serde(default)]
    text: Option<String>,
}

/// Parse the model's reply into an [`AnswerResult`].
///
/// A missing, blank, non-string or non-http(s) `image_url` is replaced with
/// `default_image`; only an unusable payload or a missing `text` fails.
pub fn parse_reply(reply: &str, default_image: &str) -> Result<AnswerResult, ParseError> {
    let answer: ModelAnswer =
        serde_json::from_str(reply.trim()).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let text = answer
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or(ParseError::MissingText)?;

    let image_url = match answer.image_url.as_ref().and_then(Value::as_str).map(str::trim) {
        Some(url) if is_web_url(url) => url.to_string(),
        _ => {
            debug!("Using placeholder image instead of {:?}", answer.image_url);
            default_image.to_string()
        }
    };

    Ok(AnswerResult { text, image_url })
}

fn is_web_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}
