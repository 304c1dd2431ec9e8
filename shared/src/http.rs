//! HTTP helpers: Lambda responses inbound, JSON API calls outbound.

use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ApiError, ParseError};
use crate::models::ActionError;

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>, lambda_http::Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(data)?))
        .expect("Failed to build response"))
}

/// Create an action-server error response.
pub fn error_response(
    status: u16,
    action_name: impl Into<String>,
    message: impl Into<String>,
) -> Result<Response<Body>, lambda_http::Error> {
    json_response(
        status,
        &ActionError {
            error: message.into(),
            action_name: action_name.into(),
        },
    )
}

/// Parse request body as JSON, returning a 400 response on failure.
///
/// Returns `Ok(Ok(T))` on successful parse, `Ok(Err(Response))` on parse error (400),
/// or `Err(lambda_http::Error)` on serialization failure.
pub fn parse_json_body<T: DeserializeOwned>(body: &Body) -> Result<Result<T, Response<Body>>, lambda_http::Error> {
    match serde_json::from_slice(body.as_ref()) {
        Ok(parsed) => Ok(Ok(parsed)),
        Err(e) => {
            let response = error_response(400, "", format!("Invalid request body: {}", e))?;
            Ok(Err(response))
        }
    }
}

/// Macro to parse request body, returning early with 400 on parse error.
///
/// Usage:
/// ```ignore
/// let request: ActionRequest = parse_body!(event.body());
/// ```
#[macro_export]
macro_rules! parse_body {
    ($body:expr) => {
        match shared::http::parse_json_body($body)? {
            Ok(parsed) => parsed,
            Err(response) => return Ok(response),
        }
    };
}

/// Build the pooled client used for every outbound call.
///
/// The timeout bounds the whole request, so a stalled dependency surfaces as
/// [`ApiError::Timeout`] instead of blocking the turn.
pub fn build_client(timeout: std::time::Duration) -> crate::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| crate::Error::Config(format!("Failed to build HTTP client: {}", e)))
}

/// POST a JSON body and decode a typed JSON response.
///
/// Non-2xx answers become [`ApiError::Status`] carrying the response body;
/// a 2xx body that does not fit `R` becomes [`ParseError::Envelope`].
pub async fn post_json<B, R>(
    service: &'static str,
    request: reqwest::RequestBuilder,
    body: &B,
) -> crate::Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = request
        .json(body)
        .send()
        .await
        .map_err(|e| ApiError::from_reqwest(service, e))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::from_reqwest(service, e))?;

    if !status.is_success() {
        return Err(ApiError::Status {
            service,
            status: status.as_u16(),
            body: text,
        }
        .into());
    }

    decode_envelope(service, &text)
}

pub(crate) fn decode_envelope<R: DeserializeOwned>(service: &'static str, text: &str) -> crate::Result<R> {
    serde_json::from_str(text).map_err(|e| {
        ParseError::Envelope {
            service,
            message: e.to_string(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Envelope {
        data: Vec<u32>,
    }

    #[test]
    fn test_decode_envelope() {
        let ok: Envelope = decode_envelope("test", r#"{"data":[1,2]}"#).unwrap();
        assert_eq!(ok.data, vec![1, 2]);

        let err = decode_envelope::<Envelope>("test", r#"{"items":[]}"#).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Envelope { service: "test", .. })));
    }

    #[test]
    fn test_error_response_body() {
        let response = error_response(404, "action_unknown", "No registered action found").unwrap();
        assert_eq!(response.status(), 404);

        let body: serde_json::Value = serde_json::from_slice(response.body().as_ref()).unwrap();
        assert_eq!(body["action_name"], "action_unknown");
        assert_eq!(body["error"], "No registered action found");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_api_error() {
        let client = build_client(std::time::Duration::from_millis(500)).unwrap();
        let result: crate::Result<Envelope> =
            post_json("test", client.post("http://127.0.0.1:9/unreachable"), &()).await;
        assert!(matches!(result, Err(Error::Api(_))));
    }
}
