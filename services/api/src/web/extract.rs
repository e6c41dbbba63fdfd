//! services/api/src/web/extract.rs
//!
//! The JSON body extractor used by every handler that reads a request body.

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::HandlerError;

/// Like `Json<T>`, but every rejection is a 400 `{"message": ...}` and an empty body
/// reads as `{}`. The `Content-Type` header is not required.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = HandlerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| HandlerError::bad_request(rejection.body_text()))?;

        let bytes = if bytes.iter().all(u8::is_ascii_whitespace) {
            Bytes::from_static(b"{}")
        } else {
            bytes
        };

        let Json(value) = Json::<T>::from_bytes(&bytes)
            .map_err(|rejection| HandlerError::bad_request(rejection.body_text()))?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse};
    use serde::Deserialize;
    use serde_json::Value;

    #[derive(Debug, Default, Deserialize)]
    struct StatusBody {
        #[serde(default)]
        status: Option<String>,
    }

    fn request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from(body))
            .unwrap()
    }

    async fn message_of(err: HandlerError) -> (StatusCode, Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn empty_body_reads_as_empty_object() {
        let JsonBody(body) = JsonBody::<StatusBody>::from_request(request(""), &())
            .await
            .unwrap();
        assert_eq!(body.status, None);
    }

    #[tokio::test]
    async fn syntax_error_is_a_json_bad_request() {
        let err = JsonBody::<Value>::from_request(request("{title:"), &())
            .await
            .unwrap_err();
        let (status, body) = message_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn type_mismatch_is_a_json_bad_request() {
        let err = JsonBody::<StatusBody>::from_request(request(r#"{"status": 3}"#), &())
            .await
            .unwrap_err();
        let (status, body) = message_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("status"));
    }
}
