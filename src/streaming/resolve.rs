//! HTTP client for the info route, used by the download route.

use reqwest::Url;
use tubeforged_av::MediaInfo;

use crate::server::error::ApiError;

#[derive(Clone)]
pub struct InfoClient {
    http: reqwest::Client,
    base_url: String,
}

impl InfoClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the info route for `source` and `format`.
    pub fn endpoint(&self, source: &str, format: &str) -> Result<Url, ApiError> {
        Url::parse_with_params(
            &format!("{}/info", self.base_url),
            &[("f", format), ("q", source)],
        )
        .map_err(|e| ApiError::Unknown(format!("invalid info endpoint: {e}")))
    }

    /// Resolve `source` through the info route.
    ///
    /// A non-200 answer is a client error carrying the resolver's body; a
    /// non-object document is one too. Anything that fails at the transport
    /// level or does not fit [`MediaInfo`] is an internal error.
    pub async fn fetch(&self, source: &str, format: &str) -> Result<MediaInfo, ApiError> {
        let endpoint = self.endpoint(source, format)?;
        tracing::debug!(%endpoint, "fetching info");

        let response = self
            .http
            .get(endpoint)
            .send()
            .await
            .map_err(|e| ApiError::Unknown(e.to_string()))?;

        if response.status().as_u16() != 200 {
            let status = response.status();
            let text = rejection_text(status, response.text().await);
            tracing::warn!(%status, body = %text, "info route rejected the request");
            return Err(ApiError::ResolverRejected(text));
        }

        let document: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ApiError::Unknown(e.to_string()))?;

        if !document.is_object() {
            return Err(ApiError::Validation(
                "Invalid response from info endpoint".to_string(),
            ));
        }

        serde_json::from_value(document)
            .map_err(|e| ApiError::Unknown(format!("unexpected info document: {e}")))
    }
}

/// Body of a rejected info call, or the status line when there is none to
/// forward.
fn rejection_text<E: std::fmt::Display>(
    status: reqwest::StatusCode,
    body: Result<String, E>,
) -> String {
    match body {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => status.to_string(),
        Err(e) => {
            tracing::warn!(%status, error = %e, "failed to read info route error body");
            status.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_parameters() {
        let client = InfoClient::new(reqwest::Client::new(), "http://127.0.0.1:8080/");
        let url = client
            .endpoint("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1", "bestvideo+bestaudio/best")
            .unwrap();
        assert_eq!(url.path(), "/info");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("f".to_string(), "bestvideo+bestaudio/best".to_string()),
                (
                    "q".to_string(),
                    "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=1".to_string()
                ),
            ]
        );
    }

    #[test]
    fn base_url_is_normalized() {
        let client = InfoClient::new(reqwest::Client::new(), "http://localhost:9000///");
        assert_eq!(client.base_url(), "http://localhost:9000");
    }

    #[test]
    fn rejection_text_falls_back_to_status() {
        let status = reqwest::StatusCode::FORBIDDEN;
        assert_eq!(
            rejection_text::<String>(status, Ok(r#"{"error":"blocked"}"#.to_string())),
            r#"{"error":"blocked"}"#
        );
        assert_eq!(rejection_text::<String>(status, Ok(String::new())), "403 Forbidden");
        assert_eq!(
            rejection_text(status, Err("connection reset")),
            "403 Forbidden"
        );
    }

    #[tokio::test]
    async fn unreachable_resolver_is_internal_error() {
        // Port 9 (discard) is closed on any sane test host.
        let client = InfoClient::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let err = client
            .fetch("https://youtu.be/dQw4w9WgXcQ", "best")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Unknown(_)));
    }
}
