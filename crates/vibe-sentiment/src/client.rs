use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use crate::request::{AttemptPlan, FallbackPolicy};

#[derive(Debug, Error)]
pub enum SentimentError {
    /// Transport-level failure (DNS, connect, TLS, or a dropped body).
    /// Aborts the whole attempt sequence: candidates are alternatives
    /// for a reachable backend, not for an unreachable one.
    #[error("sentiment backend unreachable: {0}")]
    Connection(#[from] reqwest::Error),
}

/// What the provider answered: status and raw body, with no claim yet
/// about whether the body normalizes into anything.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: String,
}

impl ProviderResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn not_found() -> Self {
        Self {
            status: 404,
            body: String::new(),
        }
    }
}

/// Thin wrapper over a shared `reqwest::Client`. Holds no per-request
/// state; the bearer token is supplied by the caller on each execute.
#[derive(Clone)]
pub struct SentimentClient {
    http: Client,
}

impl SentimentClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// POST each candidate in order until one answers 2xx. A failed
    /// attempt only advances the sequence when the plan's fallback
    /// policy allows it; otherwise (and after the last candidate) the
    /// most recent response is returned as the final result.
    pub async fn execute(
        &self,
        plan: &AttemptPlan,
        token: Option<&str>,
    ) -> Result<ProviderResponse, SentimentError> {
        let mut last: Option<ProviderResponse> = None;

        for candidate in &plan.candidates {
            let mut req = self.http.post(&candidate.url).json(&candidate.payload);
            if let Some(token) = token {
                req = req.bearer_auth(token);
            }

            let resp = req.send().await?;
            let status = resp.status().as_u16();
            let body = resp.text().await?;
            debug!("sentiment attempt {} -> {}", candidate.url, status);

            let resp = ProviderResponse { status, body };
            if resp.is_success() {
                return Ok(resp);
            }

            let advance = match plan.fallback {
                FallbackPolicy::NotFoundOnly => resp.status == 404,
                FallbackPolicy::AnyFailure => true,
            };
            last = Some(resp);
            if !advance {
                break;
            }
        }

        Ok(last.unwrap_or_else(ProviderResponse::not_found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Candidate;
    use serde_json::json;

    fn plan(urls: &[String], fallback: FallbackPolicy) -> AttemptPlan {
        AttemptPlan {
            candidates: urls
                .iter()
                .map(|u| Candidate {
                    url: u.clone(),
                    payload: json!({ "inputs": "hi" }),
                })
                .collect(),
            fallback,
        }
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let mut server = mockito::Server::new_async().await;
        let hit = server
            .mock("POST", "/a")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;
        let skipped = server
            .mock("POST", "/b")
            .with_status(200)
            .expect(0)
            .create_async()
            .await;

        let client = SentimentClient::new(reqwest::Client::new());
        let urls = vec![format!("{}/a", server.url()), format!("{}/b", server.url())];
        let resp = client
            .execute(&plan(&urls, FallbackPolicy::AnyFailure), None)
            .await
            .unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, r#"{"ok":true}"#);
        hit.assert_async().await;
        skipped.assert_async().await;
    }

    #[tokio::test]
    async fn not_found_advances_to_alternate() {
        let mut server = mockito::Server::new_async().await;
        let missing = server.mock("POST", "/model").with_status(404).create_async().await;
        let found = server
            .mock("POST", "/model/")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let client = SentimentClient::new(reqwest::Client::new());
        let urls = vec![
            format!("{}/model", server.url()),
            format!("{}/model/", server.url()),
        ];
        let resp = client
            .execute(&plan(&urls, FallbackPolicy::NotFoundOnly), None)
            .await
            .unwrap();

        assert_eq!(resp.status, 200);
        missing.assert_async().await;
        found.assert_async().await;
    }

    #[tokio::test]
    async fn non_404_failure_is_final_under_not_found_policy() {
        let mut server = mockito::Server::new_async().await;
        let broken = server
            .mock("POST", "/model")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;
        let untried = server
            .mock("POST", "/model/")
            .with_status(200)
            .expect(0)
            .create_async()
            .await;

        let client = SentimentClient::new(reqwest::Client::new());
        let urls = vec![
            format!("{}/model", server.url()),
            format!("{}/model/", server.url()),
        ];
        let resp = client
            .execute(&plan(&urls, FallbackPolicy::NotFoundOnly), None)
            .await
            .unwrap();

        assert_eq!(resp.status, 500);
        assert_eq!(resp.body, "boom");
        broken.assert_async().await;
        untried.assert_async().await;
    }

    #[tokio::test]
    async fn exhausted_plan_returns_last_response() {
        let mut server = mockito::Server::new_async().await;
        let first = server.mock("POST", "/a").with_status(500).create_async().await;
        let last = server
            .mock("POST", "/b")
            .with_status(503)
            .with_body("later")
            .create_async()
            .await;

        let client = SentimentClient::new(reqwest::Client::new());
        let urls = vec![format!("{}/a", server.url()), format!("{}/b", server.url())];
        let resp = client
            .execute(&plan(&urls, FallbackPolicy::AnyFailure), None)
            .await
            .unwrap();

        assert_eq!(resp.status, 503);
        assert_eq!(resp.body, "later");
        first.assert_async().await;
        last.assert_async().await;
    }

    #[tokio::test]
    async fn bearer_token_is_attached() {
        let mut server = mockito::Server::new_async().await;
        let authed = server
            .mock("POST", "/a")
            .match_header("authorization", "Bearer sekrit")
            .with_status(200)
            .create_async()
            .await;

        let client = SentimentClient::new(reqwest::Client::new());
        let urls = vec![format!("{}/a", server.url())];
        client
            .execute(&plan(&urls, FallbackPolicy::AnyFailure), Some("sekrit"))
            .await
            .unwrap();

        authed.assert_async().await;
    }

    #[tokio::test]
    async fn connection_failure_aborts() {
        // Nothing listens on port 1.
        let client = SentimentClient::new(reqwest::Client::new());
        let urls = vec![
            "http://127.0.0.1:1/a".to_string(),
            "http://127.0.0.1:1/b".to_string(),
        ];
        let err = client
            .execute(&plan(&urls, FallbackPolicy::AnyFailure), None)
            .await;

        assert!(matches!(err, Err(SentimentError::Connection(_))));
    }

    #[tokio::test]
    async fn space_search_walks_paths_until_run_predict_answers() {
        use crate::provider::{AiConfig, ProviderKind};
        use crate::request::build_plan;

        let mut server = mockito::Server::new_async().await;
        // Four payload shapes per path, so four misses on each dead path.
        let miss_a = server
            .mock("POST", "/api/predict")
            .with_status(404)
            .expect(4)
            .create_async()
            .await;
        let miss_b = server
            .mock("POST", "/api/predict/")
            .with_status(404)
            .expect(4)
            .create_async()
            .await;
        let hit = server
            .mock("POST", "/run/predict")
            .with_status(200)
            .with_body(r#"{"data":["joy"]}"#)
            .expect(1)
            .create_async()
            .await;

        let cfg = AiConfig {
            provider: ProviderKind::HfSpace,
            base_url: server.url(),
            path: None,
            token: None,
        };
        let client = SentimentClient::new(reqwest::Client::new());
        let resp = client.execute(&build_plan(&cfg, "hello"), None).await.unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, r#"{"data":["joy"]}"#);
        miss_a.assert_async().await;
        miss_b.assert_async().await;
        hit.assert_async().await;
    }

    #[tokio::test]
    async fn empty_plan_yields_synthetic_not_found() {
        let client = SentimentClient::new(reqwest::Client::new());
        let resp = client
            .execute(&plan(&[], FallbackPolicy::AnyFailure), None)
            .await
            .unwrap();

        assert_eq!(resp.status, 404);
        assert!(resp.body.is_empty());
    }
}
