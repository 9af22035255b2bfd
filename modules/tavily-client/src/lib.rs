pub mod error;
pub mod types;

pub use error::{Result, TavilyError};
pub use types::{SearchParams, SearchRequest, SearchResponse, SearchResult};

use std::time::Duration;

const BASE_URL: &str = "https://api.tavily.com";

pub struct TavilyClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TavilyClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Run an advanced-depth search restricted to the last `params.days` days.
    pub async fn search(&self, params: &SearchParams) -> Result<SearchResponse> {
        let request = SearchRequest {
            api_key: self.api_key.clone(),
            query: params.query.clone(),
            search_depth: "advanced".to_string(),
            include_answer: false,
            days: params.days,
            max_results: params.max_results,
            include_domains: if params.include_domains.is_empty() {
                None
            } else {
                Some(params.include_domains.clone())
            },
        };

        let url = format!("{}/search", self.base_url);
        let resp = self.client.post(&url).json(&request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TavilyError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let response: SearchResponse = serde_json::from_str(&body)?;
        tracing::debug!(
            query = %params.query,
            results = response.results.len(),
            "Tavily search completed"
        );

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> TavilyClient {
        TavilyClient::new("tvly-test".to_string())
            .unwrap()
            .with_base_url(&server.uri())
    }

    #[tokio::test]
    async fn sends_fixed_flags_and_domains() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(serde_json::json!({
                "api_key": "tvly-test",
                "query": "LLM Leaderboard",
                "search_depth": "advanced",
                "include_answer": false,
                "days": 7,
                "max_results": 5,
                "include_domains": ["lmsys.org"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": "LLM Leaderboard",
                "results": [
                    { "title": "Arena", "url": "https://lmsys.org/blog", "content": "Top models", "score": 0.9 }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let params = SearchParams::new("LLM Leaderboard")
            .max_results(5)
            .include_domains(vec!["lmsys.org".to_string()]);
        let resp = client_for(&server).await.search(&params).await.unwrap();

        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].url.as_deref(), Some("https://lmsys.org/blog"));
    }

    #[tokio::test]
    async fn omits_include_domains_when_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "results": [] })))
            .mount(&server)
            .await;

        client_for(&server)
            .await
            .search(&SearchParams::new("macro"))
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert!(body.get("include_domains").is_none());
    }

    #[tokio::test]
    async fn missing_results_list_means_no_hits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "answer": null })))
            .mount(&server)
            .await;

        let resp = client_for(&server)
            .await
            .search(&SearchParams::new("q"))
            .await
            .unwrap();
        assert!(resp.results.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .search(&SearchParams::new("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, TavilyError::Parse(_)));
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .search(&SearchParams::new("q"))
            .await
            .unwrap_err();
        match err {
            TavilyError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "invalid key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
