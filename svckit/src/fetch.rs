use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::BackendConfig;
use crate::errors::FetchError;
use crate::types::PageEnvelope;

/// Fetches one page of a list endpoint. Items stay as raw JSON so a single
/// fetcher can serve every resource; the aggregator decodes them.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &Url) -> Result<PageEnvelope<Value>, FetchError>;

    fn name(&self) -> &str;
}

pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    /// Deployment headers become client defaults so every request carries them.
    pub fn new(config: &BackendConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .default_headers(config.headers()?)
            .build()
            .map_err(|e| FetchError::Config(format!("failed to build http client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &Url) -> Result<PageEnvelope<Value>, FetchError> {
        debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;

        Ok(serde_json::from_slice(&body)?)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        Router,
    };
    use std::net::SocketAddr;

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn config_for(addr: SocketAddr) -> BackendConfig {
        BackendConfig {
            base_url: format!("http://{}/api", addr),
            bearer_token: "secret-token".to_string(),
            hostname: "assets.example.com".to_string(),
            ..Default::default()
        }
    }

    fn list_url(addr: SocketAddr) -> Url {
        Url::parse(&format!("http://{}/api/machines:list?page=1", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_success_sends_deployment_headers() {
        async fn handler(headers: HeaderMap) -> impl IntoResponse {
            let authorized = headers
                .get("authorization")
                .map(|v| v == "Bearer secret-token")
                .unwrap_or(false);
            let host_ok = headers
                .get("x-hostname")
                .map(|v| v == "assets.example.com")
                .unwrap_or(false);
            if !(authorized && host_ok) {
                return (StatusCode::UNAUTHORIZED, String::new());
            }
            (
                StatusCode::OK,
                r#"{"data":[{"id":1},{"id":2}],"meta":{"count":2,"page":1,"pageSize":200,"hasNext":false}}"#
                    .to_string(),
            )
        }

        let addr = serve(Router::new().fallback(handler)).await;
        let fetcher = HttpPageFetcher::new(&config_for(addr)).unwrap();

        let envelope = fetcher.fetch_page(&list_url(addr)).await.unwrap();
        assert_eq!(envelope.data.len(), 2);
        assert_eq!(envelope.meta.has_next, Some(false));
    }

    #[tokio::test]
    async fn test_non_success_status_is_http_error() {
        async fn handler() -> impl IntoResponse {
            (StatusCode::INTERNAL_SERVER_ERROR, "boom")
        }

        let addr = serve(Router::new().fallback(handler)).await;
        let fetcher = HttpPageFetcher::new(&config_for(addr)).unwrap();

        let err = fetcher.fetch_page(&list_url(addr)).await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { code: 500, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        async fn handler() -> impl IntoResponse {
            (StatusCode::OK, r#"{"rows": []}"#)
        }

        let addr = serve(Router::new().fallback(handler)).await;
        let fetcher = HttpPageFetcher::new(&config_for(addr)).unwrap();

        let err = fetcher.fetch_page(&list_url(addr)).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpPageFetcher::new(&config_for(addr)).unwrap();
        let err = fetcher.fetch_page(&list_url(addr)).await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)));
    }
}
