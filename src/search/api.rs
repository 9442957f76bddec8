//! Remote search API / 远程搜索 API
//!
//! The coordinator only talks to the `SearchApi` trait; `HttpSearchApi` is
//! the reqwest-backed implementation.
//! 协调器只依赖 `SearchApi` trait。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::error::SearchError;
use super::schema::{ResultPage, SearchRequest};

/// Remote search interface (primitive operation only) / 远程搜索接口
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Run one search; implementations should stop early once `cancel` fires
    /// (best effort, the coordinator ignores superseded calls regardless).
    /// 执行一次搜索；取消是尽力而为。
    async fn search(&self, request: &SearchRequest, cancel: CancellationToken) -> Result<ResultPage, SearchError>;
}

/// HTTP search client / HTTP 搜索客户端
pub struct HttpSearchApi {
    client: Client,
    endpoint: Url,
}

impl HttpSearchApi {
    pub fn new(base_url: &str, search_path: &str, timeout: Duration) -> Result<Self, SearchError> {
        let endpoint = Url::parse(base_url)?.join(search_path)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Transport(e.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn send(&self, request: &SearchRequest) -> Result<ResultPage, SearchError> {
        let resp = self
            .client
            .get(self.endpoint.clone())
            .query(&request.query_pairs())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = extract_error_message(&body).unwrap_or_else(|| {
                status.canonical_reason().unwrap_or("request failed").to_string()
            });
            return Err(SearchError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json::<ResultPage>().await?)
    }
}

#[async_trait]
impl SearchApi for HttpSearchApi {
    async fn search(&self, request: &SearchRequest, cancel: CancellationToken) -> Result<ResultPage, SearchError> {
        tracing::debug!(
            "GET {} q='{}' type={} offset={}",
            self.endpoint,
            request.query,
            request.strategy.as_str(),
            request.offset
        );
        // Dropping the request future aborts the HTTP exchange / 丢弃 future 即中断请求
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SearchError::Cancelled),
            result = self.send(request) => result,
        }
    }
}

/// Pull `detail`/`error`/`message` out of a JSON error body / 提取错误信息
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "error", "message"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()).map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let api = HttpSearchApi::new("http://localhost:8000", "/api/photos/search", Duration::from_secs(5)).unwrap();
        assert_eq!(api.endpoint().as_str(), "http://localhost:8000/api/photos/search");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpSearchApi::new("not a url", "/api", Duration::from_secs(5)).err().unwrap();
        assert!(matches!(err, SearchError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(extract_error_message(r#"{"detail": "index not ready"}"#).as_deref(), Some("index not ready"));
        assert_eq!(extract_error_message(r#"{"error": "bad query"}"#).as_deref(), Some("bad query"));
        assert_eq!(extract_error_message("<html>oops</html>"), None);
    }

    /// Serve one canned HTTP response on a local port / 本地返回一次固定响应
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_error_status_maps_to_remote() {
        let base = serve_once("503 Service Unavailable", r#"{"detail": "index rebuilding"}"#).await;
        let api = HttpSearchApi::new(&base, "/api/photos/search", Duration::from_secs(5)).unwrap();
        let request = SearchRequest::from_params(&crate::search::SearchParameters::new("x"), 50, 0);

        let result = api.search(&request, CancellationToken::new()).await;
        assert_eq!(
            result,
            Err(SearchError::Remote {
                status: 503,
                message: "index rebuilding".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_success_body_is_decoded() {
        let base = serve_once("200 OK", r#"{"results": [{"id": 1}, {"id": 2}], "count": 2}"#).await;
        let api = HttpSearchApi::new(&base, "/api/photos/search", Duration::from_secs(5)).unwrap();
        let request = SearchRequest::from_params(&crate::search::SearchParameters::new("x"), 50, 0);

        let page = api.search(&request, CancellationToken::new()).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.total, Some(2));
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        // Port 9 (discard) is never contacted: the token is already cancelled.
        let api = HttpSearchApi::new("http://127.0.0.1:9", "/search", Duration::from_secs(5)).unwrap();
        let request = SearchRequest::from_params(&crate::search::SearchParameters::new("x"), 50, 0);
        let token = CancellationToken::new();
        token.cancel();
        let result = api.search(&request, token).await;
        assert_eq!(result, Err(SearchError::Cancelled));
    }
}
