//! REST client for the alert and ticker resources.

use crate::error::StoreError;
use crate::models::{Alert, AlertDraft, AlertId, AlertUpdate, Ticker, UserId};
use crate::store::{AlertStore, TickerLookup};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

/// Default backend when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

const USER_AGENT: &str = concat!("alertwatch/", env!("CARGO_PKG_VERSION"));

/// HTTP gateway to the alert backend. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, mapping 404 on an alert id to `NotFound`.
    async fn send(request: RequestBuilder, id: Option<AlertId>) -> Result<Response, StoreError> {
        let response = request.send().await?;
        let status = response.status();

        match (status, id) {
            (StatusCode::NOT_FOUND, Some(id)) => Err(StoreError::NotFound(id)),
            (status, _) if !status.is_success() => Err(StoreError::Status(status)),
            _ => Ok(response),
        }
    }

    async fn send_json<T: DeserializeOwned>(
        request: RequestBuilder,
        id: Option<AlertId>,
    ) -> Result<T, StoreError> {
        let response = Self::send(request, id).await?;
        Ok(response.json().await?)
    }
}

impl AlertStore for ApiClient {
    async fn list(&self, user: UserId) -> Result<Vec<Alert>, StoreError> {
        let url = self.url(&format!("/alerts/user/{user}"));
        debug!(%url, "listing alerts");
        let alerts: Vec<Alert> = Self::send_json(self.client.get(&url), None).await?;
        debug!(count = alerts.len(), "alerts fetched");
        Ok(alerts)
    }

    async fn get(&self, id: AlertId) -> Result<Alert, StoreError> {
        let url = self.url(&format!("/alerts/{id}"));
        Self::send_json(self.client.get(&url), Some(id)).await
    }

    async fn create(&self, draft: &AlertDraft) -> Result<Alert, StoreError> {
        let url = self.url("/alerts");
        let alert: Alert = Self::send_json(self.client.post(&url).json(draft), None).await?;
        info!(id = %alert.id, ticker = %alert.ticker, "alert created");
        Ok(alert)
    }

    async fn update(&self, id: AlertId, update: &AlertUpdate) -> Result<Alert, StoreError> {
        let url = self.url(&format!("/alerts/{id}"));
        let alert: Alert = Self::send_json(self.client.put(&url).json(update), Some(id)).await?;
        info!(%id, "alert updated");
        Ok(alert)
    }

    async fn delete(&self, id: AlertId) -> Result<(), StoreError> {
        let url = self.url(&format!("/alerts/{id}"));
        Self::send(self.client.delete(&url), Some(id)).await?;
        info!(%id, "alert deleted");
        Ok(())
    }

    async fn reset(&self, id: AlertId) -> Result<Alert, StoreError> {
        let url = self.url(&format!("/alerts/{id}/reset"));
        let alert: Alert = Self::send_json(self.client.put(&url), Some(id)).await?;
        info!(%id, "alert reset");
        Ok(alert)
    }
}

impl TickerLookup for ApiClient {
    async fn find_by_symbol(&self, symbol: &str) -> Result<Option<Ticker>, StoreError> {
        let url = self.url(&format!("/tickers/symbol/{}", urlencoding::encode(symbol)));
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => Err(StoreError::Status(status)),
            _ => Ok(Some(response.json().await?)),
        }
    }

    async fn list_active(&self) -> Result<Vec<Ticker>, StoreError> {
        let url = self.url("/tickers/active");
        Self::send_json(self.client.get(&url), None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned response and hand back the request line received.
    async fn serve_once(status: &'static str, body: &'static str) -> (ApiClient, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;

            request.lines().next().unwrap_or_default().to_string()
        });

        let client = ApiClient::new(&format!("http://{addr}/api"), 5).unwrap();
        (client, handle)
    }

    #[tokio::test]
    async fn test_list_parses_user_alerts() {
        let (client, server) = serve_once(
            "200 OK",
            r#"[{"id":1,"ticker":"AAPL","limitPrice":150.0,"direction":"UP","userId":7,"isNotified":true}]"#,
        )
        .await;

        let alerts = client.list(UserId(7)).await.unwrap();
        assert_eq!(server.await.unwrap(), "GET /api/alerts/user/7 HTTP/1.1");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].direction, Direction::Up);
        assert!(alerts[0].is_notified);
    }

    #[tokio::test]
    async fn test_missing_alert_is_not_found() {
        let (client, server) = serve_once("404 Not Found", "").await;

        let err = client.reset(AlertId(42)).await.unwrap_err();
        assert_eq!(server.await.unwrap(), "PUT /api/alerts/42/reset HTTP/1.1");
        assert!(matches!(err, StoreError::NotFound(AlertId(42))));
    }

    #[tokio::test]
    async fn test_server_error_is_status() {
        let (client, server) = serve_once("500 Internal Server Error", "").await;

        let err = client.delete(AlertId(3)).await.unwrap_err();
        assert_eq!(server.await.unwrap(), "DELETE /api/alerts/3 HTTP/1.1");
        assert!(matches!(
            err,
            StoreError::Status(StatusCode::INTERNAL_SERVER_ERROR)
        ));
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_none() {
        let (client, server) = serve_once("404 Not Found", "").await;

        let found = client.find_by_symbol("BRK.B&X").await.unwrap();
        assert_eq!(
            server.await.unwrap(),
            "GET /api/tickers/symbol/BRK.B%26X HTTP/1.1"
        );
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_known_ticker_is_returned() {
        let (client, server) = serve_once(
            "200 OK",
            r#"{"id":3,"symbol":"MSFT","name":"Microsoft Corporation"}"#,
        )
        .await;

        let ticker = client.find_by_symbol("MSFT").await.unwrap().unwrap();
        assert_eq!(server.await.unwrap(), "GET /api/tickers/symbol/MSFT HTTP/1.1");
        assert_eq!(ticker.symbol, "MSFT");
        assert!(ticker.active);
    }

    #[tokio::test]
    async fn test_ticker_lookup_server_error_is_status() {
        let (client, server) = serve_once("503 Service Unavailable", "").await;

        let err = client.find_by_symbol("AAPL").await.unwrap_err();
        server.await.unwrap();
        assert!(matches!(
            err,
            StoreError::Status(StatusCode::SERVICE_UNAVAILABLE)
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://example.test/api/", 5).unwrap();
        assert_eq!(client.base_url(), "http://example.test/api");
        assert_eq!(client.url("/alerts/7"), "http://example.test/api/alerts/7");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transport_error() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let client = ApiClient::new("http://127.0.0.1:9/api", 2).unwrap();
        let err = client.list(UserId(7)).await.unwrap_err();
        assert!(matches!(err, StoreError::Http(_)));
    }
}
