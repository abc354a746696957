use super::{clamp_mood, BackendError, DashboardBackend};
use crate::model::{
    CumulativeReturnsPayload, DrawdownPayload, DrawdownPoint, MarketMoodPayload,
    PerformancePayload, RunRequest, TimeSeriesPoint,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Client for the pipeline server's HTTP endpoints.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(format!("quanteye/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let resp = self.http.get(self.url(path)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Rejected(status));
        }
        // Decoded by hand rather than `resp.json()` so a bad payload is
        // reported as `Malformed` with the endpoint path.
        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| BackendError::Malformed(format!("{path}: {e}")))
    }
}

#[async_trait]
impl DashboardBackend for HttpBackend {
    async fn run_pipeline(&self, req: &RunRequest) -> Result<(), BackendError> {
        let resp = self
            .http
            .post(self.url("run_pipeline"))
            .json(req)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BackendError::Rejected(status));
        }
        // The body only has to arrive; its content is not used.
        let _ = resp.bytes().await?;
        Ok(())
    }

    async fn performance(&self) -> Result<PerformancePayload, BackendError> {
        self.get_json("performance_tab_chart_data").await
    }

    async fn cumulative_returns(&self) -> Result<Vec<TimeSeriesPoint>, BackendError> {
        let payload: CumulativeReturnsPayload = self.get_json("performance_data").await?;
        Ok(payload.cumulative_returns)
    }

    async fn drawdown(&self) -> Result<Vec<DrawdownPoint>, BackendError> {
        let payload: DrawdownPayload = self.get_json("drawdown_data").await?;
        Ok(payload.drawdown)
    }

    async fn market_mood(&self) -> Result<f64, BackendError> {
        let payload: MarketMoodPayload = self.get_json("weekly_market_mood_gauge_data").await?;
        Ok(clamp_mood(payload.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let request = read_request(&mut sock).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(response.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
            request
        });
        (format!("http://{addr}"), handle)
    }

    async fn read_request(sock: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    #[tokio::test]
    async fn run_pipeline_posts_json_body() {
        let (base, server) = serve_once("200 OK", r#"{"status":"ok"}"#).await;
        let backend = HttpBackend::new(&base).unwrap();
        backend
            .run_pipeline(&crate::model::RunConfig::default().request())
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /run_pipeline HTTP/1.1"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json, serde_json::json!({ "gamma": 1.5, "top_n": 8 }));
    }

    #[tokio::test]
    async fn run_pipeline_ignores_non_json_success_body() {
        let (base, server) = serve_once("200 OK", "done").await;
        let backend = HttpBackend::new(&base).unwrap();
        let res = backend
            .run_pipeline(&crate::model::RunConfig::default().request())
            .await;
        assert!(res.is_ok());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn server_error_is_a_rejection() {
        let (base, server) = serve_once("500 Internal Server Error", "{}").await;
        let backend = HttpBackend::new(&base).unwrap();
        let err = backend
            .run_pipeline(&crate::model::RunConfig::default().request())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected(s) if s.as_u16() == 500));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connection_refused_is_a_network_error() {
        // Bind then drop to get a port with nothing listening.
        let addr = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap()
        };
        let backend = HttpBackend::new(&format!("http://{addr}")).unwrap();
        let err = backend
            .run_pipeline(&crate::model::RunConfig::default().request())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Network(_)));
    }

    #[tokio::test]
    async fn market_mood_is_clamped() {
        let (base, server) = serve_once("200 OK", r#"{"value": 1.7}"#).await;
        let backend = HttpBackend::new(&format!("{base}/")).unwrap();
        assert_eq!(backend.market_mood().await.unwrap(), 1.0);
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /weekly_market_mood_gauge_data "));
    }

    #[tokio::test]
    async fn drawdown_without_array_is_malformed() {
        let (base, server) = serve_once("200 OK", r#"{"drawdown": 3}"#).await;
        let backend = HttpBackend::new(&base).unwrap();
        let err = backend.drawdown().await.unwrap_err();
        assert!(matches!(&err, BackendError::Malformed(msg) if msg.starts_with("drawdown_data: ")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn cumulative_returns_unwraps_payload() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"cumulativeReturns":[{"date":"2025-01-02","portfolio":1.02,"btc":0.99}]}"#,
        )
        .await;
        let backend = HttpBackend::new(&base).unwrap();
        let series = backend.cumulative_returns().await.unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].portfolio, 1.02);
        server.await.unwrap();
    }
}
