//! Data collaborators behind the dashboard.
//!
//! The controller talks to one [`DashboardBackend`] trait object, either the
//! HTTP client for the real pipeline server or the in-process mock generator.

mod http;
mod mock;

use crate::model::{
    ChartData, ChartKind, DrawdownPoint, PerformancePayload, RunRequest, TimeSeriesPoint,
};
use async_trait::async_trait;
use reqwest::StatusCode;

pub use http::HttpBackend;
pub use mock::MockBackend;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("server returned {0}")]
    Rejected(StatusCode),
    #[error("unexpected response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait DashboardBackend: Send + Sync {
    /// Trigger a pipeline run. Resolves once the server has finished it.
    async fn run_pipeline(&self, req: &RunRequest) -> Result<(), BackendError>;
    async fn performance(&self) -> Result<PerformancePayload, BackendError>;
    async fn cumulative_returns(&self) -> Result<Vec<TimeSeriesPoint>, BackendError>;
    async fn drawdown(&self) -> Result<Vec<DrawdownPoint>, BackendError>;
    /// Weekly market mood in `[0, 1]`.
    async fn market_mood(&self) -> Result<f64, BackendError>;

    async fn chart(&self, kind: ChartKind) -> Result<ChartData, BackendError> {
        match kind {
            ChartKind::MarketMood => self.market_mood().await.map(ChartData::MarketMood),
            ChartKind::CumulativeReturns => self
                .cumulative_returns()
                .await
                .map(ChartData::CumulativeReturns),
            ChartKind::Drawdown => self.drawdown().await.map(ChartData::Drawdown),
        }
    }
}

pub(crate) fn clamp_mood(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
