use super::{clamp_mood, BackendError, DashboardBackend};
use crate::model::{
    AssetRecommendation, DrawdownPoint, PerformancePayload, PortfolioMetrics, RunRequest,
    TimeSeriesPoint,
};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::OnceLock;
use std::time::Duration;
use time::{macros::format_description, Date, OffsetDateTime};

const ASSETS: [&str; 8] = ["BTC", "ETH", "SOL", "AVAX", "LINK", "MATIC", "ADA", "DOT"];
const PICKED_ASSETS: usize = 5;
const HISTORY_DAYS: i64 = 180;

/// Everything the mock serves, generated together so the charts agree.
#[derive(Debug, Clone)]
pub struct MockDataset {
    pub metrics: PortfolioMetrics,
    pub recommendations: Vec<AssetRecommendation>,
    pub cumulative_returns: Vec<TimeSeriesPoint>,
    pub drawdown: Vec<DrawdownPoint>,
    pub market_mood: f64,
}

/// In-process stand-in for the pipeline server.
pub struct MockBackend {
    run_duration: Duration,
    dataset: OnceLock<MockDataset>,
}

impl MockBackend {
    pub fn new(run_duration: Duration) -> Self {
        Self {
            run_duration,
            dataset: OnceLock::new(),
        }
    }

    fn dataset(&self) -> &MockDataset {
        self.dataset.get_or_init(|| {
            let today = OffsetDateTime::now_utc().date();
            generate_dataset(&mut rand::thread_rng(), today)
        })
    }
}

#[async_trait]
impl DashboardBackend for MockBackend {
    async fn run_pipeline(&self, req: &RunRequest) -> Result<(), BackendError> {
        tracing::debug!(top_n = req.top_n, gamma = req.gamma, "mock pipeline run");
        tokio::time::sleep(self.run_duration).await;
        Ok(())
    }

    async fn performance(&self) -> Result<PerformancePayload, BackendError> {
        let data = self.dataset();
        Ok(PerformancePayload {
            portfolio_metrics: data.metrics.clone(),
            recommendations: data.recommendations.clone(),
        })
    }

    async fn cumulative_returns(&self) -> Result<Vec<TimeSeriesPoint>, BackendError> {
        Ok(self.dataset().cumulative_returns.clone())
    }

    async fn drawdown(&self) -> Result<Vec<DrawdownPoint>, BackendError> {
        Ok(self.dataset().drawdown.clone())
    }

    async fn market_mood(&self) -> Result<f64, BackendError> {
        Ok(self.dataset().market_mood)
    }
}

pub fn generate_dataset(rng: &mut impl Rng, today: Date) -> MockDataset {
    let cumulative_returns = generate_cumulative_returns(rng, today, HISTORY_DAYS);
    let drawdown = drawdown_from_returns(&cumulative_returns);
    MockDataset {
        metrics: generate_metrics(rng),
        recommendations: generate_recommendations(rng, today),
        cumulative_returns,
        drawdown,
        market_mood: clamp_mood(rng.gen_range(0.0..1.0)),
    }
}

pub fn generate_metrics(rng: &mut impl Rng) -> PortfolioMetrics {
    PortfolioMetrics {
        portfolio_cagr: rng.gen_range(25.0..80.0),
        btc_cagr: rng.gen_range(20.0..60.0),
        portfolio_sharpe: rng.gen_range(1.2..2.5),
        btc_sharpe: rng.gen_range(0.8..1.8),
        portfolio_mdd: rng.gen_range(15.0..35.0),
        btc_mdd: rng.gen_range(20.0..45.0),
        win_rate: rng.gen_range(55.0..75.0),
        outperform_rate: rng.gen_range(51.0..65.0),
    }
}

/// Pick five assets and spread 100% across them. Each weight except the last
/// is drawn from `[10, 30]`, shrunk so every remaining asset can still get 10.
pub fn generate_recommendations(rng: &mut impl Rng, today: Date) -> Vec<AssetRecommendation> {
    let date = format_date(today);
    let picked: Vec<&str> = ASSETS.choose_multiple(rng, PICKED_ASSETS).copied().collect();
    let mut remaining = 100.0_f64;

    picked
        .iter()
        .enumerate()
        .map(|(idx, asset)| {
            let is_last = idx == picked.len() - 1;
            let weight = if is_last {
                remaining
            } else {
                let reserved = (picked.len() - 1 - idx) as f64 * 10.0;
                let upper = 30.0_f64.min(remaining - reserved);
                if upper > 10.0 {
                    rng.gen_range(10.0..upper)
                } else {
                    10.0
                }
            };
            remaining -= weight;
            AssetRecommendation {
                date: date.clone(),
                asset: asset.to_string(),
                weight,
                exp_ret: rng.gen_range(0.05..0.2),
                exp_vol: rng.gen_range(0.5..1.5),
                sharpe: rng.gen_range(1.0..2.5),
            }
        })
        .collect()
}

/// Random walk of daily growth for `days + 1` dates ending today.
pub fn generate_cumulative_returns(
    rng: &mut impl Rng,
    today: Date,
    days: i64,
) -> Vec<TimeSeriesPoint> {
    let mut portfolio = 1.0_f64;
    let mut btc = 1.0_f64;
    (0..=days)
        .rev()
        .map(|back| {
            portfolio *= 1.0 + rng.gen_range(-0.025..0.035);
            btc *= 1.0 + rng.gen_range(-0.03..0.032);
            TimeSeriesPoint {
                date: format_date(today - time::Duration::days(back)),
                portfolio,
                btc,
            }
        })
        .collect()
}

/// Percent below the running portfolio peak, as a non-positive number.
pub fn drawdown_from_returns(series: &[TimeSeriesPoint]) -> Vec<DrawdownPoint> {
    let mut peak = 0.0_f64;
    series
        .iter()
        .map(|p| {
            peak = peak.max(p.portfolio);
            let dd = if peak > 0.0 {
                (peak - p.portfolio) / peak
            } else {
                0.0
            };
            DrawdownPoint {
                date: p.date.clone(),
                drawdown: -dd * 100.0,
            }
        })
        .collect()
}

fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}
