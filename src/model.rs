use serde::{Deserialize, Serialize};
use std::fmt;

pub const TOP_N_MIN: u32 = 5;
pub const TOP_N_MAX: u32 = 15;
pub const GAMMA_MIN: f64 = 0.5;
pub const GAMMA_MAX: f64 = 3.0;
/// Gamma moves in tenths, matching the 0.1 slider step.
const GAMMA_STEP_TENTHS: i32 = 1;

/// User-tunable optimisation parameters sent with every run request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub top_n: u32,
    pub gamma: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            top_n: 8,
            gamma: 1.5,
        }
    }
}

impl RunConfig {
    /// Build a config with both fields clamped into their valid ranges.
    pub fn new(top_n: u32, gamma: f64) -> Self {
        Self {
            top_n: top_n.clamp(TOP_N_MIN, TOP_N_MAX),
            gamma: round_tenth(gamma.clamp(GAMMA_MIN, GAMMA_MAX)),
        }
    }

    pub fn step_top_n(&mut self, delta: i32) {
        let next = (self.top_n as i64 + delta as i64).clamp(TOP_N_MIN as i64, TOP_N_MAX as i64);
        self.top_n = next as u32;
    }

    pub fn step_gamma(&mut self, steps: i32) {
        let tenths = (self.gamma * 10.0).round() as i32 + steps * GAMMA_STEP_TENTHS;
        let next = (tenths as f64 / 10.0).clamp(GAMMA_MIN, GAMMA_MAX);
        self.gamma = round_tenth(next);
    }

    /// Body of the `POST /run_pipeline` request.
    pub fn request(&self) -> RunRequest {
        RunRequest {
            gamma: self.gamma,
            top_n: self.top_n,
        }
    }
}

fn round_tenth(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub gamma: f64,
    pub top_n: u32,
}

/// Credentials entered by the user. Never printed in clear.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    pub coin_compare: String,
    pub gemini: String,
}

impl ApiKeys {
    pub fn has_gemini(&self) -> bool {
        !self.gemini.trim().is_empty()
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("coin_compare", &mask_secret(&self.coin_compare))
            .field("gemini", &mask_secret(&self.gemini))
            .finish()
    }
}

/// Render a secret as bullets, keeping only its length visible.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "-".to_string()
    } else {
        "•".repeat(secret.chars().count().min(24))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub portfolio_cagr: f64,
    pub btc_cagr: f64,
    pub portfolio_sharpe: f64,
    pub btc_sharpe: f64,
    pub portfolio_mdd: f64,
    pub btc_mdd: f64,
    pub win_rate: f64,
    pub outperform_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecommendation {
    pub date: String,
    pub asset: String,
    pub weight: f64,
    pub exp_ret: f64,
    pub exp_vol: f64,
    pub sharpe: f64,
}

/// Cumulative growth of 1 unit for the portfolio and the BTC benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: String,
    pub portfolio: f64,
    pub btc: f64,
}

/// Drawdown in percent, zero or negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub date: String,
    pub drawdown: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformancePayload {
    #[serde(rename = "portfolioMetrics")]
    pub portfolio_metrics: PortfolioMetrics,
    pub recommendations: Vec<AssetRecommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CumulativeReturnsPayload {
    #[serde(rename = "cumulativeReturns")]
    pub cumulative_returns: Vec<TimeSeriesPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawdownPayload {
    pub drawdown: Vec<DrawdownPoint>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketMoodPayload {
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Which chart the Charts tab is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    MarketMood,
    CumulativeReturns,
    Drawdown,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [
        ChartKind::MarketMood,
        ChartKind::CumulativeReturns,
        ChartKind::Drawdown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::MarketMood => "Weekly Market Mood",
            ChartKind::CumulativeReturns => "Cumulative Returns",
            ChartKind::Drawdown => "Drawdown Analysis",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ChartKind::MarketMood => "Weekly Market Mood Gauge",
            ChartKind::CumulativeReturns => "Cumulative Returns vs. BTC Benchmark",
            ChartKind::Drawdown => "Portfolio Drawdown Analysis",
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Data fetched for one chart of the Charts tab.
#[derive(Debug, Clone)]
pub enum ChartData {
    MarketMood(f64),
    CumulativeReturns(Vec<TimeSeriesPoint>),
    Drawdown(Vec<DrawdownPoint>),
}

/// Events emitted by the controller and consumed by presentation layers.
///
/// `mount` tags results with the view mount that asked for them so a view
/// that has since been left can drop late answers.
#[derive(Debug, Clone)]
pub enum AppEvent {
    Pipeline(crate::pipeline::RunState),
    Performance {
        mount: u64,
        result: Result<PerformancePayload, String>,
    },
    Chart {
        mount: u64,
        kind: ChartKind,
        result: Result<ChartData, String>,
    },
    ChatChunk {
        ask: u64,
        text: String,
    },
    ChatFinished {
        ask: u64,
    },
    ChatFailed {
        ask: u64,
        error: String,
    },
    Info(String),
}
