use crate::analyst::{AnalystClient, GeminiClient, DEFAULT_MODEL};
use crate::backend::{DashboardBackend, HttpBackend, MockBackend};
use crate::model::{ApiKeys, RunConfig};
use crate::orchestrator::Services;
use crate::pipeline::{PipelineTracker, RunState};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// A line bound for stdout or stderr.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Writer thread for headless output; lines arrive over the returned channel.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let mut out = std::io::LineWriter::new(std::io::stdout().lock());
        let mut err = std::io::LineWriter::new(std::io::stderr().lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{msg}");
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{msg}");
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Parser, Clone)]
#[command(
    name = "quanteye",
    version,
    about = "Terminal dashboard for the QuantEye crypto portfolio-optimization pipeline"
)]
pub struct Cli {
    /// Base URL of the pipeline server
    #[arg(long, env = "QUANTEYE_BASE_URL", default_value = "http://127.0.0.1:5053")]
    pub base_url: String,

    /// Number of top assets to consider (5-15)
    #[arg(long, default_value_t = 8)]
    pub top_n: u32,

    /// Risk aversion of the optimiser (0.5-3.0)
    #[arg(long, default_value_t = 1.5)]
    pub gamma: f64,

    /// Gemini API key for the AI analyst
    #[arg(long, env = "GEMINI_API_KEY", default_value = "", hide_env_values = true)]
    pub gemini_api_key: String,

    /// CoinCompare API key, shown masked in the sidebar
    #[arg(
        long,
        env = "COINCOMPARE_API_KEY",
        default_value = "",
        hide_env_values = true
    )]
    pub coincompare_api_key: String,

    /// Gemini model used by the analyst
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub gemini_model: String,

    /// Serve generated data instead of talking to the pipeline server
    #[arg(long)]
    pub mock: bool,

    /// How long a mock pipeline run takes
    #[arg(long, default_value = "6s")]
    pub mock_run_duration: humantime::Duration,

    /// Simulated progress tick interval
    #[arg(long, default_value = "100ms", value_parser = parse_non_zero_duration)]
    pub tick_interval: humantime::Duration,

    /// How long a notification stays on screen
    #[arg(long, default_value = "3s")]
    pub notification_ttl: humantime::Duration,

    /// Start a pipeline run when the app launches
    #[arg(long)]
    pub run_on_launch: bool,

    /// Run the pipeline once, print a JSON report and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Run the pipeline once, print progress and a summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Log file used in TUI mode
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Humantime duration that must be longer than zero.
fn parse_non_zero_duration(raw: &str) -> Result<humantime::Duration, String> {
    let d: humantime::Duration = raw.parse().map_err(|e: humantime::DurationError| e.to_string())?;
    if Duration::from(d).is_zero() {
        return Err("must be greater than zero".to_string());
    }
    Ok(d)
}

impl Cli {
    pub fn headless(&self) -> bool {
        self.json || self.text
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(self.top_n, self.gamma)
    }

    pub fn api_keys(&self) -> ApiKeys {
        ApiKeys {
            coin_compare: self.coincompare_api_key.clone(),
            gemini: self.gemini_api_key.clone(),
        }
    }
}

/// Build the backend and analyst collaborators selected by the flags.
pub(crate) fn build_services(args: &Cli) -> Result<Services> {
    let backend: Arc<dyn DashboardBackend> = if args.mock {
        Arc::new(MockBackend::new(Duration::from(args.mock_run_duration)))
    } else {
        Arc::new(HttpBackend::new(&args.base_url)?)
    };
    let analyst: Arc<dyn AnalystClient> = Arc::new(GeminiClient::new(&args.gemini_model)?);
    Ok(Services {
        backend,
        analyst,
        tick_interval: Duration::from(args.tick_interval),
    })
}

pub async fn run(args: Cli) -> Result<()> {
    if !args.headless() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            let mut args = args;
            args.text = true;
            return run_headless(args).await;
        }
    }

    run_headless(args).await
}

/// Outcome of a headless run, printed by `--json`.
#[derive(Debug, Serialize)]
struct RunReport {
    config: RunConfig,
    state: RunState,
    #[serde(with = "humantime_serde")]
    elapsed: Duration,
}

/// Run the pipeline once without the TUI. Fails if the run fails.
async fn run_headless(args: Cli) -> Result<()> {
    let services = build_services(&args)?;
    let cfg = args.run_config();
    let (out_tx, out_handle) = spawn_output_writer();

    let started = Instant::now();
    let mut tracker = PipelineTracker::new(services.backend.clone(), services.tick_interval);
    tracker.start(&cfg);

    let mut last_status = String::new();
    loop {
        let state = tracker.state();
        if args.text && state.status_text() != last_status {
            last_status = state.status_text().to_string();
            let _ = out_tx.send(OutputLine::Stderr(format!(
                "[{:>3}%] {}",
                state.progress(),
                last_status
            )));
        }
        if !state.is_running() {
            break;
        }

        tokio::select! {
            step = tracker.next_step() => {
                tracker.handle(step);
            }
            _ = tokio::signal::ctrl_c() => {
                tracker.shutdown();
                drop(out_tx);
                let _ = out_handle.await;
                anyhow::bail!("interrupted");
            }
        }
    }

    let state = tracker.state().clone();
    if args.json {
        let report = RunReport {
            config: cfg,
            state: state.clone(),
            elapsed: started.elapsed(),
        };
        let out = serde_json::to_string_pretty(&report).context("serialize run report")?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else if state.completed() {
        match services.backend.performance().await {
            Ok(payload) => {
                for line in crate::text_summary::build_text_summary(&payload).lines {
                    let _ = out_tx.send(OutputLine::Stdout(line));
                }
            }
            Err(e) => {
                let _ = out_tx.send(OutputLine::Stderr(format!(
                    "Performance data unavailable: {e}"
                )));
            }
        }
    }

    drop(out_tx);
    let _ = out_handle.await;

    if !state.completed() {
        anyhow::bail!("pipeline run failed");
    }
    Ok(())
}
