//! Dashboard controller.
//!
//! Owns the pipeline tracker, the data fetches and the analyst stream, and
//! emits events for presentation layers.

use crate::analyst::{build_prompt, AnalystClient};
use crate::backend::DashboardBackend;
use crate::model::{AppEvent, AssetRecommendation, ChartKind, PortfolioMetrics, RunConfig};
use crate::pipeline::PipelineTracker;
use anyhow::Result;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinHandle, JoinSet};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub enum UiCommand {
    RunPipeline(RunConfig),
    LoadPerformance {
        mount: u64,
    },
    LoadChart {
        mount: u64,
        kind: ChartKind,
    },
    Ask {
        ask: u64,
        question: String,
        metrics: PortfolioMetrics,
        recommendations: Vec<AssetRecommendation>,
        api_key: String,
    },
    /// Stop streaming the current answer, if any.
    CancelChat,
    Quit,
}

/// Collaborators the controller drives.
#[derive(Clone)]
pub struct Services {
    pub backend: Arc<dyn DashboardBackend>,
    pub analyst: Arc<dyn AnalystClient>,
    pub tick_interval: Duration,
}

/// Serve UI commands until `Quit` (or the command channel closes).
///
/// `launch` starts a run immediately with the given config.
pub async fn run_controller(
    services: Services,
    launch: Option<RunConfig>,
    event_tx: UnboundedSender<AppEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut tracker = PipelineTracker::new(services.backend.clone(), services.tick_interval);
    let mut fetches: JoinSet<AppEvent> = JoinSet::new();
    let mut chat: Option<JoinHandle<()>> = None;

    let _ = event_tx.send(AppEvent::Pipeline(tracker.state().clone()));
    if let Some(cfg) = launch {
        if tracker.start(&cfg) {
            let _ = event_tx.send(AppEvent::Pipeline(tracker.state().clone()));
        }
    }

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::RunPipeline(cfg)) => {
                        if tracker.start(&cfg) {
                            let _ = event_tx.send(AppEvent::Pipeline(tracker.state().clone()));
                        } else {
                            tracing::debug!(phase = ?tracker.state().phase(), "run request ignored");
                        }
                    }
                    Some(UiCommand::LoadPerformance { mount }) => {
                        let backend = services.backend.clone();
                        fetches.spawn(async move {
                            let result = backend.performance().await.map_err(|e| {
                                tracing::warn!(error = %e, "performance fetch failed");
                                e.to_string()
                            });
                            AppEvent::Performance { mount, result }
                        });
                    }
                    Some(UiCommand::LoadChart { mount, kind }) => {
                        let backend = services.backend.clone();
                        fetches.spawn(async move {
                            let result = backend.chart(kind).await.map_err(|e| {
                                tracing::warn!(error = %e, chart = kind.label(), "chart fetch failed");
                                e.to_string()
                            });
                            AppEvent::Chart { mount, kind, result }
                        });
                    }
                    Some(UiCommand::Ask { ask, question, metrics, recommendations, api_key }) => {
                        if let Some(prev) = chat.take() {
                            prev.abort();
                        }
                        let prompt = build_prompt(&question, &metrics, &recommendations);
                        chat = Some(tokio::spawn(stream_answer(
                            services.analyst.clone(),
                            ask,
                            prompt,
                            api_key,
                            event_tx.clone(),
                        )));
                    }
                    Some(UiCommand::CancelChat) => {
                        if let Some(handle) = chat.take() {
                            handle.abort();
                            tracing::debug!("analyst stream cancelled");
                        }
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            step = tracker.next_step() => {
                if tracker.handle(step) {
                    let _ = event_tx.send(AppEvent::Pipeline(tracker.state().clone()));
                }
            }
            Some(joined) = fetches.join_next(), if !fetches.is_empty() => {
                match joined {
                    Ok(ev) => {
                        let _ = event_tx.send(ev);
                    }
                    Err(e) if e.is_cancelled() => {}
                    Err(e) => {
                        let _ = event_tx.send(AppEvent::Info(format!("Fetch task failed: {e}")));
                    }
                }
            }
        }
    }

    tracker.shutdown();
    fetches.abort_all();
    if let Some(handle) = chat.take() {
        handle.abort();
    }
    Ok(())
}

/// Forward one analyst answer chunk by chunk. Any error ends the answer.
async fn stream_answer(
    analyst: Arc<dyn AnalystClient>,
    ask: u64,
    prompt: String,
    api_key: String,
    event_tx: UnboundedSender<AppEvent>,
) {
    let mut chunks = match analyst.stream(prompt, &api_key).await {
        Ok(chunks) => chunks,
        Err(e) => {
            tracing::warn!(error = %e, "analyst request failed");
            let _ = event_tx.send(AppEvent::ChatFailed {
                ask,
                error: e.to_string(),
            });
            return;
        }
    };

    while let Some(item) = chunks.next().await {
        match item {
            Ok(text) => {
                if event_tx.send(AppEvent::ChatChunk { ask, text }).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "analyst stream broke off");
                let _ = event_tx.send(AppEvent::ChatFailed {
                    ask,
                    error: e.to_string(),
                });
                return;
            }
        }
    }
    let _ = event_tx.send(AppEvent::ChatFinished { ask });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyst::{AnalystError, ChunkStream};
    use crate::backend::MockBackend;
    use async_trait::async_trait;
    use futures::stream;
    use std::sync::Mutex;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    /// Analyst that replays canned chunks and records the prompts it saw.
    struct CannedAnalyst {
        chunks: Vec<Result<String, String>>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AnalystClient for CannedAnalyst {
        async fn stream(&self, prompt: String, api_key: &str) -> Result<ChunkStream, AnalystError> {
            if api_key.is_empty() {
                return Err(AnalystError::MissingKey);
            }
            self.prompts.lock().unwrap().push(prompt);
            let items: Vec<Result<String, AnalystError>> = self
                .chunks
                .iter()
                .map(|c| c.clone().map_err(AnalystError::Malformed))
                .collect();
            Ok(stream::iter(items).boxed())
        }
    }

    struct Harness {
        events: mpsc::UnboundedReceiver<AppEvent>,
        cmds: mpsc::UnboundedSender<UiCommand>,
        task: JoinHandle<Result<()>>,
        analyst: Arc<CannedAnalyst>,
    }

    fn spawn(chunks: Vec<Result<String, String>>, launch: Option<RunConfig>) -> Harness {
        let analyst = Arc::new(CannedAnalyst {
            chunks,
            prompts: Mutex::new(Vec::new()),
        });
        let services = Services {
            backend: Arc::new(MockBackend::new(Duration::from_millis(30))),
            analyst: analyst.clone(),
            tick_interval: Duration::from_millis(1),
        };
        let (event_tx, events) = mpsc::unbounded_channel();
        let (cmds, cmd_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_controller(services, launch, event_tx, cmd_rx));
        Harness {
            events,
            cmds,
            task,
            analyst,
        }
    }

    async fn wait_for(
        events: &mut mpsc::UnboundedReceiver<AppEvent>,
        mut pred: impl FnMut(&AppEvent) -> bool,
    ) -> AppEvent {
        timeout(Duration::from_secs(5), async {
            loop {
                let ev = events.recv().await.expect("controller closed its channel");
                if pred(&ev) {
                    return ev;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    fn metrics() -> PortfolioMetrics {
        PortfolioMetrics {
            portfolio_cagr: 40.0,
            btc_cagr: 30.0,
            portfolio_sharpe: 1.8,
            btc_sharpe: 1.1,
            portfolio_mdd: 20.0,
            btc_mdd: 35.0,
            win_rate: 60.0,
            outperform_rate: 55.0,
        }
    }

    #[tokio::test]
    async fn run_completes_and_unlocks_data() {
        let mut h = spawn(Vec::new(), None);
        match wait_for(&mut h.events, |e| matches!(e, AppEvent::Pipeline(_))).await {
            AppEvent::Pipeline(state) => assert!(!state.is_running()),
            _ => unreachable!(),
        }

        h.cmds.send(UiCommand::RunPipeline(RunConfig::default())).unwrap();
        wait_for(&mut h.events, |e| matches!(e, AppEvent::Pipeline(s) if s.completed())).await;

        h.cmds.send(UiCommand::LoadPerformance { mount: 7 }).unwrap();
        match wait_for(&mut h.events, |e| matches!(e, AppEvent::Performance { .. })).await {
            AppEvent::Performance { mount, result } => {
                assert_eq!(mount, 7);
                let payload = result.unwrap();
                let total: f64 = payload.recommendations.iter().map(|r| r.weight).sum();
                assert!((total - 100.0).abs() < 1e-6);
            }
            _ => unreachable!(),
        }

        h.cmds
            .send(UiCommand::LoadChart {
                mount: 2,
                kind: ChartKind::MarketMood,
            })
            .unwrap();
        match wait_for(&mut h.events, |e| matches!(e, AppEvent::Chart { .. })).await {
            AppEvent::Chart { mount, kind, result } => {
                assert_eq!(mount, 2);
                assert_eq!(kind, ChartKind::MarketMood);
                assert!(matches!(result, Ok(crate::model::ChartData::MarketMood(v)) if (0.0..=1.0).contains(&v)));
            }
            _ => unreachable!(),
        }

        h.cmds.send(UiCommand::Quit).unwrap();
        h.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn launch_config_starts_a_run_immediately() {
        let mut h = spawn(Vec::new(), Some(RunConfig::new(10, 2.0)));
        wait_for(&mut h.events, |e| matches!(e, AppEvent::Pipeline(s) if s.is_running())).await;
        wait_for(&mut h.events, |e| matches!(e, AppEvent::Pipeline(s) if s.completed())).await;
        drop(h.cmds);
        h.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn answer_is_streamed_then_finished() {
        let mut h = spawn(vec![Ok("Sharpe ".into()), Ok("is strong.".into())], None);
        h.cmds
            .send(UiCommand::Ask {
                ask: 3,
                question: "How is the Sharpe?".into(),
                metrics: metrics(),
                recommendations: Vec::new(),
                api_key: "k".into(),
            })
            .unwrap();

        let mut text = String::new();
        loop {
            match wait_for(&mut h.events, |e| {
                matches!(e, AppEvent::ChatChunk { .. } | AppEvent::ChatFinished { .. })
            })
            .await
            {
                AppEvent::ChatChunk { ask, text: chunk } => {
                    assert_eq!(ask, 3);
                    text.push_str(&chunk);
                }
                AppEvent::ChatFinished { ask } => {
                    assert_eq!(ask, 3);
                    break;
                }
                _ => unreachable!(),
            }
        }
        assert_eq!(text, "Sharpe is strong.");

        let prompts = h.analyst.prompts.lock().unwrap().clone();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("QUESTION: How is the Sharpe?"));

        h.cmds.send(UiCommand::Quit).unwrap();
        h.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn analyst_errors_surface_as_chat_failure() {
        let mut h = spawn(vec![Ok("part".into()), Err("stream reset".into())], None);
        h.cmds
            .send(UiCommand::Ask {
                ask: 1,
                question: "q".into(),
                metrics: metrics(),
                recommendations: Vec::new(),
                api_key: "k".into(),
            })
            .unwrap();
        match wait_for(&mut h.events, |e| matches!(e, AppEvent::ChatFailed { .. })).await {
            AppEvent::ChatFailed { ask, error } => {
                assert_eq!(ask, 1);
                assert!(error.contains("stream reset"));
            }
            _ => unreachable!(),
        }

        h.cmds
            .send(UiCommand::Ask {
                ask: 2,
                question: "q".into(),
                metrics: metrics(),
                recommendations: Vec::new(),
                api_key: String::new(),
            })
            .unwrap();
        match wait_for(&mut h.events, |e| matches!(e, AppEvent::ChatFailed { .. })).await {
            AppEvent::ChatFailed { ask, .. } => assert_eq!(ask, 2),
            _ => unreachable!(),
        }

        h.cmds.send(UiCommand::Quit).unwrap();
        h.task.await.unwrap().unwrap();
    }
}
