use super::state::{RunAction, RunState};
use crate::backend::{BackendError, DashboardBackend};
use crate::model::RunConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

/// What woke the tracker up.
#[derive(Debug)]
pub enum TrackerStep {
    Tick,
    Finished(Result<(), String>),
}

/// Resources that only exist while a run is in flight.
struct InFlight {
    request: JoinHandle<Result<(), BackendError>>,
    ticker: Option<Interval>,
}

/// Owns the run state of the pipeline and the single outstanding run request.
///
/// The simulated progress timer and the request completion are both polled
/// from [`PipelineTracker::next_step`] and applied through
/// [`PipelineTracker::handle`], which is the only place the state changes.
pub struct PipelineTracker {
    state: RunState,
    backend: Arc<dyn DashboardBackend>,
    tick_interval: Duration,
    inflight: Option<InFlight>,
}

impl PipelineTracker {
    pub fn new(backend: Arc<dyn DashboardBackend>, tick_interval: Duration) -> Self {
        Self {
            state: RunState::default(),
            backend,
            tick_interval,
            inflight: None,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Begin a run with `cfg`. Ignored (returns `false`) while a run is in
    /// flight or after one has completed.
    pub fn start(&mut self, cfg: &RunConfig) -> bool {
        if self.inflight.is_some() || !self.state.apply(RunAction::Start) {
            return false;
        }

        let backend = self.backend.clone();
        let req = cfg.request();
        tracing::info!(top_n = req.top_n, gamma = req.gamma, "pipeline run started");
        let request = tokio::spawn(async move { backend.run_pipeline(&req).await });

        let start = tokio::time::Instant::now() + self.tick_interval;
        let mut ticker = tokio::time::interval_at(start, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.inflight = Some(InFlight {
            request,
            ticker: Some(ticker),
        });
        true
    }

    /// Wait for the next tick or for the request to finish. Pending forever
    /// when nothing is in flight, so it is safe to use as a `select!` branch.
    pub async fn next_step(&mut self) -> TrackerStep {
        let Some(InFlight { request, ticker }) = self.inflight.as_mut() else {
            return futures::future::pending().await;
        };

        tokio::select! {
            // Completion wins over a tick that is ready at the same time.
            biased;
            joined = request => {
                let outcome = match joined {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(e) => Err(format!("run task failed: {e}")),
                };
                TrackerStep::Finished(outcome)
            }
            _ = async {
                match ticker.as_mut() {
                    Some(t) => {
                        t.tick().await;
                    }
                    None => futures::future::pending::<()>().await,
                }
            } => TrackerStep::Tick,
        }
    }

    /// Apply a step to the run state. Returns `true` if the state changed.
    pub fn handle(&mut self, step: TrackerStep) -> bool {
        let changed = match step {
            TrackerStep::Tick => self.state.apply(RunAction::Tick),
            TrackerStep::Finished(Ok(())) => {
                // Leaving Running first stops the timer for good.
                self.inflight = None;
                let changed = self.state.apply(RunAction::Succeeded);
                tracing::info!("pipeline run completed");
                changed
            }
            TrackerStep::Finished(Err(error)) => {
                self.inflight = None;
                tracing::warn!(%error, "pipeline run failed");
                self.state.apply(RunAction::Failed)
            }
        };

        if !self.state.wants_ticks() {
            if let Some(inflight) = self.inflight.as_mut() {
                inflight.ticker = None;
            }
        }
        changed
    }

    /// Abort the in-flight request and stop ticking.
    pub fn shutdown(&mut self) {
        if let Some(inflight) = self.inflight.take() {
            inflight.request.abort();
            tracing::debug!("pipeline tracker torn down with a run in flight");
        }
    }
}

impl Drop for PipelineTracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
