//! Run-state reducer for the pipeline tracker.
//!
//! Every change to a pipeline run goes through [`RunState::apply`]. The tick
//! timer and the request completion both feed it, so the precedence between
//! them is decided in one place: a tick is only accepted while the run is
//! still `Running`.

use serde::Serialize;

/// Simulated progress never passes this value on its own.
pub const PROGRESS_CEILING: u8 = 80;
pub const PROGRESS_DONE: u8 = 100;

pub const STAGES: [&str; 3] = [
    "Station 1: Fetching crypto OHLCV data & CoinDesk news",
    "Station 2: Feature engineering (momentum, volatility, sentiment)",
    "Station 3: Portfolio optimization & backtesting",
];

pub const IDLE_TEXT: &str = "Pipeline idle. Press r to start.";
pub const SUCCESS_TEXT: &str = "✅ Pipeline completed successfully!";
pub const FAILURE_TEXT: &str = "❌ Pipeline failed.";

/// Stage boundaries in percent, used for the three station indicators.
const STAGE_SPAN: f64 = 33.33;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunAction {
    Start,
    Tick,
    Succeeded,
    Failed,
}

/// Display state of one station indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Pending,
    Running,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunState {
    phase: RunPhase,
    progress: u8,
    status_text: String,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            phase: RunPhase::Idle,
            progress: 0,
            status_text: IDLE_TEXT.to_string(),
        }
    }
}

impl RunState {
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn is_running(&self) -> bool {
        self.phase == RunPhase::Running
    }

    pub fn completed(&self) -> bool {
        self.phase == RunPhase::Completed
    }

    /// Whether `start` would be accepted in the current phase.
    pub fn can_start(&self) -> bool {
        matches!(self.phase, RunPhase::Idle | RunPhase::Failed)
    }

    /// Apply one transition. Returns `false` when the action is not valid in
    /// the current phase; the state is left untouched in that case.
    pub fn apply(&mut self, action: RunAction) -> bool {
        match (self.phase, action) {
            (RunPhase::Idle | RunPhase::Failed, RunAction::Start) => {
                self.phase = RunPhase::Running;
                self.progress = 0;
                self.status_text = stage_status_text(self.progress);
                true
            }
            (RunPhase::Running, RunAction::Tick) => {
                if self.progress >= PROGRESS_CEILING {
                    return false;
                }
                self.progress = (self.progress + 1).min(PROGRESS_CEILING);
                self.status_text = stage_status_text(self.progress);
                true
            }
            (RunPhase::Running, RunAction::Succeeded) => {
                self.phase = RunPhase::Completed;
                self.progress = PROGRESS_DONE;
                self.status_text = SUCCESS_TEXT.to_string();
                true
            }
            (RunPhase::Running, RunAction::Failed) => {
                // Progress stays where the simulation left it.
                self.phase = RunPhase::Failed;
                self.status_text = FAILURE_TEXT.to_string();
                true
            }
            _ => false,
        }
    }

    /// Whether the tick timer still has work to do.
    pub fn wants_ticks(&self) -> bool {
        self.is_running() && self.progress < PROGRESS_CEILING
    }

    pub fn stage_status(&self, stage: usize) -> StageStatus {
        let progress = self.progress as f64;
        if progress >= (stage as f64 + 1.0) * STAGE_SPAN {
            StageStatus::Completed
        } else if progress >= stage as f64 * STAGE_SPAN && self.is_running() {
            StageStatus::Running
        } else {
            StageStatus::Pending
        }
    }

    /// Label of the run button.
    pub fn action_label(&self) -> &'static str {
        if self.completed() {
            "Completed"
        } else if self.is_running() {
            "Running..."
        } else {
            "Run"
        }
    }
}

/// Index into [`STAGES`] for a progress value.
pub fn stage_index(progress: u8) -> usize {
    if progress >= 66 {
        2
    } else if progress >= 33 {
        1
    } else {
        0
    }
}

pub fn stage_status_text(progress: u8) -> String {
    format!("🔄 {}", STAGES[stage_index(progress)])
}
