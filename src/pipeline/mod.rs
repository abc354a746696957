//! Pipeline run tracking: the run-state reducer and the tracker that feeds it
//! from the tick timer and the run request.

mod state;
mod tracker;

pub use state::{RunPhase, RunState, StageStatus, STAGES};
#[cfg(test)]
pub use state::{RunAction, PROGRESS_CEILING};
pub use tracker::PipelineTracker;
