//! Application-level orchestration.
//!
//! The controller owns the pipeline run lifecycle, data fetches and the analyst
//! stream. UI and CLI layers talk to it through commands and events to keep
//! responsibilities separated.

mod controller;

pub(crate) use controller::{run_controller, Services, UiCommand};
