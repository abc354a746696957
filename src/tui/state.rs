use super::gate::{GateDecision, Tab, TabNavigator};
use crate::analyst::Transcript;
use crate::model::{ApiKeys, AppEvent, ChartData, ChartKind, PerformancePayload, RunConfig};
use crate::orchestrator::UiCommand;
use crate::pipeline::RunState;
use std::time::{Duration, Instant};

/// Data fetched for a view, with its load progress.
#[derive(Debug, Clone)]
pub enum Loadable<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Loadable<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Loadable::Loaded(v) => Some(v),
            _ => None,
        }
    }
}

impl<T> From<Result<T, String>> for Loadable<T> {
    fn from(r: Result<T, String>) -> Self {
        match r {
            Ok(v) => Loadable::Loaded(v),
            Err(e) => Loadable::Failed(e),
        }
    }
}

/// Where typed characters go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Chat,
    GeminiKey,
}

/// UI state owned by the TUI thread. The run state is a snapshot pushed by
/// the controller.
pub struct UiState {
    pub run: RunState,
    pub config: RunConfig,
    pub keys: ApiKeys,
    pub nav: TabNavigator,
    pub show_help: bool,
    pub input_mode: InputMode,
    pub input: String,
    pub info: String,

    /// Bumped on every data-view mount or chart selection; results tagged
    /// with an older value are dropped.
    pub mount: u64,
    pub performance: Loadable<PerformancePayload>,
    pub transcript: Transcript,
    /// Id of the newest question sent to the analyst.
    pub ask: u64,

    pub chart_kind: ChartKind,
    pub chart: Loadable<ChartData>,
    /// When the mood gauge started animating towards its value.
    pub mood_since: Option<Instant>,
}

impl UiState {
    pub fn new(config: RunConfig, keys: ApiKeys, notification_ttl: Duration) -> Self {
        Self {
            run: RunState::default(),
            config,
            keys,
            nav: TabNavigator::new(notification_ttl),
            show_help: false,
            input_mode: InputMode::Normal,
            input: String::new(),
            info: String::new(),
            mount: 0,
            performance: Loadable::Idle,
            transcript: Transcript::default(),
            ask: 0,
            chart_kind: ChartKind::MarketMood,
            chart: Loadable::Idle,
            mood_since: None,
        }
    }

    pub fn tab(&self) -> Tab {
        self.nav.active()
    }

    pub fn apply_event(&mut self, ev: AppEvent, now: Instant) {
        match ev {
            AppEvent::Pipeline(run) => {
                if run.completed() && !self.run.completed() {
                    self.info = "Pipeline completed. Performance and Charts are unlocked.".into();
                }
                self.run = run;
            }
            AppEvent::Performance { mount, result } => {
                if mount == self.mount && self.tab() == Tab::Performance {
                    self.performance = result.into();
                }
            }
            AppEvent::Chart {
                mount,
                kind,
                result,
            } => {
                if mount == self.mount && kind == self.chart_kind && self.tab() == Tab::Charts {
                    if matches!(result, Ok(ChartData::MarketMood(_))) {
                        self.mood_since = Some(now);
                    }
                    self.chart = result.into();
                }
            }
            AppEvent::ChatChunk { ask, text } => {
                if ask == self.ask && self.transcript.is_loading() {
                    self.transcript.append_chunk(&text);
                }
            }
            AppEvent::ChatFinished { ask } => {
                if ask == self.ask {
                    self.transcript.finish();
                }
            }
            AppEvent::ChatFailed { ask, error } => {
                if ask == self.ask && self.transcript.is_loading() {
                    self.transcript.fail(&error);
                }
            }
            AppEvent::Info(msg) => self.info = msg,
        }
    }

    /// Ask the controller for a run, unless one is running or done.
    pub fn request_run(&mut self) -> Option<UiCommand> {
        if self.run.can_start() {
            Some(UiCommand::RunPipeline(self.config))
        } else {
            None
        }
    }

    /// Navigate to `target`. Returns the commands the switch implies: loading
    /// the newly mounted view and cancelling the analyst when leaving it.
    pub fn switch_tab(&mut self, target: Tab, now: Instant) -> Vec<UiCommand> {
        let from = self.tab();
        if target == from {
            return Vec::new();
        }
        if self.nav.request(target, self.run.completed(), now) == GateDecision::Deny {
            return Vec::new();
        }

        let mut cmds = Vec::new();
        if from == Tab::Performance {
            if self.transcript.is_loading() {
                cmds.push(UiCommand::CancelChat);
            }
            if self.input_mode == InputMode::Chat {
                self.input_mode = InputMode::Normal;
                self.input.clear();
            }
        }
        match target {
            Tab::Pipeline => {}
            Tab::Performance => {
                self.mount += 1;
                self.performance = Loadable::Loading;
                self.transcript = Transcript::default();
                cmds.push(UiCommand::LoadPerformance { mount: self.mount });
            }
            Tab::Charts => cmds.push(self.load_chart()),
        }
        cmds
    }

    /// Move the chart selector and fetch the newly selected chart.
    pub fn select_chart(&mut self, kind: ChartKind) -> Option<UiCommand> {
        if self.tab() != Tab::Charts || kind == self.chart_kind {
            return None;
        }
        self.chart_kind = kind;
        Some(self.load_chart())
    }

    fn load_chart(&mut self) -> UiCommand {
        self.mount += 1;
        self.chart = Loadable::Loading;
        self.mood_since = None;
        UiCommand::LoadChart {
            mount: self.mount,
            kind: self.chart_kind,
        }
    }

    /// Whether the analyst panel accepts questions.
    pub fn analyst_enabled(&self) -> bool {
        self.keys.has_gemini()
    }

    /// Send the typed question to the analyst. Needs a key, loaded
    /// performance data and no answer in progress.
    pub fn submit_question(&mut self) -> Option<UiCommand> {
        if !self.analyst_enabled() {
            return None;
        }
        let payload = self.performance.loaded()?.clone();
        let question = self.transcript.submit(&self.input)?;
        self.input.clear();
        self.ask += 1;
        Some(UiCommand::Ask {
            ask: self.ask,
            question,
            metrics: payload.portfolio_metrics,
            recommendations: payload.recommendations,
            api_key: self.keys.gemini.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssetRecommendation, PortfolioMetrics};
    use crate::pipeline::{RunAction, PROGRESS_CEILING};
    use crate::tui::gate::DENIED_MESSAGE;

    fn state() -> UiState {
        UiState::new(
            RunConfig::default(),
            ApiKeys {
                coin_compare: String::new(),
                gemini: "g".into(),
            },
            Duration::from_secs(3),
        )
    }

    fn completed_run() -> RunState {
        let mut run = RunState::default();
        run.apply(RunAction::Start);
        run.apply(RunAction::Succeeded);
        run
    }

    fn payload() -> PerformancePayload {
        PerformancePayload {
            portfolio_metrics: PortfolioMetrics {
                portfolio_cagr: 40.0,
                btc_cagr: 30.0,
                portfolio_sharpe: 1.8,
                btc_sharpe: 1.1,
                portfolio_mdd: 20.0,
                btc_mdd: 35.0,
                win_rate: 60.0,
                outperform_rate: 55.0,
            },
            recommendations: vec![AssetRecommendation {
                date: "2025-07-01".into(),
                asset: "ETH".into(),
                weight: 100.0,
                exp_ret: 0.1,
                exp_vol: 0.8,
                sharpe: 1.4,
            }],
        }
    }

    #[test]
    fn gated_tabs_stay_locked_before_completion() {
        let now = Instant::now();
        let mut s = state();
        assert!(s.switch_tab(Tab::Performance, now).is_empty());
        assert_eq!(s.tab(), Tab::Pipeline);
        assert_eq!(
            s.nav.notifier().active(now).map(|n| n.message.as_str()),
            Some(DENIED_MESSAGE)
        );
    }

    #[test]
    fn run_is_requested_only_when_startable() {
        let mut s = state();
        assert!(matches!(s.request_run(), Some(UiCommand::RunPipeline(c)) if c == RunConfig::default()));

        let mut running = RunState::default();
        running.apply(RunAction::Start);
        for _ in 0..PROGRESS_CEILING {
            running.apply(RunAction::Tick);
        }
        s.apply_event(AppEvent::Pipeline(running), Instant::now());
        assert!(s.request_run().is_none());

        s.apply_event(AppEvent::Pipeline(completed_run()), Instant::now());
        assert!(s.request_run().is_none());
    }

    #[test]
    fn mounting_performance_loads_and_drops_stale_results() {
        let now = Instant::now();
        let mut s = state();
        s.apply_event(AppEvent::Pipeline(completed_run()), now);

        let cmds = s.switch_tab(Tab::Performance, now);
        assert!(matches!(cmds.as_slice(), [UiCommand::LoadPerformance { mount: 1 }]));
        assert!(matches!(s.performance, Loadable::Loading));

        // Leave and come back: the first answer belongs to an old mount.
        s.switch_tab(Tab::Pipeline, now);
        s.switch_tab(Tab::Performance, now);
        s.apply_event(
            AppEvent::Performance {
                mount: 1,
                result: Ok(payload()),
            },
            now,
        );
        assert!(matches!(s.performance, Loadable::Loading));

        s.apply_event(
            AppEvent::Performance {
                mount: 2,
                result: Err("server returned 500".into()),
            },
            now,
        );
        assert!(matches!(&s.performance, Loadable::Failed(e) if e == "server returned 500"));
    }

    #[test]
    fn question_flow_streams_into_transcript() {
        let now = Instant::now();
        let mut s = state();
        s.apply_event(AppEvent::Pipeline(completed_run()), now);
        s.switch_tab(Tab::Performance, now);
        s.apply_event(
            AppEvent::Performance {
                mount: s.mount,
                result: Ok(payload()),
            },
            now,
        );

        s.input = "Is ETH overweight?".into();
        let cmd = s.submit_question().unwrap();
        assert!(matches!(&cmd, UiCommand::Ask { ask: 1, question, api_key, .. }
            if question == "Is ETH overweight?" && api_key == "g"));
        assert!(s.input.is_empty());

        s.apply_event(AppEvent::ChatChunk { ask: 1, text: "Yes.".into() }, now);
        s.apply_event(AppEvent::ChatFinished { ask: 1 }, now);
        assert_eq!(s.transcript.messages().last().unwrap().content, "Yes.");
        assert!(!s.transcript.is_loading());
    }

    #[test]
    fn leaving_performance_cancels_a_streaming_answer() {
        let now = Instant::now();
        let mut s = state();
        s.apply_event(AppEvent::Pipeline(completed_run()), now);
        s.switch_tab(Tab::Performance, now);
        s.apply_event(
            AppEvent::Performance {
                mount: s.mount,
                result: Ok(payload()),
            },
            now,
        );
        s.input = "q".into();
        s.submit_question().unwrap();

        let cmds = s.switch_tab(Tab::Charts, now);
        assert!(matches!(cmds.first(), Some(UiCommand::CancelChat)));
        assert!(matches!(cmds.get(1), Some(UiCommand::LoadChart { kind: ChartKind::MarketMood, .. })));
    }

    #[test]
    fn analyst_needs_a_key_and_data() {
        let now = Instant::now();
        let mut s = state();
        s.keys.gemini.clear();
        s.apply_event(AppEvent::Pipeline(completed_run()), now);
        s.switch_tab(Tab::Performance, now);
        s.input = "q".into();
        assert!(s.submit_question().is_none());

        s.keys.gemini = "g".into();
        // Still loading.
        assert!(s.submit_question().is_none());
    }

    #[test]
    fn chart_selection_refetches_and_starts_mood_animation() {
        let now = Instant::now();
        let mut s = state();
        s.apply_event(AppEvent::Pipeline(completed_run()), now);
        s.switch_tab(Tab::Charts, now);
        let mount = s.mount;

        let cmd = s.select_chart(ChartKind::Drawdown).unwrap();
        assert!(matches!(cmd, UiCommand::LoadChart { kind: ChartKind::Drawdown, mount: m } if m == mount + 1));

        // An answer for the previous selection is ignored.
        s.apply_event(
            AppEvent::Chart {
                mount,
                kind: ChartKind::MarketMood,
                result: Ok(ChartData::MarketMood(0.4)),
            },
            now,
        );
        assert!(matches!(s.chart, Loadable::Loading));
        assert!(s.mood_since.is_none());

        s.select_chart(ChartKind::MarketMood);
        s.apply_event(
            AppEvent::Chart {
                mount: s.mount,
                kind: ChartKind::MarketMood,
                result: Ok(ChartData::MarketMood(0.4)),
            },
            now,
        );
        assert_eq!(s.mood_since, Some(now));
        assert!(s.select_chart(ChartKind::MarketMood).is_none());
    }
}
