mod charts;
mod gate;
mod help;
mod performance_view;
mod pipeline_view;
mod sidebar;
mod state;

use crate::cli::{build_services, Cli};
use crate::model::AppEvent;
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gate::Tab;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Terminal,
};
use state::{InputMode, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

const SIDEBAR_WIDTH: u16 = 40;

pub async fn run(args: Cli) -> Result<()> {
    let services = build_services(&args)?;

    let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let mut state = UiState::new(
        args.run_config(),
        args.api_keys(),
        Duration::from(args.notification_ttl),
    );
    if args.mock {
        state.info = "Serving generated mock data.".into();
    }
    let launch = args.run_on_launch.then(|| args.run_config());

    // Terminal I/O blocks, so the UI gets its own thread.
    let ui_handle = std::thread::spawn(move || run_threaded(state, event_rx, cmd_tx));

    let res = orchestrator::run_controller(services, launch, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// UI loop: apply controller events, redraw, forward key presses as commands.
fn run_threaded(
    mut state: UiState,
    mut event_rx: UnboundedReceiver<AppEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let year = current_year();
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now() - tick_rate;

    let res = loop {
        let now = Instant::now();
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev, now);
        }
        state.nav.notifier_mut().expire(now);

        if last_tick.elapsed() >= tick_rate {
            terminal
                .draw(|f| draw(f.area(), f, &state, year, Instant::now()))
                .ok();
            last_tick = Instant::now();
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                let (cmds, quit) = handle_key(&mut state, k, Instant::now());
                for cmd in cmds {
                    let _ = cmd_tx.send(cmd);
                }
                if quit {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
                // Redraw right away so typing feels immediate.
                last_tick = Instant::now() - tick_rate;
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn current_year() -> i32 {
    time::OffsetDateTime::now_local()
        .unwrap_or_else(|_| time::OffsetDateTime::now_utc())
        .year()
}

/// Apply one key press. Returns the controller commands it produced and
/// whether the UI should quit.
fn handle_key(state: &mut UiState, k: KeyEvent, now: Instant) -> (Vec<UiCommand>, bool) {
    if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
        return (Vec::new(), true);
    }

    let mut cmds = Vec::new();
    match state.input_mode {
        InputMode::Chat => match k.code {
            KeyCode::Esc => state.input_mode = InputMode::Normal,
            KeyCode::Enter => cmds.extend(state.submit_question()),
            KeyCode::Backspace => {
                state.input.pop();
            }
            KeyCode::Char(c) => state.input.push(c),
            _ => {}
        },
        InputMode::GeminiKey => match k.code {
            KeyCode::Esc => {
                state.input_mode = InputMode::Normal;
                state.input.clear();
                state.info = "Gemini API key unchanged.".into();
            }
            KeyCode::Enter => {
                state.keys.gemini = state.input.trim().to_string();
                state.input.clear();
                state.input_mode = InputMode::Normal;
                state.info = if state.keys.has_gemini() {
                    "Gemini API key updated.".into()
                } else {
                    "Gemini API key cleared.".into()
                };
            }
            KeyCode::Backspace => {
                state.input.pop();
            }
            KeyCode::Char(c) => state.input.push(c),
            _ => {}
        },
        InputMode::Normal => match k.code {
            KeyCode::Char('q') => return (cmds, true),
            KeyCode::Char('?') => state.show_help = !state.show_help,
            KeyCode::Esc => state.show_help = false,
            KeyCode::Char('1') => cmds.extend(state.switch_tab(Tab::Pipeline, now)),
            KeyCode::Char('2') => cmds.extend(state.switch_tab(Tab::Performance, now)),
            KeyCode::Char('3') => cmds.extend(state.switch_tab(Tab::Charts, now)),
            KeyCode::Tab => {
                let next = state.tab().next();
                cmds.extend(state.switch_tab(next, now));
            }
            KeyCode::Char('r') => match state.request_run() {
                Some(cmd) => cmds.push(cmd),
                None => {
                    state.info = if state.run.completed() {
                        "Pipeline already completed.".into()
                    } else {
                        "Pipeline is already running.".into()
                    };
                }
            },
            KeyCode::Char('n') => state.config.step_top_n(-1),
            KeyCode::Char('N') => state.config.step_top_n(1),
            KeyCode::Char('g') => state.config.step_gamma(-1),
            KeyCode::Char('G') => state.config.step_gamma(1),
            KeyCode::Char('K') => {
                state.input = state.keys.gemini.clone();
                state.input_mode = InputMode::GeminiKey;
            }
            KeyCode::Char('i') => {
                if state.tab() == Tab::Performance {
                    if state.analyst_enabled() {
                        state.input_mode = InputMode::Chat;
                    } else {
                        state.info = "Set a Gemini API key (K) to use the analyst.".into();
                    }
                }
            }
            KeyCode::Left | KeyCode::Char('h') => {
                cmds.extend(state.select_chart(state.chart_kind.prev()));
            }
            KeyCode::Right | KeyCode::Char('l') => {
                cmds.extend(state.select_chart(state.chart_kind.next()));
            }
            _ => {}
        },
    }
    (cmds, false)
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, year: i32, now: Instant) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)].as_ref())
        .split(area);
    sidebar::draw_sidebar(cols[0], f, state, year);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(cols[1]);

    let unlocked = state.run.completed();
    let titles = Tab::ALL.iter().map(|t| {
        let style = if *t == Tab::Pipeline || unlocked {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Line::from(Span::styled(
            format!("{} {}", t.index() + 1, t.title()),
            style,
        ))
    });
    let tabs = Tabs::new(titles)
        .select(state.tab().index())
        .block(Block::default().borders(Borders::ALL).title("quanteye"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab() {
        Tab::Pipeline => pipeline_view::draw_pipeline(chunks[1], f, &state.run),
        Tab::Performance => performance_view::draw_performance(chunks[1], f, state),
        Tab::Charts => charts::draw_charts(chunks[1], f, state, now),
    }

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("?", Style::default().fg(Color::Magenta)),
            Span::raw(" help  "),
            Span::raw(state.info.as_str()),
        ]))
        .style(Style::default().fg(Color::Gray)),
        chunks[2],
    );

    if let Some(n) = state.nav.notifier().active(now) {
        draw_toast(cols[1], f, &n.message);
    }
    if state.show_help {
        help::draw_help(area, f);
    }
}

/// Notification box in the top-right corner of `area`.
fn draw_toast(area: Rect, f: &mut ratatui::Frame, message: &str) {
    let width = (message.chars().count() as u16 + 4).min(area.width);
    let rect = Rect {
        x: area.x + area.width - width,
        y: area.y + 3,
        width,
        height: 3.min(area.height.saturating_sub(3)),
    };
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(Span::styled(
            message,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        ),
        rect,
    );
}
