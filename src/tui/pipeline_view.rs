use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::pipeline::{RunPhase, RunState, StageStatus, STAGES};

/// Short station name, the part after "Station N:".
fn stage_name(stage: &str) -> &str {
    stage.split_once(':').map(|(_, n)| n.trim()).unwrap_or(stage)
}

fn stage_spans(run: &RunState) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (i, stage) in STAGES.iter().enumerate() {
        let status = run.stage_status(i);
        let (marker, color) = match status {
            StageStatus::Completed => ("✔".to_string(), Color::Green),
            StageStatus::Running => (format!("S{}", i + 1), Color::Blue),
            StageStatus::Pending => (format!("S{}", i + 1), Color::DarkGray),
        };
        spans.push(Span::styled(
            marker,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!(" {}", stage_name(stage)),
            Style::default().fg(color),
        ));
        if i + 1 < STAGES.len() {
            spans.push(Span::styled("  ›  ", Style::default().fg(Color::DarkGray)));
        }
    }
    spans
}

pub fn draw_pipeline(area: Rect, f: &mut Frame, run: &RunState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Pipeline Execution");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(0),
                Constraint::Length(2), // description
                Constraint::Length(2), // stations
                Constraint::Length(3), // progress
                Constraint::Length(2), // status text
                Constraint::Length(3), // run button
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(inner);

    f.render_widget(
        Paragraph::new(
            "Execute the multi-stage process to generate an optimized portfolio based on the \
             latest market data and risk parameters.",
        )
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true }),
        rows[1],
    );

    f.render_widget(
        Paragraph::new(Line::from(stage_spans(run))).alignment(Alignment::Center),
        rows[2],
    );

    let bar_area = centered(rows[3], 60);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Blue).bg(Color::Black))
        .percent(u16::from(run.progress()))
        .label(format!("{}%", run.progress()));
    f.render_widget(gauge, bar_area);

    let status_color = match run.phase() {
        RunPhase::Completed => Color::Green,
        RunPhase::Failed => Color::Red,
        RunPhase::Running => Color::White,
        RunPhase::Idle => Color::Gray,
    };
    f.render_widget(
        Paragraph::new(run.status_text())
            .style(Style::default().fg(status_color))
            .alignment(Alignment::Center),
        rows[4],
    );

    let enabled = run.can_start();
    let button_style = if enabled {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let button = Paragraph::new(Line::from(vec![
        Span::styled(run.action_label(), button_style),
        Span::styled(
            if enabled { "  (r)" } else { "" },
            Style::default().fg(Color::Magenta),
        ),
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(if enabled {
                Style::default().fg(Color::Blue)
            } else {
                Style::default().fg(Color::DarkGray)
            }),
    );
    f.render_widget(button, centered(rows[5], 24));
}

/// A horizontally centred slice of `area`, at most `width` columns wide.
fn centered(area: Rect, width: u16) -> Rect {
    let w = width.min(area.width);
    Rect {
        x: area.x + (area.width - w) / 2,
        width: w,
        ..area
    }
}
