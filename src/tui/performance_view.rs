use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::charts;
use super::state::{InputMode, Loadable, UiState};
use crate::metrics::{allocation_sorted, metric_cards, MetricCard};
use crate::model::ChatRole;

const INPUT_PLACEHOLDER: &str = "Ask about the portfolio...";

pub fn draw_performance(area: Rect, f: &mut Frame, state: &UiState) {
    let payload = match &state.performance {
        Loadable::Idle | Loadable::Loading => {
            f.render_widget(
                Paragraph::new("Loading...").block(Block::default().borders(Borders::ALL)),
                area,
            );
            return;
        }
        Loadable::Failed(e) => {
            let p = Paragraph::new(format!("Load failed: {e}"))
                .style(Style::default().fg(Color::Yellow))
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(p, area);
            return;
        }
        Loadable::Loaded(p) => p,
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)].as_ref())
        .split(area);

    let card_areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4].as_ref())
        .split(rows[0]);
    for (card, card_area) in metric_cards(&payload.portfolio_metrics)
        .iter()
        .zip(card_areas.iter())
    {
        draw_card(f, *card_area, card);
    }

    let lower = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
        .split(rows[1]);
    charts::draw_allocation(f, lower[0], &allocation_sorted(&payload.recommendations));
    draw_analyst(f, lower[1], state);
}

fn draw_card(f: &mut Frame, area: Rect, card: &MetricCard) {
    let (arrow, color) = if card.positive {
        ("▲", Color::Green)
    } else {
        ("▼", Color::Red)
    };
    let p = Paragraph::new(vec![
        Line::from(Span::styled(
            card.value.as_str(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled(
                format!("{arrow} {}", card.comparison_value),
                Style::default().fg(color),
            ),
            Span::raw(" "),
            Span::styled(card.comparison_label, Style::default().fg(Color::Gray)),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title(card.label));
    f.render_widget(p, area);
}

/// Number of terminal rows `text` takes when wrapped to `width` columns.
fn wrapped_height(text: &str, width: u16) -> u16 {
    let width = width.max(1) as usize;
    text.split('\n')
        .map(|line| line.chars().count().max(1).div_ceil(width))
        .sum::<usize>()
        .min(u16::MAX as usize) as u16
}

fn draw_analyst(f: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("AI Portfolio Analyst");

    if !state.analyst_enabled() {
        let p = Paragraph::new(vec![
            Line::from(Span::styled(
                "AI Analyst Disabled",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![
                Span::raw("Please provide a Google Gemini API key (press "),
                Span::styled("K", Style::default().fg(Color::Magenta)),
                Span::raw(") to enable this feature."),
            ]),
        ])
        .wrap(Wrap { trim: true })
        .block(block);
        f.render_widget(p, area);
        return;
    }

    let inner = block.inner(area);
    f.render_widget(block, area);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(inner);

    let mut lines: Vec<Line> = Vec::new();
    let mut plain = String::new();
    let messages = state.transcript.messages();
    for (i, msg) in messages.iter().enumerate() {
        let (who, color) = match msg.role {
            ChatRole::User => ("You", Color::Cyan),
            ChatRole::Assistant => ("QuantEye AI", Color::Magenta),
        };
        lines.push(Line::from(Span::styled(
            format!("{who}:"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        plain.push_str(who);
        plain.push_str(":\n");

        let pending = i + 1 == messages.len() && state.transcript.awaiting_first_chunk();
        if pending {
            lines.push(Line::from(Span::styled("▌", Style::default().fg(Color::White))));
            plain.push_str("▌\n");
        } else {
            for l in msg.content.split('\n') {
                lines.push(Line::from(l.to_string()));
                plain.push_str(l);
                plain.push('\n');
            }
        }
        lines.push(Line::from(""));
        plain.push('\n');
    }

    // Keep the newest message in view.
    let height = wrapped_height(plain.trim_end_matches('\n'), parts[0].width);
    let scroll = height.saturating_sub(parts[0].height);
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0)),
        parts[0],
    );

    let editing = state.input_mode == InputMode::Chat;
    let input_line = if state.transcript.is_loading() {
        Line::from(Span::styled("Thinking...", Style::default().fg(Color::Gray)))
    } else if editing {
        Line::from(vec![Span::raw(state.input.as_str()), Span::raw("█")])
    } else if state.input.is_empty() {
        Line::from(vec![
            Span::styled(INPUT_PLACEHOLDER, Style::default().fg(Color::DarkGray)),
            Span::styled("  (i to type)", Style::default().fg(Color::DarkGray)),
        ])
    } else {
        Line::from(state.input.as_str())
    };
    let border = if editing { Color::Yellow } else { Color::Gray };
    f.render_widget(
        Paragraph::new(input_line).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border)),
        ),
        parts[1],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_height_counts_wrapped_and_blank_lines() {
        assert_eq!(wrapped_height("abcd", 2), 2);
        assert_eq!(wrapped_height("abc\n\nde", 2), 4);
        assert_eq!(wrapped_height("", 10), 1);
    }
}
