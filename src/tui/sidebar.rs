use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::state::{InputMode, UiState};
use crate::model::{mask_secret, GAMMA_MAX, GAMMA_MIN, TOP_N_MAX, TOP_N_MIN};

const SLIDER_WIDTH: usize = 20;

/// Text slider, `━━━━●────` style.
fn slider(value: f64, min: f64, max: f64) -> String {
    let ratio = ((value - min) / (max - min)).clamp(0.0, 1.0);
    let knob = (ratio * (SLIDER_WIDTH - 1) as f64).round() as usize;
    let mut s = String::new();
    for i in 0..SLIDER_WIDTH {
        s.push(match i.cmp(&knob) {
            std::cmp::Ordering::Less => '━',
            std::cmp::Ordering::Equal => '●',
            std::cmp::Ordering::Greater => '─',
        });
    }
    s
}

fn key(k: &'static str) -> Span<'static> {
    Span::styled(k, Style::default().fg(Color::Magenta))
}

pub fn draw_sidebar(area: Rect, f: &mut Frame, state: &UiState, year: i32) {
    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        "QuantEye",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(inner);

    let heading = Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD);
    let value = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let cfg = state.config;

    let gemini_shown = if state.input_mode == InputMode::GeminiKey {
        format!("{}█", mask_secret(&state.input).trim_start_matches('-'))
    } else {
        mask_secret(&state.keys.gemini)
    };
    let gemini_style = if state.input_mode == InputMode::GeminiKey {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };

    let lines = vec![
        Line::from(Span::styled("Optimization Parameters", heading)),
        Line::from(""),
        Line::from(vec![
            Span::raw("Top Assets (TOP_N)  "),
            Span::styled(cfg.top_n.to_string(), value),
        ]),
        Line::from(Span::styled(
            slider(cfg.top_n as f64, TOP_N_MIN as f64, TOP_N_MAX as f64),
            Style::default().fg(Color::Blue),
        )),
        Line::from(vec![key("n"), Span::raw(" / "), key("N"), Span::raw("  -/+")]),
        Line::from(""),
        Line::from(vec![
            Span::raw("Risk Aversion (γ)   "),
            Span::styled(format!("{:.1}", cfg.gamma), value),
        ]),
        Line::from(Span::styled(
            slider(cfg.gamma, GAMMA_MIN, GAMMA_MAX),
            Style::default().fg(Color::Blue),
        )),
        Line::from(vec![key("g"), Span::raw(" / "), key("G"), Span::raw("  -/+")]),
        Line::from(""),
        Line::from(Span::styled("API Keys", heading)),
        Line::from(""),
        Line::from("CoinCompare API Key"),
        Line::from(Span::styled(
            mask_secret(&state.keys.coin_compare),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(vec![Span::raw("Google Gemini API Key  "), key("K")]),
        Line::from(Span::styled(gemini_shown, gemini_style)),
    ];
    f.render_widget(Paragraph::new(lines), parts[0]);

    f.render_widget(
        Paragraph::new(vec![
            Line::from(format!("© {year} QuantEye. All rights reserved.")),
            Line::from("For institutional use only."),
        ])
        .style(Style::default().fg(Color::DarkGray)),
        parts[1],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slider_places_knob_by_ratio() {
        let low = slider(5.0, 5.0, 15.0);
        assert!(low.starts_with('●'));
        assert_eq!(low.chars().count(), SLIDER_WIDTH);

        let high = slider(3.0, 0.5, 3.0);
        assert!(high.ends_with('●'));

        let mid = slider(10.0, 5.0, 15.0);
        assert_eq!(mid.chars().position(|c| c == '●'), Some(10));
    }
}
