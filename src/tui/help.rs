use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const KEYBINDS: &[(&str, &str)] = &[
    ("q / Ctrl-C", "Quit"),
    ("1 2 3 / tab", "Switch tabs (data tabs unlock after a run)"),
    ("r", "Run pipeline"),
    ("n / N", "Top assets -/+"),
    ("g / G", "Risk aversion -/+"),
    ("K", "Edit Gemini API key"),
    ("i", "Ask the AI analyst (Performance tab)"),
    ("←/→ or h/l", "Select chart (Charts tab)"),
    ("Enter", "Submit input"),
    ("Esc", "Leave input / close help"),
    ("?", "Toggle this help"),
];

fn help_lines() -> Vec<Line<'static>> {
    let mut lines = vec![Line::from("Keybinds:")];
    for (keys, what) in KEYBINDS {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{keys:<13}"), Style::default().fg(Color::Magenta)),
            Span::raw(*what),
        ]));
    }
    lines
}

/// Help overlay, centred over `area`.
pub fn draw_help(area: Rect, f: &mut Frame) {
    let lines = help_lines();
    let width = 64.min(area.width);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };
    f.render_widget(Clear, popup);
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, popup);
}
