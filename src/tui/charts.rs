use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, Gauge, GraphType, Paragraph,
        Tabs,
    },
    Frame,
};
use std::time::{Duration, Instant};

use super::state::{Loadable, UiState};
use crate::model::{AssetRecommendation, ChartData, ChartKind, DrawdownPoint, TimeSeriesPoint};

/// Time the mood gauge takes to sweep from 0 to its value.
pub const MOOD_ANIMATION: Duration = Duration::from_millis(800);

pub const MOOD_SEGMENTS: [(&str, Color); 4] = [
    ("Very weak", Color::Red),
    ("Weak", Color::LightRed),
    ("Strong", Color::Yellow),
    ("Very strong", Color::Green),
];

/// Gauge value shown `now`, sweeping linearly from 0 to `target`.
pub fn mood_progress(target: f64, since: Option<Instant>, now: Instant) -> f64 {
    let Some(since) = since else {
        return target;
    };
    let rate = now.saturating_duration_since(since).as_secs_f64() / MOOD_ANIMATION.as_secs_f64();
    target * rate.min(1.0)
}

/// Index into [`MOOD_SEGMENTS`] for a value in `[0, 1]`.
pub fn mood_segment(value: f64) -> usize {
    ((value.clamp(0.0, 1.0) * 4.0) as usize).min(3)
}

pub fn draw_charts(area: Rect, f: &mut Frame, state: &UiState, now: Instant) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let selected = ChartKind::ALL
        .iter()
        .position(|k| *k == state.chart_kind)
        .unwrap_or(0);
    let selector = Tabs::new(ChartKind::ALL.iter().map(|k| Line::from(k.label())))
        .select(selected)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(Line::from(vec![
                    Span::raw("Chart "),
                    Span::styled("←/→", Style::default().fg(Color::Magenta)),
                ])),
        )
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(selector, chunks[0]);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(state.chart_kind.title());
    match &state.chart {
        Loadable::Idle | Loadable::Loading => {
            f.render_widget(Paragraph::new("Loading...").block(block), chunks[1]);
        }
        Loadable::Failed(e) => {
            f.render_widget(
                Paragraph::new(format!("Error: {e}"))
                    .style(Style::default().fg(Color::Red))
                    .block(block),
                chunks[1],
            );
        }
        Loadable::Loaded(ChartData::MarketMood(v)) => {
            draw_mood_gauge(f, chunks[1], mood_progress(*v, state.mood_since, now), block);
        }
        Loadable::Loaded(ChartData::CumulativeReturns(points)) => {
            draw_cumulative_returns(f, chunks[1], points, block);
        }
        Loadable::Loaded(ChartData::Drawdown(points)) => {
            draw_drawdown(f, chunks[1], points, block);
        }
    }
}

fn draw_mood_gauge(f: &mut Frame, area: Rect, value: f64, block: Block) {
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(0),
                Constraint::Length(3), // gauge
                Constraint::Length(1), // ticks
                Constraint::Length(1), // segment names
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(inner);

    let (name, color) = MOOD_SEGMENTS[mood_segment(value)];
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().fg(color))
        .ratio(value.clamp(0.0, 1.0))
        .label(Span::styled(
            format!("{:.0}% · {name}", value * 100.0),
            Style::default().add_modifier(Modifier::BOLD),
        ));
    f.render_widget(gauge, rows[1]);

    let quarter = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4].as_ref());
    let ticks = quarter.split(rows[2]);
    for (i, tick) in ticks.iter().enumerate() {
        let mut spans = vec![Span::styled(
            format!("{}", i * 25),
            Style::default().fg(Color::Gray),
        )];
        if i == 3 {
            let pad = (tick.width as usize).saturating_sub(5);
            spans.push(Span::raw(" ".repeat(pad)));
            spans.push(Span::styled("100", Style::default().fg(Color::Gray)));
        }
        f.render_widget(Paragraph::new(Line::from(spans)), *tick);
    }
    let names = quarter.split(rows[3]);
    for (i, (label, c)) in MOOD_SEGMENTS.iter().enumerate() {
        f.render_widget(
            Paragraph::new(*label)
                .style(Style::default().fg(*c))
                .alignment(Alignment::Center),
            names[i],
        );
    }
}

/// X axis labels: first, middle and last date.
fn date_labels<'a>(dates: &[&'a str]) -> Vec<Span<'a>> {
    match dates {
        [] => Vec::new(),
        [only] => vec![Span::raw(*only)],
        _ => vec![
            Span::raw(dates[0]),
            Span::raw(dates[dates.len() / 2]),
            Span::raw(dates[dates.len() - 1]),
        ],
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn draw_cumulative_returns(f: &mut Frame, area: Rect, points: &[TimeSeriesPoint], block: Block) {
    if points.is_empty() {
        f.render_widget(Paragraph::new("No data").block(block), area);
        return;
    }

    let portfolio: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.portfolio))
        .collect();
    let btc: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.btc))
        .collect();
    let (lo, hi) = bounds(points.iter().flat_map(|p| [p.portfolio, p.btc]));
    let pad = ((hi - lo) * 0.05).max(0.01);
    let (y_min, y_max) = (lo - pad, hi + pad);

    let datasets = vec![
        Dataset::default()
            .name("Portfolio")
            .graph_type(GraphType::Line)
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(Color::Cyan))
            .data(&portfolio),
        Dataset::default()
            .name("BTC")
            .graph_type(GraphType::Line)
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(Color::Yellow))
            .data(&btc),
    ];
    let dates: Vec<&str> = points.iter().map(|p| p.date.as_str()).collect();
    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .bounds([0.0, (points.len() - 1).max(1) as f64])
                .labels(date_labels(&dates)),
        )
        .y_axis(
            Axis::default()
                .title("Growth")
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::raw(format!("{y_min:.2}")),
                    Span::raw(format!("{y_max:.2}")),
                ]),
        );
    f.render_widget(chart, area);
}

fn draw_drawdown(f: &mut Frame, area: Rect, points: &[DrawdownPoint], block: Block) {
    if points.is_empty() {
        f.render_widget(Paragraph::new("No data").block(block), area);
        return;
    }

    let series: Vec<(f64, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.drawdown))
        .collect();
    let (lo, _) = bounds(points.iter().map(|p| p.drawdown));
    let y_min = lo.min(-1.0) * 1.05;

    let dates: Vec<&str> = points.iter().map(|p| p.date.as_str()).collect();
    let chart = Chart::new(vec![Dataset::default()
        .name("Drawdown %")
        .graph_type(GraphType::Line)
        .marker(symbols::Marker::Braille)
        .style(Style::default().fg(Color::Red))
        .data(&series)])
    .block(block)
    .x_axis(
        Axis::default()
            .bounds([0.0, (points.len() - 1).max(1) as f64])
            .labels(date_labels(&dates)),
    )
    .y_axis(
        Axis::default()
            .title("%")
            .bounds([y_min, 0.0])
            .labels(vec![Span::raw(format!("{y_min:.1}")), Span::raw("0")]),
    );
    f.render_widget(chart, area);
}

/// Horizontal bars of the latest allocation, heaviest first.
pub fn draw_allocation(f: &mut Frame, area: Rect, recs: &[&AssetRecommendation]) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Latest Portfolio Recommendations");
    if recs.is_empty() {
        f.render_widget(Paragraph::new("No data").block(block), area);
        return;
    }

    let palette = [
        Color::Cyan,
        Color::Green,
        Color::Magenta,
        Color::Yellow,
        Color::Blue,
        Color::LightRed,
        Color::LightGreen,
        Color::LightCyan,
    ];
    let bars: Vec<Bar> = recs
        .iter()
        .enumerate()
        .map(|(i, r)| {
            Bar::default()
                .label(Line::from(r.asset.as_str()))
                .value((r.weight * 100.0).round().max(0.0) as u64)
                .text_value(format!("{:.2}%", r.weight))
                .style(Style::default().fg(palette[i % palette.len()]))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .direction(Direction::Horizontal)
        .data(BarGroup::default().bars(&bars))
        .bar_width(1)
        .bar_gap(1)
        .max(10_000);
    f.render_widget(chart, area);
}
