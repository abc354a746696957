//! Text summary builder for CLI output.
//!
//! Formats the performance payload fetched after a successful run into
//! human-readable lines for text mode.

use crate::metrics::{allocation_sorted, metric_cards};
use crate::model::PerformancePayload;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_text_summary(payload: &PerformancePayload) -> TextSummary {
    let mut lines = Vec::new();

    for card in metric_cards(&payload.portfolio_metrics) {
        let arrow = if card.positive { '▲' } else { '▼' };
        lines.push(format!(
            "{:<14} {:>9}  {arrow} {} {}",
            format!("{}:", card.label),
            card.value,
            card.comparison_value,
            card.comparison_label
        ));
    }

    let allocation = allocation_sorted(&payload.recommendations);
    match allocation.first() {
        Some(first) => {
            lines.push(format!("Latest recommendations ({}):", first.date));
            for rec in allocation {
                lines.push(format!(
                    "  {:<6} {:>6.2}%  exp ret {:.3}  exp vol {:.3}  sharpe {:.2}",
                    rec.asset, rec.weight, rec.exp_ret, rec.exp_vol, rec.sharpe
                ));
            }
        }
        None => lines.push("Latest recommendations: none".to_string()),
    }

    TextSummary { lines }
}
