use crate::metrics::latest_recommendations;
use crate::model::{AssetRecommendation, PortfolioMetrics};

/// Build the analyst prompt: portfolio context followed by the user's question.
pub fn build_prompt(
    question: &str,
    metrics: &PortfolioMetrics,
    recommendations: &[AssetRecommendation],
) -> String {
    let weights = latest_recommendations(recommendations)
        .iter()
        .map(|r| format!("- {}: {:.2}% weight", r.asset, r.weight))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an expert cryptocurrency portfolio analyst named 'QuantEye AI', working with a \
sophisticated portfolio optimization platform. You have access to the following portfolio data:

PORTFOLIO METRICS:
- Annual Return (CAGR): {:.2}% (BTC: {:.2}%)
- Sharpe Ratio: {:.2} (BTC: {:.2})
- Max Drawdown: {:.2}% (BTC: {:.2}%)
- Win Rate: {:.1}%
- Outperform Rate vs BTC: {:.1}%

LATEST RECOMMENDATIONS:
{weights}

Based on this data, please answer the following question in a professional, institutional \
manner. Be concise but informative.

QUESTION: {question}
",
        metrics.portfolio_cagr,
        metrics.btc_cagr,
        metrics.portfolio_sharpe,
        metrics.btc_sharpe,
        metrics.portfolio_mdd,
        metrics.btc_mdd,
        metrics.win_rate,
        metrics.outperform_rate,
    )
}
