use crate::model::{AssetRecommendation, PortfolioMetrics};

/// One headline card on the Performance tab.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricCard {
    pub label: &'static str,
    pub value: String,
    pub comparison_value: String,
    pub comparison_label: &'static str,
    /// Whether the comparison reads as favourable (green).
    pub positive: bool,
}

/// Compute the four metric cards (annual return, Sharpe, max drawdown, win rate).
pub fn metric_cards(m: &PortfolioMetrics) -> [MetricCard; 4] {
    [
        MetricCard {
            label: "Annual Return",
            value: format!("{:.2}%", m.portfolio_cagr),
            comparison_value: format!("{:.2}%", m.portfolio_cagr - m.btc_cagr),
            comparison_label: "vs BTC",
            positive: m.portfolio_cagr > m.btc_cagr,
        },
        MetricCard {
            label: "Sharpe Ratio",
            value: format!("{:.2}", m.portfolio_sharpe),
            comparison_value: format!("{:.2}", m.portfolio_sharpe - m.btc_sharpe),
            comparison_label: "vs BTC",
            positive: m.portfolio_sharpe > m.btc_sharpe,
        },
        MetricCard {
            label: "Max Drawdown",
            value: format!("{:.2}%", m.portfolio_mdd),
            comparison_value: format!("{:.2}%", m.portfolio_mdd - m.btc_mdd),
            comparison_label: "vs BTC",
            // Smaller drawdown is better.
            positive: m.portfolio_mdd < m.btc_mdd,
        },
        MetricCard {
            label: "Win Rate",
            value: format!("{:.1}%", m.win_rate),
            comparison_value: format!("{:.1}%", m.outperform_rate),
            comparison_label: "vs BTC",
            positive: m.outperform_rate > 50.0,
        },
    ]
}

/// Recommendations sharing the date of the last entry, in input order.
pub fn latest_recommendations(recs: &[AssetRecommendation]) -> Vec<&AssetRecommendation> {
    let Some(last) = recs.last() else {
        return Vec::new();
    };
    recs.iter().filter(|r| r.date == last.date).collect()
}

/// Latest recommendations ordered by weight, heaviest first.
pub fn allocation_sorted(recs: &[AssetRecommendation]) -> Vec<&AssetRecommendation> {
    let mut latest = latest_recommendations(recs);
    latest.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    latest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> PortfolioMetrics {
        PortfolioMetrics {
            portfolio_cagr: 45.678,
            btc_cagr: 30.0,
            portfolio_sharpe: 1.2,
            btc_sharpe: 1.5,
            portfolio_mdd: 22.5,
            btc_mdd: 40.0,
            win_rate: 58.26,
            outperform_rate: 48.0,
        }
    }

    fn rec(date: &str, asset: &str, weight: f64) -> AssetRecommendation {
        AssetRecommendation {
            date: date.into(),
            asset: asset.into(),
            weight,
            exp_ret: 0.0,
            exp_vol: 1.0,
            sharpe: 1.0,
        }
    }

    #[test]
    fn cards_format_values_and_comparisons() {
        let [ret, sharpe, mdd, win] = metric_cards(&metrics());

        assert_eq!(ret.value, "45.68%");
        assert_eq!(ret.comparison_value, "15.68%");
        assert!(ret.positive);

        assert_eq!(sharpe.value, "1.20");
        assert_eq!(sharpe.comparison_value, "-0.30");
        assert!(!sharpe.positive);

        assert_eq!(mdd.value, "22.50%");
        assert_eq!(mdd.comparison_value, "-17.50%");
        assert!(mdd.positive);

        assert_eq!(win.value, "58.3%");
        assert_eq!(win.comparison_value, "48.0%");
        assert!(!win.positive);
        assert_eq!(win.comparison_label, "vs BTC");
    }

    #[test]
    fn deeper_drawdown_than_btc_is_unfavourable() {
        let mut m = metrics();
        m.portfolio_mdd = 50.0;
        assert!(!metric_cards(&m)[2].positive);
    }

    #[test]
    fn latest_keeps_only_last_date() {
        let recs = vec![
            rec("2025-06-30", "BTC", 50.0),
            rec("2025-07-01", "ETH", 20.0),
            rec("2025-07-01", "SOL", 30.0),
        ];
        let latest = latest_recommendations(&recs);
        let assets: Vec<_> = latest.iter().map(|r| r.asset.as_str()).collect();
        assert_eq!(assets, ["ETH", "SOL"]);
        assert!(latest_recommendations(&[]).is_empty());
    }

    #[test]
    fn allocation_is_sorted_by_weight_descending() {
        let recs = vec![
            rec("2025-07-01", "ETH", 20.0),
            rec("2025-07-01", "SOL", 45.0),
            rec("2025-07-01", "ADA", 35.0),
        ];
        let sorted: Vec<_> = allocation_sorted(&recs)
            .iter()
            .map(|r| r.asset.as_str())
            .collect();
        assert_eq!(sorted, ["SOL", "ADA", "ETH"]);
    }
}
