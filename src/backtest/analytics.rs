//! Backtest analytics and reporting

use super::trade::BacktestTrade;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Summary statistics over closed trades
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BacktestMetrics {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Fraction of trades with positive net P/L
    pub win_rate: Decimal,
    pub gross_pl: Decimal,
    pub net_pl: Decimal,
    pub fees: Decimal,
    /// Gross profit over gross loss (net); `None` without losing trades
    pub profit_factor: Option<Decimal>,
    /// Largest peak-to-trough fall of cumulative net P/L
    pub max_drawdown: Decimal,
    pub avg_duration_secs: i64,
    pub avg_entry_confidence: Decimal,
}

impl BacktestMetrics {
    /// Metrics for trades in exit order
    pub fn from_trades(trades: &[BacktestTrade]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }
        let count = Decimal::from(trades.len());

        let wins = trades.iter().filter(|t| t.is_win()).count();
        let profit: Decimal = trades
            .iter()
            .map(|t| t.net_pl())
            .filter(|p| *p > Decimal::ZERO)
            .sum();
        let loss: Decimal = trades
            .iter()
            .map(|t| t.net_pl())
            .filter(|p| *p < Decimal::ZERO)
            .map(|p| -p)
            .sum();

        let mut equity = Decimal::ZERO;
        let mut peak = Decimal::ZERO;
        let mut max_drawdown = Decimal::ZERO;
        for trade in trades {
            equity += trade.net_pl();
            peak = peak.max(equity);
            max_drawdown = max_drawdown.max(peak - equity);
        }

        let total_secs: i64 = trades.iter().map(|t| t.duration().num_seconds()).sum();

        Self {
            total_trades: trades.len(),
            wins,
            losses: trades.len() - wins,
            win_rate: Decimal::from(wins) / count,
            gross_pl: trades.iter().map(|t| t.gross_pl()).sum(),
            net_pl: trades.iter().map(|t| t.net_pl()).sum(),
            fees: trades.iter().map(|t| t.fees).sum(),
            profit_factor: (!loss.is_zero()).then(|| profit / loss),
            max_drawdown,
            avg_duration_secs: total_secs / trades.len() as i64,
            avg_entry_confidence: trades.iter().map(|t| t.entry_confidence).sum::<Decimal>() / count,
        }
    }

    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let profit_factor = self
            .profit_factor
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            r#"
══════════════════════════════════════════════════════
               BACKTEST RESULTS
══════════════════════════════════════════════════════

PERFORMANCE
───────────────────────────────────────────────────────
Net P&L:          {:+.2}
Gross P&L:        {:+.2}
Fees:             {:.2}
Max Drawdown:     {:.2}
Win Rate:         {:.1}%
Profit Factor:    {}

ACTIVITY
───────────────────────────────────────────────────────
Total Trades:     {} ({} won, {} lost)
Avg Duration:     {}s
Avg Confidence:   {:.2}
══════════════════════════════════════════════════════
"#,
            self.net_pl,
            self.gross_pl,
            self.fees,
            self.max_drawdown,
            self.win_rate * dec!(100),
            profit_factor,
            self.total_trades,
            self.wins,
            self.losses,
            self.avg_duration_secs,
            self.avg_entry_confidence,
        )
    }
}
