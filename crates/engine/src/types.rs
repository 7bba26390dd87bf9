//! Canonical source records
//!
//! One input shape per destination table, independent of which API schema
//! variant produced it. Fields the source may omit are explicit `Option`s;
//! the normalizer owns the defaults (missing numerics become 0, missing
//! leverage becomes 1, missing nullable timestamps stay NULL).

use serde::Deserialize;
use serde_json::Value;

/// One leaderboard standing, resolved from either schema variant
#[derive(Debug, Clone, Default)]
pub struct LeaderboardEntry {
    pub model_id: String,
    pub num_trades: Option<i64>,
    pub sharpe: Option<f64>,
    pub win_dollars: Option<f64>,
    pub lose_dollars: Option<f64>,
    pub num_wins: Option<i64>,
    pub num_losses: Option<i64>,
    pub return_pct: Option<f64>,
    pub equity: Option<f64>,
    /// Only the camelCase variant reports a rank
    pub rank: Option<i64>,
    /// Cumulative pnl figure for the performance windows. The flat variant
    /// has no such field, so conversion substitutes `return_pct`.
    pub total_pnl: Option<f64>,
}

/// One trade, resolved from either schema variant.
///
/// `raw` keeps the untouched payload for the blob column. The camelCase
/// variant only carries the summary fields; everything else stays `None`.
#[derive(Debug, Clone, Default)]
pub struct TradeRecord {
    pub raw: Value,
    pub id: Option<String>,
    pub model_id: Option<String>,
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub trade_type: Option<String>,
    pub leverage: Option<f64>,
    pub quantity: Option<f64>,
    pub confidence: Option<f64>,
    pub entry_time: Option<i64>,
    pub entry_human_time: Option<String>,
    pub entry_price: Option<f64>,
    pub entry_sz: Option<f64>,
    pub entry_oid: Option<String>,
    pub entry_tid: Option<String>,
    pub entry_commission_dollars: Option<f64>,
    pub entry_closed_pnl: Option<f64>,
    pub entry_crossed: Option<bool>,
    pub exit_time: Option<i64>,
    pub exit_human_time: Option<String>,
    pub exit_price: Option<f64>,
    pub exit_sz: Option<f64>,
    pub exit_oid: Option<String>,
    pub exit_tid: Option<String>,
    pub exit_commission_dollars: Option<f64>,
    pub exit_closed_pnl: Option<f64>,
    pub exit_crossed: Option<bool>,
    pub realized_net_pnl: Option<f64>,
    pub realized_gross_pnl: Option<f64>,
    /// Legacy pnl field, used as a fallback for `realized_net_pnl`
    pub pnl: Option<f64>,
    pub total_commission_dollars: Option<f64>,
    pub trade_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Analytics breakdowns (snake_case in both API versions)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeePnlBreakdown {
    pub overall_pnl_with_fees: Option<f64>,
    pub overall_pnl_without_fees: Option<f64>,
    pub total_fees_paid: Option<f64>,
    pub avg_net_pnl: Option<f64>,
    pub avg_gross_pnl: Option<f64>,
    pub std_net_pnl: Option<f64>,
    pub std_gross_pnl: Option<f64>,
    pub biggest_net_gain: Option<f64>,
    pub biggest_net_loss: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WinnersLosersBreakdown {
    pub win_rate: Option<f64>,
    pub avg_winners_net_pnl: Option<f64>,
    pub avg_losers_net_pnl: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignalsBreakdown {
    pub total_signals: Option<i64>,
    pub num_long_signals: Option<i64>,
    pub num_short_signals: Option<i64>,
    pub avg_confidence: Option<f64>,
    pub median_confidence: Option<f64>,
    pub avg_leverage: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverallTradesOverview {
    pub total_trades: Option<i64>,
    pub avg_holding_period_mins: Option<f64>,
    pub median_holding_period_mins: Option<f64>,
    pub avg_size_of_trade_notional: Option<f64>,
    pub median_size_of_trade_notional: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LongsShortsBreakdown {
    pub num_long_trades: Option<i64>,
    pub num_short_trades: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvocationBreakdown {
    pub num_invocations: Option<i64>,
    pub avg_mins_between_invocations: Option<f64>,
}

/// One per-model analytics record with its nested breakdown tables
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsEntry {
    pub updated_at: Option<i64>,
    pub last_trade_exit_time: Option<i64>,
    #[serde(default)]
    pub fee_pnl_moves_breakdown_table: FeePnlBreakdown,
    #[serde(default)]
    pub winners_losers_breakdown_table: WinnersLosersBreakdown,
    #[serde(default)]
    pub signals_breakdown_table: SignalsBreakdown,
    #[serde(default)]
    pub overall_trades_overview_table: OverallTradesOverview,
    #[serde(default)]
    pub longs_shorts_breakdown_table: LongsShortsBreakdown,
    #[serde(default)]
    pub invocation_breakdown_table: InvocationBreakdown,
}

// ---------------------------------------------------------------------------
// Accounts, inception values, prices
// ---------------------------------------------------------------------------

/// Account equity record; positions stay raw JSON so the blob column keeps
/// exactly what the API sent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountTotal {
    pub id: Option<String>,
    pub timestamp: Option<i64>,
    pub realized_pnl: Option<f64>,
    #[serde(default)]
    pub positions: serde_json::Map<String, Value>,
}

/// One open position, parsed out of an account's positions map
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Position {
    pub quantity: Option<f64>,
    pub entry_price: Option<f64>,
    pub current_price: Option<f64>,
    pub unrealized_pnl: Option<f64>,
    pub closed_pnl: Option<f64>,
    pub leverage: Option<f64>,
    pub margin: Option<f64>,
    pub liquidation_price: Option<f64>,
    pub entry_time: Option<i64>,
    pub confidence: Option<f64>,
    pub risk_usd: Option<f64>,
    pub exit_plan: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SinceInceptionValue {
    pub id: Option<String>,
    pub model_id: Option<String>,
    pub nav_since_inception: Option<f64>,
    pub inception_date: Option<i64>,
    pub num_invocations: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceData {
    pub price: Option<f64>,
    pub timestamp: Option<i64>,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Everything one fetch pass produced. Datasets whose endpoint failed are
/// empty and the failure is recorded in `errors`.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub trades: Vec<TradeRecord>,
    /// Per-model analytics in configured model order
    pub model_analytics: Vec<(String, Vec<AnalyticsEntry>)>,
    /// Conversation records are fetched and counted but produce no rows
    pub conversations: usize,
    pub account_totals: Vec<AccountTotal>,
    pub since_inception: Vec<SinceInceptionValue>,
    /// Symbol-keyed prices in source order
    pub crypto_prices: Vec<(String, PriceData)>,
    pub errors: Vec<String>,
}
