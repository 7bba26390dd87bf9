//! Normalizer — canonical snapshot records into destination-shaped rows
//!
//! Pure functions of the snapshot and the run timestamp. Every absent field
//! resolves to a documented default here (numerics 0, leverage 1, missing
//! nullable timestamps stay NULL); derived metrics are recomputed from raw
//! inputs on every run and never read back from the destination.

use serde_json::Value;

use crate::config::SyncConfig;
use crate::types::{AnalyticsEntry, Position, Snapshot};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LeaderboardRow {
    pub model_id: String,
    pub num_trades: i64,
    pub sharpe: f64,
    pub win_dollars: f64,
    pub lose_dollars: f64,
    pub num_wins: i64,
    pub num_losses: i64,
    pub return_pct: f64,
    pub equity: f64,
    pub rank: i64,
}

#[derive(Debug, Clone)]
pub struct TradeSummaryRow {
    pub id: String,
    pub model_id: String,
    pub symbol: String,
    pub side: String,
    pub entry_time: i64,
    pub exit_time: Option<i64>,
    pub realized_net_pnl: Option<f64>,
    /// Raw source payload, serialized as JSON text
    pub trade_data: String,
}

#[derive(Debug, Clone)]
pub struct TradeDetailRow {
    pub id: String,
    pub model_id: String,
    pub symbol: String,
    pub side: String,
    pub trade_type: String,
    pub leverage: f64,
    pub quantity: f64,
    pub confidence: f64,
    pub entry_time: i64,
    pub entry_human_time: String,
    pub entry_price: f64,
    pub entry_sz: f64,
    pub entry_oid: String,
    pub entry_tid: String,
    pub entry_commission_dollars: f64,
    pub entry_closed_pnl: f64,
    pub entry_crossed: i64,
    pub exit_time: Option<i64>,
    pub exit_human_time: String,
    pub exit_price: f64,
    pub exit_sz: f64,
    pub exit_oid: String,
    pub exit_tid: String,
    pub exit_commission_dollars: f64,
    pub exit_closed_pnl: f64,
    pub exit_crossed: i64,
    pub realized_net_pnl: Option<f64>,
    pub realized_gross_pnl: Option<f64>,
    pub total_commission_dollars: f64,
    pub trade_id: String,
}

/// One figure set reused for the today/week/total windows; the source
/// exposes nothing time-sliced
#[derive(Debug, Clone)]
pub struct PerformanceRow {
    pub model_id: String,
    pub trades: i64,
    pub pnl: f64,
    pub win_rate: f64,
    pub sharpe: f64,
}

#[derive(Debug, Clone)]
pub struct AnalyticsRow {
    pub model_id: String,
    pub updated_at: i64,
    pub last_trade_exit_time: Option<i64>,
    pub overall_pnl_with_fees: f64,
    pub overall_pnl_without_fees: f64,
    pub total_fees_paid: f64,
    pub avg_net_pnl: f64,
    pub avg_gross_pnl: f64,
    pub std_net_pnl: f64,
    pub std_gross_pnl: f64,
    pub biggest_net_gain: f64,
    pub biggest_net_loss: f64,
    pub win_rate: f64,
    pub avg_winners_net_pnl: f64,
    pub avg_losers_net_pnl: f64,
    pub total_trades: i64,
    pub num_long_trades: i64,
    pub num_short_trades: i64,
    pub avg_holding_period_mins: f64,
    pub median_holding_period_mins: f64,
    pub avg_size_of_trade_notional: f64,
    pub median_size_of_trade_notional: f64,
    pub total_signals: i64,
    pub num_long_signals: i64,
    pub num_short_signals: i64,
    pub avg_confidence: f64,
    pub median_confidence: f64,
    pub avg_leverage: f64,
    /// Mirrors the winners/losers win_rate, as the upstream cache always has
    pub sharpe_ratio: f64,
}

#[derive(Debug, Clone)]
pub struct SinceInceptionRow {
    pub id: String,
    pub model_id: String,
    pub nav_since_inception: f64,
    pub inception_date: i64,
    pub num_invocations: i64,
}

#[derive(Debug, Clone)]
pub struct CryptoPriceRow {
    pub symbol: String,
    pub price: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct AccountTotalRow {
    pub id: String,
    pub model_id: String,
    pub timestamp: i64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub total_equity: f64,
    pub positions_data: String,
}

#[derive(Debug, Clone)]
pub struct AccountPositionRow {
    pub id: String,
    pub account_total_id: String,
    pub model_id: String,
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub current_price: f64,
    pub unrealized_pnl: f64,
    pub closed_pnl: f64,
    pub leverage: f64,
    pub margin: f64,
    pub liquidation_price: f64,
    pub entry_time: i64,
    pub confidence: f64,
    pub risk_usd: f64,
    pub exit_plan: String,
}

#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub id: String,
    pub model_id: String,
    pub rank: i64,
    pub equity: f64,
    pub return_pct: f64,
    pub sharpe: f64,
    pub num_trades: i64,
    pub win_rate: f64,
}

/// Everything one run writes, in destination order. Each account total owns
/// the position rows that belong to it for this cycle.
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub cached_at: i64,
    pub leaderboard: Vec<LeaderboardRow>,
    pub recent_trades: Vec<TradeSummaryRow>,
    pub detailed_trades: Vec<TradeDetailRow>,
    pub performance: Vec<PerformanceRow>,
    pub analytics: Vec<AnalyticsRow>,
    pub since_inception: Vec<SinceInceptionRow>,
    pub crypto_prices: Vec<CryptoPriceRow>,
    pub accounts: Vec<(AccountTotalRow, Vec<AccountPositionRow>)>,
    pub history: Vec<HistoryRow>,
}

// ---------------------------------------------------------------------------
// Derived metrics
// ---------------------------------------------------------------------------

/// Win percentage; a zero-trade model is 0 by convention, not an error
pub fn win_rate(num_wins: i64, num_trades: i64) -> f64 {
    if num_trades > 0 {
        num_wins as f64 / num_trades as f64 * 100.0
    } else {
        0.0
    }
}

/// `"gpt-5_main"` → `"gpt-5"`; ids without a suffix pass through unchanged
pub fn model_id_from_account(account_id: &str) -> &str {
    match account_id.rsplit_once('_') {
        Some((model_id, _)) => model_id,
        None => account_id,
    }
}

/// A timestamp of 0 means the source had nothing to report
fn nullable_time(t: Option<i64>) -> Option<i64> {
    t.filter(|&v| v != 0)
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Map a snapshot into destination rows. `cached_at` is fixed once per run
/// and shared by every row the run produces.
pub fn normalize(snapshot: &Snapshot, cached_at: i64, config: &SyncConfig) -> NormalizedBatch {
    let mut batch = NormalizedBatch {
        cached_at,
        ..Default::default()
    };

    for entry in &snapshot.leaderboard {
        batch.leaderboard.push(LeaderboardRow {
            model_id: entry.model_id.clone(),
            num_trades: entry.num_trades.unwrap_or(0),
            sharpe: entry.sharpe.unwrap_or(0.0),
            win_dollars: entry.win_dollars.unwrap_or(0.0),
            lose_dollars: entry.lose_dollars.unwrap_or(0.0),
            num_wins: entry.num_wins.unwrap_or(0),
            num_losses: entry.num_losses.unwrap_or(0),
            return_pct: entry.return_pct.unwrap_or(0.0),
            equity: entry.equity.unwrap_or(0.0),
            rank: entry.rank.unwrap_or(0),
        });

        batch.performance.push(PerformanceRow {
            model_id: entry.model_id.clone(),
            trades: entry.num_trades.unwrap_or(0),
            pnl: entry.total_pnl.unwrap_or(0.0),
            win_rate: win_rate(entry.num_wins.unwrap_or(0), entry.num_trades.unwrap_or(0)),
            sharpe: entry.sharpe.unwrap_or(0.0),
        });

        batch.history.push(HistoryRow {
            id: format!("{}-{}", entry.model_id, cached_at),
            model_id: entry.model_id.clone(),
            rank: entry.rank.unwrap_or(0),
            equity: entry.equity.unwrap_or(0.0),
            return_pct: entry.return_pct.unwrap_or(0.0),
            sharpe: entry.sharpe.unwrap_or(0.0),
            num_trades: entry.num_trades.unwrap_or(0),
            win_rate: win_rate(entry.num_wins.unwrap_or(0), entry.num_trades.unwrap_or(0)),
        });
    }

    for (i, trade) in snapshot.trades.iter().enumerate() {
        let id = trade
            .id
            .clone()
            .unwrap_or_else(|| format!("trade-{cached_at}-{i}"));

        if i < config.recent_trades_limit {
            batch.recent_trades.push(TradeSummaryRow {
                id: id.clone(),
                model_id: trade.model_id.clone().unwrap_or_default(),
                symbol: trade.symbol.clone().unwrap_or_default(),
                side: trade.side.clone().unwrap_or_default(),
                entry_time: trade.entry_time.unwrap_or(cached_at),
                exit_time: nullable_time(trade.exit_time),
                realized_net_pnl: trade.realized_net_pnl.or(trade.pnl),
                trade_data: trade.raw.to_string(),
            });
        }

        batch.detailed_trades.push(TradeDetailRow {
            model_id: trade.model_id.clone().unwrap_or_default(),
            symbol: trade.symbol.clone().unwrap_or_default(),
            side: trade.side.clone().unwrap_or_default(),
            trade_type: trade
                .trade_type
                .clone()
                .or_else(|| trade.side.clone())
                .unwrap_or_default(),
            leverage: trade.leverage.unwrap_or(1.0),
            quantity: trade.quantity.or(trade.entry_sz).unwrap_or(0.0),
            confidence: trade.confidence.unwrap_or(0.0),
            entry_time: trade.entry_time.unwrap_or(cached_at),
            entry_human_time: trade.entry_human_time.clone().unwrap_or_default(),
            entry_price: trade.entry_price.unwrap_or(0.0),
            entry_sz: trade.entry_sz.unwrap_or(0.0),
            entry_oid: trade.entry_oid.clone().unwrap_or_default(),
            entry_tid: trade.entry_tid.clone().unwrap_or_default(),
            entry_commission_dollars: trade.entry_commission_dollars.unwrap_or(0.0),
            entry_closed_pnl: trade.entry_closed_pnl.unwrap_or(0.0),
            entry_crossed: trade.entry_crossed.unwrap_or(false) as i64,
            exit_time: nullable_time(trade.exit_time),
            exit_human_time: trade.exit_human_time.clone().unwrap_or_default(),
            exit_price: trade.exit_price.unwrap_or(0.0),
            exit_sz: trade.exit_sz.unwrap_or(0.0),
            exit_oid: trade.exit_oid.clone().unwrap_or_default(),
            exit_tid: trade.exit_tid.clone().unwrap_or_default(),
            exit_commission_dollars: trade.exit_commission_dollars.unwrap_or(0.0),
            exit_closed_pnl: trade.exit_closed_pnl.unwrap_or(0.0),
            exit_crossed: trade.exit_crossed.unwrap_or(false) as i64,
            realized_net_pnl: trade.realized_net_pnl,
            realized_gross_pnl: trade.realized_gross_pnl,
            total_commission_dollars: trade.total_commission_dollars.unwrap_or(0.0),
            trade_id: trade.trade_id.clone().unwrap_or_else(|| id.clone()),
            id,
        });
    }

    for (model_id, entries) in &snapshot.model_analytics {
        // A model without analytics emits no row at all
        if let Some(entry) = entries.first() {
            batch
                .analytics
                .push(flatten_analytics(model_id, entry, cached_at));
        }
    }

    for value in &snapshot.since_inception {
        batch.since_inception.push(SinceInceptionRow {
            id: value.id.clone().unwrap_or_default(),
            model_id: value.model_id.clone().unwrap_or_default(),
            nav_since_inception: value.nav_since_inception.unwrap_or(0.0),
            inception_date: value.inception_date.unwrap_or(cached_at),
            num_invocations: value.num_invocations.unwrap_or(0),
        });
    }

    for (symbol, data) in &snapshot.crypto_prices {
        batch.crypto_prices.push(CryptoPriceRow {
            symbol: symbol.clone(),
            price: data.price.unwrap_or(0.0),
            timestamp: data.timestamp.unwrap_or(cached_at),
        });
    }

    for account in &snapshot.account_totals {
        let account_id = account.id.clone().unwrap_or_default();
        let model_id = model_id_from_account(&account_id).to_string();
        let realized_pnl = account.realized_pnl.unwrap_or(0.0);

        let mut unrealized_pnl = 0.0;
        let mut position_rows = Vec::with_capacity(account.positions.len());
        for (symbol, value) in &account.positions {
            let position: Position =
                serde_json::from_value(value.clone()).unwrap_or_default();
            unrealized_pnl += position.unrealized_pnl.unwrap_or(0.0);

            position_rows.push(AccountPositionRow {
                id: format!("{account_id}_{symbol}_{cached_at}"),
                account_total_id: account_id.clone(),
                model_id: model_id.clone(),
                symbol: symbol.clone(),
                quantity: position.quantity.unwrap_or(0.0),
                entry_price: position.entry_price.unwrap_or(0.0),
                current_price: position.current_price.unwrap_or(0.0),
                unrealized_pnl: position.unrealized_pnl.unwrap_or(0.0),
                closed_pnl: position.closed_pnl.unwrap_or(0.0),
                leverage: position.leverage.unwrap_or(1.0),
                margin: position.margin.unwrap_or(0.0),
                liquidation_price: position.liquidation_price.unwrap_or(0.0),
                entry_time: position.entry_time.unwrap_or(cached_at),
                confidence: position.confidence.unwrap_or(0.0),
                risk_usd: position.risk_usd.unwrap_or(0.0),
                exit_plan: position
                    .exit_plan
                    .unwrap_or_else(|| Value::Object(Default::default()))
                    .to_string(),
            });
        }

        let total_row = AccountTotalRow {
            id: account_id.clone(),
            model_id,
            timestamp: account.timestamp.unwrap_or(cached_at),
            realized_pnl,
            unrealized_pnl,
            total_equity: realized_pnl + unrealized_pnl,
            positions_data: Value::Object(account.positions.clone()).to_string(),
        };
        batch.accounts.push((total_row, position_rows));
    }

    batch
}

fn flatten_analytics(model_id: &str, entry: &AnalyticsEntry, cached_at: i64) -> AnalyticsRow {
    let fee_pnl = &entry.fee_pnl_moves_breakdown_table;
    let winners_losers = &entry.winners_losers_breakdown_table;
    let signals = &entry.signals_breakdown_table;
    let overall = &entry.overall_trades_overview_table;
    let longs_shorts = &entry.longs_shorts_breakdown_table;

    AnalyticsRow {
        model_id: model_id.to_string(),
        updated_at: entry.updated_at.unwrap_or(cached_at),
        last_trade_exit_time: nullable_time(entry.last_trade_exit_time),
        overall_pnl_with_fees: fee_pnl.overall_pnl_with_fees.unwrap_or(0.0),
        overall_pnl_without_fees: fee_pnl.overall_pnl_without_fees.unwrap_or(0.0),
        total_fees_paid: fee_pnl.total_fees_paid.unwrap_or(0.0),
        avg_net_pnl: fee_pnl.avg_net_pnl.unwrap_or(0.0),
        avg_gross_pnl: fee_pnl.avg_gross_pnl.unwrap_or(0.0),
        std_net_pnl: fee_pnl.std_net_pnl.unwrap_or(0.0),
        std_gross_pnl: fee_pnl.std_gross_pnl.unwrap_or(0.0),
        biggest_net_gain: fee_pnl.biggest_net_gain.unwrap_or(0.0),
        biggest_net_loss: fee_pnl.biggest_net_loss.unwrap_or(0.0),
        win_rate: winners_losers.win_rate.unwrap_or(0.0),
        avg_winners_net_pnl: winners_losers.avg_winners_net_pnl.unwrap_or(0.0),
        avg_losers_net_pnl: winners_losers.avg_losers_net_pnl.unwrap_or(0.0),
        total_trades: overall.total_trades.unwrap_or(0),
        num_long_trades: longs_shorts.num_long_trades.unwrap_or(0),
        num_short_trades: longs_shorts.num_short_trades.unwrap_or(0),
        avg_holding_period_mins: overall.avg_holding_period_mins.unwrap_or(0.0),
        median_holding_period_mins: overall.median_holding_period_mins.unwrap_or(0.0),
        avg_size_of_trade_notional: overall.avg_size_of_trade_notional.unwrap_or(0.0),
        median_size_of_trade_notional: overall.median_size_of_trade_notional.unwrap_or(0.0),
        total_signals: signals.total_signals.unwrap_or(0),
        num_long_signals: signals.num_long_signals.unwrap_or(0),
        num_short_signals: signals.num_short_signals.unwrap_or(0),
        avg_confidence: signals.avg_confidence.unwrap_or(0.0),
        median_confidence: signals.median_confidence.unwrap_or(0.0),
        avg_leverage: signals.avg_leverage.unwrap_or(0.0),
        sharpe_ratio: winners_losers.win_rate.unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountTotal, LeaderboardEntry, TradeRecord};
    use serde_json::json;

    const CACHED_AT: i64 = 1_700_000_000;

    fn config() -> SyncConfig {
        SyncConfig::default()
    }

    fn leaderboard_entry(model_id: &str, wins: i64, trades: i64) -> LeaderboardEntry {
        // Canonical entries arrive with total_pnl already resolved; the flat
        // API conversion substitutes return_pct before this point
        LeaderboardEntry {
            model_id: model_id.to_string(),
            num_trades: Some(trades),
            num_wins: Some(wins),
            sharpe: Some(1.2),
            equity: Some(10300.0),
            return_pct: Some(3.0),
            total_pnl: Some(3.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_win_rate_guarded_division() {
        assert_eq!(win_rate(0, 0), 0.0);
        assert_eq!(win_rate(3, 10), 30.0);
        assert_eq!(win_rate(10, 10), 100.0);
    }

    #[test]
    fn test_model_id_from_account() {
        assert_eq!(model_id_from_account("gpt-5_main"), "gpt-5");
        assert_eq!(model_id_from_account("no-suffix"), "no-suffix");
        assert_eq!(model_id_from_account("a_b_c"), "a_b");
    }

    #[test]
    fn test_quantity_falls_back_to_entry_sz() {
        let snapshot = Snapshot {
            trades: vec![TradeRecord {
                id: Some("t1".to_string()),
                entry_sz: Some(12.0),
                ..Default::default()
            }],
            ..Default::default()
        };
        let batch = normalize(&snapshot, CACHED_AT, &config());
        assert_eq!(batch.detailed_trades[0].quantity, 12.0);
        // Defaults for the rest of the numeric fields
        assert_eq!(batch.detailed_trades[0].leverage, 1.0);
        assert_eq!(batch.detailed_trades[0].entry_time, CACHED_AT);
    }

    #[test]
    fn test_missing_exit_time_stays_null() {
        let snapshot = Snapshot {
            trades: vec![TradeRecord {
                id: Some("t1".to_string()),
                exit_time: None,
                ..Default::default()
            }],
            ..Default::default()
        };
        let batch = normalize(&snapshot, CACHED_AT, &config());
        assert_eq!(batch.recent_trades[0].exit_time, None);
        assert_eq!(batch.detailed_trades[0].exit_time, None);
    }

    #[test]
    fn test_realized_pnl_falls_back_to_legacy_field() {
        let snapshot = Snapshot {
            trades: vec![TradeRecord {
                id: Some("t1".to_string()),
                realized_net_pnl: None,
                pnl: Some(7.5),
                ..Default::default()
            }],
            ..Default::default()
        };
        let batch = normalize(&snapshot, CACHED_AT, &config());
        assert_eq!(batch.recent_trades[0].realized_net_pnl, Some(7.5));
    }

    #[test]
    fn test_synthetic_trade_id_when_missing() {
        let snapshot = Snapshot {
            trades: vec![TradeRecord::default()],
            ..Default::default()
        };
        let batch = normalize(&snapshot, CACHED_AT, &config());
        assert_eq!(batch.detailed_trades[0].id, "trade-1700000000-0");
        // trade_id passthrough column defaults to the row id
        assert_eq!(batch.detailed_trades[0].trade_id, "trade-1700000000-0");
    }

    #[test]
    fn test_recent_trades_window_bounded() {
        let trades: Vec<TradeRecord> = (0..60)
            .map(|i| TradeRecord {
                id: Some(format!("t{i}")),
                ..Default::default()
            })
            .collect();
        let snapshot = Snapshot {
            trades,
            ..Default::default()
        };
        let batch = normalize(&snapshot, CACHED_AT, &config());
        assert_eq!(batch.recent_trades.len(), 50);
        assert_eq!(batch.detailed_trades.len(), 60);
    }

    #[test]
    fn test_account_derived_metrics() {
        let mut positions = serde_json::Map::new();
        positions.insert("BTC".to_string(), json!({ "unrealized_pnl": 5.0 }));
        positions.insert("ETH".to_string(), json!({ "unrealized_pnl": -2.0 }));

        let snapshot = Snapshot {
            account_totals: vec![AccountTotal {
                id: Some("gpt-5_main".to_string()),
                realized_pnl: Some(10.0),
                positions,
                ..Default::default()
            }],
            ..Default::default()
        };
        let batch = normalize(&snapshot, CACHED_AT, &config());
        let (total, positions) = &batch.accounts[0];
        assert_eq!(total.model_id, "gpt-5");
        assert_eq!(total.unrealized_pnl, 3.0);
        assert_eq!(total.total_equity, 13.0);
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].id, format!("gpt-5_main_BTC_{CACHED_AT}"));
        assert_eq!(positions[0].account_total_id, "gpt-5_main");
        assert_eq!(positions[0].leverage, 1.0);
    }

    #[test]
    fn test_model_without_analytics_skipped() {
        let snapshot = Snapshot {
            model_analytics: vec![
                ("gpt-5".to_string(), vec![AnalyticsEntry::default()]),
                ("grok-4".to_string(), Vec::new()),
            ],
            ..Default::default()
        };
        let batch = normalize(&snapshot, CACHED_AT, &config());
        assert_eq!(batch.analytics.len(), 1);
        assert_eq!(batch.analytics[0].model_id, "gpt-5");
    }

    #[test]
    fn test_analytics_flattening_defaults() {
        let entry: AnalyticsEntry = serde_json::from_value(json!({
            "updated_at": 1699990000,
            "fee_pnl_moves_breakdown_table": { "total_fees_paid": 42.5 },
            "winners_losers_breakdown_table": { "win_rate": 61.0 }
        }))
        .unwrap();
        let row = flatten_analytics("gpt-5", &entry, CACHED_AT);
        assert_eq!(row.total_fees_paid, 42.5);
        assert_eq!(row.win_rate, 61.0);
        assert_eq!(row.avg_net_pnl, 0.0);
        assert_eq!(row.last_trade_exit_time, None);
        // The sharpe column mirrors the winners/losers win_rate upstream
        assert_eq!(row.sharpe_ratio, 61.0);
    }

    #[test]
    fn test_history_rows_timestamp_qualified() {
        let snapshot = Snapshot {
            leaderboard: vec![leaderboard_entry("gpt-5", 6, 10)],
            ..Default::default()
        };
        let batch = normalize(&snapshot, CACHED_AT, &config());
        assert_eq!(batch.history[0].id, format!("gpt-5-{CACHED_AT}"));
        assert_eq!(batch.history[0].win_rate, 60.0);
        // Performance windows share the derived figures
        assert_eq!(batch.performance[0].win_rate, 60.0);
        assert_eq!(batch.performance[0].pnl, 3.0);
    }

    #[test]
    fn test_zero_trade_model_yields_zero_win_rate() {
        let snapshot = Snapshot {
            leaderboard: vec![leaderboard_entry("fresh-model", 0, 0)],
            ..Default::default()
        };
        let batch = normalize(&snapshot, CACHED_AT, &config());
        assert_eq!(batch.performance[0].win_rate, 0.0);
        assert_eq!(batch.history[0].win_rate, 0.0);
    }
}
