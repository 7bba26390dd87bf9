//! Batch generator — normalized rows into an ordered upsert batch
//!
//! One statement template per table, `?n` placeholders throughout. Operations
//! are emitted in a fixed table order so the script rendering of any two runs
//! over the same data is comparable line by line.

use persistence::{UpsertBatch, UpsertOp};

use crate::normalize::NormalizedBatch;

// ---------------------------------------------------------------------------
// Statement templates
// ---------------------------------------------------------------------------

const LEADERBOARD_SQL: &str = "INSERT OR REPLACE INTO leaderboard_cache \
    (model_id, num_trades, sharpe, win_dollars, lose_dollars, num_wins, num_losses, \
     return_pct, equity, rank, cached_at) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

const RECENT_TRADE_SQL: &str = "INSERT OR REPLACE INTO recent_trades_cache \
    (id, model_id, symbol, side, entry_time, exit_time, realized_net_pnl, trade_data, cached_at) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const TRADE_DETAIL_SQL: &str = "INSERT OR REPLACE INTO trades_detailed \
    (id, model_id, symbol, side, trade_type, leverage, quantity, confidence, \
     entry_time, entry_human_time, entry_price, entry_sz, entry_oid, entry_tid, \
     entry_commission_dollars, entry_closed_pnl, entry_crossed, \
     exit_time, exit_human_time, exit_price, exit_sz, exit_oid, exit_tid, \
     exit_commission_dollars, exit_closed_pnl, exit_crossed, \
     realized_net_pnl, realized_gross_pnl, total_commission_dollars, trade_id, cached_at) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
     ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30, ?31)";

const PERFORMANCE_SQL: &str = "INSERT OR REPLACE INTO model_performance_cache \
    (model_id, today_trades, today_pnl, today_win_rate, week_trades, week_pnl, week_win_rate, \
     total_trades, total_pnl, overall_win_rate, sharpe_ratio, cached_at) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

const ANALYTICS_SQL: &str = "INSERT OR REPLACE INTO model_analytics \
    (model_id, updated_at, last_trade_exit_time, overall_pnl_with_fees, \
     overall_pnl_without_fees, total_fees_paid, avg_net_pnl, avg_gross_pnl, \
     std_net_pnl, std_gross_pnl, biggest_net_gain, biggest_net_loss, win_rate, \
     avg_winners_net_pnl, avg_losers_net_pnl, total_trades, num_long_trades, \
     num_short_trades, avg_holding_period_mins, median_holding_period_mins, \
     avg_size_of_trade_notional, median_size_of_trade_notional, total_signals, \
     num_long_signals, num_short_signals, avg_confidence, median_confidence, \
     avg_leverage, sharpe_ratio, cached_at) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
     ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30)";

const SINCE_INCEPTION_SQL: &str = "INSERT OR REPLACE INTO since_inception_values \
    (id, model_id, nav_since_inception, inception_date, num_invocations, cached_at) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const CRYPTO_PRICE_SQL: &str = "INSERT OR REPLACE INTO crypto_prices_realtime \
    (symbol, price, timestamp, cached_at) \
    VALUES (?1, ?2, ?3, ?4)";

const ACCOUNT_TOTAL_SQL: &str = "INSERT OR REPLACE INTO account_totals \
    (id, model_id, timestamp, realized_pnl, unrealized_pnl, total_equity, \
     positions_data, cached_at) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

const ACCOUNT_POSITION_SQL: &str = "INSERT OR REPLACE INTO account_positions \
    (id, account_total_id, model_id, symbol, quantity, entry_price, current_price, \
     unrealized_pnl, closed_pnl, leverage, margin, liquidation_price, entry_time, \
     confidence, risk_usd, exit_plan, cached_at) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)";

// History ids carry the sync timestamp, so a literal replay overwrites the
// same rows instead of duplicating them while new runs keep appending.
const HISTORY_SQL: &str = "INSERT OR REPLACE INTO leaderboard_history \
    (id, model_id, timestamp, rank, equity, return_pct, sharpe, num_trades, win_rate, cached_at) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)";

// ---------------------------------------------------------------------------
// Batch assembly
// ---------------------------------------------------------------------------

/// Turn one run's normalized rows into an ordered batch of typed upserts
pub fn build_batch(batch: &NormalizedBatch) -> UpsertBatch {
    let cached_at = batch.cached_at;
    let mut ops = Vec::new();

    for row in &batch.leaderboard {
        ops.push(UpsertOp {
            table: "leaderboard_cache",
            sql: LEADERBOARD_SQL,
            params: vec![
                row.model_id.as_str().into(),
                row.num_trades.into(),
                row.sharpe.into(),
                row.win_dollars.into(),
                row.lose_dollars.into(),
                row.num_wins.into(),
                row.num_losses.into(),
                row.return_pct.into(),
                row.equity.into(),
                row.rank.into(),
                cached_at.into(),
            ],
        });
    }

    for row in &batch.recent_trades {
        ops.push(UpsertOp {
            table: "recent_trades_cache",
            sql: RECENT_TRADE_SQL,
            params: vec![
                row.id.as_str().into(),
                row.model_id.as_str().into(),
                row.symbol.as_str().into(),
                row.side.as_str().into(),
                row.entry_time.into(),
                row.exit_time.into(),
                row.realized_net_pnl.into(),
                row.trade_data.as_str().into(),
                cached_at.into(),
            ],
        });
    }

    for row in &batch.detailed_trades {
        ops.push(UpsertOp {
            table: "trades_detailed",
            sql: TRADE_DETAIL_SQL,
            params: vec![
                row.id.as_str().into(),
                row.model_id.as_str().into(),
                row.symbol.as_str().into(),
                row.side.as_str().into(),
                row.trade_type.as_str().into(),
                row.leverage.into(),
                row.quantity.into(),
                row.confidence.into(),
                row.entry_time.into(),
                row.entry_human_time.as_str().into(),
                row.entry_price.into(),
                row.entry_sz.into(),
                row.entry_oid.as_str().into(),
                row.entry_tid.as_str().into(),
                row.entry_commission_dollars.into(),
                row.entry_closed_pnl.into(),
                row.entry_crossed.into(),
                row.exit_time.into(),
                row.exit_human_time.as_str().into(),
                row.exit_price.into(),
                row.exit_sz.into(),
                row.exit_oid.as_str().into(),
                row.exit_tid.as_str().into(),
                row.exit_commission_dollars.into(),
                row.exit_closed_pnl.into(),
                row.exit_crossed.into(),
                row.realized_net_pnl.into(),
                row.realized_gross_pnl.into(),
                row.total_commission_dollars.into(),
                row.trade_id.as_str().into(),
                cached_at.into(),
            ],
        });
    }

    for row in &batch.performance {
        ops.push(UpsertOp {
            table: "model_performance_cache",
            sql: PERFORMANCE_SQL,
            params: vec![
                row.model_id.as_str().into(),
                row.trades.into(),
                row.pnl.into(),
                row.win_rate.into(),
                row.trades.into(),
                row.pnl.into(),
                row.win_rate.into(),
                row.trades.into(),
                row.pnl.into(),
                row.win_rate.into(),
                row.sharpe.into(),
                cached_at.into(),
            ],
        });
    }

    for row in &batch.analytics {
        ops.push(UpsertOp {
            table: "model_analytics",
            sql: ANALYTICS_SQL,
            params: vec![
                row.model_id.as_str().into(),
                row.updated_at.into(),
                row.last_trade_exit_time.into(),
                row.overall_pnl_with_fees.into(),
                row.overall_pnl_without_fees.into(),
                row.total_fees_paid.into(),
                row.avg_net_pnl.into(),
                row.avg_gross_pnl.into(),
                row.std_net_pnl.into(),
                row.std_gross_pnl.into(),
                row.biggest_net_gain.into(),
                row.biggest_net_loss.into(),
                row.win_rate.into(),
                row.avg_winners_net_pnl.into(),
                row.avg_losers_net_pnl.into(),
                row.total_trades.into(),
                row.num_long_trades.into(),
                row.num_short_trades.into(),
                row.avg_holding_period_mins.into(),
                row.median_holding_period_mins.into(),
                row.avg_size_of_trade_notional.into(),
                row.median_size_of_trade_notional.into(),
                row.total_signals.into(),
                row.num_long_signals.into(),
                row.num_short_signals.into(),
                row.avg_confidence.into(),
                row.median_confidence.into(),
                row.avg_leverage.into(),
                row.sharpe_ratio.into(),
                cached_at.into(),
            ],
        });
    }

    for row in &batch.since_inception {
        ops.push(UpsertOp {
            table: "since_inception_values",
            sql: SINCE_INCEPTION_SQL,
            params: vec![
                row.id.as_str().into(),
                row.model_id.as_str().into(),
                row.nav_since_inception.into(),
                row.inception_date.into(),
                row.num_invocations.into(),
                cached_at.into(),
            ],
        });
    }

    for row in &batch.crypto_prices {
        ops.push(UpsertOp {
            table: "crypto_prices_realtime",
            sql: CRYPTO_PRICE_SQL,
            params: vec![
                row.symbol.as_str().into(),
                row.price.into(),
                row.timestamp.into(),
                cached_at.into(),
            ],
        });
    }

    // Each account total precedes its own position rows
    for (total, positions) in &batch.accounts {
        ops.push(UpsertOp {
            table: "account_totals",
            sql: ACCOUNT_TOTAL_SQL,
            params: vec![
                total.id.as_str().into(),
                total.model_id.as_str().into(),
                total.timestamp.into(),
                total.realized_pnl.into(),
                total.unrealized_pnl.into(),
                total.total_equity.into(),
                total.positions_data.as_str().into(),
                cached_at.into(),
            ],
        });
        for row in positions {
            ops.push(UpsertOp {
                table: "account_positions",
                sql: ACCOUNT_POSITION_SQL,
                params: vec![
                    row.id.as_str().into(),
                    row.account_total_id.as_str().into(),
                    row.model_id.as_str().into(),
                    row.symbol.as_str().into(),
                    row.quantity.into(),
                    row.entry_price.into(),
                    row.current_price.into(),
                    row.unrealized_pnl.into(),
                    row.closed_pnl.into(),
                    row.leverage.into(),
                    row.margin.into(),
                    row.liquidation_price.into(),
                    row.entry_time.into(),
                    row.confidence.into(),
                    row.risk_usd.into(),
                    row.exit_plan.as_str().into(),
                    cached_at.into(),
                ],
            });
        }
    }

    for row in &batch.history {
        ops.push(UpsertOp {
            table: "leaderboard_history",
            sql: HISTORY_SQL,
            params: vec![
                row.id.as_str().into(),
                row.model_id.as_str().into(),
                cached_at.into(),
                row.rank.into(),
                row.equity.into(),
                row.return_pct.into(),
                row.sharpe.into(),
                row.num_trades.into(),
                row.win_rate.into(),
                cached_at.into(),
            ],
        });
    }

    UpsertBatch { ops }
}
