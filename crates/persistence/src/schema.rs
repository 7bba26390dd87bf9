//! Database schema definitions
//!
//! Ten destination tables. All are replace-by-key caches except
//! `leaderboard_history`, whose rows carry a timestamp-qualified id and are
//! only ever appended.

/// SQL to create all tables
pub const CREATE_TABLES: &str = r#"
-- Leaderboard snapshot (one row per model, replaced every sync)
CREATE TABLE IF NOT EXISTS leaderboard_cache (
    model_id TEXT PRIMARY KEY,
    num_trades INTEGER NOT NULL DEFAULT 0,
    sharpe REAL NOT NULL DEFAULT 0,
    win_dollars REAL NOT NULL DEFAULT 0,
    lose_dollars REAL NOT NULL DEFAULT 0,
    num_wins INTEGER NOT NULL DEFAULT 0,
    num_losses INTEGER NOT NULL DEFAULT 0,
    return_pct REAL NOT NULL DEFAULT 0,
    equity REAL NOT NULL DEFAULT 0,
    rank INTEGER NOT NULL DEFAULT 0,
    cached_at INTEGER NOT NULL
);

-- Bounded window of the most recent trades, with the raw payload attached
CREATE TABLE IF NOT EXISTS recent_trades_cache (
    id TEXT PRIMARY KEY,
    model_id TEXT NOT NULL,
    symbol TEXT NOT NULL,
    side TEXT NOT NULL,
    entry_time INTEGER NOT NULL,
    exit_time INTEGER,
    realized_net_pnl REAL,
    trade_data TEXT NOT NULL,
    cached_at INTEGER NOT NULL
);

-- Every trade the API reports, fully expanded
CREATE TABLE IF NOT EXISTS trades_detailed (
    id TEXT PRIMARY KEY,
    model_id TEXT NOT NULL,
    symbol TEXT NOT NULL,
    side TEXT NOT NULL,
    trade_type TEXT NOT NULL,
    leverage REAL NOT NULL DEFAULT 1,
    quantity REAL NOT NULL DEFAULT 0,
    confidence REAL NOT NULL DEFAULT 0,
    entry_time INTEGER NOT NULL,
    entry_human_time TEXT NOT NULL DEFAULT '',
    entry_price REAL NOT NULL DEFAULT 0,
    entry_sz REAL NOT NULL DEFAULT 0,
    entry_oid TEXT NOT NULL DEFAULT '',
    entry_tid TEXT NOT NULL DEFAULT '',
    entry_commission_dollars REAL NOT NULL DEFAULT 0,
    entry_closed_pnl REAL NOT NULL DEFAULT 0,
    entry_crossed INTEGER NOT NULL DEFAULT 0,
    exit_time INTEGER,
    exit_human_time TEXT NOT NULL DEFAULT '',
    exit_price REAL NOT NULL DEFAULT 0,
    exit_sz REAL NOT NULL DEFAULT 0,
    exit_oid TEXT NOT NULL DEFAULT '',
    exit_tid TEXT NOT NULL DEFAULT '',
    exit_commission_dollars REAL NOT NULL DEFAULT 0,
    exit_closed_pnl REAL NOT NULL DEFAULT 0,
    exit_crossed INTEGER NOT NULL DEFAULT 0,
    realized_net_pnl REAL,
    realized_gross_pnl REAL,
    total_commission_dollars REAL NOT NULL DEFAULT 0,
    trade_id TEXT NOT NULL DEFAULT '',
    cached_at INTEGER NOT NULL
);

-- Per-model performance windows. The source exposes no time-sliced data, so
-- today/week/total are all derived from the same leaderboard snapshot.
CREATE TABLE IF NOT EXISTS model_performance_cache (
    model_id TEXT PRIMARY KEY,
    today_trades INTEGER NOT NULL DEFAULT 0,
    today_pnl REAL NOT NULL DEFAULT 0,
    today_win_rate REAL NOT NULL DEFAULT 0,
    week_trades INTEGER NOT NULL DEFAULT 0,
    week_pnl REAL NOT NULL DEFAULT 0,
    week_win_rate REAL NOT NULL DEFAULT 0,
    total_trades INTEGER NOT NULL DEFAULT 0,
    total_pnl REAL NOT NULL DEFAULT 0,
    overall_win_rate REAL NOT NULL DEFAULT 0,
    sharpe_ratio REAL NOT NULL DEFAULT 0,
    cached_at INTEGER NOT NULL
);

-- Flattened analytics breakdowns (one row per model)
CREATE TABLE IF NOT EXISTS model_analytics (
    model_id TEXT PRIMARY KEY,
    updated_at INTEGER NOT NULL,
    last_trade_exit_time INTEGER,
    overall_pnl_with_fees REAL NOT NULL DEFAULT 0,
    overall_pnl_without_fees REAL NOT NULL DEFAULT 0,
    total_fees_paid REAL NOT NULL DEFAULT 0,
    avg_net_pnl REAL NOT NULL DEFAULT 0,
    avg_gross_pnl REAL NOT NULL DEFAULT 0,
    std_net_pnl REAL NOT NULL DEFAULT 0,
    std_gross_pnl REAL NOT NULL DEFAULT 0,
    biggest_net_gain REAL NOT NULL DEFAULT 0,
    biggest_net_loss REAL NOT NULL DEFAULT 0,
    win_rate REAL NOT NULL DEFAULT 0,
    avg_winners_net_pnl REAL NOT NULL DEFAULT 0,
    avg_losers_net_pnl REAL NOT NULL DEFAULT 0,
    total_trades INTEGER NOT NULL DEFAULT 0,
    num_long_trades INTEGER NOT NULL DEFAULT 0,
    num_short_trades INTEGER NOT NULL DEFAULT 0,
    avg_holding_period_mins REAL NOT NULL DEFAULT 0,
    median_holding_period_mins REAL NOT NULL DEFAULT 0,
    avg_size_of_trade_notional REAL NOT NULL DEFAULT 0,
    median_size_of_trade_notional REAL NOT NULL DEFAULT 0,
    total_signals INTEGER NOT NULL DEFAULT 0,
    num_long_signals INTEGER NOT NULL DEFAULT 0,
    num_short_signals INTEGER NOT NULL DEFAULT 0,
    avg_confidence REAL NOT NULL DEFAULT 0,
    median_confidence REAL NOT NULL DEFAULT 0,
    avg_leverage REAL NOT NULL DEFAULT 0,
    sharpe_ratio REAL NOT NULL DEFAULT 0,
    cached_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS since_inception_values (
    id TEXT PRIMARY KEY,
    model_id TEXT NOT NULL,
    nav_since_inception REAL NOT NULL DEFAULT 0,
    inception_date INTEGER NOT NULL,
    num_invocations INTEGER NOT NULL DEFAULT 0,
    cached_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS crypto_prices_realtime (
    symbol TEXT PRIMARY KEY,
    price REAL NOT NULL DEFAULT 0,
    timestamp INTEGER NOT NULL,
    cached_at INTEGER NOT NULL
);

-- Account equity per model account, positions kept as a JSON blob
CREATE TABLE IF NOT EXISTS account_totals (
    id TEXT PRIMARY KEY,
    model_id TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    realized_pnl REAL NOT NULL DEFAULT 0,
    unrealized_pnl REAL NOT NULL DEFAULT 0,
    total_equity REAL NOT NULL DEFAULT 0,
    positions_data TEXT NOT NULL DEFAULT '{}',
    cached_at INTEGER NOT NULL
);

-- Individual open positions, id qualified by the sync timestamp
CREATE TABLE IF NOT EXISTS account_positions (
    id TEXT PRIMARY KEY,
    account_total_id TEXT NOT NULL,
    model_id TEXT NOT NULL,
    symbol TEXT NOT NULL,
    quantity REAL NOT NULL DEFAULT 0,
    entry_price REAL NOT NULL DEFAULT 0,
    current_price REAL NOT NULL DEFAULT 0,
    unrealized_pnl REAL NOT NULL DEFAULT 0,
    closed_pnl REAL NOT NULL DEFAULT 0,
    leverage REAL NOT NULL DEFAULT 1,
    margin REAL NOT NULL DEFAULT 0,
    liquidation_price REAL NOT NULL DEFAULT 0,
    entry_time INTEGER NOT NULL,
    confidence REAL NOT NULL DEFAULT 0,
    risk_usd REAL NOT NULL DEFAULT 0,
    exit_plan TEXT NOT NULL DEFAULT '{}',
    cached_at INTEGER NOT NULL
);

-- Append-only audit trail of leaderboard standings
CREATE TABLE IF NOT EXISTS leaderboard_history (
    id TEXT PRIMARY KEY,
    model_id TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    rank INTEGER NOT NULL DEFAULT 0,
    equity REAL NOT NULL DEFAULT 0,
    return_pct REAL NOT NULL DEFAULT 0,
    sharpe REAL NOT NULL DEFAULT 0,
    num_trades INTEGER NOT NULL DEFAULT 0,
    win_rate REAL NOT NULL DEFAULT 0,
    cached_at INTEGER NOT NULL
);

-- ========== INDEXES ==========

CREATE INDEX IF NOT EXISTS idx_recent_trades_model ON recent_trades_cache(model_id);
CREATE INDEX IF NOT EXISTS idx_trades_detailed_model ON trades_detailed(model_id);
CREATE INDEX IF NOT EXISTS idx_trades_detailed_entry ON trades_detailed(entry_time DESC);
CREATE INDEX IF NOT EXISTS idx_positions_account ON account_positions(account_total_id);
CREATE INDEX IF NOT EXISTS idx_positions_model ON account_positions(model_id);
CREATE INDEX IF NOT EXISTS idx_history_model ON leaderboard_history(model_id, timestamp DESC)
"#;

/// Destination table names, in the order batch operations are emitted
pub const TABLES: &[&str] = &[
    "leaderboard_cache",
    "recent_trades_cache",
    "trades_detailed",
    "model_performance_cache",
    "model_analytics",
    "since_inception_values",
    "crypto_prices_realtime",
    "account_totals",
    "account_positions",
    "leaderboard_history",
];
