//! NOF1 competition API client — public read-only endpoints, no authentication
//!
//! Two field-naming variants exist in the wild for leaderboard/trade data;
//! both are deserialized into typed records here and converted to the
//! canonical shapes before anything downstream sees them. Every endpoint
//! call is independent: a failed fetch degrades that dataset to an empty
//! container and the sync continues.

use anyhow::Result;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::{SchemaVersion, SyncConfig};
use crate::types::{
    AccountTotal, AnalyticsEntry, LeaderboardEntry, PriceData, SinceInceptionValue, Snapshot,
    TradeRecord,
};

/// NOF1 API client
#[derive(Clone)]
pub struct Nof1Client {
    client: Client,
    base_url: String,
}

// ---------------------------------------------------------------------------
// Deserialization structs — flat snake_case variant
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct FlatLeaderboardEntry {
    id: Option<String>,
    num_trades: Option<i64>,
    sharpe: Option<f64>,
    win_dollars: Option<f64>,
    lose_dollars: Option<f64>,
    num_wins: Option<i64>,
    num_losses: Option<i64>,
    return_pct: Option<f64>,
    equity: Option<f64>,
}

impl From<FlatLeaderboardEntry> for LeaderboardEntry {
    fn from(e: FlatLeaderboardEntry) -> Self {
        Self {
            model_id: e.id.unwrap_or_default(),
            num_trades: e.num_trades,
            sharpe: e.sharpe,
            win_dollars: e.win_dollars,
            lose_dollars: e.lose_dollars,
            num_wins: e.num_wins,
            num_losses: e.num_losses,
            return_pct: e.return_pct,
            equity: e.equity,
            // The flat variant reports no rank
            rank: None,
            // ...and no cumulative pnl; the return percentage stands in
            total_pnl: e.return_pct,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FlatTrade {
    id: Option<String>,
    model_id: Option<String>,
    symbol: Option<String>,
    side: Option<String>,
    trade_type: Option<String>,
    leverage: Option<f64>,
    quantity: Option<f64>,
    confidence: Option<f64>,
    entry_time: Option<i64>,
    entry_human_time: Option<String>,
    entry_price: Option<f64>,
    entry_sz: Option<f64>,
    entry_oid: Option<String>,
    entry_tid: Option<String>,
    entry_commission_dollars: Option<f64>,
    entry_closed_pnl: Option<f64>,
    entry_crossed: Option<bool>,
    exit_time: Option<i64>,
    exit_human_time: Option<String>,
    exit_price: Option<f64>,
    exit_sz: Option<f64>,
    exit_oid: Option<String>,
    exit_tid: Option<String>,
    exit_commission_dollars: Option<f64>,
    exit_closed_pnl: Option<f64>,
    exit_crossed: Option<bool>,
    realized_net_pnl: Option<f64>,
    realized_gross_pnl: Option<f64>,
    pnl: Option<f64>,
    total_commission_dollars: Option<f64>,
    trade_id: Option<String>,
}

impl FlatTrade {
    fn into_record(self, raw: Value) -> TradeRecord {
        TradeRecord {
            raw,
            id: self.id,
            model_id: self.model_id,
            symbol: self.symbol,
            side: self.side,
            trade_type: self.trade_type,
            leverage: self.leverage,
            quantity: self.quantity,
            confidence: self.confidence,
            entry_time: self.entry_time,
            entry_human_time: self.entry_human_time,
            entry_price: self.entry_price,
            entry_sz: self.entry_sz,
            entry_oid: self.entry_oid,
            entry_tid: self.entry_tid,
            entry_commission_dollars: self.entry_commission_dollars,
            entry_closed_pnl: self.entry_closed_pnl,
            entry_crossed: self.entry_crossed,
            exit_time: self.exit_time,
            exit_human_time: self.exit_human_time,
            exit_price: self.exit_price,
            exit_sz: self.exit_sz,
            exit_oid: self.exit_oid,
            exit_tid: self.exit_tid,
            exit_commission_dollars: self.exit_commission_dollars,
            exit_closed_pnl: self.exit_closed_pnl,
            exit_crossed: self.exit_crossed,
            realized_net_pnl: self.realized_net_pnl,
            realized_gross_pnl: self.realized_gross_pnl,
            pnl: self.pnl,
            total_commission_dollars: self.total_commission_dollars,
            trade_id: self.trade_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Deserialization structs — camelCase variant
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CamelLeaderboardEntry {
    ai_model_id: Option<String>,
    total_trades: Option<i64>,
    sharpe_ratio: Option<f64>,
    win_dollars: Option<f64>,
    lose_dollars: Option<f64>,
    num_wins: Option<i64>,
    num_losses: Option<i64>,
    return_pct: Option<f64>,
    total_assets: Option<f64>,
    rank: Option<i64>,
    #[serde(rename = "totalPnL")]
    total_pnl: Option<f64>,
}

impl From<CamelLeaderboardEntry> for LeaderboardEntry {
    fn from(e: CamelLeaderboardEntry) -> Self {
        Self {
            model_id: e.ai_model_id.unwrap_or_default(),
            num_trades: e.total_trades,
            sharpe: e.sharpe_ratio,
            win_dollars: e.win_dollars,
            lose_dollars: e.lose_dollars,
            num_wins: e.num_wins,
            num_losses: e.num_losses,
            return_pct: e.return_pct,
            equity: e.total_assets,
            rank: e.rank,
            total_pnl: e.total_pnl,
        }
    }
}

/// The camelCase trades feed only carries summary fields
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CamelTrade {
    id: Option<String>,
    ai_model_id: Option<String>,
    symbol: Option<String>,
    side: Option<String>,
    entry_time: Option<i64>,
    exit_time: Option<i64>,
    realized_net_pnl: Option<f64>,
    pnl: Option<f64>,
}

impl CamelTrade {
    fn into_record(self, raw: Value) -> TradeRecord {
        TradeRecord {
            raw,
            id: self.id,
            model_id: self.ai_model_id,
            symbol: self.symbol,
            side: self.side,
            entry_time: self.entry_time,
            exit_time: self.exit_time,
            realized_net_pnl: self.realized_net_pnl,
            pnl: self.pnl,
            ..TradeRecord::default()
        }
    }
}

/// Convert camelCase entries, falling back to the list position (1-based)
/// when the feed omits an explicit rank
fn convert_camel_leaderboard(entries: Vec<CamelLeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, e)| {
            let mut entry = LeaderboardEntry::from(e);
            if entry.rank.is_none() {
                entry.rank = Some(i as i64 + 1);
            }
            entry
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Response wrappers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LeaderboardResponse<T> {
    #[serde(default)]
    leaderboard: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TradesResponse {
    #[serde(default)]
    trades: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct AnalyticsResponse {
    #[serde(default)]
    analytics: Vec<AnalyticsEntry>,
}

#[derive(Debug, Deserialize)]
struct AccountTotalsResponse {
    #[serde(default, rename = "accountTotals")]
    account_totals: Vec<AccountTotal>,
}

#[derive(Debug, Deserialize)]
struct SinceInceptionResponse {
    #[serde(default, rename = "sinceInceptionValues")]
    since_inception_values: Vec<SinceInceptionValue>,
}

// serde_json's preserve_order feature keeps the map in source order
#[derive(Debug, Deserialize)]
struct CryptoPricesResponse {
    #[serde(default)]
    prices: serde_json::Map<String, Value>,
}

fn convert_prices(prices: serde_json::Map<String, Value>) -> Vec<(String, PriceData)> {
    prices
        .into_iter()
        .map(|(symbol, value)| {
            let data: PriceData = serde_json::from_value(value).unwrap_or_default();
            (symbol, data)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Client implementation
// ---------------------------------------------------------------------------

impl Nof1Client {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "Fetching");

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("NOF1 API error {}: {}", status, body);
        }

        Ok(resp.json().await?)
    }

    /// GET /leaderboard — current standings
    pub async fn leaderboard(&self, schema: SchemaVersion) -> Result<Vec<LeaderboardEntry>> {
        let entries = match schema {
            SchemaVersion::V1 => {
                let wrapper: LeaderboardResponse<FlatLeaderboardEntry> =
                    self.get_json("leaderboard").await?;
                wrapper.leaderboard.into_iter().map(Into::into).collect()
            }
            SchemaVersion::V2 => {
                let wrapper: LeaderboardResponse<CamelLeaderboardEntry> =
                    self.get_json("leaderboard").await?;
                convert_camel_leaderboard(wrapper.leaderboard)
            }
        };
        Ok(entries)
    }

    /// GET /trades — all trades, newest first
    pub async fn trades(&self, schema: SchemaVersion) -> Result<Vec<TradeRecord>> {
        let wrapper: TradesResponse = self.get_json("trades").await?;

        let mut records = Vec::with_capacity(wrapper.trades.len());
        for raw in wrapper.trades {
            let record = match schema {
                SchemaVersion::V1 => {
                    let parsed: FlatTrade =
                        serde_json::from_value(raw.clone()).unwrap_or_default();
                    parsed.into_record(raw)
                }
                SchemaVersion::V2 => {
                    let parsed: CamelTrade =
                        serde_json::from_value(raw.clone()).unwrap_or_default();
                    parsed.into_record(raw)
                }
            };
            records.push(record);
        }
        Ok(records)
    }

    /// GET /analytics — global analytics feed.
    ///
    /// Fetched for completeness; only the per-model feed produces rows.
    pub async fn analytics(&self) -> Result<Vec<AnalyticsEntry>> {
        let wrapper: AnalyticsResponse = self.get_json("analytics").await?;
        Ok(wrapper.analytics)
    }

    /// GET /analytics/{model} — per-model analytics breakdowns
    pub async fn model_analytics(&self, model: &str) -> Result<Vec<AnalyticsEntry>> {
        let wrapper: AnalyticsResponse = self.get_json(&format!("analytics/{model}")).await?;
        Ok(wrapper.analytics)
    }

    /// GET /conversations — fetched for the run report only
    pub async fn conversations(&self) -> Result<usize> {
        let body: Value = self.get_json("conversations").await?;
        let count = body
            .get("conversations")
            .and_then(Value::as_array)
            .map(|a| a.len())
            .unwrap_or(0);
        Ok(count)
    }

    /// GET /account-totals — account equity with open positions
    pub async fn account_totals(&self) -> Result<Vec<AccountTotal>> {
        let wrapper: AccountTotalsResponse = self.get_json("account-totals").await?;
        Ok(wrapper.account_totals)
    }

    /// GET /since-inception-values
    pub async fn since_inception_values(&self) -> Result<Vec<SinceInceptionValue>> {
        let wrapper: SinceInceptionResponse =
            self.get_json("since-inception-values").await?;
        Ok(wrapper.since_inception_values)
    }

    /// GET /crypto-prices — symbol keyed price feed, source order preserved
    pub async fn crypto_prices(&self) -> Result<Vec<(String, PriceData)>> {
        let wrapper: CryptoPricesResponse = self.get_json("crypto-prices").await?;
        Ok(convert_prices(wrapper.prices))
    }
}

// ---------------------------------------------------------------------------
// Snapshot assembly with per-endpoint failure isolation
// ---------------------------------------------------------------------------

/// Fetch every dataset sequentially.
///
/// No individual endpoint failure aborts the run: the dataset stays empty,
/// the failure is logged and recorded in the snapshot's error list.
pub async fn fetch_snapshot(client: &Nof1Client, config: &SyncConfig) -> Snapshot {
    let mut snapshot = Snapshot::default();

    info!("Fetching leaderboard");
    match client.leaderboard(config.schema).await {
        Ok(entries) => snapshot.leaderboard = entries,
        Err(e) => degrade(&mut snapshot, "leaderboard", e),
    }

    info!("Fetching trades");
    match client.trades(config.schema).await {
        Ok(trades) => snapshot.trades = trades,
        Err(e) => degrade(&mut snapshot, "trades", e),
    }

    info!("Fetching global analytics");
    match client.analytics().await {
        Ok(entries) => debug!(entries = entries.len(), "Global analytics fetched"),
        Err(e) => degrade(&mut snapshot, "analytics", e),
    }

    for model in &config.models {
        info!(model = %model, "Fetching analytics");
        match client.model_analytics(model).await {
            Ok(entries) => snapshot.model_analytics.push((model.clone(), entries)),
            Err(e) => {
                // The model still appears in the snapshot so the skip shows
                // up in logs, just with nothing to normalize
                snapshot.model_analytics.push((model.clone(), Vec::new()));
                degrade(&mut snapshot, &format!("analytics/{model}"), e);
            }
        }
    }

    info!("Fetching conversations");
    match client.conversations().await {
        Ok(count) => snapshot.conversations = count,
        Err(e) => degrade(&mut snapshot, "conversations", e),
    }

    info!("Fetching account totals");
    match client.account_totals().await {
        Ok(accounts) => snapshot.account_totals = accounts,
        Err(e) => degrade(&mut snapshot, "account-totals", e),
    }

    info!("Fetching since-inception values");
    match client.since_inception_values().await {
        Ok(values) => snapshot.since_inception = values,
        Err(e) => degrade(&mut snapshot, "since-inception-values", e),
    }

    info!("Fetching crypto prices");
    match client.crypto_prices().await {
        Ok(prices) => snapshot.crypto_prices = prices,
        Err(e) => degrade(&mut snapshot, "crypto-prices", e),
    }

    snapshot
}

fn degrade(snapshot: &mut Snapshot, dataset: &str, error: anyhow::Error) {
    warn!(dataset, error = %error, "Endpoint fetch failed, continuing with empty dataset");
    snapshot.errors.push(format!("{dataset}: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_leaderboard_conversion() {
        let raw = serde_json::json!({
            "id": "gpt-5",
            "num_trades": 12,
            "sharpe": 1.1,
            "num_wins": 7,
            "num_losses": 5,
            "return_pct": 4.2,
            "equity": 10420.0
        });
        let parsed: FlatLeaderboardEntry = serde_json::from_value(raw).unwrap();
        let entry = LeaderboardEntry::from(parsed);
        assert_eq!(entry.model_id, "gpt-5");
        assert_eq!(entry.num_trades, Some(12));
        assert_eq!(entry.rank, None);
        // Flat variant: return_pct doubles as the pnl figure
        assert_eq!(entry.total_pnl, Some(4.2));
    }

    #[test]
    fn test_camel_leaderboard_conversion() {
        let raw = serde_json::json!({
            "aiModelId": "grok-4",
            "totalTrades": 30,
            "sharpeRatio": 0.8,
            "returnPct": -1.5,
            "totalAssets": 9850.0,
            "numWins": 10,
            "numLosses": 20,
            "rank": 4,
            "totalPnL": -150.0
        });
        let parsed: CamelLeaderboardEntry = serde_json::from_value(raw).unwrap();
        let entry = LeaderboardEntry::from(parsed);
        assert_eq!(entry.model_id, "grok-4");
        assert_eq!(entry.num_trades, Some(30));
        assert_eq!(entry.equity, Some(9850.0));
        assert_eq!(entry.rank, Some(4));
        assert_eq!(entry.total_pnl, Some(-150.0));
    }

    #[test]
    fn test_camel_rank_falls_back_to_list_position() {
        let entries: Vec<CamelLeaderboardEntry> = serde_json::from_value(serde_json::json!([
            { "aiModelId": "gpt-5" },
            { "aiModelId": "grok-4", "rank": 9 },
            { "aiModelId": "qwen3-max" }
        ]))
        .unwrap();
        let converted = convert_camel_leaderboard(entries);
        assert_eq!(converted[0].rank, Some(1));
        // An explicit rank always wins over the position
        assert_eq!(converted[1].rank, Some(9));
        assert_eq!(converted[2].rank, Some(3));
    }

    #[test]
    fn test_camel_trade_keeps_raw_payload() {
        let raw = serde_json::json!({
            "id": "t-1",
            "aiModelId": "gpt-5",
            "symbol": "BTC",
            "side": "long",
            "entryTime": 1700000000,
            "extra_field": "kept in raw only"
        });
        let parsed: CamelTrade = serde_json::from_value(raw.clone()).unwrap();
        let record = parsed.into_record(raw.clone());
        assert_eq!(record.model_id.as_deref(), Some("gpt-5"));
        assert_eq!(record.entry_time, Some(1700000000));
        assert_eq!(record.raw, raw);
        // Detail fields are not part of the camelCase feed
        assert_eq!(record.entry_price, None);
    }

    #[test]
    fn test_crypto_prices_keep_source_order() {
        let wrapper: CryptoPricesResponse = serde_json::from_str(
            r#"{"prices": {
                "SOL": {"price": 180.5, "timestamp": 1700000001},
                "BTC": {"price": 64250.0, "timestamp": 1700000002},
                "ETH": {"price": 3200.0, "timestamp": 1700000003}
            }}"#,
        )
        .unwrap();
        let prices = convert_prices(wrapper.prices);
        let symbols: Vec<&str> = prices.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(symbols, vec!["SOL", "BTC", "ETH"]);
        assert_eq!(prices[1].1.price, Some(64250.0));
    }

    #[test]
    fn test_analytics_entry_defaults_for_missing_breakdowns() {
        let raw = serde_json::json!({ "updated_at": 1700000123 });
        let entry: AnalyticsEntry = serde_json::from_value(raw).unwrap();
        assert_eq!(entry.updated_at, Some(1700000123));
        assert_eq!(entry.fee_pnl_moves_breakdown_table.total_fees_paid, None);
        assert_eq!(entry.winners_losers_breakdown_table.win_rate, None);
    }
}
