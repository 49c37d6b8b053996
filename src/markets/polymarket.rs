use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::keys::ApiKeys;

use super::market::{Market, MarketKind, MarketType, Usd};
use super::venue::{MarketVenue, Trade};

/// USDC.e on Polygon, the collateral token Polymarket settles in.
const USDC_CONTRACT: &str = "0x2791Bca1f2de4661ED88A44C99A9b16aB1Cb3f3f";
const USDC_DECIMALS: i32 = 6;
/// `balanceOf(address)` selector
const BALANCE_OF_SELECTOR: &str = "70a08231";

/// Endpoints and trading mode for [`PolymarketClient`].
#[derive(Debug, Clone)]
pub struct PolymarketSettings {
    pub api_url: String,
    pub clob_url: String,
    pub data_api_url: String,
    pub rpc_url: String,
    pub dry_run: bool,
    /// Balance reported in dry-run mode instead of the on-chain one
    pub simulated_balance: Usd,
}

impl Default for PolymarketSettings {
    fn default() -> Self {
        PolymarketSettings {
            api_url: "https://gamma-api.polymarket.com".to_string(),
            clob_url: "https://clob.polymarket.com".to_string(),
            data_api_url: "https://data-api.polymarket.com".to_string(),
            rpc_url: "https://polygon-rpc.com".to_string(),
            dry_run: true,
            simulated_balance: Usd(100.0),
        }
    }
}

/// Client for the Polymarket Gamma (markets), Data (positions) and CLOB (orders) APIs.
#[derive(Clone)]
pub struct PolymarketClient {
    http: Client,
    settings: PolymarketSettings,
    api_key: Option<String>,
}

impl PolymarketClient {
    /// Live mode needs `POLYMARKET_API_KEY`; dry-run needs nothing.
    pub fn new(settings: PolymarketSettings, keys: &ApiKeys) -> Result<Self> {
        let api_key = if settings.dry_run {
            keys.polymarket_api_key().ok().map(str::to_string)
        } else {
            Some(keys.polymarket_api_key()?.to_string())
        };
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(PolymarketClient {
            http,
            settings,
            api_key,
        })
    }

    async fn get_json(&self, url: Url) -> Result<serde_json::Value> {
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("Polymarket API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Polymarket API error {}: {}", status, body);
        }

        resp.json()
            .await
            .context("Failed to parse Polymarket response")
    }

    async fn usdc_balance_of(&self, wallet: &str) -> Result<Usd> {
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": USDC_CONTRACT, "data": balance_of_calldata(wallet)? },
                "latest"
            ],
        });

        let resp = self
            .http
            .post(&self.settings.rpc_url)
            .json(&request)
            .send()
            .await
            .context("Polygon RPC request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Polygon RPC error: {}", resp.status());
        }

        let raw: serde_json::Value = resp.json().await.context("Failed to parse RPC response")?;
        if let Some(err) = raw.get("error") {
            anyhow::bail!("Polygon RPC returned an error: {}", err);
        }
        let hex = raw["result"]
            .as_str()
            .context("Polygon RPC response has no result")?;
        decode_token_amount(hex, USDC_DECIMALS)
    }
}

#[async_trait]
impl MarketVenue for PolymarketClient {
    fn market_type(&self) -> MarketType {
        MarketType::Polymarket
    }

    async fn fetch_open_markets(&self, limit: usize) -> Result<Vec<Market>> {
        let mut url = Url::parse(&format!("{}/markets", self.settings.api_url))
            .context("Invalid Polymarket API URL")?;
        url.query_pairs_mut()
            .append_pair("active", "true")
            .append_pair("closed", "false")
            .append_pair("limit", &limit.to_string())
            .append_pair("order", "volume24hr")
            .append_pair("ascending", "false");

        let raw = self.get_json(url).await?;
        let markets = parse_markets(&raw);
        info!("Fetched {} open Polymarket markets", markets.len());
        Ok(markets)
    }

    async fn trade_balance(&self, keys: &ApiKeys) -> Result<Usd> {
        if self.settings.dry_run {
            return Ok(self.settings.simulated_balance);
        }
        let wallet = keys.polymarket_wallet_address()?;
        self.usdc_balance_of(wallet).await
    }

    async fn has_open_position(&self, market: &Market, keys: &ApiKeys) -> Result<bool> {
        if self.settings.dry_run {
            return Ok(false);
        }
        let wallet = keys.polymarket_wallet_address()?;
        let condition_id = match market.condition_id.as_deref() {
            Some(c) => c,
            None => return Ok(false),
        };

        let mut url = Url::parse(&format!("{}/positions", self.settings.data_api_url))
            .context("Invalid Polymarket data API URL")?;
        url.query_pairs_mut()
            .append_pair("user", wallet)
            .append_pair("market", condition_id);

        let raw = self.get_json(url).await?;
        Ok(raw
            .as_array()
            .map(|positions| {
                positions
                    .iter()
                    .any(|p| number_field(p, "size").unwrap_or(0.0) > 0.0)
            })
            .unwrap_or(false))
    }

    async fn place_trade(&self, market: &Market, trade: &Trade) -> Result<String> {
        if self.settings.dry_run {
            info!(
                "[dry-run] {:?} {} of '{}' on market {} at <= {:.3}",
                trade.side, trade.amount, trade.outcome, market.id, trade.limit_price
            );
            return Ok(format!("dry-run-{}-{}", market.id, trade.outcome_index));
        }

        let token_id = market
            .outcome_token_ids
            .get(trade.outcome_index)
            .with_context(|| format!("No token id for outcome '{}'", trade.outcome))?;
        let api_key = self.api_key.as_deref().unwrap_or_default();

        info!(
            "Placing order: market={}, outcome={}, side={:?}, size={}, price={:.3}",
            market.id, trade.outcome, trade.side, trade.amount, trade.limit_price
        );

        let order = serde_json::json!({
            "tokenID": token_id,
            "price": trade.limit_price,
            "size": order_size_in_shares(trade),
            "side": trade.side,
            "orderType": "GTC",
        });

        let url = format!("{}/order", self.settings.clob_url);
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&order)
            .send()
            .await
            .context("Failed to place Polymarket order")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Order placement failed {}: {}", status, body);
        }

        let result: serde_json::Value = resp.json().await?;
        let order_id = result["orderID"]
            .as_str()
            .or_else(|| result["orderId"].as_str())
            .unwrap_or("unknown")
            .to_string();
        info!("Order placed, id={}", order_id);
        Ok(order_id)
    }
}

fn order_size_in_shares(trade: &Trade) -> f64 {
    if trade.limit_price <= 0.0 {
        return 0.0;
    }
    let shares = trade.amount.value() / trade.limit_price;
    (shares * 100.0).floor() / 100.0
}

// ── Parsing helpers ────────────────────────────────────────────────────────────

fn parse_markets(raw: &serde_json::Value) -> Vec<Market> {
    let items = match raw.as_array() {
        Some(a) => a,
        None => match raw.get("markets").and_then(|v| v.as_array()) {
            Some(a) => a,
            None => return vec![],
        },
    };
    items.iter().filter_map(parse_market).collect()
}

fn parse_market(item: &serde_json::Value) -> Option<Market> {
    if item["closed"].as_bool() == Some(true) || item["acceptingOrders"].as_bool() == Some(false) {
        return None;
    }

    let id = item["conditionId"].as_str().or_else(|| item["id"].as_str())?;
    let outcomes = string_list(&item["outcomes"]);
    let kind = if item["marketType"].as_str() == Some("scalar") {
        MarketKind::Scalar {
            lower_bound: number_field(item, "lowerBound").unwrap_or(0.0),
            upper_bound: number_field(item, "upperBound").unwrap_or(0.0),
        }
    } else {
        match outcomes.len() {
            0 | 1 => return None,
            2 if is_yes_no(&outcomes) => MarketKind::Binary,
            // Two named sides ("Lakers" vs "Celtics") have no YES outcome to price
            _ => MarketKind::Categorical,
        }
    };

    // Untradable without one price per outcome
    let outcome_prices: Vec<f64> = string_list(&item["outcomePrices"])
        .iter()
        .filter_map(|p| p.parse().ok())
        .collect();
    if outcome_prices.len() != outcomes.len() {
        debug!(
            "Skipping market {}: {} outcomes but {} prices",
            id,
            outcomes.len(),
            outcome_prices.len()
        );
        return None;
    }

    Some(Market {
        id: id.to_string(),
        venue: MarketType::Polymarket,
        question: item["question"].as_str().unwrap_or("").to_string(),
        outcome_token_ids: string_list(&item["clobTokenIds"]),
        outcomes,
        outcome_prices,
        kind,
        condition_id: item["conditionId"].as_str().map(str::to_string),
    })
}

fn is_yes_no(outcomes: &[String]) -> bool {
    let has = |label: &str| outcomes.iter().any(|o| o.trim().eq_ignore_ascii_case(label));
    has("yes") && has("no")
}

/// Gamma returns list fields either as JSON arrays or as JSON-encoded strings.
fn string_list(value: &serde_json::Value) -> Vec<String> {
    let decoded;
    let items = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::String(s) => {
            decoded = serde_json::from_str::<serde_json::Value>(s).unwrap_or_default();
            match decoded.as_array() {
                Some(items) => items,
                None => return vec![],
            }
        }
        _ => return vec![],
    };
    items
        .iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

fn number_field(item: &serde_json::Value, name: &str) -> Option<f64> {
    let v = &item[name];
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

fn balance_of_calldata(wallet: &str) -> Result<String> {
    let address = wallet.trim().trim_start_matches("0x");
    if address.len() != 40 || !address.chars().all(|c| c.is_ascii_hexdigit()) {
        anyhow::bail!("Invalid wallet address: {}", wallet);
    }
    Ok(format!(
        "0x{}{:0>64}",
        BALANCE_OF_SELECTOR,
        address.to_lowercase()
    ))
}

fn decode_token_amount(hex: &str, decimals: i32) -> Result<Usd> {
    let digits = hex.trim().trim_start_matches("0x").trim_start_matches('0');
    if digits.is_empty() {
        return Ok(Usd(0.0));
    }
    let raw = u128::from_str_radix(digits, 16)
        .with_context(|| format!("Invalid token amount: {}", hex))?;
    Ok(Usd(raw as f64 / 10f64.powi(decimals)))
}
