use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::keys::ApiKeys;

use super::market::{Market, MarketType, Usd};
use super::polymarket::{PolymarketClient, PolymarketSettings};

/// Order direction. Serialized the way the CLOB expects it (`BUY` / `SELL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// A single order an agent wants placed on a market.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub outcome_index: usize,
    pub outcome: String,
    pub side: OrderSide,
    pub amount: Usd,
    /// Worst acceptable price for this order (0.0–1.0)
    pub limit_price: f64,
}

/// Market data and order access for one venue.
#[async_trait]
pub trait MarketVenue: Send + Sync {
    fn market_type(&self) -> MarketType;

    /// Open markets, in the order the venue returns them.
    async fn fetch_open_markets(&self, limit: usize) -> Result<Vec<Market>>;

    /// Collateral available for trading.
    async fn trade_balance(&self, keys: &ApiKeys) -> Result<Usd>;

    /// Whether the trading wallet already holds a position in `market`.
    async fn has_open_position(&self, market: &Market, keys: &ApiKeys) -> Result<bool>;

    /// Place an order and return the venue's order id.
    async fn place_trade(&self, market: &Market, trade: &Trade) -> Result<String>;
}

/// Builds the venue client for a market type.
#[async_trait]
pub trait VenueConnector: Send + Sync {
    async fn connect(
        &self,
        market_type: MarketType,
        keys: &ApiKeys,
    ) -> Result<Arc<dyn MarketVenue>>;
}

/// Connector for the venues this binary ships adapters for.
pub struct DefaultVenueConnector {
    polymarket: PolymarketSettings,
}

impl DefaultVenueConnector {
    pub fn new(polymarket: PolymarketSettings) -> Self {
        DefaultVenueConnector { polymarket }
    }
}

#[async_trait]
impl VenueConnector for DefaultVenueConnector {
    async fn connect(
        &self,
        market_type: MarketType,
        keys: &ApiKeys,
    ) -> Result<Arc<dyn MarketVenue>> {
        match market_type {
            MarketType::Polymarket => {
                let client = PolymarketClient::new(self.polymarket.clone(), keys)?;
                Ok(Arc::new(client))
            }
            other => anyhow::bail!("No venue adapter available for market type '{}'", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_side_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&OrderSide::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&OrderSide::Sell).unwrap(), "\"SELL\"");
    }

    #[tokio::test]
    async fn test_connector_rejects_venues_without_adapter() {
        let connector = DefaultVenueConnector::new(PolymarketSettings::default());
        let err = connector
            .connect(MarketType::Omen, &ApiKeys::default())
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("omen"));
    }

    #[tokio::test]
    async fn test_connector_builds_dry_run_polymarket_client_without_keys() {
        let connector = DefaultVenueConnector::new(PolymarketSettings {
            dry_run: true,
            ..PolymarketSettings::default()
        });
        let venue = connector
            .connect(MarketType::Polymarket, &ApiKeys::default())
            .await
            .unwrap();
        assert_eq!(venue.market_type(), MarketType::Polymarket);
    }
}
