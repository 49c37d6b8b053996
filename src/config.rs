use clap::Parser;
use thiserror::Error;

use crate::agents::{ResolutionPolicy, RunnableAgent};
use crate::keys::ApiKeys;
use crate::markets::{parse_market_type, MarketType, PolymarketSettings, Usd};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeploymentError {
    #[error("Only {allowed} supported in this configuration, got {requested}.")]
    MarketTypeNotAllowed {
        requested: MarketType,
        allowed: String,
    },
}

/// Run one prediction-market trading agent against one market type
#[derive(Parser, Debug, Clone)]
#[command(name = "run-agent", version, about)]
pub struct Config {
    /// Agent to run
    #[arg(value_enum)]
    pub agent: RunnableAgent,

    /// Market type to trade on (canonical value or upper-case key, e.g. `polymarket` or `POLYMARKET`)
    #[arg(value_parser = parse_market_type)]
    pub market_type: MarketType,

    /// Run in dry-run mode (no real trades placed)
    #[arg(long, env = "DRY_RUN", default_value = "false")]
    pub dry_run: bool,

    /// Simulated trading balance for dry-run mode (USD)
    #[arg(long, env = "INITIAL_BALANCE", default_value = "100.0")]
    pub initial_balance: f64,

    /// Polymarket Gamma API base URL
    #[arg(
        long,
        env = "POLYMARKET_API_URL",
        default_value = "https://gamma-api.polymarket.com"
    )]
    pub polymarket_api_url: String,

    /// Polymarket CLOB (Central Limit Order Book) URL
    #[arg(
        long,
        env = "POLYMARKET_CLOB_URL",
        default_value = "https://clob.polymarket.com"
    )]
    pub polymarket_clob_url: String,

    /// Polymarket Data API URL (positions)
    #[arg(
        long,
        env = "POLYMARKET_DATA_API_URL",
        default_value = "https://data-api.polymarket.com"
    )]
    pub polymarket_data_api_url: String,

    /// Polygon JSON-RPC endpoint used for the USDC balance
    #[arg(long, env = "POLYGON_RPC_URL", default_value = "https://polygon-rpc.com")]
    pub polygon_rpc_url: String,

    /// Open markets requested from the venue per run
    #[arg(long, env = "MARKET_FETCH_LIMIT", default_value = "100")]
    pub market_fetch_limit: usize,

    /// Market types this deployment may trade, comma separated
    #[arg(
        long,
        env = "ALLOWED_MARKET_TYPES",
        value_delimiter = ',',
        value_parser = parse_market_type,
        default_value = "polymarket"
    )]
    pub allowed_market_types: Vec<MarketType>,

    /// When agent definitions are built: all at startup, or on first use
    #[arg(long, env = "RESOLUTION_POLICY", value_enum, default_value_t = ResolutionPolicy::Lazy)]
    pub resolution_policy: ResolutionPolicy,

    #[command(flatten)]
    pub keys: ApiKeys,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        // Written so NaN fails too
        if !(self.initial_balance > 0.0) {
            anyhow::bail!("initial_balance must be positive");
        }
        if self.market_fetch_limit == 0 {
            anyhow::bail!("market_fetch_limit must be positive");
        }
        if self.allowed_market_types.is_empty() {
            anyhow::bail!("allowed_market_types must name at least one market type");
        }
        Ok(())
    }

    /// Reject market types this deployment is locked out of.
    pub fn check_deployment(&self) -> Result<(), DeploymentError> {
        if self.allowed_market_types.contains(&self.market_type) {
            return Ok(());
        }
        let allowed = self
            .allowed_market_types
            .iter()
            .map(|t| format!("MarketType.{}", t.key()))
            .collect::<Vec<_>>()
            .join(", ");
        Err(DeploymentError::MarketTypeNotAllowed {
            requested: self.market_type,
            allowed,
        })
    }

    pub fn polymarket_settings(&self) -> PolymarketSettings {
        PolymarketSettings {
            api_url: self.polymarket_api_url.clone(),
            clob_url: self.polymarket_clob_url.clone(),
            data_api_url: self.polymarket_data_api_url.clone(),
            rpc_url: self.polygon_rpc_url.clone(),
            dry_run: self.dry_run,
            simulated_balance: Usd(self.initial_balance),
        }
    }
}
