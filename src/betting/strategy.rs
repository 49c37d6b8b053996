use anyhow::{Context, Result};
use tracing::debug;

use crate::markets::{Market, OrderSide, Trade, Usd};
use crate::prediction::Answer;

use super::kelly::{edge, kelly_fraction};

/// Share of the trading balance that may be committed; the rest covers fees.
const BALANCE_BUFFER: f64 = 0.95;
/// Orders below this are not worth placing.
const MIN_TRADE_AMOUNT: Usd = Usd(0.01);
const MAX_LIMIT_PRICE: f64 = 0.99;
const MIN_LIMIT_PRICE: f64 = 0.01;

/// Stake bound for a Kelly strategy: the balance (minus a buffer) clipped to `[min, max]`.
/// `min` wins when the balance is below it.
pub fn get_maximum_possible_bet_amount(min: Usd, max: Usd, trading_balance: Usd) -> Usd {
    min.max(max.min(trading_balance * BALANCE_BUFFER))
}

/// Stake sizing and risk limits for the Kelly strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BettingStrategyConfig {
    pub max_position_amount: Usd,
    /// Largest tolerated move away from the current price, as a fraction of it
    pub max_price_impact: Option<f64>,
    pub allow_multiple_bets: bool,
    pub allow_shorting: bool,
    pub multicategorical: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BettingStrategy {
    FullBinaryKelly(BettingStrategyConfig),
    FullCategoricalKelly(BettingStrategyConfig),
    /// Fixed stake on the most probable outcome.
    MaxAccuracy { bet_amount: Usd },
}

impl Default for BettingStrategy {
    fn default() -> Self {
        BettingStrategy::MaxAccuracy {
            bet_amount: Usd(1.0),
        }
    }
}

impl BettingStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            BettingStrategy::FullBinaryKelly(_) => "FullBinaryKellyBettingStrategy",
            BettingStrategy::FullCategoricalKelly(_) => "FullCategoricalKellyBettingStrategy",
            BettingStrategy::MaxAccuracy { .. } => "MaxAccuracyBettingStrategy",
        }
    }

    pub fn config(&self) -> Option<&BettingStrategyConfig> {
        match self {
            BettingStrategy::FullBinaryKelly(c) | BettingStrategy::FullCategoricalKelly(c) => {
                Some(c)
            }
            BettingStrategy::MaxAccuracy { .. } => None,
        }
    }

    pub fn allows_multiple_bets(&self) -> bool {
        self.config().map_or(true, |c| c.allow_multiple_bets)
    }

    /// Orders to place on `market` given the agent's answer. Empty when there is no edge.
    pub fn calculate_trades(&self, market: &Market, answer: &Answer) -> Result<Vec<Trade>> {
        let probs = answer
            .outcome_probabilities(&market.outcomes, market.yes_index())
            .with_context(|| format!("Answer does not cover the outcomes of market {}", market.id))?;
        if market.outcome_prices.len() != market.outcomes.len() {
            anyhow::bail!("Market {} has no usable outcome prices", market.id);
        }

        match self {
            BettingStrategy::MaxAccuracy { bet_amount } => {
                let (idx, _) = probs
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .context("Market has no outcomes")?;
                Ok(vec![Trade {
                    outcome_index: idx,
                    outcome: market.outcomes[idx].clone(),
                    side: OrderSide::Buy,
                    amount: *bet_amount,
                    limit_price: market.outcome_prices[idx],
                }])
            }
            BettingStrategy::FullBinaryKelly(config) => {
                if !market.is_binary() {
                    anyhow::bail!("Binary Kelly strategy used on non-binary market {}", market.id);
                }
                Ok(kelly_trades(market, &probs, config, false))
            }
            BettingStrategy::FullCategoricalKelly(config) => {
                Ok(kelly_trades(market, &probs, config, config.multicategorical))
            }
        }
    }
}

fn kelly_trades(
    market: &Market,
    probs: &[f64],
    config: &BettingStrategyConfig,
    take_all: bool,
) -> Vec<Trade> {
    let mut candidates: Vec<(f64, Trade)> = Vec::new();

    for (idx, (&p, &price)) in probs.iter().zip(&market.outcome_prices).enumerate() {
        let e = edge(p, price);
        debug!(
            "Market {} outcome '{}': p={:.3}, price={:.3}, edge={:.3}",
            market.id, market.outcomes[idx], p, price, e
        );

        let (side, fraction) = if e > 0.0 {
            (OrderSide::Buy, kelly_fraction(p, price))
        } else if e < 0.0 && config.allow_shorting {
            (OrderSide::Sell, kelly_fraction(1.0 - p, 1.0 - price))
        } else {
            continue;
        };

        let amount = config.max_position_amount * fraction;
        if amount < MIN_TRADE_AMOUNT {
            continue;
        }
        candidates.push((
            fraction,
            Trade {
                outcome_index: idx,
                outcome: market.outcomes[idx].clone(),
                side,
                amount,
                limit_price: limit_price(price, side, config.max_price_impact),
            },
        ));
    }

    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    if !take_all {
        candidates.truncate(1);
    }
    candidates.into_iter().map(|(_, t)| t).collect()
}

fn limit_price(price: f64, side: OrderSide, max_price_impact: Option<f64>) -> f64 {
    let impact = max_price_impact.unwrap_or(0.0);
    match side {
        OrderSide::Buy => (price * (1.0 + impact)).min(MAX_LIMIT_PRICE),
        OrderSide::Sell => (price * (1.0 - impact)).max(MIN_LIMIT_PRICE),
    }
}
