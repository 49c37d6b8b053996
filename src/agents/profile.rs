//! Per-variant agent configuration.
//!
//! Every deployable agent is the same [`TraderAgent`](super::TraderAgent)
//! parameterised by one of these profiles: which markets it trades, how it
//! answers them, which predictor it loads, and how it sizes bets.

use std::future::Future;

use anyhow::Result;

use crate::betting::{get_maximum_possible_bet_amount, BettingStrategy, BettingStrategyConfig};
use crate::markets::{Market, MarketType, Usd};
use crate::prediction::llm::OPENAI_EMBEDDING_MODEL;
use crate::prediction::{ModelSettings, DEFAULT_OPENAI_MODEL};

/// Markets the Kelly strategies are tuned for; everything else gets the default strategy.
pub const KELLY_MARKET_TYPE: MarketType = MarketType::Omen;

/// Which open markets an agent keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketFilter {
    BinaryOnly,
    /// Neither binary nor scalar.
    CategoricalOnly,
    Unfiltered,
}

impl MarketFilter {
    pub fn accepts(&self, market: &Market) -> bool {
        match self {
            MarketFilter::BinaryOnly => market.is_binary(),
            MarketFilter::CategoricalOnly => !market.is_binary() && !market.is_scalar(),
            MarketFilter::Unfiltered => true,
        }
    }

    /// Keeps matching markets in their original order.
    pub fn apply(&self, markets: Vec<Market>) -> Vec<Market> {
        markets.into_iter().filter(|m| self.accepts(m)).collect()
    }
}

/// Which predictor entry point an agent answers through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerMode {
    Binary,
    Categorical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyFamily {
    FullBinaryKelly,
    FullCategoricalKelly,
}

/// Fixed stake bounds and risk flags for one agent's Kelly strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyProfile {
    pub family: StrategyFamily,
    pub min_bet: Usd,
    pub max_bet: Usd,
    pub max_price_impact: f64,
    pub allow_multiple_bets: bool,
    pub allow_shorting: bool,
    pub multicategorical: bool,
}

impl StrategyProfile {
    /// Strategy for a market on the Kelly venue, sized against `trading_balance`.
    pub fn kelly_strategy(&self, trading_balance: Usd) -> BettingStrategy {
        let config = BettingStrategyConfig {
            max_position_amount: get_maximum_possible_bet_amount(
                self.min_bet,
                self.max_bet,
                trading_balance,
            ),
            max_price_impact: Some(self.max_price_impact),
            allow_multiple_bets: self.allow_multiple_bets,
            allow_shorting: self.allow_shorting,
            multicategorical: self.multicategorical,
        };
        match self.family {
            StrategyFamily::FullBinaryKelly => BettingStrategy::FullBinaryKelly(config),
            StrategyFamily::FullCategoricalKelly => BettingStrategy::FullCategoricalKelly(config),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredictorKind {
    Prophet { include_reasoning: bool },
    OlasEmbedding { embedding_model: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub model_name: String,
    pub research: ModelSettings,
    pub prediction: ModelSettings,
}

impl ModelConfig {
    fn prophet() -> Self {
        ModelConfig {
            model_name: DEFAULT_OPENAI_MODEL.to_string(),
            research: ModelSettings::with_temperature(0.7),
            prediction: ModelSettings::with_temperature(0.0),
        }
    }

    fn provider_defaults() -> Self {
        ModelConfig {
            model_name: DEFAULT_OPENAI_MODEL.to_string(),
            research: ModelSettings::default(),
            prediction: ModelSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    /// Name the agent reports in logs
    pub class_name: &'static str,
    pub market_filter: MarketFilter,
    pub answer_mode: AnswerMode,
    pub strategy: StrategyProfile,
    pub predictor: PredictorKind,
    pub model: ModelConfig,
    pub bet_on_n_markets_per_run: usize,
}

impl AgentProfile {
    /// Kelly sizing on the Kelly venue, the default strategy anywhere else.
    /// `trading_balance` is only queried on the Kelly branch.
    pub async fn select_strategy<F, Fut>(
        &self,
        market: &Market,
        trading_balance: F,
    ) -> Result<BettingStrategy>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Usd>>,
    {
        if market.venue == KELLY_MARKET_TYPE {
            Ok(self.strategy.kelly_strategy(trading_balance().await?))
        } else {
            Ok(BettingStrategy::default())
        }
    }

    /// Internal consistency of a profile; checked when the registry resolves it.
    pub fn validate(&self) -> Result<(), String> {
        let s = &self.strategy;
        if s.min_bet.value() <= 0.0 || s.min_bet > s.max_bet {
            return Err(format!("invalid stake bounds {}..{}", s.min_bet, s.max_bet));
        }
        if !(0.0..=1.0).contains(&s.max_price_impact) {
            return Err(format!("max_price_impact {} outside [0, 1]", s.max_price_impact));
        }
        if self.bet_on_n_markets_per_run == 0 {
            return Err("bet_on_n_markets_per_run must be positive".to_string());
        }
        if self.model.model_name.trim().is_empty() {
            return Err("model name is empty".to_string());
        }
        match (self.answer_mode, s.family, self.market_filter) {
            (AnswerMode::Binary, StrategyFamily::FullBinaryKelly, MarketFilter::BinaryOnly) => Ok(()),
            (AnswerMode::Binary, _, _) => {
                Err("binary agents must trade binary markets with binary Kelly".to_string())
            }
            (AnswerMode::Categorical, StrategyFamily::FullCategoricalKelly, _) => Ok(()),
            (AnswerMode::Categorical, _, _) => {
                Err("categorical agents need categorical Kelly".to_string())
            }
        }
    }
}

pub fn prophet_binary() -> AgentProfile {
    AgentProfile {
        class_name: "DeployableProphetBinary",
        market_filter: MarketFilter::BinaryOnly,
        answer_mode: AnswerMode::Binary,
        strategy: StrategyProfile {
            family: StrategyFamily::FullBinaryKelly,
            min_bet: Usd(1.0),
            max_bet: Usd(5.0),
            max_price_impact: 0.7,
            allow_multiple_bets: false,
            allow_shorting: false,
            multicategorical: false,
        },
        predictor: PredictorKind::Prophet {
            include_reasoning: true,
        },
        model: ModelConfig::prophet(),
        bet_on_n_markets_per_run: 2,
    }
}

pub fn prophet_categorical() -> AgentProfile {
    AgentProfile {
        class_name: "DeployableProphetCategorical",
        market_filter: MarketFilter::CategoricalOnly,
        answer_mode: AnswerMode::Categorical,
        strategy: StrategyProfile {
            family: StrategyFamily::FullCategoricalKelly,
            min_bet: Usd(0.01),
            max_bet: Usd(0.75),
            max_price_impact: 0.068,
            allow_multiple_bets: false,
            allow_shorting: false,
            multicategorical: false,
        },
        predictor: PredictorKind::Prophet {
            include_reasoning: true,
        },
        model: ModelConfig::prophet(),
        bet_on_n_markets_per_run: 2,
    }
}

pub fn olas_embedding_oa() -> AgentProfile {
    AgentProfile {
        class_name: "DeployableOlasEmbeddingOAAgent",
        market_filter: MarketFilter::Unfiltered,
        answer_mode: AnswerMode::Categorical,
        strategy: StrategyProfile {
            family: StrategyFamily::FullCategoricalKelly,
            min_bet: Usd(0.1),
            max_bet: Usd(6.0),
            max_price_impact: 0.7333271417580082,
            allow_multiple_bets: false,
            allow_shorting: false,
            multicategorical: false,
        },
        predictor: PredictorKind::OlasEmbedding {
            embedding_model: OPENAI_EMBEDDING_MODEL,
        },
        model: ModelConfig::provider_defaults(),
        bet_on_n_markets_per_run: 2,
    }
}
