use std::fmt;
use std::ops::Mul;
use std::str::FromStr;

use thiserror::Error;

/// Raised when a market-type string matches neither a canonical value nor a key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unsupported market type '{0}'.")]
pub struct MarketTypeError(pub String);

/// The external trading venue an agent operates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketType {
    Omen,
    Manifold,
    Polymarket,
    Metaculus,
    Seer,
}

impl MarketType {
    pub const ALL: [MarketType; 5] = [
        MarketType::Omen,
        MarketType::Manifold,
        MarketType::Polymarket,
        MarketType::Metaculus,
        MarketType::Seer,
    ];

    /// Canonical lowercase value, e.g. `polymarket`.
    pub fn value(&self) -> &'static str {
        match self {
            MarketType::Omen => "omen",
            MarketType::Manifold => "manifold",
            MarketType::Polymarket => "polymarket",
            MarketType::Metaculus => "metaculus",
            MarketType::Seer => "seer",
        }
    }

    /// Upper-case key, e.g. `POLYMARKET`.
    pub fn key(&self) -> &'static str {
        match self {
            MarketType::Omen => "OMEN",
            MarketType::Manifold => "MANIFOLD",
            MarketType::Polymarket => "POLYMARKET",
            MarketType::Metaculus => "METACULUS",
            MarketType::Seer => "SEER",
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for MarketType {
    type Err = MarketTypeError;

    /// Accepts the canonical value first, then falls back to an upper-cased key lookup.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim();
        if let Some(mt) = Self::ALL.iter().find(|mt| mt.value() == value) {
            return Ok(*mt);
        }
        let key = value.to_uppercase();
        Self::ALL
            .iter()
            .find(|mt| mt.key() == key)
            .copied()
            .ok_or_else(|| MarketTypeError(raw.to_string()))
    }
}

/// clap value parser for market-type arguments.
pub fn parse_market_type(raw: &str) -> Result<MarketType, MarketTypeError> {
    raw.parse()
}

/// A USD amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Usd(pub f64);

impl Usd {
    pub fn value(self) -> f64 {
        self.0
    }

    pub fn min(self, other: Usd) -> Usd {
        Usd(self.0.min(other.0))
    }

    pub fn max(self, other: Usd) -> Usd {
        Usd(self.0.max(other.0))
    }
}

impl Mul<f64> for Usd {
    type Output = Usd;

    fn mul(self, rhs: f64) -> Usd {
        Usd(self.0 * rhs)
    }
}

impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

/// Classification decided by the venue adapter when the market is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarketKind {
    Binary,
    Categorical,
    Scalar { lower_bound: f64, upper_bound: f64 },
}

/// An open prediction market as seen by an agent. Agents never mutate it;
/// bets go through the venue.
#[derive(Debug, Clone)]
pub struct Market {
    pub id: String,
    pub venue: MarketType,
    pub question: String,
    pub outcomes: Vec<String>,
    /// Current price per outcome, aligned with `outcomes` (0.0–1.0)
    pub outcome_prices: Vec<f64>,
    /// Venue token id per outcome, aligned with `outcomes`
    pub outcome_token_ids: Vec<String>,
    pub kind: MarketKind,
    pub condition_id: Option<String>,
}

impl Market {
    pub fn is_binary(&self) -> bool {
        matches!(self.kind, MarketKind::Binary)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, MarketKind::Scalar { .. })
    }

    /// Index of the "Yes" outcome; the first outcome when no outcome is literally "Yes".
    pub fn yes_index(&self) -> usize {
        self.outcomes
            .iter()
            .position(|o| o.eq_ignore_ascii_case("yes"))
            .unwrap_or(0)
    }
}
