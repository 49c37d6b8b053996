pub mod kelly;
pub mod strategy;

pub use strategy::{get_maximum_possible_bet_amount, BettingStrategy, BettingStrategyConfig};
