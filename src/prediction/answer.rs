use std::fmt;

use serde::Deserialize;

/// Probability that a binary market resolves YES.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilisticAnswer {
    pub p_yes: f64,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

impl ProbabilisticAnswer {
    pub fn p_no(&self) -> f64 {
        1.0 - self.p_yes
    }
}

/// Probability per outcome of a categorical market, in market outcome order.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalProbabilisticAnswer {
    pub probabilities: Vec<(String, f64)>,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

impl CategoricalProbabilisticAnswer {
    pub fn probability_of(&self, outcome: &str) -> Option<f64> {
        self.probabilities
            .iter()
            .find(|(o, _)| o.eq_ignore_ascii_case(outcome))
            .map(|(_, p)| *p)
    }
}

impl fmt::Display for CategoricalProbabilisticAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let probs: Vec<String> = self
            .probabilities
            .iter()
            .map(|(o, p)| format!("{}={:.3}", o, p))
            .collect();
        write!(f, "{} (confidence={:.2})", probs.join(", "), self.confidence)
    }
}

/// Binary forecast as emitted by a predictor, before conversion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BinaryOutcomePrediction {
    pub p_yes: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
}

fn default_confidence() -> f64 {
    0.5
}

impl BinaryOutcomePrediction {
    pub fn to_probabilistic_answer(&self) -> ProbabilisticAnswer {
        ProbabilisticAnswer {
            p_yes: self.p_yes,
            confidence: self.confidence,
            reasoning: self.reasoning.clone(),
        }
    }
}

impl fmt::Display for BinaryOutcomePrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p_yes={:.3}, confidence={:.2}", self.p_yes, self.confidence)
    }
}

/// Result of a predictor call. `outcome_prediction` is `None` when the
/// predictor could not reach a forecast; callers abstain from betting.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction<T> {
    pub outcome_prediction: Option<T>,
}

/// What an agent hands to its betting strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Binary(ProbabilisticAnswer),
    Categorical(CategoricalProbabilisticAnswer),
}

impl Answer {
    /// Probability per market outcome, aligned with `outcomes`.
    ///
    /// A binary answer maps p_yes onto the outcome at `yes_index` and splits
    /// the remainder across the others. Returns `None` when a categorical
    /// answer lacks one of the outcomes.
    pub fn outcome_probabilities(&self, outcomes: &[String], yes_index: usize) -> Option<Vec<f64>> {
        match self {
            Answer::Binary(a) => {
                if outcomes.len() < 2 {
                    return None;
                }
                let rest = a.p_no() / (outcomes.len() - 1) as f64;
                Some(
                    (0..outcomes.len())
                        .map(|i| if i == yes_index { a.p_yes } else { rest })
                        .collect(),
                )
            }
            Answer::Categorical(a) => outcomes.iter().map(|o| a.probability_of(o)).collect(),
        }
    }
}
