pub mod answer;
pub mod llm;
pub mod olas;
pub mod prompts;
pub mod prophet;

use anyhow::Result;
use async_trait::async_trait;

pub use answer::{
    Answer, BinaryOutcomePrediction, CategoricalProbabilisticAnswer, Prediction,
    ProbabilisticAnswer,
};
pub use llm::{ChatModel, ModelSettings, DEFAULT_OPENAI_MODEL};
pub use olas::OlasPredictor;
pub use prophet::ProphetPredictor;

/// LLM-backed research + forecasting.
///
/// Transport and provider failures are errors; a forecast the model could
/// not produce is `Ok` with an absent `outcome_prediction`.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, question: &str) -> Result<Prediction<BinaryOutcomePrediction>>;

    async fn predict_categorical(
        &self,
        question: &str,
        outcomes: &[String],
    ) -> Result<Prediction<CategoricalProbabilisticAnswer>>;
}
