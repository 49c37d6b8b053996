use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::answer::{BinaryOutcomePrediction, CategoricalProbabilisticAnswer, Prediction};
use super::llm::ChatModel;
use super::prompts::{
    binary_prediction_prompt, categorical_prediction_prompt, parse_binary_prediction,
    parse_categorical_prediction, research_prompt, PREDICTION_SYSTEM_PROMPT,
    RESEARCH_SYSTEM_PROMPT,
};
use super::Predictor;

/// Two-stage predictor: a research model writes a report, a prediction
/// model turns it into probabilities.
pub struct ProphetPredictor {
    research_agent: Arc<dyn ChatModel>,
    prediction_agent: Arc<dyn ChatModel>,
    include_reasoning: bool,
}

impl ProphetPredictor {
    pub fn new(
        research_agent: Arc<dyn ChatModel>,
        prediction_agent: Arc<dyn ChatModel>,
        include_reasoning: bool,
    ) -> Self {
        ProphetPredictor {
            research_agent,
            prediction_agent,
            include_reasoning,
        }
    }

    async fn research(&self, question: &str) -> Result<String> {
        let report = self
            .research_agent
            .complete(RESEARCH_SYSTEM_PROMPT, &research_prompt(question))
            .await?;
        debug!(
            "Research by {} for '{}': {} chars",
            self.research_agent.model_name(),
            question,
            report.len()
        );
        Ok(report)
    }
}

#[async_trait]
impl Predictor for ProphetPredictor {
    async fn predict(&self, question: &str) -> Result<Prediction<BinaryOutcomePrediction>> {
        let report = self.research(question).await?;
        let reply = self
            .prediction_agent
            .complete(
                PREDICTION_SYSTEM_PROMPT,
                &binary_prediction_prompt(question, &report),
            )
            .await?;
        Ok(Prediction {
            outcome_prediction: parse_binary_prediction(&reply, self.include_reasoning),
        })
    }

    async fn predict_categorical(
        &self,
        question: &str,
        outcomes: &[String],
    ) -> Result<Prediction<CategoricalProbabilisticAnswer>> {
        let report = self.research(question).await?;
        let reply = self
            .prediction_agent
            .complete(
                PREDICTION_SYSTEM_PROMPT,
                &categorical_prediction_prompt(question, outcomes, &report),
            )
            .await?;
        Ok(Prediction {
            outcome_prediction: parse_categorical_prediction(
                &reply,
                outcomes,
                self.include_reasoning,
            ),
        })
    }
}
