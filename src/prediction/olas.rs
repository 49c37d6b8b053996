use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use super::answer::{BinaryOutcomePrediction, CategoricalProbabilisticAnswer, Prediction};
use super::llm::{cosine_similarity, ChatModel, EmbeddingModel};
use super::prompts::{
    binary_prediction_prompt, categorical_prediction_prompt, parse_binary_prediction,
    parse_categorical_prediction, PREDICTION_SYSTEM_PROMPT,
};
use super::Predictor;

const SNIPPET_SYSTEM_PROMPT: &str = "You collect evidence for forecasters. \
List distinct, self-contained facts relevant to the question, one per line, without numbering.";
const MAX_SNIPPETS: usize = 12;
const TOP_K: usize = 5;

/// Research snippets are ranked by embedding similarity to the question and
/// only the closest ones reach the prediction model.
pub struct OlasPredictor {
    research_agent: Arc<dyn ChatModel>,
    prediction_agent: Arc<dyn ChatModel>,
    embedding_model: Arc<dyn EmbeddingModel>,
}

impl OlasPredictor {
    pub fn new(
        research_agent: Arc<dyn ChatModel>,
        prediction_agent: Arc<dyn ChatModel>,
        embedding_model: Arc<dyn EmbeddingModel>,
    ) -> Self {
        OlasPredictor {
            research_agent,
            prediction_agent,
            embedding_model,
        }
    }

    async fn research(&self, question: &str) -> Result<String> {
        let raw = self
            .research_agent
            .complete(SNIPPET_SYSTEM_PROMPT, question)
            .await?;
        let snippets: Vec<String> = raw
            .lines()
            .map(|l| l.trim().trim_start_matches(['-', '*', '•']).trim())
            .filter(|l| !l.is_empty())
            .take(MAX_SNIPPETS)
            .map(str::to_string)
            .collect();
        if snippets.len() <= TOP_K {
            return Ok(snippets.join("\n"));
        }

        let mut inputs = Vec::with_capacity(snippets.len() + 1);
        inputs.push(question.to_string());
        inputs.extend(snippets.iter().cloned());
        let embeddings = self.embedding_model.embed(&inputs).await?;
        let (query, rest) = embeddings
            .split_first()
            .ok_or_else(|| anyhow::anyhow!("Embedding model returned nothing"))?;

        let mut ranked: Vec<(f32, &String)> = rest
            .iter()
            .zip(&snippets)
            .map(|(e, s)| (cosine_similarity(query, e), s))
            .collect();
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        debug!(
            "Kept {} of {} snippets for '{}'",
            TOP_K,
            ranked.len(),
            question
        );

        Ok(ranked
            .into_iter()
            .take(TOP_K)
            .map(|(_, s)| s.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[async_trait]
impl Predictor for OlasPredictor {
    async fn predict(&self, question: &str) -> Result<Prediction<BinaryOutcomePrediction>> {
        let research = self.research(question).await?;
        let reply = self
            .prediction_agent
            .complete(
                PREDICTION_SYSTEM_PROMPT,
                &binary_prediction_prompt(question, &research),
            )
            .await?;
        Ok(Prediction {
            outcome_prediction: parse_binary_prediction(&reply, false),
        })
    }

    async fn predict_categorical(
        &self,
        question: &str,
        outcomes: &[String],
    ) -> Result<Prediction<CategoricalProbabilisticAnswer>> {
        let research = self.research(question).await?;
        let reply = self
            .prediction_agent
            .complete(
                PREDICTION_SYSTEM_PROMPT,
                &categorical_prediction_prompt(question, outcomes, &research),
            )
            .await?;
        Ok(Prediction {
            outcome_prediction: parse_categorical_prediction(&reply, outcomes, false),
        })
    }
}
