use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::keys::ApiKeys;
use crate::prediction::llm::{get_openai_provider, OpenAiChatModel, OpenAiEmbeddingModel};
use crate::prediction::{ChatModel, OlasPredictor, Predictor, ProphetPredictor};

use super::profile::{AgentProfile, PredictorKind};

/// Constructs the LLM clients an agent needs during `load`.
pub trait PredictorFactory: Send + Sync {
    fn build(&self, profile: &AgentProfile, keys: &ApiKeys) -> Result<Box<dyn Predictor>>;
}

/// Builds predictors against an OpenAI-compatible API.
pub struct OpenAiPredictorFactory;

impl PredictorFactory for OpenAiPredictorFactory {
    fn build(&self, profile: &AgentProfile, keys: &ApiKeys) -> Result<Box<dyn Predictor>> {
        let provider = get_openai_provider(keys.openai_api_key()?, keys.openai_base_url())?;
        let model = &profile.model;

        let research_agent: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::new(
            &model.model_name,
            provider.clone(),
            model.research,
        ));
        let prediction_agent: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::new(
            &model.model_name,
            provider.clone(),
            model.prediction,
        ));

        info!(
            "Loaded {} with model {} ({:?})",
            profile.class_name, model.model_name, profile.predictor
        );

        Ok(match profile.predictor {
            PredictorKind::Prophet { include_reasoning } => Box::new(ProphetPredictor::new(
                research_agent,
                prediction_agent,
                include_reasoning,
            )),
            PredictorKind::OlasEmbedding { embedding_model } => Box::new(OlasPredictor::new(
                research_agent,
                prediction_agent,
                Arc::new(OpenAiEmbeddingModel::new(embedding_model, provider)),
            )),
        })
    }
}
