//! Registration table mapping runnable agent keys to their profiles.
//!
//! Two resolution policies share one table: [`ResolutionPolicy::Eager`]
//! builds and validates every profile when the registry is created,
//! [`ResolutionPolicy::Lazy`] builds a profile on first access and memoizes
//! it, so every later lookup returns the same `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use clap::ValueEnum;
use thiserror::Error;

use super::profile::{olas_embedding_oa, prophet_binary, prophet_categorical, AgentProfile};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown agent '{0}'")]
    UnknownAgent(String),
    #[error("Agent '{name}' does not resolve to a valid agent: {reason}")]
    InvalidDefinition { name: &'static str, reason: String },
}

/// The closed set of agents this binary can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum RunnableAgent {
    #[value(name = "prophet_binary")]
    ProphetBinary,
    #[value(name = "prophet_categorical")]
    ProphetCategorical,
    #[value(name = "olas_embedding_oa")]
    OlasEmbeddingOa,
}

impl RunnableAgent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnableAgent::ProphetBinary => "prophet_binary",
            RunnableAgent::ProphetCategorical => "prophet_categorical",
            RunnableAgent::OlasEmbeddingOa => "olas_embedding_oa",
        }
    }
}

impl fmt::Display for RunnableAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One registered agent: its key and the constructor of its profile.
pub struct AgentDefinition {
    pub name: &'static str,
    pub key: RunnableAgent,
    pub build: fn() -> AgentProfile,
}

impl AgentDefinition {
    fn resolve(&self) -> Result<Arc<AgentProfile>, RegistryError> {
        let profile = (self.build)();
        profile
            .validate()
            .map_err(|reason| RegistryError::InvalidDefinition {
                name: self.name,
                reason,
            })?;
        Ok(Arc::new(profile))
    }
}

pub static AGENT_DEFINITIONS: &[AgentDefinition] = &[
    AgentDefinition {
        name: "prophet_binary",
        key: RunnableAgent::ProphetBinary,
        build: prophet_binary,
    },
    AgentDefinition {
        name: "prophet_categorical",
        key: RunnableAgent::ProphetCategorical,
        build: prophet_categorical,
    },
    AgentDefinition {
        name: "olas_embedding_oa",
        key: RunnableAgent::OlasEmbeddingOa,
        build: olas_embedding_oa,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ResolutionPolicy {
    Eager,
    #[default]
    Lazy,
}

enum Entry {
    Resolved(Arc<AgentProfile>),
    Deferred {
        definition: &'static AgentDefinition,
        cell: OnceLock<Result<Arc<AgentProfile>, RegistryError>>,
    },
}

pub struct AgentRegistry {
    entries: HashMap<RunnableAgent, Entry>,
}

impl AgentRegistry {
    pub fn new(policy: ResolutionPolicy) -> Result<Self, RegistryError> {
        Self::from_definitions(AGENT_DEFINITIONS, policy)
    }

    pub fn from_definitions(
        definitions: &'static [AgentDefinition],
        policy: ResolutionPolicy,
    ) -> Result<Self, RegistryError> {
        let mut entries = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            let entry = match policy {
                ResolutionPolicy::Eager => Entry::Resolved(definition.resolve()?),
                ResolutionPolicy::Lazy => Entry::Deferred {
                    definition,
                    cell: OnceLock::new(),
                },
            };
            entries.insert(definition.key, entry);
        }
        Ok(AgentRegistry { entries })
    }

    pub fn resolve(&self, key: RunnableAgent) -> Result<Arc<AgentProfile>, RegistryError> {
        match self.entries.get(&key) {
            Some(Entry::Resolved(profile)) => Ok(profile.clone()),
            Some(Entry::Deferred { definition, cell }) => {
                cell.get_or_init(|| definition.resolve()).clone()
            }
            None => Err(RegistryError::UnknownAgent(key.to_string())),
        }
    }

}
