use std::fmt;

use clap::Args;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("{0} is not set")]
    Missing(&'static str),
}

/// Secrets and endpoints, from flags or the environment.
///
/// Nothing is validated up front: each accessor fails with [`KeyError`] when
/// the value it needs is absent, so agents that never trade live never need
/// trading credentials.
#[derive(Args, Clone, Default)]
pub struct ApiKeys {
    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL")]
    openai_base_url: Option<String>,

    /// Polymarket API key (required for live trading)
    #[arg(long, env = "POLYMARKET_API_KEY", hide_env_values = true)]
    polymarket_api_key: Option<String>,

    /// Wallet whose USDC balance and positions are read in live mode
    #[arg(long, env = "POLYMARKET_WALLET_ADDRESS")]
    polymarket_wallet_address: Option<String>,
}

/// Blank values count as unset.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl ApiKeys {
    pub fn openai_api_key(&self) -> Result<&str, KeyError> {
        present(&self.openai_api_key).ok_or(KeyError::Missing("OPENAI_API_KEY"))
    }

    /// Optional override for OpenAI-compatible providers.
    pub fn openai_base_url(&self) -> Option<&str> {
        present(&self.openai_base_url)
    }

    pub fn polymarket_api_key(&self) -> Result<&str, KeyError> {
        present(&self.polymarket_api_key).ok_or(KeyError::Missing("POLYMARKET_API_KEY"))
    }

    pub fn polymarket_wallet_address(&self) -> Result<&str, KeyError> {
        present(&self.polymarket_wallet_address)
            .ok_or(KeyError::Missing("POLYMARKET_WALLET_ADDRESS"))
    }

    #[cfg(test)]
    pub(crate) fn with_openai_key(key: &str) -> Self {
        ApiKeys {
            openai_api_key: Some(key.to_string()),
            ..ApiKeys::default()
        }
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| if v.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("ApiKeys")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_base_url", &self.openai_base_url)
            .field("polymarket_api_key", &redact(&self.polymarket_api_key))
            .field("polymarket_wallet_address", &self.polymarket_wallet_address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct KeysOnly {
        #[command(flatten)]
        keys: ApiKeys,
    }

    fn keys(args: &[&str]) -> ApiKeys {
        KeysOnly::try_parse_from(std::iter::once("run-agent").chain(args.iter().copied()))
            .unwrap()
            .keys
    }

    #[test]
    fn test_missing_openai_key_is_an_error() {
        let k = ApiKeys::default();
        assert_eq!(k.openai_api_key(), Err(KeyError::Missing("OPENAI_API_KEY")));
        assert_eq!(
            k.polymarket_wallet_address(),
            Err(KeyError::Missing("POLYMARKET_WALLET_ADDRESS"))
        );
    }

    #[test]
    fn test_reads_keys_from_flags() {
        let k = keys(&[
            "--openai-api-key",
            "sk-test",
            "--polymarket-wallet-address",
            "0xabc",
        ]);
        assert_eq!(k.openai_api_key(), Ok("sk-test"));
        assert_eq!(k.polymarket_wallet_address(), Ok("0xabc"));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let k = keys(&["--openai-api-key", "  ", "--polymarket-api-key", "pk"]);
        assert!(k.openai_api_key().is_err());
        assert_eq!(k.polymarket_api_key(), Ok("pk"));
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let k = ApiKeys::with_openai_key("sk-secret");
        let dbg = format!("{:?}", k);
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<set>"));
    }
}
