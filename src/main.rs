use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod agents;
mod betting;
mod bootstrap;
mod config;
mod keys;
mod markets;
mod prediction;

use agents::{AgentProfile, AgentRegistry, RunSummary, Services, TraderAgent};
use config::Config;
use markets::MarketType;

fn main() -> Result<()> {
    let config = Config::parse();
    let process = bootstrap::init()?;

    // Refuse bad settings and locked-out market types before any agent is built
    let profile = prepare(&config)?;
    if config.dry_run {
        info!(
            "🟡 DRY RUN mode – no real trades will be placed (simulated balance: ${:.2})",
            config.initial_balance
        );
    } else {
        info!("🔴 LIVE mode – real trades WILL be placed on {}", config.market_type);
    }

    // Wire the production venue and predictor factory
    let services = Services::production(
        config.keys.clone(),
        config.polymarket_settings(),
        config.market_fetch_limit,
    );
    process.block_on(execute(profile, services, config.market_type))?;
    Ok(())
}

/// Settings checks, the deployment lock, then agent resolution.
fn prepare(config: &Config) -> Result<Arc<AgentProfile>> {
    config.validate()?;
    config.check_deployment()?;
    let registry = AgentRegistry::new(config.resolution_policy)?;
    Ok(registry.resolve(config.agent)?)
}

async fn execute(
    profile: Arc<AgentProfile>,
    services: Services,
    market_type: MarketType,
) -> Result<RunSummary> {
    info!("Running {} on {}", profile.class_name, market_type);
    TraderAgent::new(profile, services).run(market_type).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::trader::tests::{fake_services, yes_prediction, FakeVenue};
    use crate::config::DeploymentError;
    use crate::markets::market::tests::make_market;
    use crate::markets::MarketKind;
    use std::sync::atomic::Ordering;

    fn config(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("run-agent").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_prepare_resolves_the_requested_agent() {
        let profile = prepare(&config(&["prophet_binary", "polymarket"])).unwrap();
        assert_eq!(profile.class_name, "DeployableProphetBinary");

        let profile = prepare(&config(&[
            "olas_embedding_oa",
            "polymarket",
            "--resolution-policy",
            "eager",
        ]))
        .unwrap();
        assert_eq!(profile.class_name, "DeployableOlasEmbeddingOAAgent");
    }

    #[test]
    fn test_prepare_enforces_the_deployment_lock() {
        let err = prepare(&config(&["prophet_categorical", "omen"])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeploymentError>(),
            Some(DeploymentError::MarketTypeNotAllowed {
                requested: MarketType::Omen,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_execute_runs_the_resolved_agent_once() {
        let venue = FakeVenue::new(vec![
            make_market("b1", MarketKind::Binary, &["Yes", "No"], &[0.3, 0.7]),
            make_market("c1", MarketKind::Categorical, &["A", "B", "C"], &[0.2, 0.3, 0.5]),
        ]);
        let (services, connector, factory) = fake_services(venue.clone(), yes_prediction(0.7));
        let profile = prepare(&config(&["prophet_binary", "polymarket"])).unwrap();

        let summary = execute(profile, services, MarketType::Polymarket).await.unwrap();

        assert_eq!(summary.markets_considered, 1);
        assert_eq!(summary.order_ids.len(), 1);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
        assert_eq!(venue.fetches.load(Ordering::SeqCst), 1);
    }
}
