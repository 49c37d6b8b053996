use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::betting::BettingStrategy;
use crate::keys::ApiKeys;
use crate::markets::{
    DefaultVenueConnector, Market, MarketKind, MarketType, MarketVenue, PolymarketSettings,
    VenueConnector,
};
use crate::prediction::{Answer, CategoricalProbabilisticAnswer, Predictor, ProbabilisticAnswer};

use super::loader::{OpenAiPredictorFactory, PredictorFactory};
use super::profile::{AgentProfile, AnswerMode};

/// External collaborators an agent is wired to.
#[derive(Clone)]
pub struct Services {
    pub keys: ApiKeys,
    pub venues: Arc<dyn VenueConnector>,
    pub predictors: Arc<dyn PredictorFactory>,
    /// How many open markets to request from the venue per run
    pub market_fetch_limit: usize,
}

impl Services {
    pub fn production(
        keys: ApiKeys,
        polymarket: PolymarketSettings,
        market_fetch_limit: usize,
    ) -> Self {
        Services {
            keys,
            venues: Arc::new(DefaultVenueConnector::new(polymarket)),
            predictors: Arc::new(OpenAiPredictorFactory),
            market_fetch_limit,
        }
    }
}

/// Outcome of one `run`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub markets_considered: usize,
    pub markets_answered: usize,
    /// Markets where the predictor produced no forecast
    pub abstained: usize,
    /// Markets skipped because of shape, missing prices or an existing position
    pub skipped: usize,
    pub order_ids: Vec<String>,
}

/// A deployable trading agent: one profile, one predictor, one venue per run.
pub struct TraderAgent {
    profile: Arc<AgentProfile>,
    services: Services,
    predictor: Option<Box<dyn Predictor>>,
}

impl TraderAgent {
    pub fn new(profile: Arc<AgentProfile>, services: Services) -> Self {
        TraderAgent {
            profile,
            services,
            predictor: None,
        }
    }

    /// Construct the predictor from the agent's keys. Later calls are no-ops.
    pub fn load(&mut self) -> Result<()> {
        if self.predictor.is_some() {
            return Ok(());
        }
        let predictor = self
            .services
            .predictors
            .build(&self.profile, &self.services.keys)
            .with_context(|| format!("Failed to load {}", self.profile.class_name))?;
        self.predictor = Some(predictor);
        Ok(())
    }

    fn predictor(&self) -> Result<&dyn Predictor> {
        self.predictor
            .as_deref()
            .with_context(|| format!("{} used before load()", self.profile.class_name))
    }

    /// Open markets from the venue, narrowed to the shapes this agent trades.
    pub async fn get_markets(&self, venue: &dyn MarketVenue) -> Result<Vec<Market>> {
        let markets = venue
            .fetch_open_markets(self.services.market_fetch_limit)
            .await?;
        Ok(self.profile.market_filter.apply(markets))
    }

    pub async fn answer_binary_market(&self, market: &Market) -> Result<Option<ProbabilisticAnswer>> {
        let prediction = self.predictor()?.predict(&market.question).await?;
        info!(
            "Answering '{}' with '{}'.",
            market.question,
            display_or_none(prediction.outcome_prediction.as_ref())
        );
        Ok(prediction
            .outcome_prediction
            .map(|p| p.to_probabilistic_answer()))
    }

    pub async fn answer_categorical_market(
        &self,
        market: &Market,
    ) -> Result<Option<CategoricalProbabilisticAnswer>> {
        let prediction = self
            .predictor()?
            .predict_categorical(&market.question, &market.outcomes)
            .await?;
        info!(
            "Answering '{}' with '{}'.",
            market.question,
            display_or_none(prediction.outcome_prediction.as_ref())
        );
        Ok(prediction.outcome_prediction)
    }

    pub async fn get_betting_strategy(
        &self,
        venue: &dyn MarketVenue,
        market: &Market,
    ) -> Result<BettingStrategy> {
        let keys = &self.services.keys;
        self.profile
            .select_strategy(market, || venue.trade_balance(keys))
            .await
    }

    /// Load, connect to the venue for `market_type` and trade this run's markets.
    pub async fn run(&mut self, market_type: MarketType) -> Result<RunSummary> {
        self.load()?;
        let venue = self
            .services
            .venues
            .connect(market_type, &self.services.keys)
            .await?;
        self.run_on(venue.as_ref()).await
    }

    async fn run_on(&self, venue: &dyn MarketVenue) -> Result<RunSummary> {
        let markets = self.get_markets(venue).await?;
        info!(
            "{} found {} eligible {} markets",
            self.profile.class_name,
            markets.len(),
            venue.market_type()
        );

        let mut summary = RunSummary::default();
        for market in markets.iter().take(self.profile.bet_on_n_markets_per_run) {
            summary.markets_considered += 1;
            self.process_market(venue, market, &mut summary).await?;
        }

        info!(
            "{} run finished: {} answered, {} abstained, {} skipped, {} orders",
            self.profile.class_name,
            summary.markets_answered,
            summary.abstained,
            summary.skipped,
            summary.order_ids.len()
        );
        Ok(summary)
    }

    async fn process_market(
        &self,
        venue: &dyn MarketVenue,
        market: &Market,
        summary: &mut RunSummary,
    ) -> Result<()> {
        if market.outcome_prices.len() != market.outcomes.len() {
            warn!(
                "Market {} has {} prices for {} outcomes, skipping",
                market.id,
                market.outcome_prices.len(),
                market.outcomes.len()
            );
            summary.skipped += 1;
            return Ok(());
        }

        // Ask the predictor through the entry point matching the market shape
        let answer = match (self.profile.answer_mode, market.kind) {
            (_, MarketKind::Scalar { .. }) | (AnswerMode::Binary, MarketKind::Categorical) => {
                warn!(
                    "{} cannot answer market {} ({:?}), skipping",
                    self.profile.class_name, market.id, market.kind
                );
                summary.skipped += 1;
                return Ok(());
            }
            (AnswerMode::Binary, MarketKind::Binary) => {
                self.answer_binary_market(market).await?.map(Answer::Binary)
            }
            (AnswerMode::Categorical, _) => self
                .answer_categorical_market(market)
                .await?
                .map(Answer::Categorical),
        };

        let answer = match answer {
            Some(a) => a,
            None => {
                summary.abstained += 1;
                return Ok(());
            }
        };
        summary.markets_answered += 1;

        // Size the bet, then refuse to stack onto an existing position
        let strategy = self.get_betting_strategy(venue, market).await?;
        if !strategy.allows_multiple_bets()
            && venue
                .has_open_position(market, &self.services.keys)
                .await?
        {
            info!("Already holding a position in market {}, skipping", market.id);
            summary.skipped += 1;
            return Ok(());
        }

        // Compute and place orders
        let trades = strategy.calculate_trades(market, &answer)?;
        if trades.is_empty() {
            info!("{} found no edge on market {}", strategy.name(), market.id);
        }
        for trade in &trades {
            let order_id = venue.place_trade(market, trade).await?;
            summary.order_ids.push(order_id);
        }
        Ok(())
    }
}

fn display_or_none<T: std::fmt::Display>(value: Option<&T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::agents::profile::{olas_embedding_oa, prophet_binary, prophet_categorical};
    use crate::markets::market::tests::make_market;
    use crate::markets::{OrderSide, Trade, Usd};
    use crate::prediction::{BinaryOutcomePrediction, Prediction};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub(crate) struct FakeVenue {
        pub markets: Vec<Market>,
        pub balance: Usd,
        pub holding: bool,
        pub fetches: AtomicUsize,
        pub balance_queries: AtomicUsize,
        pub placed: Mutex<Vec<(String, Trade)>>,
    }

    impl FakeVenue {
        pub(crate) fn unshared(markets: Vec<Market>) -> Self {
            FakeVenue {
                markets,
                balance: Usd(100.0),
                holding: false,
                fetches: AtomicUsize::new(0),
                balance_queries: AtomicUsize::new(0),
                placed: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn new(markets: Vec<Market>) -> Arc<Self> {
            Arc::new(Self::unshared(markets))
        }
    }

    #[async_trait]
    impl MarketVenue for FakeVenue {
        fn market_type(&self) -> MarketType {
            MarketType::Polymarket
        }

        async fn fetch_open_markets(&self, limit: usize) -> Result<Vec<Market>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.markets.iter().take(limit).cloned().collect())
        }

        async fn trade_balance(&self, _keys: &ApiKeys) -> Result<Usd> {
            self.balance_queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.balance)
        }

        async fn has_open_position(&self, _market: &Market, _keys: &ApiKeys) -> Result<bool> {
            Ok(self.holding)
        }

        async fn place_trade(&self, market: &Market, trade: &Trade) -> Result<String> {
            let mut placed = self.placed.lock().unwrap();
            placed.push((market.id.clone(), trade.clone()));
            Ok(format!("order-{}", placed.len()))
        }
    }

    pub(crate) struct FakeConnector {
        pub venue: Arc<FakeVenue>,
        pub connects: AtomicUsize,
    }

    #[async_trait]
    impl VenueConnector for FakeConnector {
        async fn connect(
            &self,
            _market_type: MarketType,
            _keys: &ApiKeys,
        ) -> Result<Arc<dyn MarketVenue>> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(self.venue.clone())
        }
    }

    #[derive(Clone)]
    pub(crate) struct FakePredictor {
        pub binary: Option<BinaryOutcomePrediction>,
        pub categorical: Option<CategoricalProbabilisticAnswer>,
    }

    #[async_trait]
    impl Predictor for FakePredictor {
        async fn predict(&self, _question: &str) -> Result<Prediction<BinaryOutcomePrediction>> {
            Ok(Prediction {
                outcome_prediction: self.binary.clone(),
            })
        }

        async fn predict_categorical(
            &self,
            _question: &str,
            _outcomes: &[String],
        ) -> Result<Prediction<CategoricalProbabilisticAnswer>> {
            Ok(Prediction {
                outcome_prediction: self.categorical.clone(),
            })
        }
    }

    pub(crate) struct FakeFactory {
        pub predictor: FakePredictor,
        pub builds: AtomicUsize,
        pub fail: bool,
    }

    impl PredictorFactory for FakeFactory {
        fn build(&self, _profile: &AgentProfile, keys: &ApiKeys) -> Result<Box<dyn Predictor>> {
            self.builds.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                keys.openai_api_key()?;
            }
            Ok(Box::new(self.predictor.clone()))
        }
    }

    pub(crate) fn yes_prediction(p_yes: f64) -> FakePredictor {
        FakePredictor {
            binary: Some(BinaryOutcomePrediction {
                p_yes,
                confidence: 0.9,
                reasoning: None,
            }),
            categorical: None,
        }
    }

    pub(crate) fn fake_services(
        venue: Arc<FakeVenue>,
        predictor: FakePredictor,
    ) -> (Services, Arc<FakeConnector>, Arc<FakeFactory>) {
        let connector = Arc::new(FakeConnector {
            venue,
            connects: AtomicUsize::new(0),
        });
        let factory = Arc::new(FakeFactory {
            predictor,
            builds: AtomicUsize::new(0),
            fail: false,
        });
        let services = Services {
            keys: ApiKeys::default(),
            venues: connector.clone(),
            predictors: factory.clone(),
            market_fetch_limit: 50,
        };
        (services, connector, factory)
    }

    fn mixed_markets() -> Vec<Market> {
        vec![
            make_market("c1", MarketKind::Categorical, &["A", "B", "C"], &[0.2, 0.3, 0.5]),
            make_market("b1", MarketKind::Binary, &["Yes", "No"], &[0.5, 0.5]),
            make_market("b2", MarketKind::Binary, &["Yes", "No"], &[0.4, 0.6]),
            make_market("b3", MarketKind::Binary, &["Yes", "No"], &[0.4, 0.6]),
        ]
    }

    #[tokio::test]
    async fn test_binary_agent_bets_default_strategy_on_first_two_binary_markets() {
        let venue = FakeVenue::new(mixed_markets());
        let (services, connector, factory) = fake_services(venue.clone(), yes_prediction(0.8));
        let mut agent = TraderAgent::new(Arc::new(prophet_binary()), services);

        let summary = agent.run(MarketType::Polymarket).await.unwrap();

        assert_eq!(summary.markets_considered, 2);
        assert_eq!(summary.order_ids, vec!["order-1", "order-2"]);
        let placed = venue.placed.lock().unwrap();
        assert_eq!(placed[0].0, "b1");
        assert_eq!(placed[1].0, "b2");
        assert_eq!(placed[0].1.outcome, "Yes");
        assert_eq!(placed[0].1.amount, Usd(1.0));
        assert_eq!(venue.balance_queries.load(Ordering::SeqCst), 0);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_market_without_prices_is_skipped_and_run_continues() {
        let venue = FakeVenue::new(vec![
            make_market("b0", MarketKind::Binary, &["Yes", "No"], &[]),
            make_market("b1", MarketKind::Binary, &["Yes", "No"], &[0.5, 0.5]),
        ]);
        let (services, _, _) = fake_services(venue.clone(), yes_prediction(0.8));
        let mut agent = TraderAgent::new(Arc::new(prophet_binary()), services);

        let summary = agent.run(MarketType::Polymarket).await.unwrap();

        assert_eq!(summary.markets_considered, 2);
        assert_eq!(summary.skipped, 1);
        let placed = venue.placed.lock().unwrap();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].0, "b1");
    }

    #[tokio::test]
    async fn test_absent_categorical_prediction_abstains_without_error() {
        let venue = FakeVenue::new(mixed_markets());
        let predictor = FakePredictor {
            binary: None,
            categorical: None,
        };
        let (services, _, _) = fake_services(venue.clone(), predictor);
        let mut agent = TraderAgent::new(Arc::new(prophet_categorical()), services);
        agent.load().unwrap();

        let answer = agent
            .answer_categorical_market(&venue.markets[0])
            .await
            .unwrap();
        assert!(answer.is_none());

        let summary = agent.run(MarketType::Polymarket).await.unwrap();
        assert_eq!(summary.markets_considered, 1);
        assert_eq!(summary.abstained, 1);
        assert!(venue.placed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_kelly_venue_queries_balance_and_sizes_bets() {
        let mut markets = mixed_markets();
        for m in markets.iter_mut() {
            m.venue = MarketType::Omen;
        }
        let venue = FakeVenue::new(markets);
        let (services, _, _) = fake_services(venue.clone(), yes_prediction(0.6));
        let mut agent = TraderAgent::new(Arc::new(prophet_binary()), services);

        let summary = agent.run(MarketType::Omen).await.unwrap();

        assert_eq!(venue.balance_queries.load(Ordering::SeqCst), 2);
        assert_eq!(summary.order_ids.len(), 2);
        let placed = venue.placed.lock().unwrap();
        // b1: p=0.6 at 0.5 → f=0.2 of $5
        assert!((placed[0].1.amount.value() - 1.0).abs() < 1e-9);
        assert_eq!(placed[0].1.side, OrderSide::Buy);
        assert!((placed[0].1.limit_price - 0.85).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_existing_position_blocks_kelly_bets() {
        let mut markets = mixed_markets();
        for m in markets.iter_mut() {
            m.venue = MarketType::Omen;
        }
        let venue = Arc::new(FakeVenue {
            holding: true,
            ..FakeVenue::unshared(markets)
        });
        let (services, _, _) = fake_services(venue.clone(), yes_prediction(0.9));
        let mut agent = TraderAgent::new(Arc::new(prophet_binary()), services);

        let summary = agent.run(MarketType::Omen).await.unwrap();
        assert_eq!(summary.skipped, 2);
        assert!(summary.order_ids.is_empty());
    }

    #[tokio::test]
    async fn test_olas_agent_answers_unfiltered_markets_categorically() {
        let venue = FakeVenue::new(vec![
            make_market("c1", MarketKind::Categorical, &["A", "B", "C"], &[0.2, 0.3, 0.5]),
            make_market(
                "s1",
                MarketKind::Scalar {
                    lower_bound: 0.0,
                    upper_bound: 10.0,
                },
                &["Down", "Up"],
                &[0.5, 0.5],
            ),
            make_market("c2", MarketKind::Categorical, &["A", "B", "C"], &[0.2, 0.3, 0.5]),
        ]);
        let predictor = FakePredictor {
            binary: None,
            categorical: Some(CategoricalProbabilisticAnswer {
                probabilities: vec![("A".into(), 0.1), ("B".into(), 0.1), ("C".into(), 0.8)],
                confidence: 0.5,
                reasoning: None,
            }),
        };
        let (services, _, _) = fake_services(venue.clone(), predictor);
        let mut agent = TraderAgent::new(Arc::new(olas_embedding_oa()), services);

        let summary = agent.run(MarketType::Polymarket).await.unwrap();

        assert_eq!(summary.markets_considered, 2);
        assert_eq!(summary.skipped, 1);
        let placed = venue.placed.lock().unwrap();
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].0, "c1");
        assert_eq!(placed[0].1.outcome, "C");
    }

    #[tokio::test]
    async fn test_load_is_idempotent_and_failures_stop_the_run() {
        let venue = FakeVenue::new(mixed_markets());
        let (services, _, factory) = fake_services(venue.clone(), yes_prediction(0.8));
        let mut agent = TraderAgent::new(Arc::new(prophet_binary()), services);
        agent.load().unwrap();
        agent.load().unwrap();
        assert_eq!(factory.builds.load(Ordering::SeqCst), 1);

        let connector = Arc::new(FakeConnector {
            venue: venue.clone(),
            connects: AtomicUsize::new(0),
        });
        let failing = Services {
            keys: ApiKeys::default(),
            venues: connector.clone(),
            predictors: Arc::new(FakeFactory {
                predictor: yes_prediction(0.8),
                builds: AtomicUsize::new(0),
                fail: true,
            }),
            market_fetch_limit: 50,
        };
        let mut agent = TraderAgent::new(Arc::new(prophet_binary()), failing);
        assert!(agent.run(MarketType::Polymarket).await.is_err());
        assert_eq!(connector.connects.load(Ordering::SeqCst), 0);
        assert_eq!(venue.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_answering_before_load_is_an_error() {
        let venue = FakeVenue::new(mixed_markets());
        let (services, _, _) = fake_services(venue.clone(), yes_prediction(0.8));
        let agent = TraderAgent::new(Arc::new(prophet_binary()), services);
        assert!(agent.answer_binary_market(&venue.markets[1]).await.is_err());
    }
}
