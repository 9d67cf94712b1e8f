//! Request evaluation pipeline.
//!
//! `evaluate` is the only entry point hosts need:
//! validate → record → score → route → dispatch → count.
//!
//! All mutable state lives in an injected [`GatewayState`], so independent
//! engines (one per test, say) never share clients, block lists or counters.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::backend::{Backend, BackendSelector, DecoyFactory};
use crate::blocklist::BlockList;
use crate::clock::{Clock, SystemClock};
use crate::config::GatewayConfig;
use crate::credentials::{CredentialValidator, Secret};
use crate::error::{GatewayError, GatewayResult};
use crate::history::{HistoryStore, DEFAULT_WINDOW_SECS};
use crate::input::{InputSchema, NumericFields};
use crate::pattern::{PatternDetector, SweepDetector};
use crate::routing::{RoutingConfig, RoutingPolicy};
use crate::scoring::{ScoringConfig, ThreatScorer};
use crate::stats::{GlobalStats, StatsAggregator};
use crate::types::{ClientIdentity, Output, Route, RoutingDecision, ThreatAssessment};

/// Process-wide mutable state shared by every request
pub struct GatewayState {
    history: Arc<HistoryStore>,
    blocklist: BlockList,
    stats: StatsAggregator,
    clock: Arc<dyn Clock>,
}

impl GatewayState {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            history: Arc::new(HistoryStore::new(window, Arc::clone(&clock))),
            blocklist: BlockList::new(),
            stats: StatsAggregator::new(),
            clock,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn blocklist(&self) -> &BlockList {
        &self.blocklist
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn snapshot(&self) -> GlobalStats {
        self.stats
            .snapshot(self.blocklist.len() as u64, self.history.client_count() as u64)
    }
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_WINDOW_SECS),
            Arc::new(SystemClock::new()),
        )
    }
}

/// Everything the engine decided about one request
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub output: Output,
    pub decision: RoutingDecision,
    pub assessment: ThreatAssessment,
}

/// Routing engine
pub struct GatewayEngine {
    state: Arc<GatewayState>,
    schema: InputSchema,
    scorer: ThreatScorer,
    policy: RoutingPolicy,
    selector: BackendSelector,
    validator: Arc<dyn CredentialValidator>,
}

impl GatewayEngine {
    /// Engine with default schema, scoring and routing
    pub fn new(
        state: Arc<GatewayState>,
        authoritative: Arc<dyn Backend>,
        decoy_factory: Arc<dyn DecoyFactory>,
        validator: Arc<dyn CredentialValidator>,
    ) -> Self {
        let selector =
            BackendSelector::new(authoritative, decoy_factory, Arc::clone(&state.history));

        Self {
            state,
            schema: InputSchema::default(),
            scorer: ThreatScorer::new(ScoringConfig::default(), Arc::new(SweepDetector::new())),
            policy: RoutingPolicy::default(),
            selector,
            validator,
        }
    }

    /// Build fresh state and an engine from configuration.
    ///
    /// Only the engine sections are checked. Listener settings belong to the host.
    pub fn from_config(
        config: &GatewayConfig,
        clock: Arc<dyn Clock>,
        authoritative: Arc<dyn Backend>,
        decoy_factory: Arc<dyn DecoyFactory>,
        validator: Arc<dyn CredentialValidator>,
    ) -> GatewayResult<Self> {
        config
            .validate_engine()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let state = Arc::new(GatewayState::new(
            Duration::from_secs(config.history.window_secs),
            clock,
        ));
        let detector = Arc::new(SweepDetector::with_config(config.detection.clone()));

        Ok(Self::new(state, authoritative, decoy_factory, validator)
            .with_schema(config.input.clone())
            .with_scoring(config.scoring.clone(), detector)
            .with_routing(config.routing.clone()))
    }

    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_scoring(mut self, config: ScoringConfig, detector: Arc<dyn PatternDetector>) -> Self {
        self.scorer = ThreatScorer::new(config, detector);
        self
    }

    pub fn with_routing(mut self, config: RoutingConfig) -> Self {
        self.policy = RoutingPolicy::new(config);
        self
    }

    pub fn state(&self) -> &Arc<GatewayState> {
        &self.state
    }

    pub fn schema(&self) -> &InputSchema {
        &self.schema
    }

    /// Evaluate one request and answer it from the selected backend.
    ///
    /// Invalid input is rejected before anything is recorded. A backend failure
    /// is returned as an error but the request still counts toward the
    /// client's history and the global statistics.
    pub fn evaluate(
        &self,
        identity: &ClientIdentity,
        input: NumericFields,
        credential: Option<&Secret>,
    ) -> GatewayResult<Evaluation> {
        self.schema.validate(&input)?;

        let credentialed = credential.is_some_and(|secret| self.validator.validate(secret));

        let window = self
            .state
            .history
            .record(identity, input.clone(), credentialed);

        let assessment = self
            .scorer
            .score(identity, &window, credentialed, &self.state.blocklist);
        let decision = self.policy.decide(identity, &assessment, &self.state.blocklist);

        let result = self.selector.dispatch(&decision, identity, &input);

        self.state.stats.record(&decision, &assessment);
        self.state.history.record_outcome(identity, decision.route);

        let output = match result {
            Ok(output) => output,
            Err(failure) => {
                self.state.stats.record_backend_failure();
                error!(
                    "Backend failure for {} via {} route: {}",
                    identity, decision.route, failure
                );
                return Err(failure.into());
            }
        };

        match decision.route {
            Route::Authoritative => info!(
                "{} -> authoritative ({}), threat {:.2} {}",
                identity, decision.reason, assessment.threat_score, assessment.threat_level
            ),
            Route::Decoy => warn!(
                "{} -> decoy ({}), threat {:.2} {} [{}]",
                identity,
                decision.reason,
                assessment.threat_score,
                assessment.threat_level,
                assessment.indicators.join(", ")
            ),
        }

        Ok(Evaluation {
            output,
            decision,
            assessment,
        })
    }

    /// Current global statistics
    pub fn stats(&self) -> GlobalStats {
        self.state.snapshot()
    }
}
