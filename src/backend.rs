//! Backend functions and blind dispatch.
//!
//! The authoritative function is shared by every caller that earns it. Decoys
//! are minted per client by a factory and bound through the history store, so
//! an attacker always measures the same wrong model.

use std::sync::Arc;

use crate::error::BackendFailure;
use crate::history::HistoryStore;
use crate::input::NumericFields;
use crate::types::{ClientIdentity, Output, Route, RoutingDecision};

/// A computation the gateway can route to.
///
/// Implementations are expected to be pure and deterministic for a given input.
pub trait Backend: Send + Sync {
    fn compute(&self, input: &NumericFields) -> Result<Output, BackendFailure>;
}

impl<F> Backend for F
where
    F: Fn(&NumericFields) -> Result<Output, BackendFailure> + Send + Sync,
{
    fn compute(&self, input: &NumericFields) -> Result<Output, BackendFailure> {
        self(input)
    }
}

/// Shared handle to a client's bound decoy
pub type DecoyHandle = Arc<dyn Backend>;

/// Produces a fresh decoy instance
pub trait DecoyFactory: Send + Sync {
    fn create(&self) -> DecoyHandle;
}

impl<F> DecoyFactory for F
where
    F: Fn() -> DecoyHandle + Send + Sync,
{
    fn create(&self) -> DecoyHandle {
        self()
    }
}

/// Backend Selector
pub struct BackendSelector {
    authoritative: Arc<dyn Backend>,
    decoy_factory: Arc<dyn DecoyFactory>,
    history: Arc<HistoryStore>,
}

impl BackendSelector {
    pub fn new(
        authoritative: Arc<dyn Backend>,
        decoy_factory: Arc<dyn DecoyFactory>,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            authoritative,
            decoy_factory,
            history,
        }
    }

    /// Run the backend named by `decision`. The result is returned untouched
    /// whichever route produced it.
    pub fn dispatch(
        &self,
        decision: &RoutingDecision,
        identity: &ClientIdentity,
        input: &NumericFields,
    ) -> Result<Output, BackendFailure> {
        match decision.route {
            Route::Authoritative => self.authoritative.compute(input),
            Route::Decoy => {
                let decoy = self
                    .history
                    .get_or_create_decoy(identity, self.decoy_factory.as_ref());
                decoy.compute(input)
            }
        }
    }

    /// The decoy currently bound to `identity`, binding one if needed
    pub fn decoy_for(&self, identity: &ClientIdentity) -> DecoyHandle {
        self.history
            .get_or_create_decoy(identity, self.decoy_factory.as_ref())
    }
}
