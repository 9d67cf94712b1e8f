// Library interface for the decoy gate
// The routing engine is host-agnostic; the HTTP host and reference risk models
// sit on top of it

pub mod backend;
pub mod blocklist;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod history;
pub mod input;
pub mod lock_utils;
pub mod pattern;
pub mod risk_model;
pub mod routing;
pub mod scoring;
pub mod server;
pub mod stats;
pub mod types;

pub use backend::{Backend, BackendSelector, DecoyFactory, DecoyHandle};
pub use blocklist::BlockList;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GatewayConfig;
pub use credentials::{CredentialValidator, Secret, TokenRegistry};
pub use engine::{Evaluation, GatewayEngine, GatewayState};
pub use error::{BackendFailure, GatewayError, GatewayResult};
pub use history::HistoryStore;
pub use input::{InputSchema, NumericFields};
pub use pattern::{PatternDetector, SweepDetector};
pub use stats::GlobalStats;
pub use types::{
    ClientIdentity, Output, RequestRecord, Route, RouteReason, RoutingDecision, ThreatAssessment,
    ThreatLevel,
};
