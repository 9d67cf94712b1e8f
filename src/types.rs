use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use crate::input::NumericFields;

/// Stable key identifying a requester (usually the peer IP address)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientIdentity {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ClientIdentity {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<IpAddr> for ClientIdentity {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

/// One observed request, kept only while inside the rolling window
#[derive(Debug, Clone, PartialEq)]
pub struct RequestRecord {
    /// Monotonic time since the engine clock started
    pub timestamp: Duration,
    pub input: NumericFields,
    pub credentialed: bool,
}

/// Result of a backend computation.
///
/// Both routes produce this exact type, so the response shape can never tell a
/// caller which backend answered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub value: f64,
}

impl Output {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

/// Discrete threat bucket derived from the continuous score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    None,
    /// Reserved; the default score mapping never produces it
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// High or critical
    pub fn is_elevated(self) -> bool {
        matches!(self, ThreatLevel::High | ThreatLevel::Critical)
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreatLevel::None => write!(f, "none"),
            ThreatLevel::Low => write!(f, "low"),
            ThreatLevel::Medium => write!(f, "medium"),
            ThreatLevel::High => write!(f, "high"),
            ThreatLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Per-request threat evaluation, never persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatAssessment {
    pub is_credentialed: bool,
    /// Always within [0.0, 1.0]
    pub threat_score: f64,
    pub threat_level: ThreatLevel,
    pub indicators: Vec<String>,
    pub request_count: usize,
}

/// Which backend answers a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Authoritative,
    Decoy,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Authoritative => write!(f, "authoritative"),
            Route::Decoy => write!(f, "decoy"),
        }
    }
}

/// Why a route was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteReason {
    Credentialed,
    HighThreatBlocked,
    SuspiciousVolume,
    DefaultUnknown,
}

impl fmt::Display for RouteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteReason::Credentialed => write!(f, "credentialed"),
            RouteReason::HighThreatBlocked => write!(f, "high-threat-blocked"),
            RouteReason::SuspiciousVolume => write!(f, "suspicious-volume"),
            RouteReason::DefaultUnknown => write!(f, "default-unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub route: Route,
    pub reason: RouteReason,
}
