//! Routing policy.
//!
//! Rules are evaluated top to bottom and the first match wins:
//!
//! 1. valid credential → authoritative (`credentialed`)
//! 2. high or critical threat → decoy (`high-threat-blocked`)
//! 3. uncredentialed with more than 3 requests in window → decoy (`suspicious-volume`)
//! 4. anything else → authoritative (`default-unknown`)
//!
//! The credential check must stay first so that busy authenticated callers are
//! never misrouted by volume or pattern signals.

use serde::{Deserialize, Serialize};

use crate::blocklist::BlockList;
use crate::types::{
    ClientIdentity, Route, RouteReason, RoutingDecision, ThreatAssessment, ThreatLevel,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Uncredentialed clients above this many in-window requests get the decoy
    pub suspicious_volume_threshold: usize,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            suspicious_volume_threshold: 3,
        }
    }
}

/// Routing Policy
#[derive(Debug, Clone, Default)]
pub struct RoutingPolicy {
    config: RoutingConfig,
}

impl RoutingPolicy {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    pub fn decide(
        &self,
        identity: &ClientIdentity,
        assessment: &ThreatAssessment,
        blocklist: &BlockList,
    ) -> RoutingDecision {
        if assessment.is_credentialed {
            return RoutingDecision {
                route: Route::Authoritative,
                reason: RouteReason::Credentialed,
            };
        }

        if assessment.threat_level.is_elevated() {
            if assessment.threat_level == ThreatLevel::Critical {
                blocklist.insert(identity);
            }
            return RoutingDecision {
                route: Route::Decoy,
                reason: RouteReason::HighThreatBlocked,
            };
        }

        if assessment.request_count > self.config.suspicious_volume_threshold {
            return RoutingDecision {
                route: Route::Decoy,
                reason: RouteReason::SuspiciousVolume,
            };
        }

        RoutingDecision {
            route: Route::Authoritative,
            reason: RouteReason::DefaultUnknown,
        }
    }
}
