//! Gateway routing statistics
//!
//! Lock-free counters updated on the routing path and copied out as a
//! `GlobalStats` snapshot for `/stats` and `/metrics`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::types::{Route, RouteReason, RoutingDecision, ThreatAssessment};

/// Route counts broken down by reason
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonCounts {
    pub credentialed: u64,
    pub high_threat_blocked: u64,
    pub suspicious_volume: u64,
    pub default_unknown: u64,
}

/// Point-in-time copy of the gateway counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalStats {
    /// Requests that passed input validation
    pub total_requests: u64,

    /// Requests carrying a valid credential
    pub credentialed_requests: u64,

    /// Requests answered by the authoritative function
    pub authoritative_served: u64,

    /// Requests answered by a decoy
    pub decoys_served: u64,

    /// Requests assessed high or critical
    pub threat_detections: u64,

    /// Clients on the permanent block list
    pub blocked_clients: u64,

    /// Clients with tracked history
    pub active_clients: u64,

    /// Backend computations that failed
    pub backend_failures: u64,

    pub routes_by_reason: ReasonCounts,

    pub uptime_secs: u64,

    /// Unix seconds
    pub timestamp: i64,
}

impl GlobalStats {
    /// Share of requests answered by a decoy, in percent
    pub fn protection_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.decoys_served as f64 / self.total_requests as f64 * 100.0
    }

    /// Format stats in Prometheus text exposition format
    pub fn to_prometheus_format(&self) -> String {
        format!(
            "# HELP decoy_gate_requests_total Requests evaluated\n\
             # TYPE decoy_gate_requests_total counter\n\
             decoy_gate_requests_total {}\n\
             \n\
             # HELP decoy_gate_credentialed_requests_total Requests with a valid credential\n\
             # TYPE decoy_gate_credentialed_requests_total counter\n\
             decoy_gate_credentialed_requests_total {}\n\
             \n\
             # HELP decoy_gate_dispatch_total Requests dispatched per backend\n\
             # TYPE decoy_gate_dispatch_total counter\n\
             decoy_gate_dispatch_total{{route=\"authoritative\"}} {}\n\
             decoy_gate_dispatch_total{{route=\"decoy\"}} {}\n\
             \n\
             # HELP decoy_gate_route_reason_total Routing decisions per reason\n\
             # TYPE decoy_gate_route_reason_total counter\n\
             decoy_gate_route_reason_total{{reason=\"credentialed\"}} {}\n\
             decoy_gate_route_reason_total{{reason=\"high-threat-blocked\"}} {}\n\
             decoy_gate_route_reason_total{{reason=\"suspicious-volume\"}} {}\n\
             decoy_gate_route_reason_total{{reason=\"default-unknown\"}} {}\n\
             \n\
             # HELP decoy_gate_threat_detections_total High or critical assessments\n\
             # TYPE decoy_gate_threat_detections_total counter\n\
             decoy_gate_threat_detections_total {}\n\
             \n\
             # HELP decoy_gate_backend_failures_total Failed backend computations\n\
             # TYPE decoy_gate_backend_failures_total counter\n\
             decoy_gate_backend_failures_total {}\n\
             \n\
             # HELP decoy_gate_blocked_clients Clients on the block list\n\
             # TYPE decoy_gate_blocked_clients gauge\n\
             decoy_gate_blocked_clients {}\n\
             \n\
             # HELP decoy_gate_active_clients Clients with tracked history\n\
             # TYPE decoy_gate_active_clients gauge\n\
             decoy_gate_active_clients {}\n\
             \n\
             # HELP decoy_gate_uptime_seconds Gateway uptime in seconds\n\
             # TYPE decoy_gate_uptime_seconds counter\n\
             decoy_gate_uptime_seconds {}\n",
            self.total_requests,
            self.credentialed_requests,
            self.authoritative_served,
            self.decoys_served,
            self.routes_by_reason.credentialed,
            self.routes_by_reason.high_threat_blocked,
            self.routes_by_reason.suspicious_volume,
            self.routes_by_reason.default_unknown,
            self.threat_detections,
            self.backend_failures,
            self.blocked_clients,
            self.active_clients,
            self.uptime_secs,
        )
    }
}

/// Statistics Aggregator
pub struct StatsAggregator {
    total_requests: AtomicU64,
    credentialed_requests: AtomicU64,
    authoritative_served: AtomicU64,
    decoys_served: AtomicU64,
    threat_detections: AtomicU64,
    backend_failures: AtomicU64,
    credentialed: AtomicU64,
    high_threat_blocked: AtomicU64,
    suspicious_volume: AtomicU64,
    default_unknown: AtomicU64,
    start_time: Instant,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            credentialed_requests: AtomicU64::new(0),
            authoritative_served: AtomicU64::new(0),
            decoys_served: AtomicU64::new(0),
            threat_detections: AtomicU64::new(0),
            backend_failures: AtomicU64::new(0),
            credentialed: AtomicU64::new(0),
            high_threat_blocked: AtomicU64::new(0),
            suspicious_volume: AtomicU64::new(0),
            default_unknown: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Count one routed request
    pub fn record(&self, decision: &RoutingDecision, assessment: &ThreatAssessment) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if assessment.is_credentialed {
            self.credentialed_requests.fetch_add(1, Ordering::Relaxed);
        }

        match decision.route {
            Route::Authoritative => self.authoritative_served.fetch_add(1, Ordering::Relaxed),
            Route::Decoy => self.decoys_served.fetch_add(1, Ordering::Relaxed),
        };

        let reason_counter = match decision.reason {
            RouteReason::Credentialed => &self.credentialed,
            RouteReason::HighThreatBlocked => &self.high_threat_blocked,
            RouteReason::SuspiciousVolume => &self.suspicious_volume,
            RouteReason::DefaultUnknown => &self.default_unknown,
        };
        reason_counter.fetch_add(1, Ordering::Relaxed);

        if assessment.threat_level.is_elevated() {
            self.threat_detections.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_backend_failure(&self) {
        self.backend_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the counters. Gauges owned elsewhere (block list size, client
    /// count) are supplied by the caller.
    pub fn snapshot(&self, blocked_clients: u64, active_clients: u64) -> GlobalStats {
        GlobalStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            credentialed_requests: self.credentialed_requests.load(Ordering::Relaxed),
            authoritative_served: self.authoritative_served.load(Ordering::Relaxed),
            decoys_served: self.decoys_served.load(Ordering::Relaxed),
            threat_detections: self.threat_detections.load(Ordering::Relaxed),
            blocked_clients,
            active_clients,
            backend_failures: self.backend_failures.load(Ordering::Relaxed),
            routes_by_reason: ReasonCounts {
                credentialed: self.credentialed.load(Ordering::Relaxed),
                high_threat_blocked: self.high_threat_blocked.load(Ordering::Relaxed),
                suspicious_volume: self.suspicious_volume.load(Ordering::Relaxed),
                default_unknown: self.default_unknown.load(Ordering::Relaxed),
            },
            uptime_secs: self.start_time.elapsed().as_secs(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ThreatLevel;

    fn assessment(credentialed: bool, level: ThreatLevel) -> ThreatAssessment {
        ThreatAssessment {
            is_credentialed: credentialed,
            threat_score: 0.0,
            threat_level: level,
            indicators: Vec::new(),
            request_count: 1,
        }
    }

    fn decision(route: Route, reason: RouteReason) -> RoutingDecision {
        RoutingDecision { route, reason }
    }

    #[test]
    fn test_fresh_aggregator_is_zeroed() {
        let stats = StatsAggregator::new().snapshot(0, 0);
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.decoys_served, 0);
        assert_eq!(stats.protection_rate(), 0.0);
    }

    #[test]
    fn test_each_request_increments_exactly_one_route() {
        let aggregator = StatsAggregator::new();

        aggregator.record(
            &decision(Route::Authoritative, RouteReason::Credentialed),
            &assessment(true, ThreatLevel::None),
        );
        aggregator.record(
            &decision(Route::Authoritative, RouteReason::DefaultUnknown),
            &assessment(false, ThreatLevel::None),
        );
        aggregator.record(
            &decision(Route::Decoy, RouteReason::SuspiciousVolume),
            &assessment(false, ThreatLevel::Medium),
        );
        aggregator.record(
            &decision(Route::Decoy, RouteReason::HighThreatBlocked),
            &assessment(false, ThreatLevel::High),
        );
        aggregator.record(
            &decision(Route::Decoy, RouteReason::HighThreatBlocked),
            &assessment(false, ThreatLevel::Critical),
        );

        let stats = aggregator.snapshot(1, 3);
        assert_eq!(stats.total_requests, 5);
        assert_eq!(stats.authoritative_served + stats.decoys_served, 5);
        assert_eq!(stats.authoritative_served, 2);
        assert_eq!(stats.decoys_served, 3);
        assert_eq!(stats.credentialed_requests, 1);
        assert_eq!(stats.threat_detections, 2);
        assert_eq!(stats.routes_by_reason.high_threat_blocked, 2);
        assert_eq!(stats.routes_by_reason.suspicious_volume, 1);
        assert_eq!(stats.blocked_clients, 1);
        assert_eq!(stats.active_clients, 3);
        assert!((stats.protection_rate() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_prometheus_format() {
        let aggregator = StatsAggregator::new();
        aggregator.record_backend_failure();
        let prometheus = aggregator.snapshot(0, 0).to_prometheus_format();

        assert!(prometheus.contains("# HELP"));
        assert!(prometheus.contains("# TYPE"));
        assert!(prometheus.contains("decoy_gate_requests_total 0"));
        assert!(prometheus.contains("decoy_gate_dispatch_total{route=\"decoy\"} 0"));
        assert!(prometheus.contains("decoy_gate_backend_failures_total 1"));
    }

    #[test]
    fn test_concurrent_recording() {
        use std::sync::Arc;

        let aggregator = Arc::new(StatsAggregator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let aggregator = Arc::clone(&aggregator);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        aggregator.record(
                            &decision(Route::Decoy, RouteReason::SuspiciousVolume),
                            &assessment(false, ThreatLevel::None),
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(aggregator.snapshot(0, 0).decoys_served, 1000);
    }
}
