//! Threat scoring.
//!
//! Signals are additive and the total is capped at 1.0:
//!
//! | signal                                   | weight |
//! |------------------------------------------|--------|
//! | more than 10 requests in window          | 0.4    |
//! | systematic exploration                   | 0.5    |
//! | uncredentialed with more than 5 requests | 0.3    |
//! | already on the block list                | forces 1.0 |
//!
//! Reaching critical puts the client on the block list for good.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::blocklist::BlockList;
use crate::pattern::PatternDetector;
use crate::types::{ClientIdentity, RequestRecord, ThreatAssessment, ThreatLevel};

pub const INDICATOR_HIGH_FREQUENCY: &str = "high frequency";
pub const INDICATOR_SYSTEMATIC: &str = "systematic exploration";
pub const INDICATOR_UNAUTHENTICATED: &str = "non-authenticated elevated activity";
pub const INDICATOR_PREVIOUSLY_BLOCKED: &str = "previously blocked";

/// Scores are rounded to this many decimal places before classification
const SCORE_PRECISION: f64 = 1e9;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Request count above which the frequency signal fires
    pub frequency_threshold: usize,
    pub frequency_weight: f64,
    pub systematic_weight: f64,
    /// Request count above which uncredentialed traffic counts as elevated
    pub unauthenticated_threshold: usize,
    pub unauthenticated_weight: f64,
    /// Score strictly above this is critical
    pub critical_threshold: f64,
    /// Score strictly above this is high
    pub high_threshold: f64,
    /// Score strictly above this is medium
    pub medium_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            frequency_threshold: 10,
            frequency_weight: 0.4,
            systematic_weight: 0.5,
            unauthenticated_threshold: 5,
            unauthenticated_weight: 0.3,
            critical_threshold: 0.7,
            high_threshold: 0.4,
            medium_threshold: 0.2,
        }
    }
}

impl ScoringConfig {
    /// Map a score onto a level. Thresholds are exclusive lower bounds.
    pub fn level_for(&self, score: f64) -> ThreatLevel {
        if score > self.critical_threshold {
            ThreatLevel::Critical
        } else if score > self.high_threshold {
            ThreatLevel::High
        } else if score > self.medium_threshold {
            ThreatLevel::Medium
        } else {
            ThreatLevel::None
        }
    }
}

/// Threat Scorer
pub struct ThreatScorer {
    config: ScoringConfig,
    detector: Arc<dyn PatternDetector>,
}

impl ThreatScorer {
    pub fn new(config: ScoringConfig, detector: Arc<dyn PatternDetector>) -> Self {
        Self { config, detector }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Assess one request against its client's current window.
    ///
    /// A critical result adds `identity` to `blocklist`.
    pub fn score(
        &self,
        identity: &ClientIdentity,
        window: &[RequestRecord],
        has_credential: bool,
        blocklist: &BlockList,
    ) -> ThreatAssessment {
        let request_count = window.len();
        let mut score = 0.0;
        let mut indicators = Vec::new();

        if request_count > self.config.frequency_threshold {
            score += self.config.frequency_weight;
            indicators.push(INDICATOR_HIGH_FREQUENCY.to_string());
        }

        if self.detector.is_systematic(window) {
            score += self.config.systematic_weight;
            indicators.push(INDICATOR_SYSTEMATIC.to_string());
        }

        if !has_credential && request_count > self.config.unauthenticated_threshold {
            score += self.config.unauthenticated_weight;
            indicators.push(INDICATOR_UNAUTHENTICATED.to_string());
        }

        if blocklist.contains(identity) {
            score = 1.0;
            indicators.push(INDICATOR_PREVIOUSLY_BLOCKED.to_string());
        }

        let threat_score = normalize(score);
        let threat_level = self.config.level_for(threat_score);

        if threat_level == ThreatLevel::Critical {
            blocklist.insert(identity);
        }

        debug!(
            "Scored {}: {:.2} ({}) over {} requests",
            identity, threat_score, threat_level, request_count
        );

        ThreatAssessment {
            is_credentialed: has_credential,
            threat_score,
            threat_level,
            indicators,
            request_count,
        }
    }
}

/// Clamp into [0, 1] and drop floating-point noise so that weights summing to
/// a threshold compare equal to it.
fn normalize(score: f64) -> f64 {
    let rounded = (score * SCORE_PRECISION).round() / SCORE_PRECISION;
    rounded.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NumericFields;
    use crate::pattern::SweepDetector;
    use std::time::Duration;

    struct Always(bool);

    impl PatternDetector for Always {
        fn is_systematic(&self, _window: &[RequestRecord]) -> bool {
            self.0
        }
    }

    fn scorer(systematic: bool) -> ThreatScorer {
        ThreatScorer::new(ScoringConfig::default(), Arc::new(Always(systematic)))
    }

    fn requests(n: usize) -> Vec<RequestRecord> {
        (0..n)
            .map(|i| RequestRecord {
                timestamp: Duration::from_secs(i as u64),
                input: NumericFields::new().with("volatility", 0.5),
                credentialed: false,
            })
            .collect()
    }

    #[test]
    fn test_quiet_client_scores_zero() {
        let blocklist = BlockList::new();
        let client = ClientIdentity::from("10.0.0.1");
        let assessment = scorer(false).score(&client, &requests(2), false, &blocklist);

        assert_eq!(assessment.threat_score, 0.0);
        assert_eq!(assessment.threat_level, ThreatLevel::None);
        assert!(assessment.indicators.is_empty());
        assert_eq!(assessment.request_count, 2);
    }

    #[test]
    fn test_unauthenticated_volume_is_medium() {
        let blocklist = BlockList::new();
        let client = ClientIdentity::from("10.0.0.1");
        let assessment = scorer(false).score(&client, &requests(6), false, &blocklist);

        assert_eq!(assessment.threat_score, 0.3);
        assert_eq!(assessment.threat_level, ThreatLevel::Medium);
        assert_eq!(assessment.indicators, vec![INDICATOR_UNAUTHENTICATED]);
    }

    #[test]
    fn test_frequency_plus_unauthenticated_is_high_not_critical() {
        let blocklist = BlockList::new();
        let client = ClientIdentity::from("10.0.0.1");
        let assessment = scorer(false).score(&client, &requests(11), false, &blocklist);

        assert_eq!(assessment.threat_score, 0.7);
        assert_eq!(assessment.threat_level, ThreatLevel::High);
        assert!(blocklist.is_empty());
    }

    #[test]
    fn test_systematic_unauthenticated_is_critical_and_blocks() {
        let blocklist = BlockList::new();
        let client = ClientIdentity::from("10.0.0.1");
        let assessment = scorer(true).score(&client, &requests(6), false, &blocklist);

        assert_eq!(assessment.threat_score, 0.8);
        assert_eq!(assessment.threat_level, ThreatLevel::Critical);
        assert!(blocklist.contains(&client));
    }

    #[test]
    fn test_score_is_capped() {
        let blocklist = BlockList::new();
        let client = ClientIdentity::from("10.0.0.1");
        let assessment = scorer(true).score(&client, &requests(20), false, &blocklist);

        assert_eq!(assessment.threat_score, 1.0);
        assert_eq!(assessment.indicators.len(), 3);
    }

    #[test]
    fn test_credential_removes_unauthenticated_signal() {
        let blocklist = BlockList::new();
        let client = ClientIdentity::from("10.0.0.1");
        let assessment = scorer(false).score(&client, &requests(8), true, &blocklist);

        assert!(assessment.is_credentialed);
        assert_eq!(assessment.threat_level, ThreatLevel::None);
    }

    #[test]
    fn test_blocked_client_forced_to_max() {
        let blocklist = BlockList::new();
        let client = ClientIdentity::from("10.0.0.1");
        blocklist.insert(&client);

        let assessment = scorer(false).score(&client, &requests(1), false, &blocklist);
        assert_eq!(assessment.threat_score, 1.0);
        assert_eq!(assessment.threat_level, ThreatLevel::Critical);
        assert!(assessment
            .indicators
            .contains(&INDICATOR_PREVIOUSLY_BLOCKED.to_string()));
    }

    #[test]
    fn test_level_boundaries() {
        let config = ScoringConfig::default();
        assert_eq!(config.level_for(0.2), ThreatLevel::None);
        assert_eq!(config.level_for(0.21), ThreatLevel::Medium);
        assert_eq!(config.level_for(0.4), ThreatLevel::Medium);
        assert_eq!(config.level_for(0.41), ThreatLevel::High);
        assert_eq!(config.level_for(0.7), ThreatLevel::High);
        assert_eq!(config.level_for(0.71), ThreatLevel::Critical);
    }

    #[test]
    fn test_real_detector_on_sweep() {
        let blocklist = BlockList::new();
        let client = ClientIdentity::from("10.0.0.1");
        let scorer = ThreatScorer::new(ScoringConfig::default(), Arc::new(SweepDetector::new()));

        let window: Vec<RequestRecord> = (1..=10)
            .map(|i| RequestRecord {
                timestamp: Duration::from_secs(i),
                input: NumericFields::new().with("volatility", i as f64 * 0.1),
                credentialed: false,
            })
            .collect();

        let assessment = scorer.score(&client, &window, false, &blocklist);
        assert!(assessment
            .indicators
            .contains(&INDICATOR_SYSTEMATIC.to_string()));
        assert_eq!(assessment.threat_level, ThreatLevel::Critical);
    }
}
