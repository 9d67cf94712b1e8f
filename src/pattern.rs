//! Systematic-exploration detection.
//!
//! Extraction tooling tends to walk one parameter through a grid or in a single
//! direction. The sweep detector looks for exactly that on one field of the
//! client's most recent requests.
//!
//! This is a heuristic. Organic traffic that happens to move monotonically (a
//! dashboard polling a steadily rising value, say) will be flagged too. That
//! false positive is accepted: the cost is a decoy answer to an unauthenticated
//! caller, while missing a sweep leaks the real model.

use serde::{Deserialize, Serialize};

use crate::types::RequestRecord;

/// Strategy deciding whether a window looks like automated parameter sweeping
pub trait PatternDetector: Send + Sync {
    fn is_systematic(&self, window: &[RequestRecord]) -> bool;
}

/// Which input field to track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSelector {
    /// First field of each request
    Primary,
    Named(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// How many trailing requests to inspect
    pub sample_size: usize,
    /// Fewer usable values than this is never systematic
    pub min_samples: usize,
    /// Max number of distinct step sizes that still counts as a grid
    pub max_distinct_steps: usize,
    /// Steps closer than this are the same step
    pub step_tolerance: f64,
    pub field: FieldSelector,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_size: 10,
            min_samples: 5,
            max_distinct_steps: 2,
            step_tolerance: 1e-9,
            field: FieldSelector::Primary,
        }
    }
}

/// Flags grid sweeps (few distinct steps) and directional scans (monotonic steps)
#[derive(Debug, Clone, Default)]
pub struct SweepDetector {
    config: DetectorConfig,
}

impl SweepDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    fn field_value(&self, record: &RequestRecord) -> Option<f64> {
        match &self.config.field {
            FieldSelector::Primary => record.input.primary(),
            FieldSelector::Named(name) => record.input.get(name),
        }
    }

    /// Values of the tracked field from the last `sample_size` requests.
    /// Requests missing the field are skipped.
    fn sample(&self, window: &[RequestRecord]) -> Vec<f64> {
        let start = window.len().saturating_sub(self.config.sample_size);
        window[start..]
            .iter()
            .filter_map(|r| self.field_value(r))
            .collect()
    }

    /// Count step groups after sorting. Neighbours within tolerance share a
    /// group, so the count does not depend on the order steps arrived in.
    fn distinct_steps(&self, steps: &[f64]) -> usize {
        let mut sorted = steps.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        if sorted.is_empty() {
            return 0;
        }
        let gaps = sorted
            .windows(2)
            .filter(|pair| pair[1] - pair[0] > self.config.step_tolerance)
            .count();
        1 + gaps
    }
}

impl PatternDetector for SweepDetector {
    fn is_systematic(&self, window: &[RequestRecord]) -> bool {
        if window.len() < self.config.min_samples {
            return false;
        }

        let values = self.sample(window);
        if values.len() < self.config.min_samples {
            return false;
        }

        let steps: Vec<f64> = values.windows(2).map(|pair| pair[1] - pair[0]).collect();

        if self.distinct_steps(&steps) <= self.config.max_distinct_steps {
            return true;
        }

        steps.iter().all(|&d| d > 0.0) || steps.iter().all(|&d| d < 0.0)
    }
}
