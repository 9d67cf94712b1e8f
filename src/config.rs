use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::history::DEFAULT_WINDOW_SECS;
use crate::input::InputSchema;
use crate::pattern::{DetectorConfig, FieldSelector};
use crate::routing::RoutingConfig;
use crate::scoring::ScoringConfig;

/// Gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub history: HistoryConfig,
    pub detection: DetectorConfig,
    pub scoring: ScoringConfig,
    pub routing: RoutingConfig,
    pub input: InputSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Reported in every risk response
    pub model_version: String,
    /// Where to write the credential issued at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Listen address. `host` must be a literal IPv4 or IPv6 address.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid host '{}': not an IP address", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            model_version: "v2.1.4".to_string(),
            token_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Trailing window in seconds
    pub window_secs: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: GatewayConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(&self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Invalid port: cannot be 0");
        }

        if self.server.model_version.trim().is_empty() {
            anyhow::bail!("Invalid model_version: must not be empty");
        }

        self.server.socket_addr()?;

        self.validate_engine()
    }

    /// Validate the sections the routing engine consumes
    pub fn validate_engine(&self) -> anyhow::Result<()> {
        if self.history.window_secs == 0 {
            anyhow::bail!("Invalid history window_secs: must be > 0");
        }

        let detection = &self.detection;
        if detection.min_samples < 2 {
            anyhow::bail!("Invalid detection min_samples: need at least 2 values to form a step");
        }
        if detection.sample_size < detection.min_samples {
            anyhow::bail!(
                "Invalid detection sample_size {}: must be >= min_samples {}",
                detection.sample_size,
                detection.min_samples
            );
        }
        if !detection.step_tolerance.is_finite() || detection.step_tolerance < 0.0 {
            anyhow::bail!("Invalid detection step_tolerance: must be a finite value >= 0");
        }
        if let FieldSelector::Named(name) = &detection.field {
            if !self.input.fields.iter().any(|f| f == name) {
                anyhow::bail!(
                    "Invalid detection field '{}': not one of the input fields",
                    name
                );
            }
        }

        let scoring = &self.scoring;
        for (name, weight) in [
            ("frequency_weight", scoring.frequency_weight),
            ("systematic_weight", scoring.systematic_weight),
            ("unauthenticated_weight", scoring.unauthenticated_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                anyhow::bail!("Invalid scoring {}: must be a finite value >= 0", name);
            }
        }
        let levels = [
            scoring.medium_threshold,
            scoring.high_threshold,
            scoring.critical_threshold,
        ];
        if levels.iter().any(|t| !(0.0..=1.0).contains(t)) {
            anyhow::bail!("Invalid scoring thresholds: must be within [0, 1]");
        }
        if !(levels[0] <= levels[1] && levels[1] <= levels[2]) {
            anyhow::bail!("Invalid scoring thresholds: need medium <= high <= critical");
        }

        if self.input.fields.is_empty() {
            anyhow::bail!("Invalid input fields: at least one is required");
        }
        let mut seen = HashSet::new();
        for field in &self.input.fields {
            if field.trim().is_empty() {
                anyhow::bail!("Invalid input fields: names must not be empty");
            }
            if !seen.insert(field.as_str()) {
                anyhow::bail!("Invalid input fields: '{}' is listed twice", field);
            }
        }

        Ok(())
    }
}
