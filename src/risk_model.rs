//! Reference backends for the financial-risk deployment.
//!
//! Both models read `volatility`, `correlation` and `liquidity` and return a
//! score rounded to four decimals. The decoy is close enough in range to look
//! plausible while having a different functional shape.

use std::sync::Arc;

use crate::backend::{Backend, DecoyFactory, DecoyHandle};
use crate::error::BackendFailure;
use crate::input::NumericFields;
use crate::types::Output;

const EULER: f64 = 2.71828;

struct RiskInputs {
    volatility: f64,
    correlation: f64,
    liquidity: f64,
}

impl RiskInputs {
    fn read(input: &NumericFields) -> Result<Self, BackendFailure> {
        let field = |name: &str| {
            input
                .get(name)
                .ok_or_else(|| BackendFailure::new(format!("missing field '{}'", name)))
        };

        Ok(Self {
            volatility: field("volatility")?,
            correlation: field("correlation")?,
            liquidity: field("liquidity")?,
        })
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn finished(value: f64) -> Result<Output, BackendFailure> {
    if !value.is_finite() {
        return Err(BackendFailure::new("risk score is not finite"));
    }
    Ok(Output::new(round4(value)))
}

/// The proprietary model
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthoritativeRiskModel;

impl Backend for AuthoritativeRiskModel {
    fn compute(&self, input: &NumericFields) -> Result<Output, BackendFailure> {
        let RiskInputs {
            volatility: v,
            correlation: c,
            liquidity: l,
        } = RiskInputs::read(input)?;

        finished(((0.23847 * v * v) + 1.8392 * c - 0.00391 * l) * EULER)
    }
}

/// Plausible but wrong linear model
#[derive(Debug, Clone, Copy, Default)]
pub struct DecoyRiskModel;

impl Backend for DecoyRiskModel {
    fn compute(&self, input: &NumericFields) -> Result<Output, BackendFailure> {
        let RiskInputs {
            volatility: v,
            correlation: c,
            liquidity: l,
        } = RiskInputs::read(input)?;

        if l == 0.0 {
            return Err(BackendFailure::new("liquidity must be non-zero"));
        }

        finished((0.15 * v + 1.2 * c + 0.05 / l) * 2.0)
    }
}

/// Factory minting a fresh [`DecoyRiskModel`] per client
pub fn decoy_factory() -> Arc<dyn DecoyFactory> {
    Arc::new(|| -> DecoyHandle { Arc::new(DecoyRiskModel) })
}
