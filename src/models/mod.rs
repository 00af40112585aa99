pub mod black_scholes;
pub mod volatility;

use crate::errors::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    Call,
    Put,
}

/// Inputs to a single European option valuation. Stack-allocated, Copy.
/// Rates and volatility are fractions (0.20, not 20).
#[derive(Debug, Clone, Copy)]
pub struct ContractParams {
    pub spot: f64,
    pub strike: f64,
    pub volatility: f64,
    pub interest_rate: f64,
    pub years_to_expiry: f64,
    pub kind: OptionKind,
}

impl ContractParams {
    /// Every numeric input must be finite and strictly positive.
    /// Reports the first offending parameter by name.
    pub fn validate(&self) -> EngineResult<()> {
        require_positive("years_to_expiry", self.years_to_expiry)?;
        require_positive("strike", self.strike)?;
        require_positive("spot", self.spot)?;
        require_positive("volatility", self.volatility)?;
        require_positive("interest_rate", self.interest_rate)?;
        Ok(())
    }
}

/// Theoretical value and sensitivities of one contract.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PricingResult {
    pub price: f64,
    pub delta: f64,
    pub vega: f64,
}

#[inline]
pub fn require_positive(name: &'static str, value: f64) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidParameter { name, value })
    }
}
