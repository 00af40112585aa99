use crate::errors::EngineResult;
use crate::models::{ContractParams, OptionKind, PricingResult};
use statrs::distribution::{ContinuousCDF, Normal};

/// Black-Scholes European option pricing.
///
/// d1 = (ln(S/K) + (r + sigma^2/2)*T) / (sigma * sqrt(T))
/// d2 = d1 - sigma * sqrt(T)
///
/// Call = S*Phi(d1) - K*e^(-rT)*Phi(d2)
/// Put  = K*e^(-rT)*Phi(-d2) - S*Phi(-d1)
///
/// Vega is reported as S * sqrt(T) * Phi(d1) for both option kinds.
pub struct BlackScholes {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholes {
    pub fn new() -> Self {
        Self {
            normal: Normal::standard(),
        }
    }

    /// Pure function: price, delta and vega of one contract.
    /// Inputs outside the model's domain are rejected before any arithmetic.
    pub fn price(&self, contract: &ContractParams) -> EngineResult<PricingResult> {
        contract.validate()?;

        let ContractParams {
            spot,
            strike,
            volatility,
            interest_rate,
            years_to_expiry,
            kind,
        } = *contract;

        let sqrt_t = years_to_expiry.sqrt();
        let sigma_sqrt_t = volatility * sqrt_t;
        let d1 = ((spot / strike).ln()
            + (interest_rate + 0.5 * volatility * volatility) * years_to_expiry)
            / sigma_sqrt_t;
        let d2 = d1 - sigma_sqrt_t;
        let discounted_strike = strike * (-interest_rate * years_to_expiry).exp();

        let (price, delta) = match kind {
            OptionKind::Call => (
                spot * self.normal.cdf(d1) - discounted_strike * self.normal.cdf(d2),
                self.normal.cdf(d1),
            ),
            OptionKind::Put => (
                discounted_strike * self.normal.cdf(-d2) - spot * self.normal.cdf(-d1),
                -self.normal.cdf(-d1),
            ),
        };

        let vega = spot * sqrt_t * self.normal.cdf(d1);

        Ok(PricingResult { price, delta, vega })
    }
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self::new()
    }
}

/// Risk-neutral expected terminal price: S * e^((r - sigma^2/2) * T).
#[inline]
pub fn expected_price_at_maturity(
    spot: f64,
    volatility: f64,
    interest_rate: f64,
    years_to_expiry: f64,
) -> f64 {
    spot * ((interest_rate - 0.5 * volatility * volatility) * years_to_expiry).exp()
}
