pub mod analyzer;
pub mod strikes;

/// Inputs for one strike-grid analysis. Fractions, not percentages.
#[derive(Debug, Clone, Copy)]
pub struct GridRequest {
    pub spot: f64,
    pub volatility: f64,
    pub interest_rate: f64,
    pub years_to_expiry: f64,
    pub strike_start: f64,
    pub strike_end: f64,
    pub strike_step: f64,
    /// Underlying shares per option unit
    pub ratio: f64,
    /// Quote-currency divisor applied to price fields only
    pub eur_usd: f64,
    /// Enables `max_units` when present
    pub budget: Option<f64>,
}

/// One row of the grid. Hedge, break-even and straddle fields may be
/// non-finite when deltas or combination costs vanish.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct StrikeRecord {
    /// Strike value the contracts were priced at
    pub strike: f64,
    /// Floored strike used to label the row
    pub strike_key: i64,
    pub call_price: f64,
    pub call_delta: f64,
    pub put_price: f64,
    pub put_delta: f64,
    pub vega: f64,
    pub distance_to_strike_pct: f64,
    pub puts_per_call: f64,
    pub call_break_even: f64,
    pub put_break_even: f64,
    pub vega_per_straddle: f64,
    pub max_units: Option<f64>,
}

/// Output of one analysis run, handed to the presentation layer as plain data.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GridReport {
    pub expected_price_at_maturity: f64,
    /// Row with the highest finite vega per straddle
    pub best_vega_strike: Option<i64>,
    pub records: Vec<StrikeRecord>,
}
