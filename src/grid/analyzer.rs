use crate::errors::EngineResult;
use crate::grid::strikes::strike_progression;
use crate::grid::{GridReport, GridRequest, StrikeRecord};
use crate::models::black_scholes::{expected_price_at_maturity, BlackScholes};
use crate::models::{require_positive, ContractParams, OptionKind};

/// Price every strike of the grid and derive the per-row trading metrics.
///
/// Rows come back in ascending strike order. A contract outside the model's
/// domain fails the whole run; vanishing deltas or costs do not, they surface
/// as non-finite values in the affected rows.
pub fn build_grid(model: &BlackScholes, req: &GridRequest) -> EngineResult<GridReport> {
    require_positive("ratio", req.ratio)?;
    require_positive("eur_usd", req.eur_usd)?;
    if let Some(budget) = req.budget {
        require_positive("budget", budget)?;
    }

    let strikes = strike_progression(req.strike_start, req.strike_end, req.strike_step)?;

    // Pass 1: prices, deltas, vega, distance
    let mut records = Vec::with_capacity(strikes.len());
    for strike in strikes {
        records.push(price_strike(model, req, strike)?);
    }

    // Pass 2: metrics that depend on the finished row
    for record in records.iter_mut() {
        record.derive_metrics(req.ratio, req.budget);
    }

    let best = best_vega_strike(&records);

    tracing::debug!(
        rows = records.len(),
        best = ?best,
        "strike grid built"
    );

    Ok(GridReport {
        expected_price_at_maturity: expected_price_at_maturity(
            req.spot,
            req.volatility,
            req.interest_rate,
            req.years_to_expiry,
        ),
        best_vega_strike: best,
        records,
    })
}

/// Strike key of the row with the highest vega per straddle. NaN rows are
/// skipped; a `+inf` row (zero cost, positive vega) wins.
pub fn best_vega_strike(records: &[StrikeRecord]) -> Option<i64> {
    records
        .iter()
        .filter(|r| !r.vega_per_straddle.is_nan())
        .max_by(|a, b| a.vega_per_straddle.total_cmp(&b.vega_per_straddle))
        .map(|r| r.strike_key)
}

fn price_strike(model: &BlackScholes, req: &GridRequest, strike: f64) -> EngineResult<StrikeRecord> {
    let mut contract = ContractParams {
        spot: req.spot,
        strike,
        volatility: req.volatility,
        interest_rate: req.interest_rate,
        years_to_expiry: req.years_to_expiry,
        kind: OptionKind::Call,
    };
    let call = model.price(&contract)?;

    contract.kind = OptionKind::Put;
    let put = model.price(&contract)?;

    Ok(StrikeRecord {
        strike,
        strike_key: strike.floor() as i64,
        call_price: call.price * req.ratio / req.eur_usd,
        call_delta: call.delta,
        put_price: put.price * req.ratio / req.eur_usd,
        put_delta: put.delta,
        vega: call.vega * req.ratio,
        distance_to_strike_pct: (strike / req.spot - 1.0) * 100.0,
        puts_per_call: f64::NAN,
        call_break_even: f64::NAN,
        put_break_even: f64::NAN,
        vega_per_straddle: f64::NAN,
        max_units: None,
    })
}

impl StrikeRecord {
    /// Cost of one call plus `puts_per_call` puts, in the quoted currency.
    #[inline]
    pub fn combination_cost(&self) -> f64 {
        self.call_price + self.put_price * self.puts_per_call
    }

    /// Fills hedge ratio, break-evens, vega per straddle and (with a budget)
    /// the affordable unit count. Division by zero is left to IEEE semantics.
    pub fn derive_metrics(&mut self, ratio: f64, budget: Option<f64>) {
        self.puts_per_call = -self.call_delta / self.put_delta;
        self.call_break_even = self.strike + self.call_price / ratio;
        self.put_break_even = self.strike - self.put_price / ratio;

        let cost = self.combination_cost();
        self.vega_per_straddle = 2.0 * self.vega / cost;
        self.max_units = budget.map(|b| (b / cost).floor());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EngineError;

    fn request() -> GridRequest {
        GridRequest {
            spot: 100.0,
            volatility: 0.2,
            interest_rate: 0.05,
            years_to_expiry: 0.5,
            strike_start: 90.0,
            strike_end: 110.0,
            strike_step: 10.0,
            ratio: 1.0,
            eur_usd: 1.0,
            budget: None,
        }
    }

    #[test]
    fn test_grid_strikes_complete_and_ordered() {
        let report = build_grid(&BlackScholes::new(), &request()).unwrap();
        let keys: Vec<i64> = report.records.iter().map(|r| r.strike_key).collect();
        assert_eq!(keys, vec![90, 100, 110]);
    }

    #[test]
    fn test_atm_row_matches_pricer() {
        let report = build_grid(&BlackScholes::new(), &request()).unwrap();
        let atm = &report.records[1];
        assert!((atm.call_price - 6.89).abs() < 1e-2, "call={}", atm.call_price);
        assert!((atm.call_delta - 0.598).abs() < 1e-2, "delta={}", atm.call_delta);
        assert_eq!(atm.distance_to_strike_pct, 0.0);
    }

    #[test]
    fn test_ratio_and_fx_scaling_exact() {
        let model = BlackScholes::new();
        let base = build_grid(&model, &request()).unwrap();
        let scaled = build_grid(&model, &GridRequest { ratio: 0.1, eur_usd: 2.0, ..request() }).unwrap();

        for (b, s) in base.records.iter().zip(&scaled.records) {
            assert_eq!(s.call_price, b.call_price * 0.1 / 2.0);
            assert_eq!(s.put_price, b.put_price * 0.1 / 2.0);
            // deltas untouched, vega scaled by ratio only
            assert_eq!(s.call_delta, b.call_delta);
            assert_eq!(s.put_delta, b.put_delta);
            assert_eq!(s.vega, b.vega * 0.1);
        }
    }

    #[test]
    fn test_derived_metrics() {
        let report = build_grid(&BlackScholes::new(), &GridRequest { ratio: 0.1, ..request() }).unwrap();
        for r in &report.records {
            assert!((r.puts_per_call - (-r.call_delta / r.put_delta)).abs() < 1e-15);
            assert!((r.call_break_even - (r.strike + r.call_price / 0.1)).abs() < 1e-12);
            assert!((r.put_break_even - (r.strike - r.put_price / 0.1)).abs() < 1e-12);
            let cost = r.call_price + r.put_price * r.puts_per_call;
            assert!((r.vega_per_straddle - 2.0 * r.vega / cost).abs() < 1e-12);
            assert!(r.puts_per_call > 0.0);
            assert!(r.max_units.is_none());
        }
        assert!(report.best_vega_strike.is_some());
    }

    #[test]
    fn test_budget_max_units() {
        let report = build_grid(
            &BlackScholes::new(),
            &GridRequest { ratio: 0.1, budget: Some(1000.0), ..request() },
        )
        .unwrap();
        for r in &report.records {
            let units = r.max_units.unwrap();
            assert_eq!(units, (1000.0 / r.combination_cost()).floor());
            assert!(units * r.combination_cost() <= 1000.0);
        }
    }

    fn bare_record(strike_key: i64, vega_per_straddle: f64) -> StrikeRecord {
        StrikeRecord {
            strike: strike_key as f64,
            strike_key,
            call_price: 0.0,
            call_delta: 0.4,
            put_price: 0.0,
            put_delta: -0.6,
            vega: 12.0,
            distance_to_strike_pct: 0.0,
            puts_per_call: f64::NAN,
            call_break_even: f64::NAN,
            put_break_even: f64::NAN,
            vega_per_straddle,
            max_units: None,
        }
    }

    #[test]
    fn test_best_vega_strike_skips_nan_keeps_infinity() {
        let rows = [
            bare_record(90, 3.5),
            bare_record(100, f64::INFINITY),
            bare_record(110, f64::NAN),
            bare_record(120, 7.0),
        ];
        assert_eq!(best_vega_strike(&rows), Some(100));
        assert_eq!(best_vega_strike(&rows[2..]), Some(120));
        assert_eq!(best_vega_strike(&[bare_record(90, f64::NAN)]), None);
        assert_eq!(best_vega_strike(&[]), None);
    }

    #[test]
    fn test_zero_cost_combination_is_non_finite() {
        let mut record = bare_record(100, f64::NAN);
        record.derive_metrics(1.0, Some(500.0));
        assert!(record.puts_per_call.is_finite());
        assert!(!record.vega_per_straddle.is_finite(), "got {}", record.vega_per_straddle);
        assert!(!record.max_units.unwrap().is_finite());
    }

    #[test]
    fn test_vanishing_put_delta_propagates_without_failing_grid() {
        // Deep ITM call at tiny vol/time: put delta underflows to zero
        let req = GridRequest {
            spot: 100.0,
            volatility: 0.01,
            interest_rate: 0.05,
            years_to_expiry: 0.01,
            strike_start: 1.0,
            strike_end: 101.0,
            strike_step: 50.0,
            ratio: 1.0,
            eur_usd: 1.0,
            budget: None,
        };
        let report = build_grid(&BlackScholes::new(), &req).unwrap();
        assert_eq!(report.records.len(), 3);

        let deep = &report.records[0];
        assert_eq!(deep.put_delta, 0.0);
        assert!(deep.puts_per_call.is_infinite());
        assert!(!deep.vega_per_straddle.is_finite(), "got {}", deep.vega_per_straddle);
        assert_ne!(deep.vega_per_straddle, 0.0);
    }

    #[test]
    fn test_invalid_contract_fails_whole_grid() {
        let err = build_grid(&BlackScholes::new(), &GridRequest { volatility: 0.0, ..request() }).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { name: "volatility", .. }));
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let err = build_grid(&BlackScholes::new(), &GridRequest { ratio: 0.0, ..request() }).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { name: "ratio", .. }));
    }

    #[test]
    fn test_expected_price_in_report() {
        let report = build_grid(&BlackScholes::new(), &request()).unwrap();
        let expected = 100.0 * ((0.05 - 0.5 * 0.04) * 0.5f64).exp();
        assert!((report.expected_price_at_maturity - expected).abs() < 1e-12);
    }
}
