use crate::errors::{EngineError, EngineResult};
use crate::grid::analyzer::build_grid;
use crate::grid::strikes::default_strike_range;
use crate::grid::{GridReport, GridRequest};
use crate::models::volatility::MarketSnapshot;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::Json;
use chrono::NaiveDate;
use portable_atomic::Ordering::Relaxed;
use std::sync::Arc;

const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Default, serde::Deserialize)]
pub struct QuoteQuery {
    pub ticker: Option<String>,
}

/// Form inputs for one grid. Percent fields are converted to fractions
/// before they reach the pricer.
#[derive(Debug, Default, serde::Deserialize)]
pub struct GridQuery {
    pub ticker: Option<String>,
    /// Overrides the last traded price
    pub spot: Option<f64>,
    /// Overrides the historical volatility, percent
    pub volatility_pct: Option<f64>,
    pub rate_pct: Option<f64>,
    pub ratio: Option<f64>,
    pub eur_usd: Option<f64>,
    /// Expiry date (YYYY-MM-DD); `days` wins when both are given
    pub expiry: Option<NaiveDate>,
    pub days: Option<i64>,
    pub strike_start: Option<f64>,
    pub strike_end: Option<f64>,
    pub strike_step: Option<f64>,
    pub budget: Option<f64>,
}

#[derive(Debug, serde::Serialize)]
pub struct GridResponse {
    pub snapshot: Option<MarketSnapshot>,
    pub spot: f64,
    pub volatility_pct: f64,
    pub rate_pct: f64,
    pub days_to_expiry: i64,
    pub ratio: f64,
    pub eur_usd: f64,
    #[serde(flatten)]
    pub report: GridReport,
}

/// GET /api/health
pub async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/quote -- price-history summary for one ticker
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QuoteQuery>,
) -> EngineResult<Json<MarketSnapshot>> {
    state.counters.requests_served.fetch_add(1, Relaxed);
    let ticker = params.ticker.unwrap_or_else(|| state.config.default_ticker.clone());

    let result = state.market.snapshot(&ticker).await;
    record_outcome(&state, &result);
    if result.is_ok() {
        state.counters.snapshots_fetched.fetch_add(1, Relaxed);
    }
    result.map(Json)
}

/// GET /api/grid -- strike grid for market data plus overrides
pub async fn get_grid(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GridQuery>,
) -> EngineResult<Json<GridResponse>> {
    state.counters.requests_served.fetch_add(1, Relaxed);

    let result = grid_response(&state, params).await;
    record_outcome(&state, &result);
    result.map(Json)
}

/// GET /api/counters -- performance counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "requests_served": state.counters.requests_served.load(Relaxed),
        "grids_built": state.counters.grids_built.load(Relaxed),
        "strikes_priced": state.counters.strikes_priced.load(Relaxed),
        "snapshots_fetched": state.counters.snapshots_fetched.load(Relaxed),
        "errors": state.counters.errors.load(Relaxed),
    }))
}

async fn grid_response(state: &AppState, q: GridQuery) -> EngineResult<GridResponse> {
    let cfg = &state.config;

    // Market data only when an override is missing
    let snapshot = match (q.spot, q.volatility_pct) {
        (Some(_), Some(_)) => None,
        _ => {
            let ticker = q.ticker.as_deref().unwrap_or(&cfg.default_ticker);
            let snap = state.market.snapshot(ticker).await?;
            state.counters.snapshots_fetched.fetch_add(1, Relaxed);
            Some(snap)
        }
    };

    let (spot, volatility_pct) = match &snapshot {
        Some(s) => (
            q.spot.unwrap_or(s.last_price),
            q.volatility_pct.unwrap_or(s.historical_volatility_pct),
        ),
        None => (q.spot.unwrap_or_default(), q.volatility_pct.unwrap_or_default()),
    };

    let rate_pct = q.rate_pct.unwrap_or(cfg.default_risk_free_rate_pct);
    let ratio = q.ratio.unwrap_or(cfg.default_ratio);
    let eur_usd = q.eur_usd.unwrap_or(cfg.default_eur_usd);
    let days_to_expiry = resolve_days(
        q.days,
        q.expiry,
        chrono::Utc::now().date_naive(),
        cfg.default_expiry_weeks,
    );

    let strike_step = q.strike_step.unwrap_or(cfg.default_strike_step);
    let (default_start, default_end) = default_strike_range(spot, strike_step);

    let request = GridRequest {
        spot,
        volatility: volatility_pct / 100.0,
        interest_rate: rate_pct / 100.0,
        years_to_expiry: days_to_expiry as f64 / DAYS_PER_YEAR,
        strike_start: q.strike_start.unwrap_or(default_start),
        strike_end: q.strike_end.unwrap_or(default_end),
        strike_step,
        ratio,
        eur_usd,
        budget: q.budget,
    };

    let report = build_grid(&state.model, &request)?;

    state.counters.grids_built.fetch_add(1, Relaxed);
    state
        .counters
        .strikes_priced
        .fetch_add(report.records.len() as u64, Relaxed);

    tracing::info!(
        spot = spot,
        vol_pct = volatility_pct,
        days = days_to_expiry,
        rows = report.records.len(),
        "grid served"
    );

    Ok(GridResponse {
        snapshot,
        spot,
        volatility_pct,
        rate_pct,
        days_to_expiry,
        ratio,
        eur_usd,
        report,
    })
}

/// Days until expiry: explicit days, else the date, else the default horizon.
fn resolve_days(
    days: Option<i64>,
    expiry: Option<NaiveDate>,
    today: NaiveDate,
    default_weeks: i64,
) -> i64 {
    match (days, expiry) {
        (Some(d), _) => d,
        (None, Some(date)) => (date - today).num_days(),
        (None, None) => default_weeks * 7,
    }
}

fn record_outcome<T>(state: &AppState, result: &Result<T, EngineError>) {
    if let Err(e) = result {
        state.counters.errors.fetch_add(1, Relaxed);
        tracing::warn!(error = %e, status = %e.status(), "request failed");
    }
}
