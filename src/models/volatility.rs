use crate::errors::{EngineError, EngineResult};

/// Trading days per year used to annualize daily return volatility.
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Minimum closes needed for a sample standard deviation of returns.
const MIN_CLOSES: usize = 3;

/// One daily bar from the market-data provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyBar {
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Summary of the recent price history of one underlying.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MarketSnapshot {
    pub ticker: String,
    pub last_price: f64,
    pub period_high: f64,
    pub period_low: f64,
    pub trading_range_pct: f64,
    /// Annualized, in percent (e.g. 27.4)
    pub historical_volatility_pct: f64,
    pub observations: usize,
}

/// Annualized historical volatility in percent.
///
/// Simple daily returns c[i]/c[i-1] - 1, sample standard deviation (n - 1),
/// scaled by sqrt(252).
pub fn historical_volatility_pct(closes: &[f64]) -> EngineResult<f64> {
    if closes.len() < MIN_CLOSES {
        return Err(EngineError::MarketData(format!(
            "need at least {MIN_CLOSES} closes, got {}",
            closes.len()
        )));
    }
    if let Some(bad) = closes.iter().find(|c| !c.is_finite() || **c <= 0.0) {
        return Err(EngineError::MarketData(format!("invalid close: {bad}")));
    }

    let returns: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;

    let mut var_sum: f64 = 0.0;
    for r in &returns {
        let d = r - mean;
        var_sum += d * d;
    }
    let variance = var_sum / (n - 1.0);

    Ok(variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt() * 100.0)
}

/// Reduce a bar history to the snapshot the pricing form starts from.
pub fn summarize(ticker: &str, bars: &[DailyBar]) -> EngineResult<MarketSnapshot> {
    let last = bars
        .last()
        .ok_or_else(|| EngineError::MarketData(format!("no price history for {ticker}")))?;

    let period_high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    let period_low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    if period_low <= 0.0 || !period_low.is_finite() || !period_high.is_finite() {
        return Err(EngineError::MarketData(format!(
            "invalid high/low range for {ticker}: {period_low}..{period_high}"
        )));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let historical_volatility_pct = historical_volatility_pct(&closes)?;

    Ok(MarketSnapshot {
        ticker: ticker.to_string(),
        last_price: last.close,
        period_high,
        period_low,
        trading_range_pct: (period_high / period_low - 1.0) * 100.0,
        historical_volatility_pct,
        observations: bars.len(),
    })
}
