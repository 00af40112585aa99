use crate::errors::{EngineError, EngineResult};
use crate::models::volatility::{summarize, DailyBar, MarketSnapshot};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 500;
const MAX_TICKER_LEN: usize = 16;

/// Yahoo Finance chart client. Fetches daily history and reduces it to a
/// `MarketSnapshot`. Snapshots are cached per ticker for `cache_ttl`.
pub struct YahooClient {
    client: Client,
    base_url: String,
    history_days: u32,
    cache_ttl: Duration,
    cache: Mutex<HashMap<String, (Instant, MarketSnapshot)>>,
}

impl YahooClient {
    pub fn new(base_url: &str, history_days: u32, cache_ttl: Duration) -> Self {
        Self {
            client: build_http_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            history_days,
            cache_ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Cached snapshot for `ticker`, fetching on miss or expiry.
    pub async fn snapshot(&self, ticker: &str) -> EngineResult<MarketSnapshot> {
        let ticker = normalize_ticker(ticker)?;

        if let Some(hit) = self.cached(&ticker) {
            tracing::debug!(ticker = %ticker, "market snapshot cache hit");
            return Ok(hit);
        }

        let bars = self.history_with_retry(&ticker).await?;
        let snapshot = summarize(&ticker, &bars)?;

        tracing::info!(
            ticker = %ticker,
            last = snapshot.last_price,
            vol_pct = snapshot.historical_volatility_pct,
            bars = snapshot.observations,
            "market snapshot fetched"
        );

        self.store(ticker, snapshot.clone());
        Ok(snapshot)
    }

    /// Inserts a fresh snapshot and evicts every expired entry.
    fn store(&self, ticker: String, snapshot: MarketSnapshot) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.retain(|_, (at, _)| at.elapsed() < self.cache_ttl);
            cache.insert(ticker, (Instant::now(), snapshot));
        }
    }

    fn cached(&self, ticker: &str) -> Option<MarketSnapshot> {
        let cache = self.cache.lock().ok()?;
        cache
            .get(ticker)
            .filter(|(at, _)| at.elapsed() < self.cache_ttl)
            .map(|(_, snap)| snap.clone())
    }

    async fn history_with_retry(&self, ticker: &str) -> EngineResult<Vec<DailyBar>> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_history(ticker).await {
                Ok(bars) => return Ok(bars),
                Err(e @ EngineError::Network(_)) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(
                        ticker = %ticker,
                        error = %e,
                        attempt = attempt,
                        "history fetch failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_history(&self, ticker: &str) -> EngineResult<Vec<DailyBar>> {
        let url = format!(
            "{}/v8/finance/chart/{}?range={}d&interval=1d",
            self.base_url, ticker, self.history_days
        );

        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            // Throttling and upstream faults are worth another attempt
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                EngineError::Network(format!("HTTP {status}: {body}"))
            } else {
                EngineError::MarketData(format!("{ticker}: HTTP {status}: {body}"))
            });
        }

        let body = resp.text().await?;
        parse_chart(ticker, &body)
    }
}

fn build_http_client() -> Client {
    match Client::builder()
        .timeout(Duration::from_secs(10))
        .user_agent("strike_grid/0.1")
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "http client builder failed, using defaults without timeout");
            Client::new()
        }
    }
}

// Chart response format (trimmed):
// {
//   "chart": {
//     "result": [{
//       "meta": { "symbol": "AAPL", ... },
//       "timestamp": [1717075800, ...],
//       "indicators": { "quote": [{ "high": [..], "low": [..], "close": [..] }] }
//     }],
//     "error": null
//   }
// }
// Individual bar values may be null on halted days.

#[derive(serde::Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(serde::Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(serde::Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(serde::Deserialize)]
struct ChartResult {
    indicators: Indicators,
}

#[derive(serde::Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(serde::Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Daily bars from a chart response body, skipping incomplete bars.
fn parse_chart(ticker: &str, body: &str) -> EngineResult<Vec<DailyBar>> {
    let data: ChartResponse = serde_json::from_str(body)?;

    if let Some(err) = data.chart.error {
        return Err(EngineError::MarketData(format!(
            "{ticker}: {} ({})",
            err.description.unwrap_or_default(),
            err.code.unwrap_or_default()
        )));
    }

    let series = data
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .and_then(|r| r.indicators.quote.into_iter().next())
        .ok_or_else(|| EngineError::MarketData(format!("{ticker}: empty chart response")))?;

    let bars: Vec<DailyBar> = series
        .close
        .iter()
        .zip(&series.high)
        .zip(&series.low)
        .filter_map(|((c, h), l)| match (c, h, l) {
            (Some(close), Some(high), Some(low)) => Some(DailyBar {
                high: *high,
                low: *low,
                close: *close,
            }),
            _ => None,
        })
        .collect();

    if bars.is_empty() {
        return Err(EngineError::MarketData(format!("{ticker}: no complete bars")));
    }
    Ok(bars)
}

/// Upper-cased ticker restricted to the characters exchanges actually use.
fn normalize_ticker(raw: &str) -> EngineResult<String> {
    let ticker = raw.trim().to_ascii_uppercase();
    let valid = !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if valid {
        Ok(ticker)
    } else {
        Err(EngineError::InvalidRequest(format!("invalid ticker: {raw:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chart_skips_null_bars() {
        let body = r#"{
            "chart": {
                "result": [{
                    "meta": { "symbol": "AAPL" },
                    "timestamp": [1, 2, 3, 4],
                    "indicators": { "quote": [{
                        "high":  [101.0, null, 103.0, 104.0],
                        "low":   [99.0,  null, 100.0, 101.0],
                        "close": [100.0, null, 102.0, 103.5],
                        "open":  [100.0, null, 101.0, 102.0]
                    }]}
                }],
                "error": null
            }
        }"#;
        let bars = parse_chart("AAPL", body).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[2], DailyBar { high: 104.0, low: 101.0, close: 103.5 });
    }

    #[test]
    fn test_parse_chart_error_payload() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart("ZZZZ", body).unwrap_err();
        assert!(matches!(err, EngineError::MarketData(_)));
        assert!(err.to_string().contains("delisted"), "got: {err}");
    }

    #[test]
    fn test_parse_chart_garbage() {
        assert!(matches!(parse_chart("AAPL", "not json"), Err(EngineError::Parse(_))));
    }

    fn snapshot_for(ticker: &str) -> MarketSnapshot {
        MarketSnapshot {
            ticker: ticker.to_string(),
            last_price: 100.0,
            period_high: 110.0,
            period_low: 90.0,
            trading_range_pct: (110.0 / 90.0 - 1.0) * 100.0,
            historical_volatility_pct: 20.0,
            observations: 60,
        }
    }

    #[test]
    fn test_store_evicts_expired_entries() {
        let client = YahooClient::new("http://localhost", 90, Duration::ZERO);
        client.store("AAPL".into(), snapshot_for("AAPL"));
        client.store("MSFT".into(), snapshot_for("MSFT"));

        let cache = client.cache.lock().unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key("MSFT"));
        drop(cache);
        assert!(client.cached("MSFT").is_none());
    }

    #[test]
    fn test_store_keeps_live_entries() {
        let client = YahooClient::new("http://localhost/", 90, Duration::from_secs(300));
        client.store("AAPL".into(), snapshot_for("AAPL"));
        client.store("MSFT".into(), snapshot_for("MSFT"));

        assert_eq!(client.cache.lock().unwrap().len(), 2);
        assert_eq!(client.cached("AAPL").unwrap().last_price, 100.0);
        assert_eq!(client.base_url, "http://localhost");
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_ticker("BRK-B").unwrap(), "BRK-B");
        assert_eq!(normalize_ticker("^gspc").unwrap(), "^GSPC");
        assert!(normalize_ticker("").is_err());
        assert!(normalize_ticker("../etc").is_err());
        assert!(normalize_ticker("A B").is_err());
    }
}
