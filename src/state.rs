use crate::config::AppConfig;
use crate::feeds::yahoo::YahooClient;
use crate::models::black_scholes::BlackScholes;
use portable_atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

// ── Performance Counters (lock-free) ──

pub struct PerfCounters {
    pub requests_served: AtomicU64,
    pub grids_built: AtomicU64,
    pub strikes_priced: AtomicU64,
    pub snapshots_fetched: AtomicU64,
    pub errors: AtomicU64,
}

impl PerfCounters {
    pub fn new() -> Self {
        Self {
            requests_served: AtomicU64::new(0),
            grids_built: AtomicU64::new(0),
            strikes_priced: AtomicU64::new(0),
            snapshots_fetched: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
}

// ── Application shared state ──

/// Read-only after startup apart from the counters and the market-data cache.
/// Each request builds its own grid inputs; nothing computed is retained.
pub struct AppState {
    pub config: AppConfig,
    pub market: YahooClient,
    pub model: BlackScholes,
    pub counters: PerfCounters,
}

impl AppState {
    pub fn new(config: AppConfig) -> Arc<Self> {
        let market = YahooClient::new(
            &config.market_data_base_url,
            config.history_days,
            Duration::from_secs(config.cache_ttl_secs),
        );

        Arc::new(Self {
            config,
            market,
            model: BlackScholes::new(),
            counters: PerfCounters::new(),
        })
    }
}
