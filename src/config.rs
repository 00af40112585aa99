use crate::errors::{EngineError, EngineResult};

/// Runtime configuration. Defaults mirror what the strike-grid form pre-fills.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub default_ticker: String,
    pub market_data_base_url: String,
    pub history_days: u32,
    pub cache_ttl_secs: u64,
    /// Percent, e.g. 5.5
    pub default_risk_free_rate_pct: f64,
    /// Underlying shares per option unit
    pub default_ratio: f64,
    pub default_eur_usd: f64,
    pub default_strike_step: f64,
    pub default_expiry_weeks: i64,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_ticker: "AAPL".to_string(),
            market_data_base_url: "https://query1.finance.yahoo.com".to_string(),
            history_days: 90,
            cache_ttl_secs: 300,
            default_risk_free_rate_pct: 5.5,
            default_ratio: 0.1,
            default_eur_usd: 1.0,
            default_strike_step: 10.0,
            default_expiry_weeks: 20,
            server_port: 3001,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so parsing is testable
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();

        let cfg = Self {
            default_ticker: lookup("DEFAULT_TICKER").unwrap_or(d.default_ticker),
            market_data_base_url: lookup("MARKET_DATA_BASE_URL")
                .unwrap_or(d.market_data_base_url),
            history_days: parse_or(&lookup, "HISTORY_DAYS", d.history_days)?,
            cache_ttl_secs: parse_or(&lookup, "CACHE_TTL_SECS", d.cache_ttl_secs)?,
            default_risk_free_rate_pct: parse_or(
                &lookup,
                "DEFAULT_RISK_FREE_RATE_PCT",
                d.default_risk_free_rate_pct,
            )?,
            default_ratio: parse_or(&lookup, "DEFAULT_RATIO", d.default_ratio)?,
            default_eur_usd: parse_or(&lookup, "DEFAULT_EUR_USD", d.default_eur_usd)?,
            default_strike_step: parse_or(&lookup, "DEFAULT_STRIKE_STEP", d.default_strike_step)?,
            default_expiry_weeks: parse_or(&lookup, "DEFAULT_EXPIRY_WEEKS", d.default_expiry_weeks)?,
            server_port: parse_or(&lookup, "SERVER_PORT", d.server_port)?,
        };

        if cfg.history_days < 3 {
            return Err(EngineError::Config("HISTORY_DAYS: need at least 3 days".into()));
        }
        if !cfg.default_strike_step.is_finite() || cfg.default_strike_step <= 0.0 {
            return Err(EngineError::Config("DEFAULT_STRIKE_STEP: must be > 0".into()));
        }

        Ok(cfg)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> EngineResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| EngineError::Config(format!("{key}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let cfg = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(cfg.history_days, 90);
        assert_eq!(cfg.default_ratio, 0.1);
        assert_eq!(cfg.default_risk_free_rate_pct, 5.5);
        assert_eq!(cfg.server_port, 3001);
    }

    #[test]
    fn test_overrides_parsed() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DEFAULT_RATIO", "1.0"),
            ("SERVER_PORT", " 8080 "),
            ("MARKET_DATA_BASE_URL", "http://localhost:9000"),
        ]))
        .unwrap();
        assert_eq!(cfg.default_ratio, 1.0);
        assert_eq!(cfg.server_port, 8080);
        assert_eq!(cfg.market_data_base_url, "http://localhost:9000");
    }

    #[test]
    fn test_bad_value_names_key() {
        let err = AppConfig::from_lookup(lookup_from(&[("DEFAULT_EUR_USD", "lots")])).unwrap_err();
        assert!(err.to_string().contains("DEFAULT_EUR_USD"), "got: {err}");
    }

    #[test]
    fn test_zero_step_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("DEFAULT_STRIKE_STEP", "0")]));
        assert!(err.is_err());
    }
}
