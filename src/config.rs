use std::env;
use std::time::Duration;

use crate::enums::NetworkMode;

#[derive(Debug, Clone)]
pub struct Config {
    pub network_mode: NetworkMode,
    pub database_url: String,
    pub wallet_mnemonic: String,
    pub server_host: String,
    pub server_port: u16,
    pub blockchair_api_key: Option<String>,
    pub nownodes_api_key: Option<String>,
    /// Address the explorers are probed with; the wallet's first address when unset.
    pub canary_address: Option<String>,
    pub status: StatusConfig,
}

/// Timing knobs of the status service.
#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub probe_timeout: Duration,
    pub refresh_interval: Duration,
    pub staleness: Duration,
    pub retry_backoff: Duration,
    pub daily_quota_reset: bool,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(10),
            refresh_interval: Duration::from_secs(300),
            staleness: Duration::from_secs(300),
            retry_backoff: Duration::from_secs(60),
            daily_quota_reset: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv::dotenv().ok();

        let network_mode = env::var("NETWORK_MODE")
            .unwrap_or_else(|_| "mainnet".to_string())
            .parse::<NetworkMode>()?;

        let database_url = env::var("DATABASE_URL")?;

        let wallet_mnemonic = env::var("WALLET_MNEMONIC")?;
        let word_count = wallet_mnemonic.split_whitespace().count();
        if word_count != 12 && word_count != 24 {
            return Err("WALLET_MNEMONIC must contain 12 or 24 words".into());
        }

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "5002".to_string())
            .parse()?;

        let blockchair_api_key = Self::optional("BLOCKCHAIR_API_KEY");
        let nownodes_api_key = Self::optional("NOWNODES_API_KEY");
        let canary_address = Self::optional("CANARY_ADDRESS");

        let defaults = StatusConfig::default();
        let status = StatusConfig {
            probe_timeout: Self::seconds("PROBE_TIMEOUT_SECS", defaults.probe_timeout)?,
            refresh_interval: Self::seconds("REFRESH_INTERVAL_SECS", defaults.refresh_interval)?,
            staleness: Self::seconds("STALENESS_SECS", defaults.staleness)?,
            retry_backoff: Self::seconds("RETRY_BACKOFF_SECS", defaults.retry_backoff)?,
            daily_quota_reset: env::var("QUOTA_DAILY_RESET")
                .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(defaults.daily_quota_reset),
        };

        if status.refresh_interval.is_zero() {
            return Err("REFRESH_INTERVAL_SECS must be greater than zero".into());
        }

        Ok(Config {
            network_mode,
            database_url,
            wallet_mnemonic,
            server_host,
            server_port,
            blockchair_api_key,
            nownodes_api_key,
            canary_address,
            status,
        })
    }

    /// Empty values count as unset.
    fn optional(key: &str) -> Option<String> {
        env::var(key)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn seconds(key: &str, default: Duration) -> Result<Duration, Box<dyn std::error::Error>> {
        match env::var(key) {
            Ok(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| format!("{} must be a whole number of seconds", key))?;
                Ok(Duration::from_secs(secs))
            }
            Err(_) => Ok(default),
        }
    }
}
