use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::prelude::Decimal;

use crate::enums::ProviderId;
use crate::error::{ ProbeError, ProbeResult };
use crate::providers::probe::{ decode, fetch_body, parse_decimal };
use crate::providers::ProviderProbe;

const COINGECKO_API_BASE: &str = "https://api.coingecko.com/api/v3";

pub struct CoinGeckoRate {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGeckoRate {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, COINGECKO_API_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn parse_price(body: &str) -> ProbeResult<Decimal> {
        // {"litecoin":{"usd":89.5}}; numbers are kept as text to avoid f64 rounding.
        let prices: HashMap<String, HashMap<String, serde_json::Number>> = decode(body)?;

        let usd = prices
            .get("litecoin")
            .and_then(|p| p.get("usd"))
            .ok_or_else(|| ProbeError::Malformed("litecoin.usd missing".to_string()))?;

        parse_decimal(&usd.to_string())
    }
}

#[async_trait]
impl ProviderProbe for CoinGeckoRate {
    fn id(&self) -> ProviderId {
        ProviderId::CoinGecko
    }

    async fn probe_rate(&self) -> ProbeResult<Decimal> {
        let url = format!("{}/simple/price", self.base_url);
        let request = self.client.get(&url).query(
            &[
                ("ids", "litecoin"),
                ("vs_currencies", "usd"),
            ]
        );

        let body = fetch_body(request).await?;
        Self::parse_price(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_price() {
        let rate = CoinGeckoRate::parse_price(r#"{"litecoin":{"usd":89.37}}"#).unwrap();
        assert_eq!(rate, Decimal::from_str("89.37").unwrap());
    }

    #[test]
    fn test_parse_price_missing_coin() {
        assert!(CoinGeckoRate::parse_price(r#"{}"#).is_err());
    }
}
