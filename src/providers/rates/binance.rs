use async_trait::async_trait;
use sea_orm::prelude::Decimal;
use serde::Deserialize;

use crate::enums::ProviderId;
use crate::error::ProbeResult;
use crate::providers::probe::{ decode, fetch_body, parse_decimal };
use crate::providers::ProviderProbe;

const BINANCE_API_BASE: &str = "https://api.binance.com/api/v3";
const LTC_USD_PAIR: &str = "LTCUSDT";

pub struct BinanceRate {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct TickerPrice {
    price: String,
}

impl BinanceRate {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, BINANCE_API_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn parse_ticker(body: &str) -> ProbeResult<Decimal> {
        let ticker: TickerPrice = decode(body)?;
        parse_decimal(&ticker.price)
    }
}

#[async_trait]
impl ProviderProbe for BinanceRate {
    fn id(&self) -> ProviderId {
        ProviderId::Binance
    }

    async fn probe_rate(&self) -> ProbeResult<Decimal> {
        let url = format!("{}/ticker/price", self.base_url);
        let body = fetch_body(self.client.get(&url).query(&[("symbol", LTC_USD_PAIR)])).await?;
        Self::parse_ticker(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_ticker() {
        let rate = BinanceRate::parse_ticker(
            r#"{"symbol":"LTCUSDT","price":"89.50000000"}"#
        ).unwrap();
        assert_eq!(rate, Decimal::from_str("89.5").unwrap());
    }

    #[test]
    fn test_parse_ticker_error_payload() {
        assert!(BinanceRate::parse_ticker(r#"{"code":-1121,"msg":"Invalid symbol."}"#).is_err());
    }
}
