use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::prelude::Decimal;
use serde::Deserialize;

use crate::enums::ProviderId;
use crate::error::{ ProbeError, ProbeResult };
use crate::providers::probe::{ decode, fetch_body, parse_decimal };
use crate::providers::ProviderProbe;

const KRAKEN_API_BASE: &str = "https://api.kraken.com/0/public";

pub struct KrakenRate {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct TickerResponse {
    #[serde(default)]
    error: Vec<String>,
    #[serde(default)]
    result: HashMap<String, PairTicker>,
}

#[derive(Deserialize)]
struct PairTicker {
    /// Last trade closed: [price, lot volume].
    c: Vec<String>,
}

impl KrakenRate {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, KRAKEN_API_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn parse_ticker(body: &str) -> ProbeResult<Decimal> {
        let response: TickerResponse = decode(body)?;

        if !response.error.is_empty() {
            return Err(ProbeError::Malformed(response.error.join("; ")));
        }

        // Kraken renames the pair (LTCUSD -> XLTCZUSD); there is only one.
        let last = response.result
            .values()
            .next()
            .and_then(|ticker| ticker.c.first())
            .ok_or_else(|| ProbeError::Malformed("no ticker in result".to_string()))?;

        parse_decimal(last)
    }
}

#[async_trait]
impl ProviderProbe for KrakenRate {
    fn id(&self) -> ProviderId {
        ProviderId::Kraken
    }

    async fn probe_rate(&self) -> ProbeResult<Decimal> {
        let url = format!("{}/Ticker", self.base_url);
        let body = fetch_body(self.client.get(&url).query(&[("pair", "LTCUSD")])).await?;
        Self::parse_ticker(&body)
    }
}
