use std::str::FromStr;

use async_trait::async_trait;
use sea_orm::prelude::Decimal;
use serde::{ de::DeserializeOwned, Deserialize, Serialize };

use crate::enums::ProviderId;
use crate::error::{ ProbeError, ProbeResult };

/// Litoshi per LTC.
const LITOSHI_DECIMALS: u32 = 8;

/// Balance of one address as reported by an explorer, in whole LTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressBalance {
    pub balance: Decimal,
    /// `None` when the explorer does not report it.
    pub transaction_count: Option<u64>,
}

/// One external provider. Explorers implement `probe_balance`, rate sources
/// implement `probe_rate`; the other capability reports `Unsupported`.
#[async_trait]
pub trait ProviderProbe: Send + Sync {
    fn id(&self) -> ProviderId;

    async fn probe_balance(&self, _address: &str) -> ProbeResult<AddressBalance> {
        Err(ProbeError::Unsupported)
    }

    /// LTC price in USD.
    async fn probe_rate(&self) -> ProbeResult<Decimal> {
        Err(ProbeError::Unsupported)
    }

    /// Replace the API key used for later requests. `None` clears it.
    async fn set_api_key(&self, _api_key: Option<String>) -> ProbeResult<()> {
        Err(ProbeError::Unsupported)
    }
}

/// Send the request and return the body of a 2xx response.
pub(crate) async fn fetch_body(request: reqwest::RequestBuilder) -> ProbeResult<String> {
    let response = request.send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProbeError::Http(status.as_u16()));
    }

    Ok(response.text().await?)
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str) -> ProbeResult<T> {
    serde_json::from_str(body).map_err(|e| ProbeError::Malformed(e.to_string()))
}

pub(crate) fn parse_decimal(raw: &str) -> ProbeResult<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e|
        ProbeError::Malformed(format!("invalid amount '{}': {}", raw, e))
    )
}

pub(crate) fn litoshi_to_ltc(litoshi: i64) -> Decimal {
    Decimal::new(litoshi, LITOSHI_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_litoshi_conversion() {
        assert_eq!(litoshi_to_ltc(150_000_000), Decimal::from_str("1.5").unwrap());
        assert_eq!(litoshi_to_ltc(1), Decimal::from_str("0.00000001").unwrap());
        assert_eq!(litoshi_to_ltc(0), Decimal::ZERO);
    }

    #[test]
    fn test_parse_decimal_rejects_garbage() {
        assert_eq!(parse_decimal(" 89.50000000 ").unwrap(), Decimal::from_str("89.5").unwrap());
        assert!(matches!(parse_decimal("n/a"), Err(ProbeError::Malformed(_))));
    }
}
