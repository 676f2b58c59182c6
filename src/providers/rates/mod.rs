mod binance;
mod coingecko;
mod kraken;

pub use binance::BinanceRate;
pub use coingecko::CoinGeckoRate;
pub use kraken::KrakenRate;
