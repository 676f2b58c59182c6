pub mod probe;
pub mod registry;
pub mod explorers;
pub mod rates;

pub use probe::{ AddressBalance, ProviderProbe };
pub use registry::ProviderRegistry;
