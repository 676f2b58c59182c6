pub mod status_service;
pub mod address_service;

pub use status_service::{ ProviderStatus, StatusService, SystemStatusSnapshot };
pub use address_service::{ AddressService, BalanceCheck };
