pub mod config;
pub mod enums;
pub mod error;
pub mod crypto;
pub mod db;
pub mod providers;
pub mod wallet;
pub mod services;
pub mod api;
pub mod scheduler;

pub use config::Config;
pub use enums::{ NetworkMode, ProviderId, ProviderKind };
pub use error::{ AppError, Result };
