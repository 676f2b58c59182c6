pub mod provider_stats;
pub mod generated_address;

pub use provider_stats::Entity as ProviderStats;
pub use generated_address::Entity as GeneratedAddress;
