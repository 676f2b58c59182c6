mod blockchair;
mod nownodes;
mod sochain;

pub use blockchair::BlockchairExplorer;
pub use nownodes::NownodesExplorer;
pub use sochain::SochainExplorer;
