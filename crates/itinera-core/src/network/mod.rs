mod client;
mod config;

pub use client::{join_url, ClientError, ClientResult, ProviderClient};
pub use config::{NetworkConfig, NetworkConfigError};
