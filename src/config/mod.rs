#[cfg(feature = "cli")]
pub mod cli;
pub mod script_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, ServerConfig};

pub const DEFAULT_URL: &str = "http://127.0.0.1:2345/rpc";
