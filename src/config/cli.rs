use super::DEFAULT_URL;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_positive_number, validate_rpc_path, validate_url, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "small-xmlrpc")]
#[command(about = "Run the XML-RPC demo script against a server")]
pub struct CliConfig {
    #[arg(long, help = "Server URL (default: http://127.0.0.1:2345/rpc)")]
    pub url: Option<String>,

    #[arg(long, help = "TOML file with the steps to run")]
    pub script: Option<String>,

    #[arg(long, help = "Also run the calls added in later versions of the demo")]
    pub extended: bool,

    #[arg(long, help = "Print faults and continue instead of stopping")]
    pub keep_going: bool,

    #[arg(long, help = "Print results as JSON")]
    pub json: bool,

    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ConfigProvider for CliConfig {
    fn endpoint(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_URL)
    }

    fn timeout_seconds(&self) -> Option<u64> {
        self.timeout_seconds
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("url", self.endpoint())?;
        if let Some(timeout) = self.timeout_seconds {
            validate_positive_number("timeout_seconds", timeout as usize, 1)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "demo_server")]
#[command(about = "XML-RPC demo server for the client script")]
pub struct ServerConfig {
    #[arg(long = "bind-all", help = "Bind to all interfaces (0.0.0.0) instead of localhost only")]
    pub bind_all: bool,

    #[arg(short = 'p', long = "port", default_value = "2345")]
    pub port: u16,

    #[arg(long, default_value = "/rpc")]
    pub path: String,

    #[arg(long, default_value = "MyName", help = "Name used in SayHello replies")]
    pub name: String,

    #[arg(long = "json-logs", help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl ServerConfig {
    pub fn bind_ip(&self) -> [u8; 4] {
        if self.bind_all {
            [0, 0, 0, 0]
        } else {
            [127, 0, 0, 1]
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        validate_rpc_path("path", &self.path)?;
        validate_positive_number("port", self.port as usize, 1)
    }
}
