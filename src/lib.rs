pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, ServerConfig};

pub use crate::config::script_config::ScriptConfig;
pub use crate::core::{
    client::{Client, HttpTransport},
    demo_service::DemoService,
    handler::Handler,
    script::{DemoScript, RunSummary, Step},
};
pub use crate::domain::model::{Fault, MethodCall, MethodResponse, Payload, Value};
pub use crate::utils::error::{Result, XmlRpcError};
