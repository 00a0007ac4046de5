pub mod client;
pub mod demo_service;
pub mod handler;
pub mod marshal;
pub mod script;
pub mod server;
pub mod token;
pub mod unmarshal;

pub use crate::domain::model::{Fault, MethodCall, MethodResponse, Payload, Value};
pub use crate::domain::ports::{ConfigProvider, Method, Service, Transport};
pub use crate::utils::error::Result;
