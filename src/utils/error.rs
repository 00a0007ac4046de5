use crate::domain::model::Fault;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlRpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {message}")]
    Xml { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Remote fault: {0}")]
    Fault(Fault),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Protocol,
    Remote,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl XmlRpcError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Http(_) | Self::HttpStatus { .. } => ErrorCategory::Transport,
            Self::Xml { .. } | Self::Decode { .. } | Self::Encode { .. } => {
                ErrorCategory::Protocol
            }
            Self::Fault(_) => ErrorCategory::Remote,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::Io(_) | Self::Serialization(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 連線失敗通常重試即可
            ErrorCategory::Transport => ErrorSeverity::Medium,
            ErrorCategory::Protocol | ErrorCategory::Remote => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Http(_) => "Check that the XML-RPC server is running and the URL is reachable",
            Self::HttpStatus { .. } => "Check the endpoint path, the server rejected the request",
            Self::Xml { .. } | Self::Decode { .. } => {
                "The peer sent a malformed XML-RPC document"
            }
            Self::Encode { .. } => "Only finite numbers and well-formed values can be sent",
            Self::Fault(_) => "The remote method reported a fault, check its name and arguments",
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Fix the command line flags or the script file",
            Self::Io(_) => "Check file paths and permissions",
            Self::Serialization(_) => "Result could not be rendered as JSON",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Http(e) if e.is_connect() => {
                "Could not connect to the XML-RPC server".to_string()
            }
            Self::Http(e) if e.is_timeout() => "The XML-RPC server did not answer in time".to_string(),
            Self::Fault(fault) => format!("Server fault: {}", fault),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, XmlRpcError>;
