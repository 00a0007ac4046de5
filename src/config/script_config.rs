use crate::core::script::{DemoScript, Step};
use crate::domain::model::Value;
use crate::utils::error::{Result, XmlRpcError};
use crate::utils::validation::{validate_non_empty_string, validate_url, Validate};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    pub script: Option<ScriptInfo>,
    pub endpoint: Option<String>,
    pub keep_going: Option<bool>,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptInfo {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Dump,
    Call,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    pub kind: StepKind,
    /// call 的方法名稱；dump 時為 methodName，省略則編碼為回應
    pub method: Option<String>,
    #[serde(default)]
    pub params: Vec<toml::Value>,
}

impl ScriptConfig {
    /// 從 TOML 檔案載入腳本
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析腳本
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| XmlRpcError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RPC_HOST})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| XmlRpcError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 轉成可執行的腳本
    pub fn to_script(&self) -> Result<DemoScript> {
        let steps = self
            .steps
            .iter()
            .map(|step| {
                let params = step
                    .params
                    .iter()
                    .map(toml_to_value)
                    .collect::<Result<Vec<_>>>()?;
                Ok(match step.kind {
                    StepKind::Dump => Step::Dump {
                        method_name: step.method.clone(),
                        params,
                    },
                    StepKind::Call => Step::Call {
                        method: step.method.clone().unwrap_or_default(),
                        params,
                    },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DemoScript::new(steps).with_keep_going(self.keep_going.unwrap_or(false)))
    }
}

impl Validate for ScriptConfig {
    fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.endpoint {
            validate_url("endpoint", endpoint)?;
        }

        if self.steps.is_empty() {
            return Err(XmlRpcError::MissingConfigError {
                field: "steps".to_string(),
            });
        }

        for (i, step) in self.steps.iter().enumerate() {
            if step.kind == StepKind::Call {
                let field = format!("steps[{}].method", i);
                match &step.method {
                    Some(method) => validate_non_empty_string(&field, method)?,
                    None => return Err(XmlRpcError::MissingConfigError { field }),
                }
            }
        }

        Ok(())
    }
}

/// TOML 值對應到 XML-RPC 值
pub fn toml_to_value(value: &toml::Value) -> Result<Value> {
    Ok(match value {
        toml::Value::String(s) => Value::String(s.clone()),
        toml::Value::Integer(i) => Value::Int(*i),
        toml::Value::Float(f) => Value::Double(*f),
        toml::Value::Boolean(b) => Value::Boolean(*b),
        toml::Value::Datetime(dt) => Value::DateTime(parse_toml_datetime(&dt.to_string())?),
        toml::Value::Array(items) => {
            Value::Array(items.iter().map(toml_to_value).collect::<Result<Vec<_>>>()?)
        }
        toml::Value::Table(table) => Value::Struct(
            table
                .iter()
                .map(|(k, v)| Ok((k.clone(), toml_to_value(v)?)))
                .collect::<Result<_>>()?,
        ),
    })
}

fn parse_toml_datetime(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(raw).map(|dt| dt.naive_local()))
        .map_err(|_| XmlRpcError::InvalidConfigValueError {
            field: "params".to_string(),
            value: raw.to_string(),
            reason: "Datetime must carry both a date and a time".to_string(),
        })
}
