use crate::core::handler::{expect_str, FnMethod};
use crate::domain::model::{Fault, Value};
use crate::domain::ports::{Method, Service};
use std::collections::BTreeMap;
use std::sync::Arc;

/// 示範伺服器提供的方法，用來配合客戶端腳本
#[derive(Debug, Clone)]
pub struct DemoService {
    name: String,
}

impl DemoService {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn say_hello(&self, who: &str) -> String {
        format!("{} say Hello to {}", self.name, who)
    }
}

impl Default for DemoService {
    fn default() -> Self {
        Self::new("MyName")
    }
}

fn unary<F>(method: &'static str, f: F) -> (String, Arc<dyn Method>)
where
    F: Fn(&str) -> Value + Send + Sync + 'static,
{
    let wrapped = FnMethod::new(1, move |params: Vec<Value>| -> Result<Value, Fault> {
        let arg = expect_str(method, &params, 0)?;
        Ok(f(arg))
    });
    let wrapped: Arc<dyn Method> = Arc::new(wrapped);
    (method.to_string(), wrapped)
}

impl Service for DemoService {
    fn methods(&self) -> Vec<(String, Arc<dyn Method>)> {
        let this = self.clone();
        vec![
            unary("SayHello", move |who| Value::String(this.say_hello(who))),
            unary("RetStrs", |s| {
                Value::Array(vec![
                    Value::from(s),
                    Value::from(s.to_lowercase()),
                    Value::from(s.to_uppercase()),
                ])
            }),
            // 兩個回傳值，客戶端收到陣列
            unary("RetIntStr", |s| {
                Value::Array(vec![Value::from(s.chars().count()), Value::from(s)])
            }),
            unary("RetMapIS", |s| {
                Value::Struct(
                    s.chars()
                        .enumerate()
                        .map(|(i, c)| (i.to_string(), Value::String(c.to_string())))
                        .collect(),
                )
            }),
            unary("RetMapSS", |s| {
                let mut members = BTreeMap::new();
                members.insert("lower".to_string(), Value::from(s.to_lowercase()));
                members.insert("upper".to_string(), Value::from(s.to_uppercase()));
                Value::Struct(members)
            }),
            unary("RetStruct", |s| {
                let mut members = BTreeMap::new();
                members.insert("Name".to_string(), Value::from(s));
                members.insert("Len".to_string(), Value::from(s.chars().count()));
                Value::Struct(members)
            }),
        ]
    }
}
