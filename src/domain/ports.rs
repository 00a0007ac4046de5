use crate::domain::model::{Fault, Value};
use crate::utils::error::Result;
use std::sync::Arc;

/// 傳送編碼好的請求，取回回應文件
pub trait Transport: Send + Sync {
    fn post(&self, body: String) -> impl std::future::Future<Output = Result<String>> + Send;
}

/// 一個可被遠端呼叫的方法
pub trait Method: Send + Sync {
    fn arity(&self) -> usize;
    fn call(&self, params: Vec<Value>) -> std::result::Result<Value, Fault>;
}

/// 一組方法，註冊時可經過名稱轉換
pub trait Service: Send + Sync {
    fn methods(&self) -> Vec<(String, Arc<dyn Method>)>;
}

pub trait ConfigProvider: Send + Sync {
    fn endpoint(&self) -> &str;
    fn timeout_seconds(&self) -> Option<u64>;
}
