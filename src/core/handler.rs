use crate::core::marshal::{encode_fault, encode_response};
use crate::core::unmarshal::decode;
use crate::domain::model::{Fault, MethodCall, Payload, Value};
use crate::domain::ports::{Method, Service};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

// semi-standard XML-RPC fault codes
pub const ERR_NOT_WELL_FORMED: i32 = -32700;
pub const ERR_INVALID_REQUEST: i32 = -32600;
pub const ERR_UNKNOWN_METHOD: i32 = -32601;
pub const ERR_INVALID_PARAMS: i32 = -32602;
pub const ERR_INTERNAL: i32 = -32603;

pub const LIST_METHODS: &str = "system.listMethods";

/// 以閉包實作的方法
pub struct FnMethod<F> {
    arity: usize,
    func: F,
}

impl<F> FnMethod<F>
where
    F: Fn(Vec<Value>) -> Result<Value, Fault> + Send + Sync,
{
    pub fn new(arity: usize, func: F) -> Self {
        Self { arity, func }
    }
}

impl<F> Method for FnMethod<F>
where
    F: Fn(Vec<Value>) -> Result<Value, Fault> + Send + Sync,
{
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, params: Vec<Value>) -> Result<Value, Fault> {
        (self.func)(params)
    }
}

struct Registered {
    method: Arc<dyn Method>,
    pad_params: bool,
}

/// XML-RPC 方法名稱到實作的對照表
#[derive(Default)]
pub struct Handler {
    methods: HashMap<String, Registered>,
    names: BTreeSet<String>,
}

impl Handler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_fn<F>(&mut self, name: &str, arity: usize, func: F)
    where
        F: Fn(Vec<Value>) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        self.insert(name.to_string(), Arc::new(FnMethod::new(arity, func)), false);
    }

    /// 註冊服務的所有方法。mapper 可改名，回傳 None 則略過該方法
    pub fn register<S: Service + ?Sized>(
        &mut self,
        service: &S,
        mapper: Option<&dyn Fn(&str) -> Option<String>>,
        pad_params: bool,
    ) {
        for (name, method) in service.methods() {
            let name = match mapper {
                None => name,
                Some(map) => match map(&name) {
                    Some(mapped) if !mapped.is_empty() => mapped,
                    _ => {
                        tracing::debug!("Skipping method {}", name);
                        continue;
                    }
                },
            };
            self.insert(name, method, pad_params);
        }
    }

    fn insert(&mut self, name: String, method: Arc<dyn Method>, pad_params: bool) {
        let lower = name.to_lowercase();
        if lower != name {
            self.methods.insert(
                lower,
                Registered {
                    method: Arc::clone(&method),
                    pad_params,
                },
            );
        }
        self.methods.insert(name.clone(), Registered { method, pad_params });
        self.names.insert(name);
    }

    /// 已註冊的方法名稱（不含小寫別名），依字母排序
    pub fn method_list(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }

    /// 處理一份請求文件，永遠回傳一份回應文件
    pub fn handle(&self, body: &str) -> String {
        let call = match decode(body) {
            Ok(Payload::Call(call)) => call,
            Ok(Payload::Response(_)) => {
                return self.fault(Fault::new(
                    ERR_INVALID_REQUEST,
                    "Invalid request: expected <methodCall>",
                ))
            }
            Err(e) => {
                return self.fault(Fault::new(
                    ERR_NOT_WELL_FORMED,
                    format!("Unmarshal error: {}", e),
                ))
            }
        };

        let method_name = call.method_name.clone();
        tracing::debug!("Dispatching {} ({} params)", method_name, call.params.len());

        let result = match self.dispatch(call) {
            Ok(value) => value,
            Err(fault) => return self.fault(fault),
        };

        match encode_response(&[result]) {
            Ok(xml) => xml,
            Err(e) => self.fault(Fault::new(
                ERR_INTERNAL,
                format!("Failed to marshal {}: {}", method_name, e),
            )),
        }
    }

    fn dispatch(&self, call: MethodCall) -> Result<Value, Fault> {
        let MethodCall {
            method_name,
            mut params,
        } = call;

        if method_name == LIST_METHODS {
            let mut names = self.method_list();
            names.push(LIST_METHODS.to_string());
            return Ok(Value::Array(names.into_iter().map(Value::String).collect()));
        }

        let registered = self.methods.get(&method_name).ok_or_else(|| {
            Fault::new(
                ERR_UNKNOWN_METHOD,
                format!("Unknown method \"{}\"", method_name),
            )
        })?;

        let expected = registered.method.arity();
        if params.len() != expected {
            if !registered.pad_params || params.len() > expected {
                return Err(Fault::new(
                    ERR_INVALID_PARAMS,
                    format!(
                        "Bad number of parameters for method \"{}\", ({} != {})",
                        method_name,
                        params.len(),
                        expected
                    ),
                ));
            }
            params.resize(expected, Value::Nil);
        }

        registered.method.call(params)
    }

    fn fault(&self, fault: Fault) -> String {
        tracing::warn!("Returning fault: {}", fault);
        encode_fault(&fault)
    }
}

fn bad_argument(method: &str, index: usize, got: &Value, want: &str) -> Fault {
    Fault::new(
        ERR_INVALID_PARAMS,
        format!(
            "Bad {} argument #{} ({} should be {})",
            method,
            index,
            got.type_name(),
            want
        ),
    )
}

/// 取出字串參數；補齊的 Nil 參數視為空字串
pub fn expect_str<'a>(method: &str, params: &'a [Value], index: usize) -> Result<&'a str, Fault> {
    match params.get(index) {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Nil) | None => Ok(""),
        Some(other) => Err(bad_argument(method, index, other, "string")),
    }
}

/// 取出整數參數；補齊的 Nil 參數視為 0
pub fn expect_i64(method: &str, params: &[Value], index: usize) -> Result<i64, Fault> {
    match params.get(index) {
        Some(Value::Int(i)) => Ok(*i),
        Some(Value::Nil) | None => Ok(0),
        Some(other) => Err(bad_argument(method, index, other, "int")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::marshal::encode_call;
    use crate::core::unmarshal::decode_response;
    use crate::domain::model::MethodResponse;

    struct Calc;

    impl Service for Calc {
        fn methods(&self) -> Vec<(String, Arc<dyn Method>)> {
            vec![
                (
                    "Add".to_string(),
                    Arc::new(FnMethod::new(2, |p: Vec<Value>| {
                        Ok(Value::Int(expect_i64("Add", &p, 0)? + expect_i64("Add", &p, 1)?))
                    })) as Arc<dyn Method>,
                ),
                (
                    "Del".to_string(),
                    Arc::new(FnMethod::new(0, |_| Ok(Value::Nil))) as Arc<dyn Method>,
                ),
            ]
        }
    }

    fn call(handler: &Handler, method: &str, params: Vec<Value>) -> MethodResponse {
        let body = encode_call(method, &params).unwrap();
        decode_response(&handler.handle(&body)).unwrap()
    }

    fn fault_code(response: MethodResponse) -> i32 {
        match response {
            MethodResponse::Fault(fault) => fault.code,
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_register_fn_and_call() {
        let mut handler = Handler::new();
        handler.register_fn("B", 1, |p| Ok(p[0].clone()));
        assert_eq!(
            call(&handler, "B", vec![Value::from("data")]),
            MethodResponse::Params(vec![Value::from("data")])
        );
        // lowercase alias
        assert_eq!(
            call(&handler, "b", vec![Value::from("data")]),
            MethodResponse::Params(vec![Value::from("data")])
        );
    }

    #[test]
    fn test_mapper_skips_and_renames() {
        let mut handler = Handler::new();
        let mapper = |name: &str| {
            if name == "Del" {
                None
            } else {
                Some(format!("calc.{}", name))
            }
        };
        handler.register(&Calc, Some(&mapper), false);

        assert_eq!(handler.method_list(), vec!["calc.Add".to_string()]);
        assert_eq!(fault_code(call(&handler, "Del", vec![])), ERR_UNKNOWN_METHOD);
        assert_eq!(
            call(&handler, "calc.Add", vec![Value::from(2), Value::from(3)]),
            MethodResponse::Params(vec![Value::Int(5)])
        );
    }

    #[test]
    fn test_param_count_checks() {
        let mut strict = Handler::new();
        strict.register(&Calc, None, false);
        assert_eq!(
            fault_code(call(&strict, "Add", vec![Value::from(1)])),
            ERR_INVALID_PARAMS
        );

        let mut padded = Handler::new();
        padded.register(&Calc, None, true);
        assert_eq!(
            call(&padded, "Add", vec![Value::from(1)]),
            MethodResponse::Params(vec![Value::Int(1)])
        );
        assert_eq!(
            fault_code(call(&padded, "Add", vec![1.into(), 2.into(), 3.into()])),
            ERR_INVALID_PARAMS
        );
    }

    #[test]
    fn test_bad_argument_type() {
        let mut handler = Handler::new();
        handler.register(&Calc, None, false);
        match call(&handler, "Add", vec![Value::from("x"), Value::from(1)]) {
            MethodResponse::Fault(fault) => {
                assert_eq!(fault.code, ERR_INVALID_PARAMS);
                assert_eq!(fault.message, "Bad Add argument #0 (string should be int)");
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_and_wrong_kind() {
        let handler = Handler::new();
        let reply = handler.handle("<?xml version=\"1.0\"?><ethodResponse");
        assert_eq!(
            fault_code(decode_response(&reply).unwrap()),
            ERR_NOT_WELL_FORMED
        );

        let reply = handler.handle(&encode_response(&[Value::from("x")]).unwrap());
        assert_eq!(
            fault_code(decode_response(&reply).unwrap()),
            ERR_INVALID_REQUEST
        );
    }

    #[test]
    fn test_deeply_nested_request_is_not_well_formed() {
        let mut handler = Handler::new();
        handler.register_fn("B", 1, |p| Ok(p[0].clone()));

        let body = format!(
            "<methodCall><methodName>B</methodName><params><param>{}",
            "<value><array><data>".repeat(10_000)
        );
        match decode_response(&handler.handle(&body)).unwrap() {
            MethodResponse::Fault(fault) => {
                assert_eq!(fault.code, ERR_NOT_WELL_FORMED);
                assert!(fault.message.contains("Value nesting too deep"));
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_unencodable_result_is_internal_fault() {
        let mut handler = Handler::new();
        handler.register_fn("nan", 0, |_| Ok(Value::Double(f64::NAN)));
        match call(&handler, "nan", vec![]) {
            MethodResponse::Fault(fault) => {
                assert_eq!(fault.code, ERR_INTERNAL);
                assert!(fault.message.starts_with("Failed to marshal nan"));
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_list_methods() {
        let mut handler = Handler::new();
        handler.register(&Calc, None, false);
        assert_eq!(
            call(&handler, LIST_METHODS, vec![]),
            MethodResponse::Params(vec![Value::Array(vec![
                Value::from("Add"),
                Value::from("Del"),
                Value::from(LIST_METHODS),
            ])])
        );
    }

    #[test]
    fn test_method_fault_passes_through() {
        let mut handler = Handler::new();
        handler.register_fn("boom", 0, |_| Err(Fault::new(42, "exploded")));
        assert_eq!(
            call(&handler, "boom", vec![]),
            MethodResponse::Fault(Fault::new(42, "exploded"))
        );
    }
}
