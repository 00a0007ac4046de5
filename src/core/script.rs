use crate::core::client::Client;
use crate::core::marshal::dumps;
use crate::domain::model::Value;
use crate::domain::ports::Transport;
use crate::utils::error::{Result, XmlRpcError};
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// 只編碼並印出 XML，不送出
    Dump {
        method_name: Option<String>,
        params: Vec<Value>,
    },
    /// 呼叫遠端方法並印出結果
    Call { method: String, params: Vec<Value> },
}

impl Step {
    pub fn dump(method_name: &str, params: Vec<Value>) -> Self {
        Step::Dump {
            method_name: Some(method_name.to_string()),
            params,
        }
    }

    pub fn call(method: &str, params: Vec<Value>) -> Self {
        Step::Call {
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub dumps: usize,
    pub calls: usize,
    pub faults: usize,
}

/// 依序執行的示範腳本
#[derive(Debug, Clone, Default)]
pub struct DemoScript {
    pub steps: Vec<Step>,
    pub keep_going: bool,
    pub json_output: bool,
}

fn string_map(pairs: &[(&str, &str)]) -> Value {
    Value::Struct(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect::<BTreeMap<_, _>>(),
    )
}

impl DemoScript {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// 原始客戶端腳本的步驟
    pub fn classic() -> Self {
        Self::new(vec![
            Step::dump(
                "testfunc",
                vec![Value::from("<str&#~!>"), Value::from(1), Value::from(true)],
            ),
            Step::dump("testfunc", vec![Value::Struct(BTreeMap::new())]),
            Step::dump("testfunc", vec![string_map(&[("1", "ab"), ("2", "cd")])]),
            Step::call("SayHello", vec![Value::from("12345<>&6")]),
            Step::call("RetMapSS", vec![Value::from("AbCdEf")]),
            Step::call("ttt", vec![Value::from("AbCdEf")]),
        ])
    }

    /// classic 加上後續版本的呼叫
    pub fn extended() -> Self {
        let mut script = Self::classic();
        let arg = || vec![Value::from("AbCdEf")];
        script.steps.extend([
            Step::call("RetStrs", arg()),
            Step::call("RetIntStr", arg()),
            Step::call("RetMapIS", arg()),
            Step::call("RetStruct", arg()),
            Step::call("mmm", arg()),
            Step::call("rrr", arg()),
            Step::call("ddd", arg()),
        ]);
        script
    }

    pub fn with_keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    pub fn with_json_output(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }

    /// 依序執行；遇到第一個錯誤即停止，除非 keep_going 且錯誤為 fault
    pub async fn run<T: Transport, W: Write>(
        &self,
        client: &Client<T>,
        out: &mut W,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for (index, step) in self.steps.iter().enumerate() {
            match step {
                Step::Dump {
                    method_name,
                    params,
                } => {
                    let xml = dumps(params, method_name.as_deref())?;
                    writeln!(out, "{}", xml)?;
                    summary.dumps += 1;
                }
                Step::Call { method, params } => {
                    tracing::info!("Step {}: calling {}", index + 1, method);
                    summary.calls += 1;
                    match client.call(method, params.clone()).await {
                        Ok(value) => self.print_value(out, &value)?,
                        Err(XmlRpcError::Fault(fault)) if self.keep_going => {
                            tracing::warn!("{} returned fault: {}", method, fault);
                            writeln!(out, "Fault: {}", fault)?;
                            summary.faults += 1;
                        }
                        Err(e) => {
                            tracing::error!("Step {} ({}) failed: {}", index + 1, method, e);
                            return Err(e);
                        }
                    }
                }
            }
        }

        Ok(summary)
    }

    fn print_value<W: Write>(&self, out: &mut W, value: &Value) -> Result<()> {
        if self.json_output {
            writeln!(out, "{}", serde_json::to_string(&value.to_json())?)?;
        } else {
            match value {
                // 頂層字串原樣輸出，容器內的字串才加引號
                Value::String(s) => writeln!(out, "{}", s)?,
                other => writeln!(out, "{}", other)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::demo_service::DemoService;
    use crate::core::handler::Handler;

    /// 不經網路，直接交給 Handler 的傳輸層
    struct InProcess(Handler);

    impl Transport for InProcess {
        async fn post(&self, body: String) -> Result<String> {
            Ok(self.0.handle(&body))
        }
    }

    fn demo_client() -> Client<InProcess> {
        let mut handler = Handler::new();
        handler.register(&DemoService::default(), None, false);
        Client::with_transport(InProcess(handler))
    }

    #[tokio::test]
    async fn test_classic_stops_at_unknown_method() {
        let client = demo_client();
        let mut out = Vec::new();

        let err = DemoScript::classic().run(&client, &mut out).await.unwrap_err();
        match err {
            XmlRpcError::Fault(fault) => assert_eq!(fault.message, "Unknown method \"ttt\""),
            other => panic!("expected fault, got {:?}", other),
        }

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("<string>&lt;str&amp;#~!&gt;</string>"));
        let lines: Vec<&str> = printed.lines().collect();
        assert!(lines.contains(&"MyName say Hello to 12345<>&6"));
        assert!(!printed.contains("'MyName say Hello"));
        assert!(printed.contains("{'lower': 'abcdef', 'upper': 'ABCDEF'}"));
    }

    #[tokio::test]
    async fn test_extended_keep_going_counts_faults() {
        let client = demo_client();
        let mut out = Vec::new();

        let summary = DemoScript::extended()
            .with_keep_going(true)
            .run(&client, &mut out)
            .await
            .unwrap();

        assert_eq!(
            summary,
            RunSummary {
                dumps: 3,
                calls: 10,
                faults: 4,
            }
        );
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("['AbCdEf', 'abcdef', 'ABCDEF']"));
        assert!(printed.contains("[6, 'AbCdEf']"));
        assert!(printed.contains("Fault: Unknown method \"mmm\" (code#-32601)"));
    }

    #[tokio::test]
    async fn test_json_output() {
        let client = demo_client();
        let mut out = Vec::new();

        DemoScript::new(vec![Step::call("RetStruct", vec![Value::from("abc")])])
            .with_json_output(true)
            .run(&client, &mut out)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"Len\":3,\"Name\":\"abc\"}\n"
        );
    }

    /// 連線失敗的傳輸層
    struct Unreachable;

    impl Transport for Unreachable {
        async fn post(&self, _body: String) -> Result<String> {
            Err(XmlRpcError::HttpStatus {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_keep_going_still_stops_on_transport_error() {
        let client = Client::with_transport(Unreachable);
        let mut out = Vec::new();

        let err = DemoScript::new(vec![
            Step::call("SayHello", vec![Value::from("x")]),
            Step::call("RetMapSS", vec![Value::from("x")]),
        ])
        .with_keep_going(true)
        .run(&client, &mut out)
        .await
        .unwrap_err();

        assert!(matches!(err, XmlRpcError::HttpStatus { status: 503, .. }));
        assert!(out.is_empty());
    }
}
