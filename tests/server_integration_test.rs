use small_xmlrpc::core::handler::LIST_METHODS;
use small_xmlrpc::core::server;
use small_xmlrpc::{Client, DemoScript, DemoService, Handler, ScriptConfig, Value, XmlRpcError};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::net::TcpListener;

/// 在隨機埠上啟動示範伺服器，回傳 `/rpc` 的 URL
async fn start_demo_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut handler = Handler::new();
    handler.register(&DemoService::default(), None, false);
    let router = server::router(Arc::new(handler), "/rpc");

    tokio::spawn(async move {
        server::serve(listener, router).await.unwrap();
    });

    format!("http://{}/rpc", addr)
}

#[tokio::test]
async fn test_say_hello_end_to_end() {
    let url = start_demo_server().await;
    let client = Client::new(&url).unwrap();

    let result = client
        .call("SayHello", vec![Value::from("12345<>&6")])
        .await
        .unwrap();
    assert_eq!(result, Value::from("MyName say Hello to 12345<>&6"));

    // 小寫別名
    let result = client
        .call("sayhello", vec![Value::from("x")])
        .await
        .unwrap();
    assert_eq!(result, Value::from("MyName say Hello to x"));
}

#[tokio::test]
async fn test_unknown_method_and_bad_arity_faults() {
    let url = start_demo_server().await;
    let client = Client::new(&url).unwrap();

    match client.call("ttt", vec![Value::from("AbCdEf")]).await {
        Err(XmlRpcError::Fault(fault)) => {
            assert_eq!(fault.code, -32601);
            assert_eq!(fault.message, "Unknown method \"ttt\"");
        }
        other => panic!("expected fault, got {:?}", other),
    }

    match client.call("SayHello", vec![]).await {
        Err(XmlRpcError::Fault(fault)) => {
            assert_eq!(fault.code, -32602);
            assert_eq!(
                fault.message,
                "Bad number of parameters for method \"SayHello\", (0 != 1)"
            );
        }
        other => panic!("expected fault, got {:?}", other),
    }
}

#[tokio::test]
async fn test_list_methods() {
    let url = start_demo_server().await;
    let client = Client::new(&url).unwrap();

    let result = client.call(LIST_METHODS, vec![]).await.unwrap();
    let names: Vec<&str> = result
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(names.contains(&"SayHello"));
    assert!(names.contains(&"RetMapSS"));
    assert!(!names.contains(&"sayhello"));
}

#[tokio::test]
async fn test_classic_script_against_server() {
    let url = start_demo_server().await;
    let client = Client::new(&url).unwrap();
    let mut out = Vec::new();

    let summary = DemoScript::classic()
        .with_keep_going(true)
        .run(&client, &mut out)
        .await
        .unwrap();
    assert_eq!(summary.calls, 3);
    assert_eq!(summary.faults, 1);

    let printed = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = printed.lines().collect();
    assert!(lines.contains(&"MyName say Hello to 12345<>&6"));
    assert!(lines.contains(&"{'lower': 'abcdef', 'upper': 'ABCDEF'}"));
    assert!(lines.contains(&"Fault: Unknown method \"ttt\" (code#-32601)"));
}

#[tokio::test]
async fn test_toml_script_against_server() {
    let url = start_demo_server().await;

    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
endpoint = "{}"

[[steps]]
kind = "call"
method = "RetStruct"
params = ["AbCdEf"]

[[steps]]
kind = "call"
method = "RetIntStr"
params = ["AbCdEf"]
"#,
        url
    )
    .unwrap();

    let config = ScriptConfig::from_file(file.path()).unwrap();
    let client = Client::new(config.endpoint.as_deref().unwrap()).unwrap();
    let mut out = Vec::new();

    config
        .to_script()
        .unwrap()
        .run(&client, &mut out)
        .await
        .unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "{'Len': 6, 'Name': 'AbCdEf'}\n[6, 'AbCdEf']\n"
    );
}

#[test]
fn test_bundled_classic_script_matches_builtin() {
    use small_xmlrpc::utils::validation::Validate;

    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/scripts/classic.toml");
    let config = ScriptConfig::from_file(path).unwrap();
    config.validate().unwrap();

    assert_eq!(config.to_script().unwrap().steps, DemoScript::classic().steps);
}
