use crate::core::marshal::encode_call;
use crate::core::unmarshal::decode_response;
use crate::domain::model::Value;
use crate::domain::ports::{ConfigProvider, Transport};
use crate::utils::error::{Result, XmlRpcError};
use crate::utils::validation::validate_url;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// 以 reqwest POST XML 文件
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self> {
        validate_url("url", url)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    async fn post(&self, body: String) -> Result<String> {
        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(XmlRpcError::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

/// XML-RPC 客戶端代理
pub struct Client<T: Transport = HttpTransport> {
    transport: T,
}

impl Client<HttpTransport> {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(url, None)?))
    }

    pub fn from_host_port(host: &str, port: u16) -> Result<Self> {
        Self::new(&format!("http://{}:{}/RPC2", host, port))
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        let timeout = config.timeout_seconds().map(Duration::from_secs);
        Ok(Self::with_transport(HttpTransport::new(
            config.endpoint(),
            timeout,
        )?))
    }

    pub fn url(&self) -> &str {
        self.transport.url()
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// 呼叫遠端方法；fault 會轉成 `XmlRpcError::Fault`
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
        let body = encode_call(method, &params)?;
        tracing::debug!("Calling {} with {} params", method, params.len());

        let reply = self.transport.post(body).await?;
        tracing::debug!("Response for {}: {} bytes", method, reply.len());

        decode_response(&reply)?
            .into_result()
            .map_err(XmlRpcError::Fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::marshal::{encode_fault, encode_response};
    use crate::domain::model::Fault;
    use std::sync::Mutex;

    struct CannedTransport {
        reply: String,
        seen: Mutex<Vec<String>>,
    }

    impl Transport for CannedTransport {
        async fn post(&self, body: String) -> Result<String> {
            self.seen.lock().unwrap().push(body);
            Ok(self.reply.clone())
        }
    }

    fn canned(reply: String) -> Client<CannedTransport> {
        Client::with_transport(CannedTransport {
            reply,
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_call_returns_single_value() {
        let client = canned(encode_response(&[Value::from("MyName say Hello to x")]).unwrap());
        let result = client.call("SayHello", vec![Value::from("x")]).await.unwrap();
        assert_eq!(result, Value::from("MyName say Hello to x"));

        let seen = client.transport.seen.lock().unwrap();
        assert!(seen[0].contains("<methodName>SayHello</methodName>"));
    }

    #[tokio::test]
    async fn test_call_maps_fault() {
        let client = canned(encode_fault(&Fault::new(-32601, "Unknown method \"ttt\"")));
        match client.call("ttt", vec![]).await {
            Err(XmlRpcError::Fault(fault)) => assert_eq!(fault.code, -32601),
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn test_from_host_port_uses_rpc2_path() {
        let client = Client::from_host_port("127.0.0.1", 2345).unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:2345/RPC2");
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(Client::new("ftp://127.0.0.1/rpc").is_err());
    }
}
