//! HTTP transport used by the bridge session.

use futures::FutureExt;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use strum_macros::Display;

use crate::config::SessionConfig;
use crate::errors::Error;
use crate::runtime::BoxFuture;

type Result<T> = std::result::Result<T, Error>;

/// HTTP verbs used against the bridge's REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    /// Whether the request mutates bridge state.
    pub fn is_write(self) -> bool {
        !matches!(self, Method::Get)
    }
}

/// A fully resolved request to the bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeRequest {
    pub method: Method,
    pub url: String,
    /// JSON encoded body, if any.
    pub body: Option<Vec<u8>>,
}

impl BridgeRequest {
    /// The body decoded as JSON.
    pub fn json_body(&self) -> Option<Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }
}

/// Executes bridge requests and yields the raw response body.
///
/// `execute` is called synchronously when the request is issued; the returned
/// future is then driven on a spawned task.
pub trait Transport: Send + Sync {
    fn execute(&self, request: BridgeRequest) -> BoxFuture<'static, Result<Vec<u8>>>;
}

/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &SessionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: BridgeRequest) -> BoxFuture<'static, Result<Vec<u8>>> {
        let client = self.client.clone();
        async move {
            let method = match request.method {
                Method::Get => reqwest::Method::GET,
                Method::Put => reqwest::Method::PUT,
                Method::Post => reqwest::Method::POST,
                Method::Delete => reqwest::Method::DELETE,
            };
            let mut builder = client.request(method, &request.url);
            if let Some(body) = request.body {
                builder = builder.header(CONTENT_TYPE, "application/json").body(body);
            }

            let response = builder.send().await?;
            let status = response.status();
            if !status.is_success() {
                debug!("{} {} answered with status {}", request.method, request.url, status);
            }
            Ok(response.bytes().await?.to_vec())
        }
        .boxed()
    }
}
