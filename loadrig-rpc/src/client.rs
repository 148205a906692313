use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper::body::Incoming;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;

use super::wire::{RPC_PATH_PREFIX, RpcReply};
use super::{Error, Result, RpcRequest};

/// JSON-over-HTTP client for a single target.
#[derive(Debug, Clone)]
pub struct RpcClient {
    inner: Client<HttpConnector, Full<Bytes>>,
    base_url: String,
    timeout: Option<Duration>,
}

impl RpcClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = url::Url::parse(base_url).map_err(|_| Error::InvalidUrl(base_url.into()))?;
        if parsed.scheme() != "http" {
            return Err(Error::UnsupportedScheme(base_url.to_string()));
        }
        if parsed.host_str().is_none() {
            return Err(Error::InvalidUrl(base_url.to_string()));
        }

        let mut connector = HttpConnector::new();
        connector.enforce_http(true);
        connector.set_connect_timeout(Some(Duration::from_secs(3)));
        connector.set_nodelay(true);

        let inner = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            inner,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            timeout: None,
        })
    }

    /// Default per-call timeout; `None` waits indefinitely.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, operation: &str) -> Result<String> {
        let valid = !operation.is_empty()
            && operation
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(Error::InvalidOperation(operation.to_string()));
        }

        Ok(format!("{}{RPC_PATH_PREFIX}{operation}", self.base_url))
    }

    pub async fn call(&self, req: RpcRequest) -> Result<RpcReply> {
        let url = self.endpoint(&req.operation)?;
        let uri: hyper::Uri = url.parse().map_err(|_| Error::InvalidUrl(url.clone()))?;
        let body = serde_json::to_vec(&req.payload).map_err(Error::Encode)?;

        let mut builder = Request::builder()
            .method(http::Method::POST)
            .uri(uri)
            .header(http::header::CONTENT_TYPE, "application/json")
            .header(http::header::CONTENT_LENGTH, body.len());

        if let Some(token) = &req.bearer {
            let value = http::header::HeaderValue::from_str(&format!("Bearer {token}"))?;
            builder = builder.header(http::header::AUTHORIZATION, value);
        }

        let http_req: Request<Full<Bytes>> = builder.body(Full::new(Bytes::from(body)))?;

        let exchange = async {
            let res: hyper::Response<Incoming> = self.inner.request(http_req).await?;
            let (parts, body) = res.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok::<_, Error>((parts.status, body))
        };

        let (status, body) = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| Error::Timeout(timeout))??,
            None => exchange.await?,
        };

        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        serde_json::from_slice(&body).map_err(Error::Decode)
    }
}
