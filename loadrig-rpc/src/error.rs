use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RpcTransportErrorKind {
    InvalidUrl,
    UnsupportedScheme,
    InvalidOperation,
    Encode,
    RequestBuild,
    HeaderValue,
    Request,
    Timeout,
    BodyRead,
    HttpStatus,
    Decode,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("only http:// targets are supported: {0}")]
    UnsupportedScheme(String),

    #[error("invalid operation name: `{0}`")]
    InvalidOperation(String),

    #[error("failed to encode request payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("rpc request build failed: {0}")]
    RequestBuild(#[from] http::Error),

    #[error("invalid authorization header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("rpc request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),

    #[error("rpc request timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to read response body: {0}")]
    BodyRead(#[from] hyper::Error),

    #[error("unexpected http status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("failed to decode rpc reply: {0}")]
    Decode(#[source] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn transport_error_kind(&self) -> RpcTransportErrorKind {
        match self {
            Self::InvalidUrl(_) => RpcTransportErrorKind::InvalidUrl,
            Self::UnsupportedScheme(_) => RpcTransportErrorKind::UnsupportedScheme,
            Self::InvalidOperation(_) => RpcTransportErrorKind::InvalidOperation,
            Self::Encode(_) => RpcTransportErrorKind::Encode,
            Self::RequestBuild(_) => RpcTransportErrorKind::RequestBuild,
            Self::HeaderValue(_) => RpcTransportErrorKind::HeaderValue,
            Self::Request(_) => RpcTransportErrorKind::Request,
            Self::Timeout(_) => RpcTransportErrorKind::Timeout,
            Self::BodyRead(_) => RpcTransportErrorKind::BodyRead,
            Self::HttpStatus { .. } => RpcTransportErrorKind::HttpStatus,
            Self::Decode(_) => RpcTransportErrorKind::Decode,
        }
    }
}
