use std::future::Future;
use std::sync::Arc;

use loadrig_value::Value;

/// Status code of a successful remote operation.
pub const STATUS_OK: u32 = 0;

/// One invocation of a named remote operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub operation: Arc<str>,
    pub payload: Value,
    /// Bearer credentials attached to the call.
    pub credentials: Option<Arc<str>>,
}

/// The service answered; `status` tells whether the operation itself succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    pub status: u32,
    pub body: Value,
}

impl RemoteResponse {
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self {
            status: STATUS_OK,
            body,
        }
    }

    #[must_use]
    pub fn with_status(status: u32, body: Value) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// The call produced no response (transport error, timeout, undecodable reply).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct RemoteFailure {
    pub kind: String,
    pub detail: String,
}

impl RemoteFailure {
    pub fn new(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
        }
    }
}

/// The service under test.
///
/// Implementations only carry the request and response; timing, assertions and metric
/// accounting happen around the call.
pub trait RemoteService: Send + Sync + 'static {
    fn invoke(
        &self,
        call: RemoteCall,
    ) -> impl Future<Output = Result<RemoteResponse, RemoteFailure>> + Send;
}
