#[derive(Debug, Clone)]
pub struct RpcRequest {
    pub operation: String,
    pub payload: serde_json::Value,
    /// Sent as `authorization: Bearer <token>`.
    pub bearer: Option<String>,
}

impl RpcRequest {
    pub fn new(operation: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            operation: operation.into(),
            payload,
            bearer: None,
        }
    }

    #[must_use]
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}
