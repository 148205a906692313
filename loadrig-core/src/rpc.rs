use loadrig_rpc::{RpcClient, RpcRequest};
use loadrig_value::Value;

use crate::remote::{RemoteCall, RemoteFailure, RemoteResponse, RemoteService};

impl RemoteService for RpcClient {
    async fn invoke(&self, call: RemoteCall) -> Result<RemoteResponse, RemoteFailure> {
        let mut req = RpcRequest::new(&*call.operation, call.payload.to_json());
        if let Some(token) = call.credentials {
            req = req.with_bearer(&*token);
        }

        match self.call(req).await {
            Ok(reply) => Ok(RemoteResponse::with_status(
                reply.status,
                Value::from(reply.message),
            )),
            Err(err) => Err(RemoteFailure::new(
                err.transport_error_kind().to_string(),
                err.to_string(),
            )),
        }
    }
}
