//! JSON envelope shared by the client and the stand-in service.
//!
//! Every operation is a `POST {base}/rpc/{operation}` with a JSON object body. The service answers
//! HTTP 200 with `{ "status": <code>, "message": <body> }`, where `status` follows the gRPC status
//! code numbering. Transport-level problems are reported with non-2xx HTTP statuses instead.

use serde::{Deserialize, Serialize};

pub const RPC_PATH_PREFIX: &str = "/rpc/";

pub mod status {
    pub const OK: u32 = 0;
    pub const INVALID_ARGUMENT: u32 = 3;
    pub const NOT_FOUND: u32 = 5;
    pub const ALREADY_EXISTS: u32 = 6;
    pub const UNAVAILABLE: u32 = 14;
    pub const UNAUTHENTICATED: u32 = 16;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcReply {
    pub status: u32,
    #[serde(default)]
    pub message: serde_json::Value,
}

impl RpcReply {
    #[must_use]
    pub fn ok(message: serde_json::Value) -> Self {
        Self {
            status: status::OK,
            message,
        }
    }

    #[must_use]
    pub fn error(status: u32, detail: &str) -> Self {
        Self {
            status,
            message: serde_json::json!({ "error": detail }),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == status::OK
    }
}
