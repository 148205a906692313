#![forbid(unsafe_code)]

mod client;
mod error;
mod types;
pub mod wire;

pub use client::RpcClient;
pub use error::{Error, Result, RpcTransportErrorKind};
pub use types::RpcRequest;
pub use wire::{RpcReply, status};
