pub mod client;
pub mod dispatch;
pub mod protocol;
pub mod server;

pub use client::IpcClient;
pub use dispatch::{RpcDispatcher, RpcError};
pub use protocol::{ApiErrorBody, ApiRequest, ApiResponse};
pub use server::{IpcServer, RpcHandler};
