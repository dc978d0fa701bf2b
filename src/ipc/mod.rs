//! Client/server IPC layer (spec.md §4.7, C7).

pub mod protocol;
pub mod server;

pub use protocol::{Message, RequestKind};
pub use server::IpcServer;
