//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 boundary of the Queueline engine. Feed mutations are
//! forwarded as commands through a `CommandHandle`; roster methods call the
//! roster store directly.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{RpcServer, RpcServerConfig};
