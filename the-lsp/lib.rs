pub mod capabilities;
pub mod command;
pub mod config;
pub mod editing;
pub mod jsonrpc;
pub mod rename;
pub mod server;
pub mod text_sync;
pub mod transport;

pub use config::ServerConfig;
pub use server::{
  Exit,
  Server,
  ServerError,
  ServerOptions,
};
pub use transport::{
  Connection,
  TransportError,
};
