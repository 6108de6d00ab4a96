//! Route one prompt to one or many AI models through short aliases.
//!
//! The library holds the core: alias catalog and its discovery, the resolver,
//! the concurrent dispatch engine, the file-backed chat store and the local
//! HTTP façade. The `ai` binary layers the command line on top.

pub mod catalog;
pub mod chat;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod providers;
pub mod resolve;
pub mod server;
pub mod storage;
pub mod utils;

pub use error::{AiError, ErrorKind, Result};
