//! The URL-shortener service: RPC surface, HTTP gateway, configuration,
//! and in-memory test support. The binary entrypoint lives in `main.rs`.

pub mod config;
pub mod gateway;
pub mod service;
pub mod testing;

pub use config::Args;
pub use service::ShortenerService;
