//! Message types of the shortener protocol, generated from
//! `proto/shortener.proto`. Messages carry serde derives so the HTTP
//! gateway can map JSON bodies onto the exact types the RPCs use.

pub mod shortener;
