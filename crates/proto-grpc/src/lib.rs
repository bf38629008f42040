//! gRPC service bindings for the shortener protocol, generated by
//! tonic-build from `proto-shortener/proto/shortener.proto`. Client and
//! server roles are split behind features so consumers only compile the
//! side they use.

#[cfg(any(feature = "shortener_client", feature = "shortener_server"))]
pub mod shortener;
