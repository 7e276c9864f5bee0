//! Dynamic tonic/gRPC binding for `pluggable-core`.
//!
//! Everything a plugin's author or a caller touches over the wire — the
//! dynamic dispatch service (C5), the reflection-backed meta endpoint
//! (C6), and the client-side routing table (C7) — lives here. The
//! registry, schema synthesis, rate limiting, caching and dispatch engine
//! itself are transport-agnostic and live in `pluggable-core`; see that
//! crate's docs for why the split exists.

mod codec;
mod meta_wire;
mod pool;
pub mod client;
pub mod server;
mod status;

pub use client::{ClientRouter, RouterError};
pub use server::PluginGrpcService;
