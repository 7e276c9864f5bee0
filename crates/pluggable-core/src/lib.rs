//! Transport-agnostic core of the dynamic plugin server: type introspection
//! glue, schema synthesis, the plugin registry, rate limiting and caching,
//! the dispatcher, and the metadata/reflection service.
//!
//! Nothing in this crate speaks gRPC — see `pluggable-grpc` for the wire
//! binding. This separation mirrors the distinction the original server drew
//! between `pluggable/` (the registry/dispatch engine) and `server/`
//! (the gRPC transport).

pub mod cache;
pub mod dispatch;
pub mod error;
pub mod limiter;
pub mod meta;
pub mod meta_service;
pub mod plugin;
pub mod registry;
pub mod schema;
pub mod wire;

pub use error::{Error, Result};
pub use meta::{Input, Item, Output, PluginMeta, RegisterOptions, DEFAULT_NAMESPACE, DEFAULT_TIMEOUT_MS, PACKAGE_NAME};
pub use plugin::{CustomCacheKey, Pluggable, PluginSchema};
pub use registry::Registry;
pub use dispatch::Dispatcher;
pub use meta_service::{MetaListRequest, MetaListResponse, MetaService};
pub use cache::{Cacheable, MemoryCache};
