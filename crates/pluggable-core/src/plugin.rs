//! Traits a plugin author implements: the call contract ([`Pluggable`]), an
//! optional cache-key override ([`CustomCacheKey`]), and the schema
//! introspection contract that `#[derive(PluginSchema)]` implements for a
//! plugin's input/output types.

use async_trait::async_trait;

use crate::error::Error;
use crate::meta::Item;

/// A single plugin's call contract: decode an `I`, produce an `O`, or fail.
///
/// Mirrors the Go source's `Pluggable[I, O any]` interface.
#[async_trait]
pub trait Pluggable<I, O>: Send + Sync
where
	I: Send + 'static,
	O: Send + 'static,
{
	async fn execute(&self, input: I) -> Result<O, Error>;
}

/// Lets a plugin's input type override the default cache-key derivation
/// (canonical JSON of the decoded value). Implement this when two distinct
/// inputs should share a cache entry, or when only part of the input should
/// participate in the key.
pub trait CustomCacheKey {
	fn generate_key(&self, namespace: &str, plugin_name: &str) -> String;
}

/// Compile-time schema introspection for a plugin's input or output type.
/// Implemented by `#[derive(PluginSchema)]`; see `pluggable-macros`.
pub trait PluginSchema {
	/// The synthesized type name used in generated descriptors, e.g.
	/// `Default.HelloRequest`.
	fn type_name() -> &'static str;

	/// One [`Item`] per field, in declaration order.
	fn schema_items() -> Vec<Item>;

	/// Whether the whole record is a nullable reference (a Go pointer
	/// receiver in the original), which marks every one of its fields
	/// `optional = true` when used as an `Input`.
	fn struct_optional() -> bool {
		false
	}

	/// Raw `#[schema(options = "...")]` JSON literals, one per field in the
	/// same order as [`PluginSchema::schema_items`], `None` where the
	/// attribute was absent. Only meaningful when the type is used as an
	/// `Input`; output types never consult this.
	fn field_options() -> Vec<Option<String>> {
		Vec::new()
	}
}
