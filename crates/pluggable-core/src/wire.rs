//! Field-type mapping and canonical-JSON key derivation.
//!
//! The original server walked Go `reflect.Kind`s to build protobuf field
//! descriptors on the fly. Here the same table drives two consumers: the
//! `#[derive(PluginSchema)]` macro (which maps a Rust field's type name to a
//! [`WireType`] at compile time) and [`crate::schema`] (which maps a
//! [`WireType`] to a `prost_types::field_descriptor_proto::Type` when
//! synthesizing a `FileDescriptorProto`).

use serde::{Deserialize, Serialize};

/// Protobuf-ish wire type for a single field, independent of any concrete
/// protobuf crate's enum so the macro crate doesn't need to depend on
/// `prost-types` itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireType {
	String,
	Bool,
	Int32,
	Int64,
	Float,
	Uint32,
	Uint64,
	Message,
}

impl WireType {
	/// Maps a Rust primitive type name to its wire type, per the table in
	/// §4.1: strings, bools and every int/float width get a dedicated wire
	/// type; anything else (structs, enums, collections) is a nested
	/// message.
	pub fn from_rust_type_name(name: &str) -> Self {
		match name {
			"String" | "str" | "& str" | "&str" => WireType::String,
			"bool" => WireType::Bool,
			"i8" | "i16" | "i32" => WireType::Int32,
			"i64" | "i128" | "isize" => WireType::Int64,
			"f32" | "f64" => WireType::Float,
			"u8" | "u16" | "u32" => WireType::Uint32,
			"u64" | "u128" | "usize" => WireType::Uint64,
			_ => WireType::Message,
		}
	}
}

/// Builds the default cache key for a call: `UPPER(namespace:name)` joined
/// with the canonical JSON of the decoded input. This is the scheme spec.md
/// mandates for plugins that don't implement [`crate::plugin::CustomCacheKey`]
/// — the original Go server left this derivation as an unresolved `// todo`
/// when no custom key generator was supplied.
pub fn default_cache_key(namespace: &str, plugin_name: &str, value: &serde_json::Value) -> String {
	let routing_key = format!("{namespace}:{plugin_name}").to_uppercase();
	format!("{routing_key}:{}", canonical_json(value))
}

/// Serializes a `serde_json::Value` with object keys sorted, so structurally
/// identical payloads in different field orders hash to the same key.
pub fn canonical_json(value: &serde_json::Value) -> String {
	canonicalize(value).to_string()
}

fn canonicalize(value: &serde_json::Value) -> serde_json::Value {
	match value {
		serde_json::Value::Object(map) => {
			let sorted: std::collections::BTreeMap<String, serde_json::Value> = map
				.iter()
				.map(|(k, v)| (k.clone(), canonicalize(v)))
				.collect();
			serde_json::Value::Object(sorted.into_iter().collect())
		}
		serde_json::Value::Array(items) => {
			serde_json::Value::Array(items.iter().map(canonicalize).collect())
		}
		other => other.clone(),
	}
}

/// Routing key for a plugin: `UPPER(namespace:name)`, used both by the
/// registry's internal map and by the wire method-path convention.
pub fn routing_key(namespace: &str, name: &str) -> String {
	format!("{namespace}:{name}").to_uppercase()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wire_type_table_matches_spec() {
		assert_eq!(WireType::from_rust_type_name("String"), WireType::String);
		assert_eq!(WireType::from_rust_type_name("bool"), WireType::Bool);
		assert_eq!(WireType::from_rust_type_name("i32"), WireType::Int32);
		assert_eq!(WireType::from_rust_type_name("i64"), WireType::Int64);
		assert_eq!(WireType::from_rust_type_name("f64"), WireType::Float);
		assert_eq!(WireType::from_rust_type_name("u32"), WireType::Uint32);
		assert_eq!(WireType::from_rust_type_name("u64"), WireType::Uint64);
		assert_eq!(WireType::from_rust_type_name("SomeStruct"), WireType::Message);
	}

	#[test]
	fn canonical_json_ignores_key_order() {
		let a = serde_json::json!({"b": 1, "a": 2});
		let b = serde_json::json!({"a": 2, "b": 1});
		assert_eq!(canonical_json(&a), canonical_json(&b));
	}

	#[test]
	fn routing_key_is_uppercased() {
		assert_eq!(routing_key("default", "hello"), "DEFAULT:HELLO");
	}

	#[test]
	fn default_cache_key_is_stable_across_field_order() {
		let a = serde_json::json!({"name": "x", "id": 1});
		let b = serde_json::json!({"id": 1, "name": "x"});
		assert_eq!(
			default_cache_key("Default", "hello", &a),
			default_cache_key("Default", "hello", &b)
		);
	}
}
