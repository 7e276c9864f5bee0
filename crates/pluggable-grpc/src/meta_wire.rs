//! JSON shape shared by the server's `GetPluginMetaList` response encoding
//! ([`crate::server`]) and the client's decoding of that same response
//! ([`crate::client`]) — kept in one place so the two sides can't drift
//! apart on field names or the wire-type label scheme.
//!
//! Field names follow protobuf-JSON's default `lowerCamelCase` convention
//! (matching what `prost_reflect`'s `serde` feature produces for the
//! hand-authored descriptor in [`crate::pool::meta_file_descriptor`]);
//! `WireType` is carried as a lowercase string rather than
//! [`pluggable_core::wire::WireType`]'s own `Serialize` output (its derive
//! emits the Rust variant name, e.g. `"String"`), since the wire type table
//! is itself part of the public schema contract (§4.1) and shouldn't be
//! tied to the host language's identifier casing.

use pluggable_core::meta::{Input, Item, Output, PluginMeta};
use pluggable_core::wire::WireType;

pub(crate) fn wire_type_label(wire_type: WireType) -> &'static str {
	match wire_type {
		WireType::String => "string",
		WireType::Bool => "bool",
		WireType::Int32 => "int32",
		WireType::Int64 => "int64",
		WireType::Float => "float",
		WireType::Uint32 => "uint32",
		WireType::Uint64 => "uint64",
		WireType::Message => "message",
	}
}

pub(crate) fn wire_type_from_label(label: &str) -> WireType {
	match label {
		"string" => WireType::String,
		"bool" => WireType::Bool,
		"int32" => WireType::Int32,
		"int64" => WireType::Int64,
		"float" => WireType::Float,
		"uint32" => WireType::Uint32,
		"uint64" => WireType::Uint64,
		_ => WireType::Message,
	}
}

/// Encodes one [`PluginMeta`] into the JSON shape the `PluginMetaMsg`
/// descriptor expects. `Input::options` (arbitrary already-decoded JSON)
/// is stringified into `optionsJson`, the one field
/// [`crate::pool::meta_file_descriptor`] represents as a plain string
/// rather than a nested message.
pub(crate) fn plugin_meta_to_wire_json(meta: &PluginMeta) -> serde_json::Value {
	serde_json::json!({
		"namespace": meta.namespace,
		"name": meta.name,
		"desc": meta.desc,
		"inputs": meta.inputs.iter().map(|input| serde_json::json!({
			"name": input.item.name,
			"type": wire_type_label(input.item.wire_type),
			"desc": input.item.desc,
			"optional": input.optional,
			"optionsJson": input.options.to_string(),
		})).collect::<Vec<_>>(),
		"outputs": meta.outputs.iter().map(|output| serde_json::json!({
			"name": output.item.name,
			"type": wire_type_label(output.item.wire_type),
			"desc": output.item.desc,
		})).collect::<Vec<_>>(),
		"qps": meta.qps,
		"timeoutMs": meta.timeout_ms,
		"cacheTimeMs": meta.cache_time_ms,
	})
}

/// The inverse of [`plugin_meta_to_wire_json`], used by the client router
/// to rebuild [`PluginMeta`] values (and from them, via
/// `pluggable_core::schema::build_file_descriptor`, the message
/// descriptors it needs to assemble outbound calls) from a decoded
/// `MetaResponse`.
pub(crate) fn plugin_meta_from_wire_json(value: &serde_json::Value) -> Option<PluginMeta> {
	let namespace = value.get("namespace")?.as_str()?.to_string();
	let name = value.get("name")?.as_str()?.to_string();
	let desc = value.get("desc").and_then(|v| v.as_str()).unwrap_or_default().to_string();

	let inputs = value
		.get("inputs")
		.and_then(|v| v.as_array())
		.into_iter()
		.flatten()
		.filter_map(|entry| {
			Some(Input {
				item: Item {
					name: entry.get("name")?.as_str()?.to_string(),
					wire_type: wire_type_from_label(entry.get("type")?.as_str()?),
					desc: entry.get("desc").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
				},
				optional: entry.get("optional").and_then(|v| v.as_bool()).unwrap_or(false),
				options: entry
					.get("optionsJson")
					.and_then(|v| v.as_str())
					.and_then(|s| serde_json::from_str(s).ok())
					.unwrap_or(serde_json::Value::Null),
			})
		})
		.collect();

	let outputs = value
		.get("outputs")
		.and_then(|v| v.as_array())
		.into_iter()
		.flatten()
		.filter_map(|entry| {
			Some(Output {
				item: Item {
					name: entry.get("name")?.as_str()?.to_string(),
					wire_type: wire_type_from_label(entry.get("type")?.as_str()?),
					desc: entry.get("desc").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
				},
			})
		})
		.collect();

	Some(PluginMeta {
		namespace,
		name,
		desc,
		inputs,
		outputs,
		qps: value.get("qps").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
		timeout_ms: value.get("timeoutMs").and_then(|v| v.as_u64()).unwrap_or(0),
		cache_time_ms: value.get("cacheTimeMs").and_then(|v| v.as_u64()).unwrap_or(0),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wire_type_label_round_trips() {
		for wt in [
			WireType::String,
			WireType::Bool,
			WireType::Int32,
			WireType::Int64,
			WireType::Float,
			WireType::Uint32,
			WireType::Uint64,
			WireType::Message,
		] {
			assert_eq!(wire_type_from_label(wire_type_label(wt)), wt);
		}
	}

	#[test]
	fn plugin_meta_round_trips_through_wire_json() {
		let meta = PluginMeta {
			namespace: "Default".to_string(),
			name: "Hello".to_string(),
			desc: "says hello".to_string(),
			inputs: vec![Input {
				item: Item {
					name: "name".to_string(),
					wire_type: WireType::String,
					desc: "who to greet".to_string(),
				},
				optional: false,
				options: serde_json::json!(["a", "b"]),
			}],
			outputs: vec![Output {
				item: Item {
					name: "greeting".to_string(),
					wire_type: WireType::String,
					desc: String::new(),
				},
			}],
			qps: 5,
			timeout_ms: 2000,
			cache_time_ms: 60_000,
		};

		let wire = plugin_meta_to_wire_json(&meta);
		let round_tripped = plugin_meta_from_wire_json(&wire).unwrap();
		assert_eq!(round_tripped, meta);
	}
}
