//! Builds the [`prost_reflect::DescriptorPool`] the dynamic service resolves
//! messages against: the registry's synthesized plugin file
//! ([`pluggable_core::schema`]) plus a hand-authored file describing the
//! fixed `MetaService` contract (its shape never changes, unlike plugin
//! schemas, so it doesn't need runtime synthesis).
//!
//! This is the Rust-native stand-in for the Go source's
//! `dynamicpb.NewMessage` + `protoreflect.FileDescriptor` pairing in
//! `pkg/server/serve.go`: a pool resolved once per server construction,
//! used to decode/encode wire messages whose Rust types don't exist at
//! compile time.

use prost_reflect::{DescriptorError, DescriptorPool};
use prost_types::field_descriptor_proto::{Label, Type as FieldType};
use prost_types::{
	DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
	MethodDescriptorProto, ServiceDescriptorProto,
};

use pluggable_core::PACKAGE_NAME;

const META_FILE_NAME: &str = "plugin_center_meta.proto";

fn field(name: &str, number: i32, ty: FieldType, repeated: bool, type_name: Option<&str>) -> FieldDescriptorProto {
	FieldDescriptorProto {
		name: Some(name.to_string()),
		number: Some(number),
		label: Some(if repeated { Label::Repeated } else { Label::Optional } as i32),
		r#type: Some(ty as i32),
		type_name: type_name.map(|n| format!(".{PACKAGE_NAME}.{n}")),
		..Default::default()
	}
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
	DescriptorProto {
		name: Some(name.to_string()),
		field: fields,
		..Default::default()
	}
}

/// The fixed `MetaService` file: `Item`, `Input`, `Output`, `PluginMetaMsg`,
/// `MetaRequest`, `MetaResponse`, and the `GetPluginMetaList` method. Field
/// names mirror [`pluggable_core::meta`]'s serde field names exactly so the
/// JSON bridge in [`crate::server`] needs no renaming in either direction.
/// `Input::options` (an arbitrary JSON value in core) is carried as a
/// JSON-encoded string field here (`options_json`) rather than a nested
/// `google.protobuf.Value`, since the metadata listing endpoint is read-only
/// tooling surface, not the hot dispatch path.
pub(crate) fn meta_file_descriptor() -> FileDescriptorProto {
	let item_fields = vec![
		field("name", 1, FieldType::String, false, None),
		field("type", 2, FieldType::String, false, None),
		field("desc", 3, FieldType::String, false, None),
	];

	let input_fields = vec![
		field("name", 1, FieldType::String, false, None),
		field("type", 2, FieldType::String, false, None),
		field("desc", 3, FieldType::String, false, None),
		field("optional", 4, FieldType::Bool, false, None),
		field("options_json", 5, FieldType::String, false, None),
	];

	let output_fields = vec![
		field("name", 1, FieldType::String, false, None),
		field("type", 2, FieldType::String, false, None),
		field("desc", 3, FieldType::String, false, None),
	];

	let plugin_meta_fields = vec![
		field("namespace", 1, FieldType::String, false, None),
		field("name", 2, FieldType::String, false, None),
		field("desc", 3, FieldType::String, false, None),
		field("inputs", 4, FieldType::Message, true, Some("Input")),
		field("outputs", 5, FieldType::Message, true, Some("Output")),
		field("qps", 6, FieldType::Uint32, false, None),
		field("timeout_ms", 7, FieldType::Uint64, false, None),
		field("cache_time_ms", 8, FieldType::Uint64, false, None),
	];

	let meta_request_fields = vec![
		field("namespace", 1, FieldType::String, false, None),
		field("name", 2, FieldType::String, false, None),
		field("page", 3, FieldType::Uint32, false, None),
		field("page_size", 4, FieldType::Uint32, false, None),
	];

	let meta_response_fields = vec![
		field("total", 1, FieldType::Uint64, false, None),
		field("version", 2, FieldType::String, false, None),
		field("plugins", 3, FieldType::Message, true, Some("PluginMetaMsg")),
	];

	FileDescriptorProto {
		name: Some(META_FILE_NAME.to_string()),
		package: Some(PACKAGE_NAME.to_string()),
		message_type: vec![
			message("Item", item_fields),
			message("Input", input_fields),
			message("Output", output_fields),
			message("PluginMetaMsg", plugin_meta_fields),
			message("MetaRequest", meta_request_fields),
			message("MetaResponse", meta_response_fields),
		],
		service: vec![ServiceDescriptorProto {
			name: Some("MetaService".to_string()),
			method: vec![MethodDescriptorProto {
				name: Some("GetPluginMetaList".to_string()),
				input_type: Some(format!(".{PACKAGE_NAME}.MetaRequest")),
				output_type: Some(format!(".{PACKAGE_NAME}.MetaResponse")),
				..Default::default()
			}],
			..Default::default()
		}],
		syntax: Some("proto3".to_string()),
		..Default::default()
	}
}

/// Builds the combined pool: the registry's current plugin file plus the
/// fixed meta file. A fresh snapshot is taken at server construction time;
/// per spec §5 ("replacing [shared resources] mid-flight is not required
/// to be safe"), re-registering plugins after the server starts serving
/// does not retroactively widen this pool.
pub(crate) fn build_pool(plugin_file: FileDescriptorProto) -> Result<DescriptorPool, DescriptorError> {
	let set = FileDescriptorSet {
		file: vec![plugin_file, meta_file_descriptor()],
	};
	DescriptorPool::from_file_descriptor_set(set)
}
