//! C2 Schema Synthesizer: turns registered [`PluginMeta`] records into a
//! single `FileDescriptorProto`, the way `pkg/pluggable/registry.go`'s
//! `GetServiceDescriptors()` builds one `descriptorpb.FileDescriptorProto`
//! per call to `protodesc.NewFile`.

use prost_types::field_descriptor_proto::{Label, Type as FieldType};
use prost_types::{
	DescriptorProto, FieldDescriptorProto, FileDescriptorProto, MethodDescriptorProto,
	ServiceDescriptorProto,
};

use crate::meta::{Item, PluginMeta, PACKAGE_NAME};
use crate::wire::WireType;

fn field_type_for(wire_type: WireType) -> FieldType {
	match wire_type {
		WireType::String => FieldType::String,
		WireType::Bool => FieldType::Bool,
		WireType::Int32 => FieldType::Int32,
		WireType::Int64 => FieldType::Int64,
		WireType::Float => FieldType::Float,
		WireType::Uint32 => FieldType::Uint32,
		WireType::Uint64 => FieldType::Uint64,
		WireType::Message => FieldType::Message,
	}
}

fn field_descriptor(index: usize, item: &Item) -> FieldDescriptorProto {
	FieldDescriptorProto {
		name: Some(item.name.clone()),
		number: Some(index as i32 + 1),
		label: Some(Label::Optional as i32),
		r#type: Some(field_type_for(item.wire_type) as i32),
		type_name: matches!(item.wire_type, WireType::Message).then(|| item.name.clone()),
		..Default::default()
	}
}

/// Wire method path for a plugin, per §3/§6:
/// `/{package}.{namespace}/{namespace}.{namespace}.{name}`.
pub fn method_path(namespace: &str, name: &str) -> String {
	format!("/{PACKAGE_NAME}.{namespace}/{namespace}.{namespace}.{name}")
}

/// A protobuf message name must itself be a plain identifier (no dots), so
/// the namespace is folded into the name with an underscore rather than
/// joined with the dot used for fully-qualified references elsewhere in
/// this module. Keeps `Default_HelloRequest` distinct from an `Admin`
/// namespace's own `Admin_HelloRequest` even when the plugin name repeats.
fn message_name(namespace: &str, plugin_name: &str, suffix: &str) -> String {
	format!("{namespace}_{plugin_name}{suffix}")
}

/// Synthesizes one `FileDescriptorProto` covering every registered plugin.
/// Plugins are grouped into one `ServiceDescriptorProto` per namespace, each
/// carrying one `MethodDescriptorProto` per plugin in that namespace — the
/// `namespace` segment of the wire path doubles as the service name.
pub fn build_file_descriptor(plugins: &[PluginMeta]) -> FileDescriptorProto {
	let mut message_types = Vec::new();
	let mut services: Vec<ServiceDescriptorProto> = Vec::new();
	let mut service_index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

	for plugin in plugins {
		let input_name = message_name(&plugin.namespace, &plugin.name, "Request");
		let output_name = message_name(&plugin.namespace, &plugin.name, "Response");

		message_types.push(DescriptorProto {
			name: Some(input_name.clone()),
			field: plugin
				.inputs
				.iter()
				.enumerate()
				.map(|(i, input)| field_descriptor(i, &input.item))
				.collect(),
			..Default::default()
		});

		message_types.push(DescriptorProto {
			name: Some(output_name.clone()),
			field: plugin
				.outputs
				.iter()
				.enumerate()
				.map(|(i, output)| field_descriptor(i, &output.item))
				.collect(),
			..Default::default()
		});

		let index = *service_index.entry(plugin.namespace.clone()).or_insert_with(|| {
			services.push(ServiceDescriptorProto {
				name: Some(plugin.namespace.clone()),
				..Default::default()
			});
			services.len() - 1
		});
		let service = &mut services[index];

		service.method.push(MethodDescriptorProto {
			name: Some(plugin.name.clone()),
			input_type: Some(format!(".{PACKAGE_NAME}.{input_name}")),
			output_type: Some(format!(".{PACKAGE_NAME}.{output_name}")),
			..Default::default()
		});
	}

	FileDescriptorProto {
		name: Some(format!("{PACKAGE_NAME}.proto")),
		package: Some(PACKAGE_NAME.to_string()),
		message_type: message_types,
		service: services,
		syntax: Some("proto3".to_string()),
		..Default::default()
	}
}
