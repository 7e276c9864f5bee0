//! Plugin metadata shapes shared by the registry, schema synthesizer and
//! meta service.

use serde::{Deserialize, Serialize};

use crate::wire::WireType;

/// A single named, typed field — the leaf of both `Input` and `Output`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
	pub name: String,
	#[serde(rename = "type")]
	pub wire_type: WireType,
	pub desc: String,
}

/// One input field of a plugin's request type, with its own optionality and
/// free-form options payload (the Go source's `Options []any`, kept here as
/// already-decoded JSON since Rust has no `interface{}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
	#[serde(flatten)]
	pub item: Item,
	pub optional: bool,
	#[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
	pub options: serde_json::Value,
}

/// One output field of a plugin's response type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
	#[serde(flatten)]
	pub item: Item,
}

/// Everything a client needs to know about a registered plugin: its
/// identity, its schema, and the runtime knobs that govern how calls to it
/// behave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMeta {
	pub namespace: String,
	pub name: String,
	pub desc: String,
	pub inputs: Vec<Input>,
	pub outputs: Vec<Output>,
	pub qps: u32,
	pub timeout_ms: u64,
	pub cache_time_ms: u64,
}

/// Registration-time options, mirroring the Go source's `Option` functions
/// (`Desc`, `QPS`, `Namespace`, `Timeout`, `CacheTime`).
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
	pub desc: String,
	pub namespace: Option<String>,
	pub qps: u32,
	pub timeout_ms: u64,
	pub cache_time_ms: u64,
}

impl RegisterOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn desc(mut self, desc: impl Into<String>) -> Self {
		self.desc = desc.into();
		self
	}

	pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Some(namespace.into());
		self
	}

	pub fn qps(mut self, qps: u32) -> Self {
		self.qps = qps;
		self
	}

	pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
		self.timeout_ms = timeout_ms;
		self
	}

	pub fn cache_time_ms(mut self, cache_time_ms: u64) -> Self {
		self.cache_time_ms = cache_time_ms;
		self
	}
}

/// Default namespace assigned when a caller doesn't specify one.
pub const DEFAULT_NAMESPACE: &str = "Default";

/// Protobuf package name all synthesized descriptors share, and the first
/// segment of every wire method path.
pub const PACKAGE_NAME: &str = "plugin_center";

/// Default per-call deadline when neither the request nor the registration
/// specifies one.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
