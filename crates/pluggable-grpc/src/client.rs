//! C7 Client Router: pages `GetPluginMetaList` into a routing table and
//! assembles outbound calls from it, without any generated client stub.
//!
//! Grounded on `pkg/client/router.go`'s `refresh()` loop — page with
//! `pageSize=100`, capture the version from page 1, restart from page 1 if
//! a later page reports a different version, stop once
//! `total - pageSize*pageNum < pageSize` — and `pkg/client/request.go`'s
//! `GetGRpcMethodName()` for the outbound path convention, already
//! implemented once in [`pluggable_core::schema::method_path`].

use std::collections::HashMap;

use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};
use prost_types::FileDescriptorSet;
use thiserror::Error;
use tokio::sync::RwLock;
use tonic::client::Grpc;
use tonic::transport::{Channel, Endpoint};
use tonic::IntoRequest;

use pluggable_core::schema::{build_file_descriptor, method_path};
use pluggable_core::wire::routing_key;
use pluggable_core::PACKAGE_NAME;

use crate::codec::DynamicCodec;
use crate::meta_wire::plugin_meta_from_wire_json;
use crate::pool::meta_file_descriptor;

const META_PAGE_SIZE: u32 = 100;
const META_METHOD_PATH: &str = "/plugin_center.MetaService/GetPluginMetaList";

/// Everything that can go wrong routing a call: connecting, refreshing the
/// routing table, or an unresolved namespace/plugin pair.
#[derive(Debug, Error)]
pub enum RouterError {
	#[error("transport error: {0}")]
	Transport(#[from] tonic::transport::Error),
	#[error("rpc failed: {0}")]
	Rpc(#[from] tonic::Status),
	#[error("no plugin registered for {0}")]
	UnknownPlugin(String),
	#[error("malformed descriptor: {0}")]
	Descriptor(String),
	#[error("malformed meta response: {0}")]
	MalformedResponse(String),
}

struct RouteEntry {
	method_path: String,
	input: MessageDescriptor,
	output: MessageDescriptor,
}

struct RouterState {
	version: String,
	routes: HashMap<String, RouteEntry>,
}

/// Client-side counterpart to [`crate::server::PluginGrpcService`]: holds a
/// `tonic` channel plus a routing table rebuilt from `GetPluginMetaList`,
/// and lets a caller invoke `namespace.pluginName` with a plain JSON object
/// instead of a generated client method.
pub struct ClientRouter {
	channel: Channel,
	meta_pool: DescriptorPool,
	state: RwLock<Option<RouterState>>,
}

impl ClientRouter {
	/// Connects to `endpoint` (e.g. `http://127.0.0.1:50051`) and performs
	/// an initial [`ClientRouter::refresh`] before returning, so a freshly
	/// constructed router is immediately ready to route calls.
	pub async fn connect(endpoint: impl Into<String>) -> Result<Self, RouterError> {
		let channel = Endpoint::from_shared(endpoint.into())
			.map_err(|e| RouterError::Descriptor(e.to_string()))?
			.connect()
			.await?;
		Self::with_channel(channel).await
	}

	/// Builds a router over an already-established channel — useful for
	/// tests that wire up an in-process server via a `tonic::transport`
	/// test channel rather than a real socket.
	pub async fn with_channel(channel: Channel) -> Result<Self, RouterError> {
		let meta_pool = DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
			file: vec![meta_file_descriptor()],
		})
		.map_err(|e| RouterError::Descriptor(e.to_string()))?;

		let router = Self {
			channel,
			meta_pool,
			state: RwLock::new(None),
		};
		router.refresh().await?;
		Ok(router)
	}

	fn meta_request_descriptor(&self) -> MessageDescriptor {
		self.meta_pool
			.get_message_by_name("plugin_center.MetaRequest")
			.expect("meta_file_descriptor declares MetaRequest")
	}

	fn meta_response_descriptor(&self) -> MessageDescriptor {
		self.meta_pool
			.get_message_by_name("plugin_center.MetaResponse")
			.expect("meta_file_descriptor declares MetaResponse")
	}

	async fn call_meta_page(&self, page: u32) -> Result<(u64, String, Vec<pluggable_core::PluginMeta>), RouterError> {
		let request_value = serde_json::json!({
			"namespace": serde_json::Value::Null,
			"name": serde_json::Value::Null,
			"page": page,
			"pageSize": META_PAGE_SIZE,
		});
		let request_message = DynamicMessage::deserialize(self.meta_request_descriptor(), &request_value)
			.map_err(|e| RouterError::Descriptor(e.to_string()))?;

		let codec = DynamicCodec { decode_into: self.meta_response_descriptor() };
		let mut grpc = Grpc::new(self.channel.clone());
		grpc.ready().await.map_err(|e| RouterError::Descriptor(e.to_string()))?;
		let response = grpc
			.unary(request_message.into_request(), http::uri::PathAndQuery::from_static(META_METHOD_PATH), codec)
			.await?;

		let body = response.into_inner();
		let value = serde_json::to_value(&body).map_err(|e| RouterError::MalformedResponse(e.to_string()))?;

		let total = value.get("total").and_then(|v| v.as_u64()).unwrap_or(0);
		let version = value.get("version").and_then(|v| v.as_str()).unwrap_or_default().to_string();
		let metas = value
			.get("plugins")
			.and_then(|v| v.as_array())
			.into_iter()
			.flatten()
			.filter_map(plugin_meta_from_wire_json)
			.collect();

		Ok((total, version, metas))
	}

	/// Pages through `GetPluginMetaList` with `pageSize=100`, restarting
	/// from page 1 whenever the reported version changes mid-scan, and
	/// rebuilds the routing table from the collected metadata. Safe to call
	/// repeatedly — e.g. on a timer, or reactively after an
	/// [`RouterError::UnknownPlugin`].
	pub async fn refresh(&self) -> Result<(), RouterError> {
		'restart: loop {
			let mut metas = Vec::new();
			let mut version: Option<String> = None;
			let mut page = 1u32;

			loop {
				let (total, page_version, page_metas) = self.call_meta_page(page).await?;
				match &version {
					None => version = Some(page_version),
					Some(v) if *v != page_version => continue 'restart,
					_ => {}
				}
				metas.extend(page_metas);

				let scanned = META_PAGE_SIZE as u64 * page as u64;
				if total.saturating_sub(scanned) < META_PAGE_SIZE as u64 {
					break;
				}
				page += 1;
			}

			let version = version.unwrap_or_default();
			let file = build_file_descriptor(&metas);
			let pool = DescriptorPool::from_file_descriptor_set(FileDescriptorSet { file: vec![file] })
				.map_err(|e| RouterError::Descriptor(e.to_string()))?;

			let mut routes = HashMap::new();
			for meta in &metas {
				let service = pool
					.get_service_by_name(&format!("{PACKAGE_NAME}.{}", meta.namespace))
					.ok_or_else(|| RouterError::Descriptor(format!("missing synthesized service for {}", meta.namespace)))?;
				let method = service
					.methods()
					.find(|m| m.name() == meta.name)
					.ok_or_else(|| RouterError::Descriptor(format!("missing synthesized method for {}", meta.name)))?;

				routes.insert(
					routing_key(&meta.namespace, &meta.name),
					RouteEntry {
						method_path: method_path(&meta.namespace, &meta.name),
						input: method.input(),
						output: method.output(),
					},
				);
			}

			*self.state.write().await = Some(RouterState { version, routes });
			return Ok(());
		}
	}

	/// Invokes `namespace.pluginName` with `data` (field name to JSON
	/// value), returning the plugin's output as a JSON object. If the
	/// routing table has no entry for the pair — either because it hasn't
	/// been refreshed yet or because the plugin was only just registered —
	/// refreshes once and retries before giving up.
	pub async fn call(
		&self,
		namespace: &str,
		plugin_name: &str,
		data: serde_json::Map<String, serde_json::Value>,
	) -> Result<serde_json::Value, RouterError> {
		match self.call_once(namespace, plugin_name, &data).await {
			Err(RouterError::UnknownPlugin(_)) => {
				self.refresh().await?;
				self.call_once(namespace, plugin_name, &data).await
			}
			other => other,
		}
	}

	async fn call_once(
		&self,
		namespace: &str,
		plugin_name: &str,
		data: &serde_json::Map<String, serde_json::Value>,
	) -> Result<serde_json::Value, RouterError> {
		let key = routing_key(namespace, plugin_name);
		let (method_path, input, output) = {
			let guard = self.state.read().await;
			let state = guard.as_ref().ok_or_else(|| RouterError::UnknownPlugin(key.clone()))?;
			let entry = state.routes.get(&key).ok_or_else(|| RouterError::UnknownPlugin(key.clone()))?;
			(entry.method_path.clone(), entry.input.clone(), entry.output.clone())
		};

		let request_message = DynamicMessage::deserialize(input, &serde_json::Value::Object(data.clone()))
			.map_err(|e| RouterError::Descriptor(e.to_string()))?;

		let codec = DynamicCodec { decode_into: output };
		let mut grpc = Grpc::new(self.channel.clone());
		grpc.ready().await.map_err(|e| RouterError::Descriptor(e.to_string()))?;
		let path = http::uri::PathAndQuery::try_from(method_path).map_err(|e| RouterError::Descriptor(e.to_string()))?;
		let response = grpc.unary(request_message.into_request(), path, codec).await?;

		serde_json::to_value(response.into_inner()).map_err(|e| RouterError::MalformedResponse(e.to_string()))
	}

	/// The version captured on the most recent successful [`ClientRouter::refresh`],
	/// or `None` if the router has never completed one.
	pub async fn version(&self) -> Option<String> {
		self.state.read().await.as_ref().map(|s| s.version.clone())
	}
}
