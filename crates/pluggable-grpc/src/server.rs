//! C5/C6 wire binding: a single dynamic `tower` service that resolves an
//! inbound method path to a registered plugin (or the fixed meta service)
//! and installs the registry's synthesized schema into `tonic`'s
//! reflection endpoint — all without any `tonic-build`-generated server
//! trait, per spec §2's "generic RPC server without any code generation".
//!
//! Grounded on `pkg/server/serve.go`'s `dynamicService`: `resolveServices`
//! registers one `grpc.ServiceDesc` per namespace with a single shared
//! `handler`; `getMethodDesc` parses the stream's method path the same way
//! [`parse_method_key`] does here. Since tonic ties `add_service` to a
//! compile-time `NamedService::NAME`, the equivalent here is a single
//! `axum::Router` fallback service that performs its own path-based
//! resolution, with the reflection service mounted at its well-known
//! fixed routes alongside it.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use prost_reflect::{DescriptorPool, DynamicMessage, MessageDescriptor};
use prost_types::FileDescriptorSet;
use tonic::server::{Grpc, UnaryService};
use tonic::{Request, Response, Status};

use pluggable_core::{Dispatcher, MetaListRequest, MetaService, Registry, PACKAGE_NAME};

use crate::codec::{json_to_message, message_to_json, DynamicCodec};
use crate::meta_wire::plugin_meta_to_wire_json;
use crate::pool::build_pool;
use crate::status::to_status;

const META_SERVICE_FULL_NAME: &str = "plugin_center.MetaService";
const META_METHOD_NAME: &str = "GetPluginMetaList";

/// The dynamic gRPC binding. Cheap to clone: every field is an `Arc`.
#[derive(Clone)]
pub struct PluginGrpcService {
	registry: Arc<Registry>,
	dispatcher: Arc<Dispatcher>,
	meta_service: Arc<MetaService>,
	pool: Arc<DescriptorPool>,
}

impl PluginGrpcService {
	/// Snapshots the registry's current schema into a descriptor pool and
	/// returns a service ready to be mounted with [`PluginGrpcService::into_router`]
	/// or driven directly with [`PluginGrpcService::serve`].
	pub fn new(registry: Arc<Registry>, dispatcher: Arc<Dispatcher>) -> Result<Self, prost_reflect::DescriptorError> {
		let plugin_file = registry.service_descriptors();
		let pool = build_pool(plugin_file)?;
		Ok(Self {
			meta_service: Arc::new(MetaService::new(registry.clone())),
			registry,
			dispatcher,
			pool: Arc::new(pool),
		})
	}

	/// Rebuilds the descriptor pool from the registry's current state.
	/// Per spec §5, swapping shared resources mid-flight isn't required to
	/// be safe; callers that register plugins after startup should build a
	/// fresh [`PluginGrpcService`] (or call this before accepting traffic)
	/// rather than relying on in-place updates reaching already-accepted
	/// connections.
	pub fn refresh(&mut self) -> Result<(), prost_reflect::DescriptorError> {
		let plugin_file = self.registry.service_descriptors();
		self.pool = Arc::new(build_pool(plugin_file)?);
		Ok(())
	}

	/// Builds the standard `grpc.reflection.v1`/`v1alpha` services from
	/// this instance's descriptor pool, so generic gRPC clients (`grpcurl`,
	/// this crate's own [`crate::client::ClientRouter`] via the meta
	/// service, or third-party tooling) can enumerate the synthesized
	/// schema without a `.proto` file.
	fn reflection_router(&self) -> Router {
		let set = FileDescriptorSet {
			file: self.pool.files().map(|f| f.file_descriptor_proto().clone()).collect(),
		};

		let v1 = tonic_reflection::server::Builder::configure()
			.register_file_descriptor_set(set.clone())
			.build_v1()
			.expect("registry-synthesized descriptors form a valid reflection set");
		let v1alpha = tonic_reflection::server::Builder::configure()
			.register_file_descriptor_set(set)
			.build_v1alpha()
			.expect("registry-synthesized descriptors form a valid reflection set");

		Router::new()
			.route_service(
				"/grpc.reflection.v1.ServerReflection/ServerReflectionInfo",
				v1,
			)
			.route_service(
				"/grpc.reflection.v1alpha.ServerReflection/ServerReflectionInfo",
				v1alpha,
			)
	}

	/// Mounts this service as the fallback behind the reflection routes,
	/// producing a single `axum::Router` ready for `axum::serve` (or
	/// further composition by the caller — wiring it to a listening socket
	/// is the external entry point's job, out of scope per spec §1).
	pub fn into_router(self) -> Router {
		self.reflection_router().fallback_service(self)
	}

	/// Convenience entry point for the common case: bind `addr` and serve
	/// this instance directly. Kept thin on purpose — the real work is
	/// `into_router`; this just saves callers the `axum::serve` boilerplate.
	pub async fn serve(self, addr: SocketAddr) -> std::io::Result<()> {
		let listener = tokio::net::TcpListener::bind(addr).await?;
		axum::serve(listener, self.into_router().into_make_service()).await
	}

	async fn handle(&self, req: http::Request<Body>) -> http::Response<tonic::body::Body> {
		let path = req.uri().path().to_string();

		if path == format!("/{META_SERVICE_FULL_NAME}/{META_METHOD_NAME}") {
			return self.handle_meta(req).await;
		}

		let Some((namespace, plugin_name)) = parse_method_key(&path) else {
			return Status::not_found(format!("malformed method path: {path}")).to_http();
		};

		let Some((input, output)) = self.resolve_plugin_descriptors(&namespace, &plugin_name) else {
			return Status::not_found(format!("{namespace}:{plugin_name}")).to_http();
		};

		let codec = DynamicCodec { decode_into: input };
		let grpc = Grpc::new(codec);
		grpc.unary(
			PluginUnary {
				dispatcher: self.dispatcher.clone(),
				namespace,
				plugin_name,
				output,
			},
			req,
		)
		.await
	}

	async fn handle_meta(&self, req: http::Request<Body>) -> http::Response<tonic::body::Body> {
		let Some(input) = self.pool.get_message_by_name("plugin_center.MetaRequest") else {
			return Status::internal("meta service descriptor missing").to_http();
		};
		let Some(output) = self.pool.get_message_by_name("plugin_center.MetaResponse") else {
			return Status::internal("meta service descriptor missing").to_http();
		};

		let codec = DynamicCodec { decode_into: input };
		let grpc = Grpc::new(codec);
		grpc.unary(
			MetaUnary {
				meta_service: self.meta_service.clone(),
				output,
			},
			req,
		)
		.await
	}

	fn resolve_plugin_descriptors(&self, namespace: &str, plugin_name: &str) -> Option<(MessageDescriptor, MessageDescriptor)> {
		let service = self.pool.get_service_by_name(&format!("{PACKAGE_NAME}.{namespace}"))?;
		let method = service.methods().find(|m| m.name() == plugin_name)?;
		Some((method.input(), method.output()))
	}
}

impl tower::Service<http::Request<Body>> for PluginGrpcService {
	type Response = http::Response<tonic::body::Body>;
	type Error = Infallible;
	type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Infallible>> + Send>>;

	fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
		std::task::Poll::Ready(Ok(()))
	}

	fn call(&mut self, req: http::Request<Body>) -> Self::Future {
		let this = self.clone();
		Box::pin(async move { Ok(this.handle(req).await) })
	}
}

/// Parses the dispatcher's resolution algorithm (§4.5, steps 1-2): split
/// the path at the last `/`, require an `A.B.C` suffix, and take `(B, C)`
/// as `(namespace, pluginName)`. The leading `A` (which happens to equal
/// `B`, per the wire path's deliberate triple-namespace repetition) is
/// ignored here exactly as it is in the Go source.
fn parse_method_key(path: &str) -> Option<(String, String)> {
	let suffix = path.rsplit('/').next()?;
	let mut parts = suffix.split('.');
	let _service_namespace = parts.next()?;
	let namespace = parts.next()?;
	let name = parts.next()?;
	if parts.next().is_some() {
		return None;
	}
	Some((namespace.to_string(), name.to_string()))
}

struct PluginUnary {
	dispatcher: Arc<Dispatcher>,
	namespace: String,
	plugin_name: String,
	output: MessageDescriptor,
}

impl UnaryService<DynamicMessage> for PluginUnary {
	type Response = DynamicMessage;
	type Future = Pin<Box<dyn Future<Output = Result<Response<DynamicMessage>, Status>> + Send>>;

	fn call(&mut self, request: Request<DynamicMessage>) -> Self::Future {
		let dispatcher = self.dispatcher.clone();
		let namespace = self.namespace.clone();
		let plugin_name = self.plugin_name.clone();
		let output = self.output.clone();
		Box::pin(async move {
			let payload = message_to_json(request.get_ref())?;
			let bytes = dispatcher
				.dispatch(&namespace, &plugin_name, &payload, None)
				.await
				.map_err(to_status)?;
			let message = json_to_message(&bytes, output)?;
			Ok(Response::new(message))
		})
	}
}

struct MetaUnary {
	meta_service: Arc<MetaService>,
	output: MessageDescriptor,
}

impl UnaryService<DynamicMessage> for MetaUnary {
	type Response = DynamicMessage;
	type Future = Pin<Box<dyn Future<Output = Result<Response<DynamicMessage>, Status>> + Send>>;

	fn call(&mut self, request: Request<DynamicMessage>) -> Self::Future {
		let meta_service = self.meta_service.clone();
		let output = self.output.clone();
		Box::pin(async move {
			let request_json: serde_json::Value = serde_json::to_value(request.get_ref())
				.map_err(|e| Status::internal(format!("failed to decode meta request: {e}")))?;

			let req = MetaListRequest {
				namespace: request_json.get("namespace").and_then(|v| v.as_str()).map(String::from),
				name: request_json.get("name").and_then(|v| v.as_str()).map(String::from),
				page: request_json.get("page").and_then(|v| v.as_u64()).map(|n| n as u32),
				size: request_json.get("pageSize").and_then(|v| v.as_u64()).map(|n| n as u32),
			};

			let resp = meta_service.get_plugin_meta_list(req).map_err(to_status)?;

			let value = serde_json::json!({
				"total": resp.total,
				"version": resp.version,
				"plugins": resp.metas.iter().map(plugin_meta_to_wire_json).collect::<Vec<_>>(),
			});
			let message = DynamicMessage::deserialize(output, &value)
				.map_err(|e| Status::internal(format!("failed to encode meta response: {e}")))?;
			Ok(Response::new(message))
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_the_triple_namespace_path() {
		let (namespace, name) = parse_method_key("/plugin_center.Default/Default.Default.SayHello").unwrap();
		assert_eq!(namespace, "Default");
		assert_eq!(name, "SayHello");
	}

	#[test]
	fn rejects_a_two_part_suffix() {
		assert!(parse_method_key("/grpc.reflection.v1.ServerReflection/ServerReflectionInfo").is_none());
	}

	#[test]
	fn rejects_a_path_with_no_slash() {
		assert!(parse_method_key("GetPluginMetaList").is_none());
	}
}
