//! C6 Meta Service: the read-only surface a client's [router](../pluggable_grpc)
//! pages through to build its routing table.
//!
//! Grounded on `pkg/server/serve.go`'s `GetPluginMetaList` handler: a
//! `name` without a `namespace` is rejected up front, a `name` bypasses
//! pagination entirely, otherwise the registry's own slicing rules apply.

use std::sync::Arc;

use crate::error::Result;
use crate::meta::PluginMeta;
use crate::registry::Registry;

/// One page of a `GetPluginMetaList` query.
#[derive(Debug, Clone, Default)]
pub struct MetaListRequest {
	pub namespace: Option<String>,
	pub name: Option<String>,
	pub page: Option<u32>,
	pub size: Option<u32>,
}

/// A page of results plus the registry version it was computed against, so
/// a client can detect whether the routing table moved under it mid-scan.
#[derive(Debug, Clone)]
pub struct MetaListResponse {
	pub metas: Vec<PluginMeta>,
	pub total: u64,
	pub version: String,
}

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_SIZE: u32 = 20;

/// Thin read-only facade over [`Registry`] for the metadata/reflection RPC.
pub struct MetaService {
	registry: Arc<Registry>,
}

impl MetaService {
	pub fn new(registry: Arc<Registry>) -> Self {
		Self { registry }
	}

	pub fn get_plugin_meta_list(&self, request: MetaListRequest) -> Result<MetaListResponse> {
		let page = request.page.unwrap_or(DEFAULT_PAGE);
		let size = request.size.unwrap_or(DEFAULT_SIZE);

		let (metas, total, version) = self.registry.plugin_meta_list(
			request.namespace.as_deref(),
			request.name.as_deref(),
			page,
			size,
		)?;

		Ok(MetaListResponse { metas, total, version })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::Error;
	use crate::meta::{Item, RegisterOptions};
	use crate::plugin::{Pluggable, PluginSchema};
	use crate::wire::WireType;
	use async_trait::async_trait;
	use serde::{Deserialize, Serialize};

	#[derive(Debug, Deserialize, Serialize, Clone)]
	struct Req {
		name: String,
	}

	impl PluginSchema for Req {
		fn type_name() -> &'static str {
			"Default.HelloRequest"
		}
		fn schema_items() -> Vec<Item> {
			vec![Item {
				name: "name".to_string(),
				wire_type: WireType::String,
				desc: String::new(),
			}]
		}
	}

	#[derive(Debug, Deserialize, Serialize, Clone)]
	struct Resp {
		greeting: String,
	}

	impl PluginSchema for Resp {
		fn type_name() -> &'static str {
			"Default.HelloResponse"
		}
		fn schema_items() -> Vec<Item> {
			vec![Item {
				name: "greeting".to_string(),
				wire_type: WireType::String,
				desc: String::new(),
			}]
		}
	}

	struct Hello;

	#[async_trait]
	impl Pluggable<Req, Resp> for Hello {
		async fn execute(&self, input: Req) -> crate::error::Result<Resp> {
			Ok(Resp {
				greeting: format!("hello {}", input.name),
			})
		}
	}

	#[test]
	fn name_without_namespace_is_rejected() {
		let registry = Arc::new(Registry::new());
		let service = MetaService::new(registry);
		let err = service
			.get_plugin_meta_list(MetaListRequest {
				name: Some("Hello".to_string()),
				..Default::default()
			})
			.unwrap_err();
		assert!(matches!(err, Error::InvalidArgument(_)));
	}

	#[test]
	fn name_lookup_bypasses_pagination() {
		let registry = Arc::new(Registry::new());
		registry
			.register("Hello", Hello, RegisterOptions::new())
			.unwrap();
		let service = MetaService::new(registry);
		let resp = service
			.get_plugin_meta_list(MetaListRequest {
				namespace: Some("Default".to_string()),
				name: Some("Hello".to_string()),
				..Default::default()
			})
			.unwrap();
		assert_eq!(resp.metas.len(), 1);
		assert_eq!(resp.total, 1);
	}

	#[test]
	fn default_page_and_size_are_applied() {
		let registry = Arc::new(Registry::new());
		registry
			.register("Hello", Hello, RegisterOptions::new())
			.unwrap();
		let service = MetaService::new(registry);
		let resp = service.get_plugin_meta_list(MetaListRequest::default()).unwrap();
		assert_eq!(resp.metas.len(), 1);
	}
}
