//! End-to-end scenarios for the core dispatch pipeline (S1-S6), exercised
//! without any transport in front of the registry/dispatcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pluggable_core::{
	Dispatcher, Error, Item, MetaListRequest, MetaService, PluginSchema, Registry, RegisterOptions,
};
use pluggable_core::wire::WireType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
struct HelloRequest {
	name: String,
}

impl PluginSchema for HelloRequest {
	fn type_name() -> &'static str {
		"Default.HelloRequest"
	}
	fn schema_items() -> Vec<Item> {
		vec![Item {
			name: "name".to_string(),
			wire_type: WireType::String,
			desc: "who to greet".to_string(),
		}]
	}
}

#[derive(Debug, Deserialize, Serialize, Clone)]
struct HelloResponse {
	greeting: String,
}

impl PluginSchema for HelloResponse {
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
impl pluggable_core::Pluggable<HelloRequest, HelloResponse> for Hello {
	async fn execute(&self, input: HelloRequest) -> pluggable_core::Result<HelloResponse> {
		Ok(HelloResponse {
			greeting: format!("hello {}", input.name),
		})
	}
}

/// S1: a registered plugin answers a well-formed call.
#[tokio::test]
async fn s1_hello_happy_path() {
	let registry = Arc::new(Registry::new());
	registry.register("Hello", Hello, RegisterOptions::new()).unwrap();
	let dispatcher = Dispatcher::new(registry);

	let out = dispatcher
		.dispatch("Default", "Hello", br#"{"name":"world"}"#, None)
		.await
		.unwrap();
	let out: HelloResponse = serde_json::from_slice(&out).unwrap();
	assert_eq!(out.greeting, "hello world");
}

/// S2: calling an unregistered plugin surfaces `NotFound`.
#[tokio::test]
async fn s2_unknown_plugin() {
	let registry = Arc::new(Registry::new());
	let dispatcher = Dispatcher::new(registry);
	let err = dispatcher
		.dispatch("Default", "Missing", b"{}", None)
		.await
		.unwrap_err();
	assert!(matches!(err, Error::NotFound(_)));
}

/// S3: registering the same namespace/name twice fails the second time.
#[test]
fn s3_duplicate_registration() {
	let registry = Registry::new();
	registry.register("Hello", Hello, RegisterOptions::new()).unwrap();
	let err = registry.register("Hello", Hello, RegisterOptions::new()).unwrap_err();
	assert!(matches!(err, Error::Duplicate(_)));
}

/// S4: a tightly QPS-limited plugin rejects a burst once the per-call
/// deadline is shorter than the bucket's refill interval.
#[tokio::test]
async fn s4_qps_limiting() {
	let registry = Arc::new(Registry::new());
	registry
		.register("Hello", Hello, RegisterOptions::new().qps(1))
		.unwrap();
	let dispatcher = Dispatcher::new(registry);

	dispatcher
		.dispatch("Default", "Hello", br#"{"name":"a"}"#, Some(Duration::from_millis(200)))
		.await
		.unwrap();

	let err = dispatcher
		.dispatch("Default", "Hello", br#"{"name":"b"}"#, Some(Duration::from_millis(50)))
		.await
		.unwrap_err();
	assert!(matches!(err, Error::DeadlineExceeded(_)));
}

/// S5: the registry's version stamp changes on every mutation, the signal
/// a client router uses to know its routing table is stale.
#[test]
fn s5_version_changes_on_mutation() {
	let registry = Registry::new();
	let v0 = registry.version();
	registry.register("Hello", Hello, RegisterOptions::new()).unwrap();
	let v1 = registry.version();
	assert_ne!(v0, v1);
	registry.unregister("Default", "Hello");
	let v2 = registry.version();
	assert_ne!(v1, v2);
}

/// S6: the meta service reports the registered shape of a plugin, matching
/// what was passed at registration time.
#[test]
fn s6_meta_shape() {
	let registry = Arc::new(Registry::new());
	registry
		.register(
			"Hello",
			Hello,
			RegisterOptions::new().desc("says hello").namespace("Default"),
		)
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
	let meta = &resp.metas[0];
	assert_eq!(meta.namespace, "Default");
	assert_eq!(meta.name, "Hello");
	assert_eq!(meta.desc, "says hello");
	assert_eq!(meta.inputs.len(), 1);
	assert_eq!(meta.inputs[0].item.name, "name");
	assert_eq!(meta.outputs.len(), 1);
	assert_eq!(meta.outputs[0].item.name, "greeting");
}
