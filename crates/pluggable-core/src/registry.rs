//! C3 Registry: the single source of truth for which plugins are callable,
//! guarded by one `parking_lot::RwLock`, per spec §4.3/§5.
//!
//! Grounded on `pkg/pluggable/registry.go` in full: the version stamp is a
//! timestamp bumped on every mutation, descriptors are synthesized lazily
//! and invalidated whenever the version moves, and `GetPluginMetaList`'s
//! pagination/slicing matches that file's `lo.Ternary`/`min`-based logic.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::limiter::{build_limiter, PluginLimiter};
use crate::meta::{
	Input, Output, PluginMeta, RegisterOptions, DEFAULT_NAMESPACE, DEFAULT_TIMEOUT_MS,
};
use crate::plugin::{CustomCacheKey, Pluggable, PluginSchema};
use crate::schema::build_file_descriptor;
use crate::wire::{default_cache_key, routing_key};

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub(crate) type ExecuteFn =
	Arc<dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<serde_json::Value>> + Send + Sync>;
pub(crate) type CacheKeyFn =
	Arc<dyn Fn(&serde_json::Value, &str, &str) -> String + Send + Sync>;

pub(crate) struct PluginEntry {
	pub meta: PluginMeta,
	pub execute: ExecuteFn,
	pub limiter: Option<Arc<PluginLimiter>>,
	pub cache_key: CacheKeyFn,
}

struct Inner {
	store: HashMap<String, PluginEntry>,
	/// Registration order, so descriptor synthesis and the full listing can
	/// emit plugins in stable insertion order instead of hash order.
	order: Vec<String>,
	descriptors: Option<(String, prost_types::FileDescriptorProto)>,
	version: String,
}

/// The plugin registry. Cheap to clone via `Arc<Registry>`; internally one
/// `RwLock` guards every piece of mutable state so readers (dispatch, meta
/// listing) never block each other and only contend with registration.
pub struct Registry {
	inner: RwLock<Inner>,
}

impl Default for Registry {
	fn default() -> Self {
		Self::new()
	}
}

impl Registry {
	pub fn new() -> Self {
		Self {
			inner: RwLock::new(Inner {
				store: HashMap::new(),
				order: Vec::new(),
				descriptors: None,
				version: initial_version(),
			}),
		}
	}

	/// Registers a plugin under `name`, using the default cache-key
	/// derivation (canonical JSON of the decoded input) when caching is
	/// enabled for it.
	pub fn register<P, I, O>(&self, name: &str, plugin: P, options: RegisterOptions) -> Result<()>
	where
		P: Pluggable<I, O> + 'static,
		I: DeserializeOwned + PluginSchema + Send + 'static,
		O: Serialize + PluginSchema + Send + 'static,
	{
		let cache_key: CacheKeyFn = Arc::new(|value, namespace, name| default_cache_key(namespace, name, value));
		self.register_with_cache_key(name, plugin, options, cache_key)
	}

	/// Registers a plugin whose input type implements [`CustomCacheKey`],
	/// using it instead of the default derivation.
	pub fn register_with_custom_key<P, I, O>(
		&self,
		name: &str,
		plugin: P,
		options: RegisterOptions,
	) -> Result<()>
	where
		P: Pluggable<I, O> + 'static,
		I: DeserializeOwned + PluginSchema + CustomCacheKey + Send + 'static,
		O: Serialize + PluginSchema + Send + 'static,
	{
		let cache_key: CacheKeyFn = Arc::new(|value, namespace, name| {
			match serde_json::from_value::<I>(value.clone()) {
				Ok(input) => input.generate_key(namespace, name),
				Err(_) => default_cache_key(namespace, name, value),
			}
		});
		self.register_with_cache_key(name, plugin, options, cache_key)
	}

	fn register_with_cache_key<P, I, O>(
		&self,
		name: &str,
		plugin: P,
		options: RegisterOptions,
		cache_key: CacheKeyFn,
	) -> Result<()>
	where
		P: Pluggable<I, O> + 'static,
		I: DeserializeOwned + PluginSchema + Send + 'static,
		O: Serialize + PluginSchema + Send + 'static,
	{
		let namespace = options
			.namespace
			.clone()
			.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
		let key = routing_key(&namespace, name);

		let mut inner = self.inner.write();
		if inner.store.contains_key(&key) {
			return Err(Error::Duplicate(key));
		}

		let meta = PluginMeta {
			namespace: namespace.clone(),
			name: name.to_string(),
			desc: options.desc.clone(),
			inputs: build_inputs::<I>()?,
			outputs: build_outputs::<O>(),
			qps: options.qps,
			timeout_ms: if options.timeout_ms > 0 {
				options.timeout_ms
			} else {
				DEFAULT_TIMEOUT_MS
			},
			cache_time_ms: options.cache_time_ms,
		};

		let plugin = Arc::new(plugin);
		let execute: ExecuteFn = Arc::new(move |value: serde_json::Value| {
			let plugin = Arc::clone(&plugin);
			Box::pin(async move {
				let input: I = serde_json::from_value(value)
					.map_err(|e| Error::InvalidArgument(e.to_string()))?;
				let output = plugin.execute(input).await?;
				serde_json::to_value(output).map_err(|e| Error::Unknown(e.to_string()))
			})
		});

		let limiter = build_limiter(options.qps);

		tracing::debug!(namespace = %namespace, name, "registering plugin");

		inner.store.insert(
			key.clone(),
			PluginEntry {
				meta,
				execute,
				limiter,
				cache_key,
			},
		);
		inner.order.push(key);
		inner.descriptors = None;
		let version = next_version(&inner.version);
		inner.version = version;
		Ok(())
	}

	/// Removes a registered plugin, returning whether anything was removed
	/// (the Go source's `Unregister(namespace, pluginName) bool`).
	pub fn unregister(&self, namespace: &str, name: &str) -> bool {
		let key = routing_key(namespace, name);
		let mut inner = self.inner.write();
		let removed = inner.store.remove(&key).is_some();
		if removed {
			inner.order.retain(|k| k != &key);
			tracing::debug!(namespace, name, "unregistered plugin");
			inner.descriptors = None;
			let version = next_version(&inner.version);
			inner.version = version;
		}
		removed
	}

	/// The registry's current version stamp.
	pub fn version(&self) -> String {
		self.inner.read().version.clone()
	}

	/// Synthesizes (or returns the memoized) `FileDescriptorProto` covering
	/// every registered plugin. Memoized against the version counter so
	/// repeated calls between mutations are free.
	pub fn service_descriptors(&self) -> prost_types::FileDescriptorProto {
		{
			let inner = self.inner.read();
			if let Some((version, descriptor)) = &inner.descriptors {
				if *version == inner.version {
					return descriptor.clone();
				}
			}
		}

		let mut inner = self.inner.write();
		if let Some((version, descriptor)) = &inner.descriptors {
			if *version == inner.version {
				return descriptor.clone();
			}
		}

		let metas: Vec<PluginMeta> = inner
			.order
			.iter()
			.filter_map(|key| inner.store.get(key))
			.map(|e| e.meta.clone())
			.collect();
		let descriptor = build_file_descriptor(&metas);
		inner.descriptors = Some((inner.version.clone(), descriptor.clone()));
		descriptor
	}

	/// Backing implementation for C6's `GetPluginMetaList`: returns
	/// `(page_of_metas, total, version)`.
	pub fn plugin_meta_list(
		&self,
		namespace: Option<&str>,
		name: Option<&str>,
		page: u32,
		size: u32,
	) -> Result<(Vec<PluginMeta>, u64, String)> {
		if name.is_some() && namespace.is_none() {
			return Err(Error::InvalidArgument("namespace is required".to_string()));
		}

		let inner = self.inner.read();
		let version = inner.version.clone();

		if let Some(name) = name {
			let namespace = namespace.expect("checked above");
			let key = routing_key(namespace, name);
			return match inner.store.get(&key) {
				Some(entry) => Ok((vec![entry.meta.clone()], 1, version)),
				None => Err(Error::NotFound(key)),
			};
		}

		let mut metas: Vec<PluginMeta> = inner
			.store
			.values()
			.filter(|entry| namespace.map(|ns| entry.meta.namespace == ns).unwrap_or(true))
			.map(|entry| entry.meta.clone())
			.collect();
		metas.sort_by(|a, b| (&a.namespace, &a.name).cmp(&(&b.namespace, &b.name)));

		let total = metas.len() as u64;
		let page = page.max(1) as u64;
		let size = size.max(1) as u64;
		let start = ((page - 1) * size).min(total) as usize;
		let end = (start as u64 + size).min(total) as usize;

		Ok((metas[start..end].to_vec(), total, version))
	}

	/// Looks up a plugin's dispatch-time handles. Internal to the crate;
	/// the dispatcher is the only other consumer.
	pub(crate) fn lookup(
		&self,
		namespace: &str,
		name: &str,
	) -> Result<(PluginMeta, ExecuteFn, Option<Arc<PluginLimiter>>, CacheKeyFn)> {
		let key = routing_key(namespace, name);
		let inner = self.inner.read();
		let entry = inner
			.store
			.get(&key)
			.ok_or_else(|| Error::NotFound(key.clone()))?;
		Ok((
			entry.meta.clone(),
			Arc::clone(&entry.execute),
			entry.limiter.clone(),
			Arc::clone(&entry.cache_key),
		))
	}
}

/// Builds a type's `Input` list, parsing each field's `#[schema(options =
/// "...")]` JSON literal (if any). Grounded on `meta.go`'s `resolveType`:
/// `sonic.Unmarshal` of a malformed `options` tag fails the whole
/// registration rather than silently dropping the allowed-value list.
fn build_inputs<I: PluginSchema>() -> Result<Vec<Input>> {
	let optional = I::struct_optional();
	let options = I::field_options();
	I::schema_items()
		.into_iter()
		.enumerate()
		.map(|(i, item)| {
			let options = match options.get(i).and_then(|o| o.as_deref()) {
				Some(raw) => serde_json::from_str(raw)
					.map_err(|e| Error::SchemaInvalid(item.name.clone(), e.to_string()))?,
				None => serde_json::Value::Null,
			};
			Ok(Input {
				item,
				optional,
				options,
			})
		})
		.collect()
}

fn build_outputs<O: PluginSchema>() -> Vec<Output> {
	O::schema_items().into_iter().map(|item| Output { item }).collect()
}

fn initial_version() -> String {
	chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Produces a version strictly greater (lexicographically) than
/// `previous`. Consecutive mutations within the same wall-clock second fall
/// back to a numeric suffix so the version counter never repeats.
fn next_version(previous: &str) -> String {
	let now = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
	if now.as_str() > previous {
		now
	} else {
		bump_suffix(previous)
	}
}

fn bump_suffix(previous: &str) -> String {
	match previous.rsplit_once('-') {
		Some((base, suffix)) if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) => {
			let n: u64 = suffix.parse().unwrap_or(0);
			format!("{base}-{}", n + 1)
		}
		_ => format!("{previous}-1"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use rstest::rstest;
	use serde::Deserialize;

	#[derive(Debug, Deserialize, Serialize, Clone)]
	struct Req {
		name: String,
	}

	impl PluginSchema for Req {
		fn type_name() -> &'static str {
			"Default.HelloRequest"
		}

		fn schema_items() -> Vec<crate::meta::Item> {
			vec![crate::meta::Item {
				name: "name".to_string(),
				wire_type: crate::wire::WireType::String,
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

		fn schema_items() -> Vec<crate::meta::Item> {
			vec![crate::meta::Item {
				name: "greeting".to_string(),
				wire_type: crate::wire::WireType::String,
				desc: String::new(),
			}]
		}
	}

	struct Hello;

	#[async_trait]
	impl Pluggable<Req, Resp> for Hello {
		async fn execute(&self, input: Req) -> Result<Resp> {
			Ok(Resp {
				greeting: format!("hello {}", input.name),
			})
		}
	}

	#[test]
	fn register_then_duplicate_fails() {
		let registry = Registry::new();
		registry
			.register("Hello", Hello, RegisterOptions::new())
			.unwrap();
		let err = registry
			.register("Hello", Hello, RegisterOptions::new())
			.unwrap_err();
		assert!(matches!(err, Error::Duplicate(_)));
	}

	#[test]
	fn register_bumps_version() {
		let registry = Registry::new();
		let before = registry.version();
		registry
			.register("Hello", Hello, RegisterOptions::new())
			.unwrap();
		assert_ne!(before, registry.version());
	}

	#[test]
	fn unregister_reports_whether_anything_was_removed() {
		let registry = Registry::new();
		assert!(!registry.unregister("Default", "Hello"));
		registry
			.register("Hello", Hello, RegisterOptions::new())
			.unwrap();
		assert!(registry.unregister("Default", "Hello"));
		assert!(!registry.unregister("Default", "Hello"));
	}

	#[test]
	fn service_descriptors_are_memoized_until_mutation() {
		let registry = Registry::new();
		registry
			.register("Hello", Hello, RegisterOptions::new())
			.unwrap();
		let first = registry.service_descriptors();
		let second = registry.service_descriptors();
		assert_eq!(first, second);

		registry
			.register("Hello2", Hello, RegisterOptions::new())
			.unwrap();
		let third = registry.service_descriptors();
		assert_ne!(first, third);
	}

	#[rstest]
	#[case(1, 1, 1)]
	#[case(2, 1, 0)]
	fn plugin_meta_list_paginates(#[case] page: u32, #[case] size: u32, #[case] expected: usize) {
		let registry = Registry::new();
		registry
			.register("Hello", Hello, RegisterOptions::new())
			.unwrap();
		let (metas, total, _version) = registry.plugin_meta_list(None, None, page, size).unwrap();
		assert_eq!(metas.len(), expected);
		assert_eq!(total, 1);
	}

	#[test]
	fn name_without_namespace_is_invalid_argument() {
		let registry = Registry::new();
		let err = registry
			.plugin_meta_list(None, Some("Hello"), 1, 20)
			.unwrap_err();
		assert!(matches!(err, Error::InvalidArgument(_)));
	}

	#[test]
	fn lookup_is_case_normalized_via_routing_key() {
		let registry = Registry::new();
		registry
			.register("Hello", Hello, RegisterOptions::new())
			.unwrap();
		assert!(registry.lookup("Default", "Hello").is_ok());
		assert!(registry.lookup("default", "hello").is_ok());
	}

	#[test]
	fn registration_order_is_preserved_in_descriptors() {
		let registry = Registry::new();
		registry
			.register("Zebra", Hello, RegisterOptions::new())
			.unwrap();
		registry
			.register("Apple", Hello, RegisterOptions::new())
			.unwrap();
		let file = registry.service_descriptors();
		let names: Vec<_> = file.service.iter().map(|s| s.name.clone().unwrap()).collect();
		assert_eq!(names, vec!["Default".to_string()]);
		let methods: Vec<_> = file.service[0]
			.method
			.iter()
			.map(|m| m.name.clone().unwrap())
			.collect();
		assert_eq!(methods, vec!["Zebra".to_string(), "Apple".to_string()]);
	}

	struct WithOptions;

	#[derive(Debug, Deserialize, Serialize, Clone)]
	struct ReqWithOptions {
		color: String,
	}

	impl PluginSchema for ReqWithOptions {
		fn type_name() -> &'static str {
			"Default.ColorRequest"
		}

		fn schema_items() -> Vec<crate::meta::Item> {
			vec![crate::meta::Item {
				name: "color".to_string(),
				wire_type: crate::wire::WireType::String,
				desc: String::new(),
			}]
		}

		fn field_options() -> Vec<Option<String>> {
			vec![Some(r#"["red","green","blue"]"#.to_string())]
		}
	}

	#[async_trait]
	impl Pluggable<ReqWithOptions, Resp> for WithOptions {
		async fn execute(&self, input: ReqWithOptions) -> Result<Resp> {
			Ok(Resp {
				greeting: input.color,
			})
		}
	}

	#[test]
	fn field_options_are_parsed_onto_the_input() {
		let registry = Registry::new();
		registry
			.register("Color", WithOptions, RegisterOptions::new())
			.unwrap();
		let (meta, ..) = registry.lookup("Default", "Color").unwrap();
		assert_eq!(
			meta.inputs[0].options,
			serde_json::json!(["red", "green", "blue"])
		);
	}

	struct WithBadOptions;

	#[derive(Debug, Deserialize, Serialize, Clone)]
	struct ReqWithBadOptions {
		color: String,
	}

	impl PluginSchema for ReqWithBadOptions {
		fn type_name() -> &'static str {
			"Default.ColorRequest"
		}

		fn schema_items() -> Vec<crate::meta::Item> {
			vec![crate::meta::Item {
				name: "color".to_string(),
				wire_type: crate::wire::WireType::String,
				desc: String::new(),
			}]
		}

		fn field_options() -> Vec<Option<String>> {
			vec![Some("not json".to_string())]
		}
	}

	#[async_trait]
	impl Pluggable<ReqWithBadOptions, Resp> for WithBadOptions {
		async fn execute(&self, input: ReqWithBadOptions) -> Result<Resp> {
			Ok(Resp {
				greeting: input.color,
			})
		}
	}

	#[test]
	fn malformed_options_json_fails_registration() {
		let registry = Registry::new();
		let err = registry
			.register("Color", WithBadOptions, RegisterOptions::new())
			.unwrap_err();
		assert!(matches!(err, Error::SchemaInvalid(_, _)));
	}
}
