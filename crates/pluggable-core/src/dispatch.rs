//! C5 Dispatcher: decode -> deadline -> cache probe -> limiter -> execute
//! (panic-isolated) -> encode -> async cache fill.
//!
//! Grounded on `pluggable/call.go`'s `Call`/`run`: a cache hit skips the
//! limiter entirely, a miss takes a token then executes, and the cache is
//! filled by a detached task afterwards (`go func(){ ... }()` in the
//! original) so a slow cache backend never adds latency to the response.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cacheable;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::wire::routing_key;

/// Binds a [`Registry`] to an optional result cache and dispatches decoded
/// JSON payloads to registered plugins.
pub struct Dispatcher {
	registry: Arc<Registry>,
	cache: Option<Arc<dyn Cacheable>>,
}

/// What the deadline-bounded portion of the pipeline (cache probe through
/// execute) produced. Encoding and the detached cache fill happen outside
/// the deadline, since neither can meaningfully exceed the plugin's own
/// timeout once the output value already exists.
enum Outcome {
	CacheHit(Vec<u8>),
	Executed(serde_json::Value, Option<String>),
}

impl Dispatcher {
	pub fn new(registry: Arc<Registry>) -> Self {
		Self { registry, cache: None }
	}

	pub fn with_cache(registry: Arc<Registry>, cache: Arc<dyn Cacheable>) -> Self {
		Self {
			registry,
			cache: Some(cache),
		}
	}

	/// Dispatches a single call. `payload` is the JSON-encoded input;
	/// `timeout_override` is the per-call deadline from `meta.timeout` on
	/// the wire request, falling back to the plugin's registered timeout.
	#[tracing::instrument(skip(self, payload), fields(namespace = %namespace, plugin = %plugin_name))]
	pub async fn dispatch(
		&self,
		namespace: &str,
		plugin_name: &str,
		payload: &[u8],
		timeout_override: Option<Duration>,
	) -> Result<Vec<u8>> {
		let (meta, execute, limiter, cache_key_fn) = self.registry.lookup(namespace, plugin_name)?;
		let key = routing_key(namespace, plugin_name);

		let value: serde_json::Value =
			serde_json::from_slice(payload).map_err(|e| Error::InvalidArgument(e.to_string()))?;

		let deadline = timeout_override.unwrap_or(Duration::from_millis(meta.timeout_ms));

		let cache_key = (meta.cache_time_ms > 0 && self.cache.is_some())
			.then(|| cache_key_fn(&value, namespace, plugin_name));

		// The deadline covers the cache probe through execute — a slow cache
		// backend is just as subject to the plugin's timeout as a slow
		// plugin would be.
		let cache = &self.cache;
		let pipeline_key = key.clone();
		let pipeline = async move {
			if let (Some(cache), Some(cache_key)) = (cache, &cache_key) {
				if let Some(hit) = cache.get(cache_key).await {
					tracing::debug!(key = %pipeline_key, "cache hit");
					return Ok(Outcome::CacheHit(hit));
				}
			}

			if let Some(limiter) = &limiter {
				limiter.until_ready().await;
			}

			let result = tokio::spawn(execute(value)).await;
			let output = match result {
				Ok(Ok(output)) => output,
				Ok(Err(err)) => return Err(err),
				Err(join_err) if join_err.is_panic() => {
					tracing::error!(key = %pipeline_key, "plugin panicked");
					return Err(Error::Internal(pipeline_key));
				}
				Err(join_err) => return Err(Error::Unknown(join_err.to_string())),
			};

			Ok(Outcome::Executed(output, cache_key))
		};

		let outcome = tokio::time::timeout(deadline, pipeline)
			.await
			.map_err(|_| Error::DeadlineExceeded(key.clone()))??;

		match outcome {
			Outcome::CacheHit(bytes) => Ok(bytes),
			Outcome::Executed(output, cache_key) => {
				let encoded = serde_json::to_vec(&output).map_err(|e| Error::Unknown(e.to_string()))?;

				if let (Some(cache), Some(cache_key)) = (self.cache.clone(), cache_key) {
					let ttl = Duration::from_millis(meta.cache_time_ms);
					let to_store = encoded.clone();
					tokio::spawn(async move {
						cache.set(&cache_key, to_store, ttl).await;
					});
				}

				Ok(encoded)
			}
		}
	}
}
