//! The pluggable result cache (C4's cache half).
//!
//! The Go source's `Cacheable` interface (`Set`/`Get`) is kept as a trait so
//! callers can swap in a different backend; [`MemoryCache`] is the default,
//! grounded in the teacher's own use of `moka` for TTL caching
//! (`reinhardt-conf/Cargo.toml`, `reinhardt-conf/crates/settings/Cargo.toml`).
//! Unlike the teacher's usage, every entry here carries its own TTL (the
//! spec's per-call `cache_time_ms` contract), so a [`moka::Expiry`]
//! implementation is used instead of a single cache-wide TTL.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::sync::Cache;
use moka::Expiry;

/// A cached value paired with the TTL it was inserted with.
#[derive(Clone)]
struct Entry {
	bytes: Arc<[u8]>,
	ttl: Duration,
}

struct PerEntryExpiry;

impl Expiry<String, Entry> for PerEntryExpiry {
	fn expire_after_create(&self, _key: &String, value: &Entry, _created_at: Instant) -> Option<Duration> {
		Some(value.ttl)
	}
}

/// Backend for the dispatcher's result cache.
#[async_trait]
pub trait Cacheable: Send + Sync {
	async fn get(&self, key: &str) -> Option<Vec<u8>>;
	async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration);
}

/// Default in-memory cache, backed by `moka::sync::Cache` with a per-entry
/// expiry policy.
pub struct MemoryCache {
	inner: Cache<String, Entry>,
}

impl MemoryCache {
	/// `max_capacity` bounds the number of distinct cached results kept at
	/// once; the original used an unbounded `go-cache` map swept every 10
	/// minutes, but moka requires an explicit capacity for its eviction
	/// policy.
	pub fn new(max_capacity: u64) -> Self {
		let inner = Cache::builder()
			.max_capacity(max_capacity)
			.expire_after(PerEntryExpiry)
			.build();
		Self { inner }
	}
}

impl Default for MemoryCache {
	fn default() -> Self {
		Self::new(10_000)
	}
}

#[async_trait]
impl Cacheable for MemoryCache {
	async fn get(&self, key: &str) -> Option<Vec<u8>> {
		self.inner.get(key).map(|entry| entry.bytes.to_vec())
	}

	async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
		self.inner.insert(
			key.to_string(),
			Entry {
				bytes: Arc::from(value.into_boxed_slice()),
				ttl,
			},
		);
	}
}
