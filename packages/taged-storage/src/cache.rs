//! Cache-aside helpers with version counters for bulk invalidation.

use std::{
	future::Future,
	time::{Duration, Instant},
};

use moka::{Expiry, future::Cache};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{BoxFuture, Error, Result};

pub const DEFAULT_VERSION: u64 = 1;
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

pub trait CacheStore
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>>>;

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: Value,
		ttl: Option<Duration>,
	) -> BoxFuture<'a, Result<()>>;

	fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool>>;

	/// Atomically adds `delta`, storing `initial` instead when the key is absent.
	fn incr<'a>(&'a self, key: &'a str, delta: i64, initial: i64) -> BoxFuture<'a, Result<i64>>;
}

#[derive(Clone)]
struct Entry {
	value: Value,
	ttl: Option<Duration>,
}

struct EntryExpiry;
impl Expiry<String, Entry> for EntryExpiry {
	fn expire_after_create(&self, _: &String, entry: &Entry, _: Instant) -> Option<Duration> {
		entry.ttl
	}

	fn expire_after_update(
		&self,
		_: &String,
		entry: &Entry,
		_: Instant,
		_: Option<Duration>,
	) -> Option<Duration> {
		entry.ttl
	}
}

/// Process-local store backed by moka.
///
/// Cached values are bounded by `max_entries` and expire with their own TTL. Counters live
/// apart from them and are never evicted, so a version cannot silently fall back to its
/// default while entries rendered with older versions are still alive.
#[derive(Clone)]
pub struct MemoryCache {
	entries: Cache<String, Entry>,
	counters: Cache<String, i64>,
}
impl MemoryCache {
	pub fn new() -> Self {
		Self::with_capacity(DEFAULT_MAX_ENTRIES)
	}

	pub fn with_capacity(max_entries: u64) -> Self {
		Self {
			entries: Cache::builder().max_capacity(max_entries).expire_after(EntryExpiry).build(),
			counters: Cache::builder().build(),
		}
	}
}
impl Default for MemoryCache {
	fn default() -> Self {
		Self::new()
	}
}
impl CacheStore for MemoryCache {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Value>>> {
		Box::pin(async move {
			if let Some(counter) = self.counters.get(key).await {
				return Ok(Some(Value::from(counter)));
			}

			Ok(self.entries.get(key).await.map(|entry| entry.value))
		})
	}

	fn set<'a>(
		&'a self,
		key: &'a str,
		value: Value,
		ttl: Option<Duration>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			self.counters.invalidate(key).await;
			self.entries.insert(key.to_string(), Entry { value, ttl }).await;

			Ok(())
		})
	}

	fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			let counter = self.counters.remove(key).await.is_some();
			let entry = self.entries.remove(key).await.is_some();

			Ok(counter || entry)
		})
	}

	fn incr<'a>(&'a self, key: &'a str, delta: i64, initial: i64) -> BoxFuture<'a, Result<i64>> {
		Box::pin(async move {
			let entry = self
				.counters
				.entry(key.to_string())
				.and_upsert_with(|current| async move {
					match current {
						Some(current) => current.into_value().saturating_add(delta),
						None => initial,
					}
				})
				.await;

			Ok(entry.into_value())
		})
	}
}

/// A cache key built from a namespace and an optional scope such as a username.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
	namespace: String,
	scope: Option<String>,
}
impl CacheKey {
	pub fn new(namespace: impl Into<String>) -> Self {
		Self { namespace: namespace.into(), scope: None }
	}

	pub fn scoped(namespace: impl Into<String>, scope: impl Into<String>) -> Self {
		Self { namespace: namespace.into(), scope: Some(scope.into()) }
	}

	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	pub fn render(&self, version: u64) -> String {
		match &self.scope {
			Some(scope) => format!("{}:{scope}:v{version}", self.namespace),
			None => format!("{}:v{version}", self.namespace),
		}
	}
}

/// A named monotonic counter. Bumping it orphans every key rendered with the old value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheVersion {
	name: String,
}
impl CacheVersion {
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into() }
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	fn key(&self) -> String {
		format!("version:{}", self.name)
	}

	pub async fn get_version(&self, store: &dyn CacheStore) -> Result<u64> {
		let version = store.get(&self.key()).await?;

		Ok(version.as_ref().and_then(Value::as_u64).filter(|v| *v > 0).unwrap_or(DEFAULT_VERSION))
	}

	pub async fn increment_version(&self, store: &dyn CacheStore) -> Result<u64> {
		let next = store.incr(&self.key(), 1, DEFAULT_VERSION as i64 + 1).await?;

		Ok(next.max(1) as u64)
	}
}

/// Returns the cached value for `key` at `version`, computing and storing it on a miss.
/// Only an absent or undecodable entry counts as a miss; empty results are cached too.
pub async fn get_or_cache<T, E, F, Fut>(
	store: &dyn CacheStore,
	key: &CacheKey,
	version: u64,
	ttl: Duration,
	compute: F,
) -> Result<T, E>
where
	T: Serialize + DeserializeOwned,
	E: From<Error>,
	F: FnOnce() -> Fut,
	Fut: Future<Output = Result<T, E>>,
{
	let rendered = key.render(version);

	if let Some(cached) = store.get(&rendered).await? {
		match serde_json::from_value(cached) {
			Ok(value) => {
				tracing::debug!(key = %rendered, "Cache hit.");

				return Ok(value);
			},
			Err(err) => tracing::warn!(key = %rendered, error = %err, "Dropping undecodable cache entry."),
		}
	}

	let value = compute().await?;
	let encoded = serde_json::to_value(&value).map_err(Error::from)?;

	store.set(&rendered, encoded, Some(ttl)).await?;

	Ok(value)
}
