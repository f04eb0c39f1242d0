//! Cache contracts and built-in backends for tokens, statistics, and sessions.
//!
//! [`TokenCache`] is the only store the broker consults when deciding whether a token is
//! still live. [`StatsStore`] and [`SessionStore`] cover the auxiliary counter and hash data
//! that share the same key-value backend.

pub mod key;
pub mod memory;
#[cfg(feature = "redis")] pub mod redis;

pub use key::*;
pub use memory::MemoryCache;
#[cfg(feature = "redis")] pub use redis::{RedisCache, RedisConfig};

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Boxed future returned by every cache operation.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Field/value pairs stored under a hash key.
pub type HashFields = HashMap<String, String>;

/// Token storage contract consulted by the broker.
///
/// Implementations enforce expiry themselves: [`TokenCache::get`] must never return a value
/// whose TTL has elapsed, and absent or expired keys are reported as `None` rather than
/// errors. Concurrent writers overwrite each other.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Returns the live token stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a TokenKey) -> CacheFuture<'a, Option<TokenSecret>>;

	/// Stores `token` under `key` for `ttl`.
	///
	/// A zero or negative TTL expires the key immediately: nothing is stored and any previous
	/// value is removed.
	fn set<'a>(&'a self, key: &'a TokenKey, token: TokenSecret, ttl: Duration)
	-> CacheFuture<'a, ()>;

	/// Returns the remaining lifetime of the token stored under `key`.
	///
	/// Keys without an expiry report [`Duration::MAX`].
	fn ttl<'a>(&'a self, key: &'a TokenKey) -> CacheFuture<'a, Option<Duration>>;

	/// Removes the token stored under `key`. Deleting an absent key succeeds.
	fn delete<'a>(&'a self, key: &'a TokenKey) -> CacheFuture<'a, ()>;
}

/// Counter and hash operations backing usage statistics.
///
/// Every operation is independent and safe to retry.
pub trait StatsStore
where
	Self: Send + Sync,
{
	/// Increments the counter at `key`, returning the new value.
	fn incr<'a>(&'a self, key: &'a StatKey) -> CacheFuture<'a, i64>;

	/// Reads the counter at `key`.
	fn counter<'a>(&'a self, key: &'a StatKey) -> CacheFuture<'a, Option<i64>>;

	/// Sets `field` inside the hash at `key`.
	fn hset<'a>(&'a self, key: &'a StatKey, field: &'a str, value: String) -> CacheFuture<'a, ()>;

	/// Reads every field of the hash at `key`; absent hashes are empty.
	fn hgetall<'a>(&'a self, key: &'a StatKey) -> CacheFuture<'a, HashFields>;
}

/// Hash-backed session storage for auxiliary per-subject data.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Replaces the session fields and applies `ttl`.
	///
	/// A zero or negative TTL or an empty field set removes the session.
	fn save_session<'a>(
		&'a self,
		key: &'a SessionKey,
		fields: HashFields,
		ttl: Duration,
	) -> CacheFuture<'a, ()>;

	/// Fetches the live session fields, if any.
	fn fetch_session<'a>(&'a self, key: &'a SessionKey) -> CacheFuture<'a, Option<HashFields>>;

	/// Removes the session.
	fn delete_session<'a>(&'a self, key: &'a SessionKey) -> CacheFuture<'a, ()>;
}

/// Error type produced by cache backends.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CacheError {
	/// Stored data could not be encoded or decoded.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// The operation exceeded its deadline.
	#[error("Cache {operation} timed out after {after}.")]
	Timeout {
		/// Operation label (`get`, `set`, ...).
		operation: &'static str,
		/// Deadline that elapsed.
		after: Duration,
	},
}

/// Runs a cache operation under an optional deadline.
///
/// A non-positive `limit` disables the deadline.
pub(crate) async fn bounded<T>(
	operation: &'static str,
	limit: Duration,
	fut: CacheFuture<'_, T>,
) -> Result<T, CacheError> {
	if !limit.is_positive() {
		return fut.await;
	}

	match tokio::time::timeout(limit.unsigned_abs(), fut).await {
		Ok(result) => result,
		Err(_) => Err(CacheError::Timeout { operation, after: limit }),
	}
}
