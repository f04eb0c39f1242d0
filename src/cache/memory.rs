//! Thread-safe in-memory cache for local development, tests, and single-node deployments.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	cache::{
		CacheFuture, HashFields, SessionKey, SessionStore, StatKey, StatsStore, TokenCache,
		TokenKey,
	},
};

#[derive(Clone, Debug)]
struct Expiring<T> {
	value: T,
	expires_at: Option<OffsetDateTime>,
}
impl<T> Expiring<T> {
	fn new(value: T, ttl: Duration, now: OffsetDateTime) -> Self {
		Self { value, expires_at: now.checked_add(ttl) }
	}

	fn is_live_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_none_or(|at| now < at)
	}

	fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		self.expires_at.map_or(Duration::MAX, |at| at - now)
	}
}

type ExpiringMap<T> = RwLock<HashMap<String, Expiring<T>>>;

#[derive(Debug, Default)]
struct MemoryState {
	tokens: ExpiringMap<TokenSecret>,
	hashes: ExpiringMap<HashFields>,
	counters: RwLock<HashMap<String, i64>>,
}

/// Storage backend that keeps tokens, counters, and hashes in-process.
///
/// Expiry is evaluated lazily on access; expired entries are purged the first time they are
/// read. Clones share the same underlying state.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(Arc<MemoryState>);
impl MemoryCache {
	fn read_live<T>(map: &ExpiringMap<T>, key: &str, now: OffsetDateTime) -> Option<Expiring<T>>
	where
		T: Clone,
	{
		{
			let guard = map.read();

			match guard.get(key) {
				Some(entry) if entry.is_live_at(now) => return Some(entry.clone()),
				None => return None,
				Some(_) => {},
			}
		}

		let mut guard = map.write();

		if guard.get(key).is_some_and(|entry| !entry.is_live_at(now)) {
			guard.remove(key);
		}

		None
	}

	fn write_expiring<T>(map: &ExpiringMap<T>, key: String, value: T, ttl: Duration) {
		let mut guard = map.write();

		if ttl.is_positive() {
			guard.insert(key, Expiring::new(value, ttl, OffsetDateTime::now_utc()));
		} else {
			guard.remove(&key);
		}
	}

	fn incr_now(&self, key: String) -> i64 {
		let mut guard = self.0.counters.write();
		let value = guard.entry(key).or_insert(0);

		*value = value.saturating_add(1);

		*value
	}

	fn hset_now(&self, key: String, field: &str, value: String) {
		let mut guard = self.0.hashes.write();
		let now = OffsetDateTime::now_utc();
		let entry = guard
			.entry(key)
			.and_modify(|entry| {
				if !entry.is_live_at(now) {
					*entry = Expiring { value: HashFields::new(), expires_at: None };
				}
			})
			.or_insert_with(|| Expiring { value: HashFields::new(), expires_at: None });

		entry.value.insert(field.to_owned(), value);
	}
}
impl TokenCache for MemoryCache {
	fn get<'a>(&'a self, key: &'a TokenKey) -> CacheFuture<'a, Option<TokenSecret>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			Ok(Self::read_live(&self.0.tokens, &key.to_string(), now).map(|entry| entry.value))
		})
	}

	fn set<'a>(
		&'a self,
		key: &'a TokenKey,
		token: TokenSecret,
		ttl: Duration,
	) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			Self::write_expiring(&self.0.tokens, key.to_string(), token, ttl);

			Ok(())
		})
	}

	fn ttl<'a>(&'a self, key: &'a TokenKey) -> CacheFuture<'a, Option<Duration>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			Ok(Self::read_live(&self.0.tokens, &key.to_string(), now)
				.map(|entry| entry.remaining_at(now)))
		})
	}

	fn delete<'a>(&'a self, key: &'a TokenKey) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			self.0.tokens.write().remove(&key.to_string());

			Ok(())
		})
	}
}
impl StatsStore for MemoryCache {
	fn incr<'a>(&'a self, key: &'a StatKey) -> CacheFuture<'a, i64> {
		Box::pin(async move { Ok(self.incr_now(key.to_string())) })
	}

	fn counter<'a>(&'a self, key: &'a StatKey) -> CacheFuture<'a, Option<i64>> {
		Box::pin(async move { Ok(self.0.counters.read().get(&key.to_string()).copied()) })
	}

	fn hset<'a>(&'a self, key: &'a StatKey, field: &'a str, value: String) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			self.hset_now(key.to_string(), field, value);

			Ok(())
		})
	}

	fn hgetall<'a>(&'a self, key: &'a StatKey) -> CacheFuture<'a, HashFields> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			Ok(Self::read_live(&self.0.hashes, &key.to_string(), now)
				.map(|entry| entry.value)
				.unwrap_or_default())
		})
	}
}
impl SessionStore for MemoryCache {
	fn save_session<'a>(
		&'a self,
		key: &'a SessionKey,
		fields: HashFields,
		ttl: Duration,
	) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			let ttl = if fields.is_empty() { Duration::ZERO } else { ttl };

			Self::write_expiring(&self.0.hashes, key.to_string(), fields, ttl);

			Ok(())
		})
	}

	fn fetch_session<'a>(&'a self, key: &'a SessionKey) -> CacheFuture<'a, Option<HashFields>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			Ok(Self::read_live(&self.0.hashes, &key.to_string(), now).map(|entry| entry.value))
		})
	}

	fn delete_session<'a>(&'a self, key: &'a SessionKey) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			self.0.hashes.write().remove(&key.to_string());

			Ok(())
		})
	}
}
