//! Redis-backed cache shared by every broker instance in a deployment.

// crates.io
use redis::{AsyncCommands, Client, RedisError, aio::ConnectionManager};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	cache::{
		CacheError, CacheFuture, HashFields, SessionKey, SessionStore, StatKey, StatsStore,
		TokenCache, TokenKey,
	},
};

/// Connection settings for [`RedisCache`].
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
	/// Server host name.
	pub host: String,
	/// Server port.
	pub port: u16,
	/// Optional password.
	pub password: Option<String>,
	/// Logical database index.
	pub db: i64,
	/// Deadline for establishing the initial connection, in seconds.
	pub connect_timeout_secs: u64,
}
impl RedisConfig {
	/// Builds the `redis://` connection URL.
	pub fn url(&self) -> String {
		match &self.password {
			Some(password) => format!("redis://:{password}@{}:{}/{}", self.host, self.port, self.db),
			None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
		}
	}
}
impl Default for RedisConfig {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".into(),
			port: 6379,
			password: None,
			db: 0,
			connect_timeout_secs: 5,
		}
	}
}
impl Debug for RedisConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RedisConfig")
			.field("host", &self.host)
			.field("port", &self.port)
			.field("password_set", &self.password.is_some())
			.field("db", &self.db)
			.field("connect_timeout_secs", &self.connect_timeout_secs)
			.finish()
	}
}

/// [`TokenCache`], [`StatsStore`], and [`SessionStore`] over a multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisCache {
	conn: ConnectionManager,
}
impl RedisCache {
	/// Connects using the provided settings.
	pub async fn connect(config: &RedisConfig) -> Result<Self, CacheError> {
		let client = Client::open(config.url()).map_err(backend)?;
		let limit = connect_timeout(config.connect_timeout_secs);
		let conn = tokio::time::timeout(limit.unsigned_abs(), ConnectionManager::new(client))
			.await
			.map_err(|_| CacheError::Timeout { operation: "connect", after: limit })?
			.map_err(backend)?;

		Ok(Self { conn })
	}

	/// Wraps an existing connection manager.
	pub fn with_connection(conn: ConnectionManager) -> Self {
		Self { conn }
	}

	fn connection(&self) -> ConnectionManager {
		self.conn.clone()
	}
}
impl Debug for RedisCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RedisCache(..)")
	}
}
impl TokenCache for RedisCache {
	fn get<'a>(&'a self, key: &'a TokenKey) -> CacheFuture<'a, Option<TokenSecret>> {
		Box::pin(async move {
			let mut conn = self.connection();
			let value = conn.get::<_, Option<String>>(key.to_string()).await.map_err(backend)?;

			Ok(value.filter(|value| !value.is_empty()).map(TokenSecret::new))
		})
	}

	fn set<'a>(
		&'a self,
		key: &'a TokenKey,
		token: TokenSecret,
		ttl: Duration,
	) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			let mut conn = self.connection();

			match positive_millis(ttl) {
				Some(millis) => conn
					.pset_ex::<_, _, ()>(key.to_string(), token.expose(), millis)
					.await
					.map_err(backend),
				None => conn.del::<_, ()>(key.to_string()).await.map_err(backend),
			}
		})
	}

	fn ttl<'a>(&'a self, key: &'a TokenKey) -> CacheFuture<'a, Option<Duration>> {
		Box::pin(async move {
			let mut conn = self.connection();
			let millis = conn.pttl::<_, i64>(key.to_string()).await.map_err(backend)?;

			// -2: missing key, -1: key without expiry.
			Ok(match millis {
				-1 => Some(Duration::MAX),
				millis if millis >= 0 => Some(Duration::milliseconds(millis)),
				_ => None,
			})
		})
	}

	fn delete<'a>(&'a self, key: &'a TokenKey) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			let mut conn = self.connection();

			conn.del::<_, ()>(key.to_string()).await.map_err(backend)
		})
	}
}
impl StatsStore for RedisCache {
	fn incr<'a>(&'a self, key: &'a StatKey) -> CacheFuture<'a, i64> {
		Box::pin(async move {
			let mut conn = self.connection();

			conn.incr::<_, _, i64>(key.to_string(), 1_i64).await.map_err(backend)
		})
	}

	fn counter<'a>(&'a self, key: &'a StatKey) -> CacheFuture<'a, Option<i64>> {
		Box::pin(async move {
			let mut conn = self.connection();

			conn.get::<_, Option<i64>>(key.to_string()).await.map_err(backend)
		})
	}

	fn hset<'a>(&'a self, key: &'a StatKey, field: &'a str, value: String) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			let mut conn = self.connection();

			conn.hset::<_, _, _, ()>(key.to_string(), field, value).await.map_err(backend)
		})
	}

	fn hgetall<'a>(&'a self, key: &'a StatKey) -> CacheFuture<'a, HashFields> {
		Box::pin(async move {
			let mut conn = self.connection();

			conn.hgetall::<_, HashFields>(key.to_string()).await.map_err(backend)
		})
	}
}
impl SessionStore for RedisCache {
	fn save_session<'a>(
		&'a self,
		key: &'a SessionKey,
		fields: HashFields,
		ttl: Duration,
	) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			let mut conn = self.connection();
			let key = key.to_string();
			let millis = match positive_millis(ttl) {
				Some(millis) if !fields.is_empty() => millis,
				_ => return conn.del::<_, ()>(key).await.map_err(backend),
			};
			let pairs = fields.into_iter().collect::<Vec<_>>();

			redis::pipe()
				.atomic()
				.del(&key)
				.ignore()
				.hset_multiple(&key, &pairs)
				.ignore()
				.pexpire(&key, i64::try_from(millis).unwrap_or(i64::MAX))
				.ignore()
				.query_async::<()>(&mut conn)
				.await
				.map_err(backend)
		})
	}

	fn fetch_session<'a>(&'a self, key: &'a SessionKey) -> CacheFuture<'a, Option<HashFields>> {
		Box::pin(async move {
			let mut conn = self.connection();
			let fields = conn.hgetall::<_, HashFields>(key.to_string()).await.map_err(backend)?;

			Ok(if fields.is_empty() { None } else { Some(fields) })
		})
	}

	fn delete_session<'a>(&'a self, key: &'a SessionKey) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			let mut conn = self.connection();

			conn.del::<_, ()>(key.to_string()).await.map_err(backend)
		})
	}
}

fn backend(err: RedisError) -> CacheError {
	CacheError::Backend { message: err.to_string() }
}

fn connect_timeout(secs: u64) -> Duration {
	Duration::seconds(i64::try_from(secs.max(1)).unwrap_or(i64::MAX))
}

// Sub-millisecond TTLs round up so a positive lifetime never becomes "no expiry".
fn positive_millis(ttl: Duration) -> Option<u64> {
	if !ttl.is_positive() {
		return None;
	}

	let millis = ttl.whole_milliseconds().max(1);

	Some(u64::try_from(millis).unwrap_or(u64::MAX))
}
