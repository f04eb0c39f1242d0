//! Runs against a local Redis (`127.0.0.1:6379`, database 15):
//! `cargo test --features redis --test redis_cache_it -- --ignored`.

#![cfg(feature = "redis")]

// crates.io
use time::Duration;
// self
use platform_token_broker::{
	auth::{AppId, PlatformId, TokenSecret},
	cache::{
		HashFields, RedisCache, RedisConfig, SessionKey, SessionStore, StatKey, StatsStore,
		TokenCache, TokenKey,
	},
	redis::{AsyncCommands, Client, aio::ConnectionManager},
};

const PLATFORM: &str = "wechat_miniprogram";

fn config() -> RedisConfig {
	RedisConfig { db: 15, ..RedisConfig::default() }
}

async fn connect() -> (RedisCache, ConnectionManager) {
	let client = Client::open(config().url()).expect("Redis URL should parse.");
	let conn = ConnectionManager::new(client).await.expect("Local Redis should accept connections.");

	(RedisCache::with_connection(conn.clone()), conn)
}

fn token_key(app_id: &str) -> TokenKey {
	TokenKey::parse(PLATFORM, app_id).expect("Token key fixture should be valid.")
}

fn app_id(value: &str) -> AppId {
	AppId::new(value).expect("App fixture should be valid.")
}

#[tokio::test]
#[ignore = "requires a local Redis server"]
async fn connect_honors_the_configuration() {
	let cache = RedisCache::connect(&config()).await.expect("Local Redis should accept connections.");
	let key = token_key("wx-redis-connect");

	cache.delete(&key).await.expect("DEL should succeed.");

	assert!(cache.get(&key).await.expect("GET should succeed.").is_none());
}

#[tokio::test]
#[ignore = "requires a local Redis server"]
async fn tokens_expire_and_report_their_ttl() {
	let (cache, mut conn) = connect().await;
	let key = token_key("wx-redis-token");

	cache
		.set(&key, TokenSecret::new("AT1"), Duration::seconds(60))
		.await
		.expect("PSETEX should succeed.");

	assert_eq!(
		cache.get(&key).await.expect("GET should succeed.").as_ref().map(TokenSecret::expose),
		Some("AT1")
	);

	let ttl = cache.ttl(&key).await.expect("PTTL should succeed.").expect("Key should exist.");

	assert!(ttl > Duration::seconds(55) && ttl <= Duration::seconds(60));

	cache.delete(&key).await.expect("DEL should succeed.");

	assert!(cache.get(&key).await.expect("GET should succeed.").is_none());
	assert!(cache.ttl(&key).await.expect("PTTL should succeed.").is_none());

	conn.set::<_, _, ()>(key.to_string(), "AT0").await.expect("SET should succeed.");

	assert_eq!(cache.ttl(&key).await.expect("PTTL should succeed."), Some(Duration::MAX));

	cache
		.set(&key, TokenSecret::new("AT2"), Duration::ZERO)
		.await
		.expect("Non-positive TTL should delete the key.");

	assert!(cache.get(&key).await.expect("GET should succeed.").is_none());
}

#[tokio::test]
#[ignore = "requires a local Redis server"]
async fn counters_and_hashes_round_trip() {
	let (cache, mut conn) = connect().await;
	let platform = PlatformId::new(PLATFORM).expect("Platform fixture should be valid.");
	let counter = StatKey::PlatformCalls { platform };
	let app = StatKey::App { app_id: app_id("wx-redis-stats") };

	conn.del::<_, ()>(vec![counter.to_string(), app.to_string()]).await.expect("DEL should succeed.");

	assert_eq!(cache.counter(&counter).await.expect("GET should succeed."), None);
	assert_eq!(cache.incr(&counter).await.expect("INCR should succeed."), 1);
	assert_eq!(cache.incr(&counter).await.expect("INCR should succeed."), 2);
	assert_eq!(cache.counter(&counter).await.expect("GET should succeed."), Some(2));

	cache
		.hset(&app, StatKey::LAST_LOGIN_FIELD, "1741341600".into())
		.await
		.expect("HSET should succeed.");

	let fields = cache.hgetall(&app).await.expect("HGETALL should succeed.");

	assert_eq!(fields.get(StatKey::LAST_LOGIN_FIELD).map(String::as_str), Some("1741341600"));
}

#[tokio::test]
#[ignore = "requires a local Redis server"]
async fn sessions_are_replaced_atomically_and_expire() {
	let (cache, mut conn) = connect().await;
	let platform = PlatformId::new(PLATFORM).expect("Platform fixture should be valid.");
	let key = SessionKey::new(platform, app_id("wx-redis-session"), "openid-1");
	let first = HashFields::from([("session_key".into(), "sk1".into()), ("unionid".into(), "u1".into())]);
	let second = HashFields::from([("session_key".into(), "sk2".into())]);

	cache.save_session(&key, first, Duration::minutes(5)).await.expect("Pipeline should succeed.");
	cache.save_session(&key, second.clone(), Duration::minutes(5)).await.expect("Pipeline should succeed.");

	assert_eq!(cache.fetch_session(&key).await.expect("HGETALL should succeed."), Some(second));

	let millis = conn.pttl::<_, i64>(key.to_string()).await.expect("PTTL should succeed.");

	assert!(millis > 0 && millis <= 300_000);

	cache.save_session(&key, HashFields::new(), Duration::minutes(5)).await.expect("Empty save should delete.");

	assert!(cache.fetch_session(&key).await.expect("HGETALL should succeed.").is_none());

	cache
		.save_session(&key, HashFields::from([("session_key".into(), "sk3".into())]), Duration::minutes(5))
		.await
		.expect("Pipeline should succeed.");
	cache.delete_session(&key).await.expect("DEL should succeed.");

	assert!(cache.fetch_session(&key).await.expect("HGETALL should succeed.").is_none());
}
