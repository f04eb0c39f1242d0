//! Shared fixtures and counting test doubles for the integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
};
// crates.io
use parking_lot::Mutex;
use time::Duration;
// self
use platform_token_broker::{
	auth::{AppId, PlatformId, PlatformKind, TokenSecret},
	cache::{CacheError, CacheFuture, MemoryCache, TokenCache, TokenKey},
	error::UpstreamError,
	provider::{FetchRequest, FetchedToken, ProviderClient, ProviderFuture, ProviderRegistry},
	registry::{PlatformConfig, PlatformRegistry},
};

pub const WECHAT: &str = "wechat_miniprogram";
pub const APP_ID: &str = "wx123";
pub const APP_SECRET: &str = "s3cr3t";
pub const DISABLED: &str = "wechat_disabled";
pub const UNSUPPORTED: &str = "douyin_miniprogram";

pub fn platform_id(value: &str) -> PlatformId {
	PlatformId::new(value).expect("Platform fixture should be valid.")
}

pub fn app_id(value: &str) -> AppId {
	AppId::new(value).expect("App fixture should be valid.")
}

pub fn kind(value: &str) -> PlatformKind {
	PlatformKind::new(value).expect("Kind fixture should be valid.")
}

pub fn token_key() -> TokenKey {
	TokenKey::parse(WECHAT, APP_ID).expect("Token key fixture should be valid.")
}

/// Registry with one enabled WeChat platform, a disabled copy, and a platform whose kind has
/// no provider client.
pub fn registry() -> Arc<PlatformRegistry> {
	registry_with_base(None)
}

pub fn registry_with_base(base: Option<url::Url>) -> Arc<PlatformRegistry> {
	let mut wechat =
		PlatformConfig::builder(platform_id(WECHAT), kind(WECHAT)).app(app_id(APP_ID), APP_SECRET);

	if let Some(base) = base {
		wechat = wechat.api_base_url(base);
	}

	let platforms = [
		wechat.build().expect("WeChat fixture should build."),
		PlatformConfig::builder(platform_id(DISABLED), kind(WECHAT))
			.enabled(false)
			.app(app_id(APP_ID), APP_SECRET)
			.build()
			.expect("Disabled fixture should build."),
		PlatformConfig::builder(platform_id(UNSUPPORTED), kind(UNSUPPORTED))
			.app(app_id("tt123"), "tt-secret")
			.build()
			.expect("Unsupported fixture should build."),
	];

	Arc::new(PlatformRegistry::new(platforms).expect("Registry fixture should build."))
}

/// [`TokenCache`] over [`MemoryCache`] that counts calls and can be told to fail.
#[derive(Default)]
pub struct CountingCache {
	pub inner: MemoryCache,
	pub gets: AtomicUsize,
	pub sets: AtomicUsize,
	pub ttls: AtomicUsize,
	pub deletes: AtomicUsize,
	pub fail_gets: AtomicBool,
	pub fail_sets: AtomicBool,
}
impl CountingCache {
	pub fn calls(&self) -> usize {
		self.gets.load(Ordering::SeqCst)
			+ self.sets.load(Ordering::SeqCst)
			+ self.ttls.load(Ordering::SeqCst)
			+ self.deletes.load(Ordering::SeqCst)
	}

	pub fn sets(&self) -> usize {
		self.sets.load(Ordering::SeqCst)
	}

	pub async fn seed(&self, token: &str, ttl: Duration) {
		self.inner
			.set(&token_key(), TokenSecret::new(token), ttl)
			.await
			.expect("Seeding the memory cache should succeed.");
	}

	pub async fn stored(&self) -> Option<String> {
		self.inner
			.get(&token_key())
			.await
			.expect("Memory cache reads should succeed.")
			.map(|token| token.expose().to_owned())
	}

	pub async fn stored_ttl(&self) -> Option<Duration> {
		self.inner.ttl(&token_key()).await.expect("Memory cache TTL reads should succeed.")
	}
}
impl TokenCache for CountingCache {
	fn get<'a>(&'a self, key: &'a TokenKey) -> CacheFuture<'a, Option<TokenSecret>> {
		self.gets.fetch_add(1, Ordering::SeqCst);

		if self.fail_gets.load(Ordering::SeqCst) {
			return Box::pin(async { Err(CacheError::Backend { message: "get refused".into() }) });
		}

		self.inner.get(key)
	}

	fn set<'a>(
		&'a self,
		key: &'a TokenKey,
		token: TokenSecret,
		ttl: Duration,
	) -> CacheFuture<'a, ()> {
		self.sets.fetch_add(1, Ordering::SeqCst);

		if self.fail_sets.load(Ordering::SeqCst) {
			return Box::pin(async { Err(CacheError::Backend { message: "set refused".into() }) });
		}

		self.inner.set(key, token, ttl)
	}

	fn ttl<'a>(&'a self, key: &'a TokenKey) -> CacheFuture<'a, Option<Duration>> {
		self.ttls.fetch_add(1, Ordering::SeqCst);

		self.inner.ttl(key)
	}

	fn delete<'a>(&'a self, key: &'a TokenKey) -> CacheFuture<'a, ()> {
		self.deletes.fetch_add(1, Ordering::SeqCst);

		self.inner.delete(key)
	}
}

/// Scripted provider reply.
#[derive(Clone, Debug)]
pub enum Reply {
	Token(&'static str, i64),
	Rejected(i64, &'static str),
}

/// [`ProviderClient`] that replays scripted replies and counts calls.
pub struct CountingProvider {
	replies: Mutex<VecDeque<Reply>>,
	fallback: Reply,
	delay: Option<std::time::Duration>,
	pub calls: AtomicUsize,
	pub last_secret: Mutex<Option<String>>,
}
impl CountingProvider {
	pub fn always(reply: Reply) -> Self {
		Self {
			replies: Mutex::new(VecDeque::new()),
			fallback: reply,
			delay: None,
			calls: AtomicUsize::new(0),
			last_secret: Mutex::new(None),
		}
	}

	pub fn scripted(replies: impl IntoIterator<Item = Reply>, fallback: Reply) -> Self {
		Self { replies: Mutex::new(replies.into_iter().collect()), ..Self::always(fallback) }
	}

	pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl ProviderClient for CountingProvider {
	fn fetch_token<'a>(&'a self, request: FetchRequest<'a>) -> ProviderFuture<'a, FetchedToken> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		*self.last_secret.lock() = Some(request.secret.expose().to_owned());

		let reply = self.replies.lock().pop_front().unwrap_or_else(|| self.fallback.clone());
		let delay = self.delay;

		Box::pin(async move {
			if let Some(delay) = delay {
				tokio::time::sleep(delay).await;
			}

			match reply {
				Reply::Token(token, expires_in) => FetchedToken::new(token, expires_in),
				Reply::Rejected(code, message) =>
					Err(UpstreamError::Rejected { code, message: message.into() }),
			}
		})
	}
}

pub fn providers(provider: Arc<CountingProvider>) -> Arc<ProviderRegistry> {
	Arc::new(ProviderRegistry::new().register(kind(WECHAT), provider))
}
