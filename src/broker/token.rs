//! Token acquisition: resolve the app, reuse the cached token, or fetch and persist a new one.
//!
//! The registry is consulted first so unknown, disabled, or unregistered apps never reach the
//! cache or the network. Cache failures on the read path degrade into a miss; a failed write
//! is attached to the returned token instead of failing the request. With single-flight
//! enabled, concurrent misses for the same key join one flight: the first caller re-probes the
//! cache and talks to the provider, and every other caller receives the same outcome.

// self
use crate::{
	_prelude::*,
	broker::{
		Broker,
		common::{BrokeredToken, FlowLease, TokenOrigin},
	},
	cache::{self, TokenKey},
	error::UpstreamError,
	obs::{self, RequestOutcome, RequestSpan},
	provider::{FetchRequest, FetchedToken, ProviderClient},
	registry::ResolvedApp,
	stats::StatsEvent,
};

impl Broker {
	/// Returns a live access token for `app_id` under `platform`.
	pub async fn get_token(&self, platform: &str, app_id: &str) -> Result<BrokeredToken> {
		let span = RequestSpan::new(platform, app_id, "get_token");

		span.instrument(async move {
			let resolved = self.registry.lookup_app(platform, app_id)?;

			obs::record_request_outcome(platform, RequestOutcome::Attempt);

			let result = self.acquire(resolved).await;

			match &result {
				Ok(token) if token.is_cached() =>
					obs::record_request_outcome(platform, RequestOutcome::CacheHit),
				Ok(_) => obs::record_request_outcome(platform, RequestOutcome::Fetched),
				Err(_) => obs::record_request_outcome(platform, RequestOutcome::Failure),
			}

			result
		})
		.await
	}

	/// Remaining lifetime of the cached token, if one is stored.
	pub async fn token_ttl(&self, platform: &str, app_id: &str) -> Result<Option<Duration>> {
		let resolved = self.registry.lookup_app(platform, app_id)?;
		let key = token_key(resolved);

		Ok(cache::bounded("ttl", self.options.cache_timeout, self.cache.ttl(&key)).await?)
	}

	/// Drops the cached token so the next request fetches a fresh one.
	pub async fn invalidate(&self, platform: &str, app_id: &str) -> Result<()> {
		let resolved = self.registry.lookup_app(platform, app_id)?;
		let key = token_key(resolved);

		Ok(cache::bounded("delete", self.options.cache_timeout, self.cache.delete(&key)).await?)
	}

	async fn acquire(&self, resolved: ResolvedApp<'_>) -> Result<BrokeredToken> {
		let key = token_key(resolved);

		if let Some(token) = self.probe_cache(&key).await {
			return Ok(token);
		}

		let platform = resolved.platform;
		let client: &dyn ProviderClient = self
			.providers
			.get(&platform.kind)
			.ok_or_else(|| Error::UnsupportedPlatform {
				platform: platform.id.to_string(),
				kind: platform.kind.to_string(),
			})?
			.as_ref();

		if !self.options.single_flight {
			return Ok(self.fetch_and_store(client, resolved, &key).await?);
		}

		let lease = FlowLease::acquire(self, &key);
		let key = &key;
		let outcome = lease
			.join(move || async move {
				if let Some(token) = self.probe_cache(key).await {
					return Ok(token);
				}

				self.fetch_and_store(client, resolved, key).await
			})
			.await;

		Ok(outcome?)
	}

	async fn probe_cache(&self, key: &TokenKey) -> Option<BrokeredToken> {
		let timeout = self.options.cache_timeout;
		let access_token = match cache::bounded("get", timeout, self.cache.get(key)).await {
			Ok(Some(token)) if !token.is_empty() => token,
			Ok(_) => return None,
			Err(e) => {
				obs::log_cache_failure("get", key, &e);

				return None;
			},
		};
		let mut expires_in = None;

		if self.options.refresh_buffer.is_positive() {
			match cache::bounded("ttl", timeout, self.cache.ttl(key)).await {
				Ok(Some(remaining)) if remaining > self.options.refresh_buffer =>
					expires_in = Some(remaining),
				Ok(_) => return None,
				// A readable token is served even when its TTL is not.
				Err(e) => obs::log_cache_failure("ttl", key, &e),
			}
		}

		obs::log_cache_hit(key);

		Some(BrokeredToken { access_token, origin: TokenOrigin::Cached, expires_in, persist_error: None })
	}

	async fn fetch_and_store(
		&self,
		client: &dyn ProviderClient,
		resolved: ResolvedApp<'_>,
		key: &TokenKey,
	) -> Result<BrokeredToken, UpstreamError> {
		let request = FetchRequest {
			base_url: resolved.platform.api_base_url.as_ref(),
			app_id: resolved.app_id,
			secret: &resolved.app.app_secret,
		};
		let FetchedToken { access_token, expires_in } = self.call_provider(client, request).await?;
		let persist_error = cache::bounded(
			"set",
			self.options.cache_timeout,
			self.cache.set(key, access_token.clone(), expires_in),
		)
		.await
		.err();

		if let Some(e) = &persist_error {
			obs::log_cache_failure("set", key, e);
		}

		obs::log_token_fetched(key, expires_in);
		self.stats.record(StatsEvent::now(resolved.platform.id.clone(), resolved.app_id.clone()));

		Ok(BrokeredToken {
			access_token,
			origin: TokenOrigin::Fetched,
			expires_in: Some(expires_in),
			persist_error,
		})
	}

	async fn call_provider(
		&self,
		client: &dyn ProviderClient,
		request: FetchRequest<'_>,
	) -> Result<FetchedToken, UpstreamError> {
		let limit = self.options.provider_timeout;

		if !limit.is_positive() {
			return client.fetch_token(request).await;
		}

		tokio::time::timeout(limit.unsigned_abs(), client.fetch_token(request))
			.await
			.unwrap_or_else(|_| Err(UpstreamError::Timeout { source: None }))
	}
}

fn token_key(resolved: ResolvedApp<'_>) -> TokenKey {
	TokenKey::new(resolved.platform.id.clone(), resolved.app_id.clone())
}
