// self
use crate::{_prelude::*, cache::CacheError};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// A span builder used by broker requests.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the platform, app, and stage.
	pub fn new(platform: &str, app_id: &str, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("platform_token_broker.request", platform, app_id, stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (platform, app_id, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Reports a cache failure the broker swallowed (read treated as a miss, or a failed write).
pub fn log_cache_failure(operation: &'static str, key: &dyn Display, error: &CacheError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(operation, key = %key, error = %error, "cache operation failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (operation, key, error);
}

/// Reports a statistics operation that failed on the worker.
pub fn log_stats_failure(operation: &'static str, key: &dyn Display, error: &CacheError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(operation, key = %key, error = %error, "statistics update failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (operation, key, error);
}

/// Reports a statistics event that could not reach the worker.
pub fn log_stats_dropped(platform: &str, app_id: &str) {
	#[cfg(feature = "tracing")]
	tracing::warn!(platform, app_id, "statistics worker is gone; event dropped");
	#[cfg(not(feature = "tracing"))]
	let _ = (platform, app_id);
}

/// Reports a token served from the cache.
pub fn log_cache_hit(key: &dyn Display) {
	#[cfg(feature = "tracing")]
	tracing::debug!(key = %key, "token served from cache");
	#[cfg(not(feature = "tracing"))]
	let _ = key;
}

/// Reports a token fetched from the provider.
pub fn log_token_fetched(key: &dyn Display, expires_in: Duration) {
	#[cfg(feature = "tracing")]
	tracing::debug!(key = %key, expires_in = %expires_in, "token fetched from provider");
	#[cfg(not(feature = "tracing"))]
	let _ = (key, expires_in);
}
