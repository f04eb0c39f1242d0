//! Token broker facade: registry resolution, cache reuse, and upstream fetches.

pub mod common;

mod token;

pub use common::*;

// self
use crate::{
	_prelude::*,
	broker::common::Flight,
	cache::{TokenCache, TokenKey},
	provider::ProviderRegistry,
	registry::{PlatformConfig, PlatformRegistry},
	stats::StatsRecorder,
};

type FlowGuards = Mutex<HashMap<TokenKey, Arc<Flight>>>;

/// Tunables applied to every broker request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrokerOptions {
	/// Deadline for each cache call; a non-positive value disables it.
	pub cache_timeout: Duration,
	/// Deadline for each provider call; a non-positive value disables it.
	pub provider_timeout: Duration,
	/// Cached tokens with less remaining lifetime than this are refetched.
	///
	/// Zero keeps the fast path to a single cache read.
	pub refresh_buffer: Duration,
	/// Coalesces concurrent misses for the same `(platform, app)` into one upstream call.
	pub single_flight: bool,
}
impl BrokerOptions {
	/// Default cache deadline.
	pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::seconds(5);
	/// Default provider deadline.
	pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::seconds(30);

	/// Overrides the cache deadline.
	pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
		self.cache_timeout = timeout;

		self
	}

	/// Overrides the provider deadline.
	pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
		self.provider_timeout = timeout;

		self
	}

	/// Overrides the refresh buffer; negative values are clamped to zero.
	pub fn with_refresh_buffer(mut self, buffer: Duration) -> Self {
		self.refresh_buffer = if buffer.is_negative() { Duration::ZERO } else { buffer };

		self
	}

	/// Enables or disables single-flight coalescing.
	pub fn with_single_flight(mut self, enabled: bool) -> Self {
		self.single_flight = enabled;

		self
	}
}
impl Default for BrokerOptions {
	fn default() -> Self {
		Self {
			cache_timeout: Self::DEFAULT_CACHE_TIMEOUT,
			provider_timeout: Self::DEFAULT_PROVIDER_TIMEOUT,
			refresh_buffer: Duration::ZERO,
			single_flight: true,
		}
	}
}

/// Hands out access tokens for registered `(platform, app)` pairs.
///
/// The broker owns shared handles to the platform registry, the token cache, the provider
/// clients, and the statistics recorder. Clones share all of them, including the
/// single-flight guards, so one broker can be cloned freely across tasks.
#[derive(Clone)]
pub struct Broker {
	/// Platform and application configuration.
	pub registry: Arc<PlatformRegistry>,
	/// Token cache consulted before every upstream call.
	pub cache: Arc<dyn TokenCache>,
	/// Provider clients keyed by platform kind.
	pub providers: Arc<ProviderRegistry>,
	/// Statistics sink notified after every upstream fetch.
	pub stats: StatsRecorder,
	/// Request tunables.
	pub options: BrokerOptions,
	flow_guards: Arc<FlowGuards>,
}
impl Broker {
	/// Creates a broker with default options and statistics disabled.
	///
	/// Upstream fetches are not counted until a running recorder is attached with
	/// [`with_stats`](Self::with_stats), typically one returned by [`StatsRecorder::spawn`].
	pub fn new(
		registry: Arc<PlatformRegistry>,
		cache: Arc<dyn TokenCache>,
		providers: Arc<ProviderRegistry>,
	) -> Self {
		Self {
			registry,
			cache,
			providers,
			stats: StatsRecorder::disabled(),
			options: BrokerOptions::default(),
			flow_guards: Default::default(),
		}
	}

	/// Attaches a statistics recorder.
	pub fn with_stats(mut self, stats: StatsRecorder) -> Self {
		self.stats = stats;

		self
	}

	/// Replaces the request tunables.
	pub fn with_options(mut self, options: BrokerOptions) -> Self {
		self.options = options;

		self
	}

	/// Enabled platforms whose kind has no registered provider client, sorted by identifier.
	///
	/// Requests against these platforms fail with [`Error::UnsupportedPlatform`] on a cache
	/// miss, so hosts typically check this once at startup.
	pub fn unsupported_platforms(&self) -> Vec<&PlatformConfig> {
		let mut platforms = self
			.registry
			.platforms()
			.filter(|platform| platform.enabled && !self.providers.supports(&platform.kind))
			.collect::<Vec<_>>();

		platforms.sort_by(|a, b| a.id.cmp(&b.id));

		platforms
	}
}
impl Debug for Broker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("platforms", &self.registry.len())
			.field("providers", &self.providers)
			.field("stats", &self.stats)
			.field("options", &self.options)
			.finish()
	}
}
