//! Optional observability helpers for broker requests.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `platform_token_broker.request` with the
//!   `platform`, `app_id`, and `stage` fields, plus `warn!` events for every swallowed cache or
//!   statistics failure.
//! - Enable `metrics` to increment the `platform_token_broker_request_total` counter for every
//!   attempt/cache hit/fetch/failure, labeled by `platform` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outcome labels recorded for each token request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Entry to [`crate::broker::Broker::get_token`] after configuration resolved.
	Attempt,
	/// Token served from the cache.
	CacheHit,
	/// Token fetched from the upstream provider.
	Fetched,
	/// Failure propagated back to the caller.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::CacheHit => "cache_hit",
			RequestOutcome::Fetched => "fetched",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
