//! Shared broker types: the token handed back to callers and the single-flight lease.

// crates.io
use async_lock::OnceCell;
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	broker::{Broker, FlowGuards},
	cache::{CacheError, TokenKey},
	error::UpstreamError,
};

/// Where a [`BrokeredToken`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenOrigin {
	/// Served from the cache without contacting the provider.
	Cached,
	/// Fetched from the upstream provider during this request.
	Fetched,
}

/// Access token returned by [`Broker::get_token`].
#[derive(Clone, Debug)]
pub struct BrokeredToken {
	/// Opaque access token.
	pub access_token: TokenSecret,
	/// Cache hit or upstream fetch.
	pub origin: TokenOrigin,
	/// Remaining lifetime when known (always for fetched tokens).
	pub expires_in: Option<Duration>,
	/// Cache write failure for a fetched token, if the write failed.
	pub persist_error: Option<CacheError>,
}
impl BrokeredToken {
	/// Returns the raw token value.
	pub fn expose(&self) -> &str {
		self.access_token.expose()
	}

	/// Returns `true` when the token was served from the cache.
	pub fn is_cached(&self) -> bool {
		self.origin == TokenOrigin::Cached
	}

	/// Fails with [`Error::CachePersist`] when the fetched token could not be cached.
	pub fn ensure_persisted(mut self) -> Result<Self> {
		match self.persist_error.take() {
			Some(e) => Err(Error::CachePersist(e)),
			None => Ok(self),
		}
	}

	/// Consumes the result and returns the token.
	pub fn into_secret(self) -> TokenSecret {
		self.access_token
	}
}

/// Outcome of one upstream flight, cloned to every request that joined it.
pub(crate) type FlightOutcome = Result<BrokeredToken, UpstreamError>;

pub(crate) type Flight = OnceCell<FlightOutcome>;

/// Per-key single-flight lease.
///
/// The first request to [`join`](Self::join) runs the fetch; concurrent requests wait for it
/// and receive a clone of its outcome, success or failure. A finished flight is retired from
/// the map so later requests start a new one. If the running request is cancelled, one of the
/// waiters takes the fetch over.
pub(crate) struct FlowLease<'a> {
	guards: &'a FlowGuards,
	key: TokenKey,
	flight: Arc<Flight>,
}
impl<'a> FlowLease<'a> {
	/// Joins the in-flight fetch for a token key, creating it on demand.
	pub(crate) fn acquire(broker: &'a Broker, key: &TokenKey) -> Self {
		let guards = broker.flow_guards.as_ref();
		let flight =
			guards.lock().entry(key.clone()).or_insert_with(|| Arc::new(OnceCell::new())).clone();

		Self { guards, key: key.clone(), flight }
	}

	/// Runs `fetch` unless another request already is, and returns the shared outcome.
	pub(crate) async fn join<F, Fut>(&self, fetch: F) -> FlightOutcome
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = FlightOutcome>,
	{
		let outcome = self.flight.get_or_init(fetch).await.clone();

		self.retire();

		outcome
	}

	fn retire(&self) {
		let mut guards = self.guards.lock();

		if guards.get(&self.key).is_some_and(|flight| Arc::ptr_eq(flight, &self.flight)) {
			guards.remove(&self.key);
		}
	}
}
impl Drop for FlowLease<'_> {
	fn drop(&mut self) {
		let mut guards = self.guards.lock();
		let owned = guards.get(&self.key).is_some_and(|flight| Arc::ptr_eq(flight, &self.flight));

		// The map and this lease are the only owners left.
		if owned && Arc::strong_count(&self.flight) == 2 {
			guards.remove(&self.key);
		}
	}
}
