//! Upstream provider clients and the registry that dispatches to them.
//!
//! [`ProviderClient`] is the broker's only dependency on an upstream identity platform.
//! Each platform kind maps to one implementation inside a [`ProviderRegistry`], so adding a
//! platform means registering a new client rather than touching the broker.

#[cfg(feature = "reqwest")] pub mod wechat;

#[cfg(feature = "reqwest")] pub use wechat::WeChatClient;

// self
use crate::{
	_prelude::*,
	auth::{AppId, AppSecret, PlatformKind, TokenSecret},
	error::UpstreamError,
};

/// Boxed future returned by [`ProviderClient::fetch_token`].
pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, UpstreamError>> + 'a + Send>>;

/// Capability to obtain a fresh access token from an upstream platform.
///
/// Implementations must bound their own network calls with a timeout and must report any
/// provider-side error (including error codes carried in a successful HTTP response) as an
/// [`UpstreamError`]. They never retry.
pub trait ProviderClient
where
	Self: Send + Sync,
{
	/// Requests a new token for the application described by `request`.
	fn fetch_token<'a>(&'a self, request: FetchRequest<'a>) -> ProviderFuture<'a, FetchedToken>;
}

/// Inputs for a single upstream token request.
#[derive(Clone, Copy, Debug)]
pub struct FetchRequest<'a> {
	/// Platform-level base URL override; clients fall back to their own default.
	pub base_url: Option<&'a Url>,
	/// Application identifier.
	pub app_id: &'a AppId,
	/// Application secret.
	pub secret: &'a AppSecret,
}

/// Token returned by a provider together with its relative lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedToken {
	/// Issued access token.
	pub access_token: TokenSecret,
	/// Lifetime reported by the provider.
	pub expires_in: Duration,
}
impl FetchedToken {
	/// Validates a provider-reported lifetime in seconds.
	pub fn new(access_token: impl Into<TokenSecret>, expires_in_secs: i64) -> Result<Self, UpstreamError> {
		let access_token = access_token.into();

		if access_token.is_empty() {
			return Err(UpstreamError::InvalidResponse { reason: "access token is empty" });
		}
		if expires_in_secs <= 0 {
			return Err(UpstreamError::InvalidResponse { reason: "expires_in must be positive" });
		}

		Ok(Self { access_token, expires_in: Duration::seconds(expires_in_secs) })
	}
}

/// Map from platform kind to the client that serves it.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
	clients: HashMap<PlatformKind, Arc<dyn ProviderClient>>,
}
impl ProviderRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a registry with every built-in client registered under its default kind.
	#[cfg(feature = "reqwest")]
	pub fn with_defaults() -> Result<Self, crate::error::ConfigError> {
		let wechat = PlatformKind::new(wechat::WECHAT_KIND)?;

		Ok(Self::new().register(wechat, Arc::new(WeChatClient::new()?)))
	}

	/// Registers (or replaces) the client for `kind`.
	pub fn register(mut self, kind: PlatformKind, client: Arc<dyn ProviderClient>) -> Self {
		self.clients.insert(kind, client);

		self
	}

	/// Returns the client registered for `kind`.
	pub fn get(&self, kind: &str) -> Option<&Arc<dyn ProviderClient>> {
		self.clients.get(kind)
	}

	/// Returns `true` when a client is registered for `kind`.
	pub fn supports(&self, kind: &str) -> bool {
		self.clients.contains_key(kind)
	}

	/// Iterates over the registered kinds.
	pub fn kinds(&self) -> impl Iterator<Item = &PlatformKind> {
		self.clients.keys()
	}
}
impl Debug for ProviderRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_set().entries(self.clients.keys()).finish()
	}
}

/// Truncates provider bodies before they are embedded in errors or logs.
#[cfg(feature = "reqwest")]
pub(crate) fn body_preview(body: &[u8]) -> String {
	const LIMIT: usize = 256;

	let text = String::from_utf8_lossy(body);

	if text.chars().count() <= LIMIT {
		return text.into_owned();
	}

	let mut buf = text.chars().take(LIMIT).collect::<String>();

	buf.push('…');

	buf
}
