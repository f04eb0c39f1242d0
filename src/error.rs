//! Broker-level error types shared across the registry, providers, and caches.

// self
use crate::{_prelude::*, auth::IdentifierError, cache::CacheError};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The requested platform is not present in the registry.
	#[error("Platform `{platform}` is not configured.")]
	ConfigNotFound {
		/// Platform identifier supplied by the caller.
		platform: String,
	},
	/// The requested platform exists but is switched off.
	#[error("Platform `{platform}` is disabled.")]
	PlatformDisabled {
		/// Platform identifier supplied by the caller.
		platform: String,
	},
	/// The application is not registered under the requested platform.
	#[error("App `{app_id}` is not registered under platform `{platform}`.")]
	AppNotFound {
		/// Platform identifier supplied by the caller.
		platform: String,
		/// Application identifier supplied by the caller.
		app_id: String,
	},
	/// No provider client is registered for the platform's declared kind.
	#[error("Platform `{platform}` declares kind `{kind}`, which has no provider client.")]
	UnsupportedPlatform {
		/// Platform identifier.
		platform: String,
		/// Kind tag declared by the platform configuration.
		kind: String,
	},
	/// Upstream provider rejected the request or could not be reached.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// A freshly fetched token could not be written to the cache.
	#[error("Fetched token could not be persisted: {0}")]
	CachePersist(#[source] CacheError),
	/// Cache failure on an operation the caller asked for directly (TTL queries, invalidation).
	#[error("{0}")]
	Cache(
		#[from]
		#[source]
		CacheError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Returns `true` for failures raised while resolving the registry entry.
	pub fn is_resolution_failure(&self) -> bool {
		matches!(
			self,
			Self::ConfigNotFound { .. } | Self::PlatformDisabled { .. } | Self::AppNotFound { .. }
		)
	}
}

/// Configuration and validation failures raised while assembling the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// An identifier in the configuration failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] IdentifierError),
	/// A platform was declared more than once.
	#[error("Platform `{platform}` is declared more than once.")]
	DuplicatePlatform {
		/// Duplicated platform identifier.
		platform: String,
	},
	/// A platform base URL cannot be parsed.
	#[error("Platform `{platform}` has an unparsable API base URL.")]
	InvalidBaseUrl {
		/// Platform identifier.
		platform: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A platform base URL uses a scheme other than HTTP(S).
	#[error("Platform `{platform}` API base URL must use http or https: {url}.")]
	UnsupportedBaseUrl {
		/// Platform identifier.
		platform: String,
		/// Offending URL.
		url: String,
	},
	/// The configuration file could not be read.
	#[error("Failed to read configuration file {path}.")]
	Read {
		/// Path that failed to load.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The configuration document is not valid YAML for the expected shape.
	#[error("Configuration document is invalid.")]
	Parse(#[from] serde_yaml::Error),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A background task was requested outside of a Tokio runtime.
	#[error("A Tokio runtime is required to spawn the {task} task.")]
	NoRuntime {
		/// Task that could not be spawned.
		task: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Failures reported by upstream provider clients.
///
/// The variants keep transport, HTTP, payload, and provider-reported failures apart for
/// logging, while the broker treats all of them as a single failed fetch. Sources are shared
/// so one failed fetch can be reported to every request waiting on it.
#[derive(Clone, Debug, ThisError)]
pub enum UpstreamError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Transport {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// The call did not complete within its deadline.
	#[error("Request timed out while calling the token endpoint.")]
	Timeout {
		/// Transport-specific timeout error, when the transport raised one.
		#[source]
		source: Option<SharedError>,
	},
	/// Token endpoint answered with a non-success HTTP status.
	#[error("Token endpoint returned HTTP {status}: {body}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON.
	#[error("Token endpoint returned malformed JSON.")]
	Parse {
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Provider reported an error code in the response body.
	#[error("Provider rejected the request with code {code}: {message}.")]
	Rejected {
		/// Provider-specific error code.
		code: i64,
		/// Provider-supplied error message.
		message: String,
	},
	/// Response parsed but lacks a usable token or lifetime.
	#[error("Token endpoint response is unusable: {reason}.")]
	InvalidResponse {
		/// What was wrong with the payload.
		reason: &'static str,
	},
	/// The token endpoint URL could not be derived from the platform base URL.
	#[error("Cannot derive a token endpoint from {url}.")]
	InvalidEndpoint {
		/// Base URL that was rejected.
		url: String,
	},
}
impl UpstreamError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Arc::new(src) }
	}

	/// Returns a short, stable label for logs and metrics.
	pub const fn label(&self) -> &'static str {
		match self {
			Self::Transport { .. } => "transport",
			Self::Timeout { .. } => "timeout",
			Self::Status { .. } => "status",
			Self::Parse { .. } => "parse",
			Self::Rejected { .. } => "rejected",
			Self::InvalidResponse { .. } => "invalid_response",
			Self::InvalidEndpoint { .. } => "invalid_endpoint",
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for UpstreamError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout { source: Some(Arc::new(e)) } } else { Self::transport(e) }
	}
}
