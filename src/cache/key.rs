//! Key naming for every record the broker writes to the shared cache.
//!
//! Token, session, and statistics keys live in disjoint prefixes so they can share one
//! key-value namespace without collisions.

// self
use crate::{
	_prelude::*,
	auth::{AppId, IdentifierError, PlatformId},
};

/// Key of the cached access token for a `(platform, app)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TokenKey {
	/// Platform component.
	pub platform: PlatformId,
	/// Application component.
	pub app_id: AppId,
}
impl TokenKey {
	const PREFIX: &'static str = "access_token";

	/// Builds a key from validated identifiers.
	pub fn new(platform: PlatformId, app_id: AppId) -> Self {
		Self { platform, app_id }
	}

	/// Builds a key from raw strings.
	pub fn parse(platform: &str, app_id: &str) -> Result<Self, IdentifierError> {
		Ok(Self::new(PlatformId::new(platform)?, AppId::new(app_id)?))
	}
}
impl Display for TokenKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}:{}:{}", Self::PREFIX, self.platform, self.app_id)
	}
}

/// Key of an auxiliary session hash for a subject within an app.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
	/// Platform component.
	pub platform: PlatformId,
	/// Application component.
	pub app_id: AppId,
	/// Subject (end-user identifier issued by the platform).
	pub subject: String,
}
impl SessionKey {
	/// Builds a session key.
	pub fn new(platform: PlatformId, app_id: AppId, subject: impl Into<String>) -> Self {
		Self { platform, app_id, subject: subject.into() }
	}
}
impl Display for SessionKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "session:{}:{}:{}", self.platform, self.app_id, self.subject)
	}
}

/// Keys of the observational statistics counters and hashes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StatKey {
	/// Per-day fetch counter for an app.
	DailyLogins {
		/// Platform component.
		platform: PlatformId,
		/// Application component.
		app_id: AppId,
		/// Calendar day (UTC).
		date: Date,
	},
	/// Cumulative fetch counter for an app.
	TotalLogins {
		/// Platform component.
		platform: PlatformId,
		/// Application component.
		app_id: AppId,
	},
	/// Per-app hash (e.g. `last_login`).
	App {
		/// Application component.
		app_id: AppId,
	},
	/// Per-platform call counter.
	PlatformCalls {
		/// Platform component.
		platform: PlatformId,
	},
	/// Per-platform hash for free-form fields.
	Platform {
		/// Platform component.
		platform: PlatformId,
	},
}
impl StatKey {
	/// Field written into [`StatKey::App`] hashes with the last fetch time (unix seconds).
	pub const LAST_LOGIN_FIELD: &'static str = "last_login";
}
impl Display for StatKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::DailyLogins { platform, app_id, date } => write!(
				f,
				"stats:login:daily:{platform}:{app_id}:{:04}-{:02}-{:02}",
				date.year(),
				u8::from(date.month()),
				date.day(),
			),
			Self::TotalLogins { platform, app_id } =>
				write!(f, "stats:login:total:{platform}:{app_id}"),
			Self::App { app_id } => write!(f, "stats:app:{app_id}"),
			Self::PlatformCalls { platform } => write!(f, "stats:platform:{platform}:total_calls"),
			Self::Platform { platform } => write!(f, "stats:platform:{platform}"),
		}
	}
}
