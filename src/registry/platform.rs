//! Platform and application configuration entries plus their validating builder.

// self
use crate::{
	_prelude::*,
	auth::{AppId, AppSecret, PlatformId, PlatformKind},
	error::ConfigError,
};

/// One application registered within a platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
	/// Credential presented to the upstream provider.
	pub app_secret: AppSecret,
}
impl AppConfig {
	/// Creates an app entry with the provided secret.
	pub fn new(app_secret: impl Into<AppSecret>) -> Self {
		Self { app_secret: app_secret.into() }
	}
}

/// Immutable configuration for one upstream identity platform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformConfig {
	/// Registry key used by callers.
	pub id: PlatformId,
	/// Human-readable platform name.
	pub name: String,
	/// Type tag that selects the provider client.
	pub kind: PlatformKind,
	/// Whether lookups against this platform may proceed.
	pub enabled: bool,
	/// Override for the provider's API base URL.
	pub api_base_url: Option<Url>,
	/// Applications keyed by application identifier.
	pub apps: HashMap<AppId, AppConfig>,
}
impl PlatformConfig {
	/// Creates a new builder for the provided identifier and kind.
	pub fn builder(id: PlatformId, kind: PlatformKind) -> PlatformConfigBuilder {
		PlatformConfigBuilder::new(id, kind)
	}

	/// Returns the app entry and its stored identifier, if registered.
	pub fn app(&self, app_id: &str) -> Option<(&AppId, &AppConfig)> {
		self.apps.get_key_value(app_id)
	}
}

/// Builder for [`PlatformConfig`] values.
#[derive(Debug)]
pub struct PlatformConfigBuilder {
	id: PlatformId,
	kind: PlatformKind,
	name: Option<String>,
	enabled: bool,
	api_base_url: Option<Url>,
	apps: HashMap<AppId, AppConfig>,
}
impl PlatformConfigBuilder {
	/// Creates a builder for an enabled platform without apps.
	pub fn new(id: PlatformId, kind: PlatformKind) -> Self {
		Self { id, kind, name: None, enabled: true, api_base_url: None, apps: HashMap::new() }
	}

	/// Sets the display name (defaults to the identifier).
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());

		self
	}

	/// Overrides the enabled flag.
	pub fn enabled(mut self, enabled: bool) -> Self {
		self.enabled = enabled;

		self
	}

	/// Overrides the provider's API base URL.
	pub fn api_base_url(mut self, url: Url) -> Self {
		self.api_base_url = Some(url);

		self
	}

	/// Registers (or replaces) an application.
	pub fn app(mut self, app_id: AppId, secret: impl Into<AppSecret>) -> Self {
		self.apps.insert(app_id, AppConfig::new(secret));

		self
	}

	/// Registers multiple applications.
	pub fn apps<I>(mut self, apps: I) -> Self
	where
		I: IntoIterator<Item = (AppId, AppConfig)>,
	{
		self.apps.extend(apps);

		self
	}

	/// Consumes the builder and validates the resulting platform.
	pub fn build(self) -> Result<PlatformConfig, ConfigError> {
		if let Some(url) =
			self.api_base_url.as_ref().filter(|url| !matches!(url.scheme(), "http" | "https"))
		{
			return Err(ConfigError::UnsupportedBaseUrl {
				platform: self.id.to_string(),
				url: url.to_string(),
			});
		}

		Ok(PlatformConfig {
			name: self.name.unwrap_or_else(|| self.id.to_string()),
			id: self.id,
			kind: self.kind,
			enabled: self.enabled,
			api_base_url: self.api_base_url,
			apps: self.apps,
		})
	}
}
