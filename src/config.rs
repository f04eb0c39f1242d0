//! YAML configuration for the platform registry, the Redis backend, and broker tunables.
//!
//! ```yaml
//! platforms:
//!   wechat_miniprogram:
//!     name: WeChat Mini Program
//!     type: wechat_miniprogram
//!     enabled: true
//!     api_base_url: https://api.weixin.qq.com
//!     apps:
//!       wx123:
//!         app_secret: s3cr3t
//! redis:
//!   host: 127.0.0.1
//!   port: 6379
//! broker:
//!   cache_timeout_secs: 5
//!   refresh_buffer_secs: 0
//!   single_flight: true
//! ```

// std
use std::path::Path;
// self
#[cfg(feature = "redis")] use crate::cache::RedisConfig;
use crate::{
	_prelude::*,
	auth::{AppId, PlatformId, PlatformKind},
	broker::BrokerOptions,
	error::ConfigError,
	registry::{AppConfig, PlatformConfig, PlatformRegistry},
};

/// Root of the configuration document.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BrokerConfig {
	/// Platforms keyed by identifier.
	#[serde(default)]
	pub platforms: BTreeMap<PlatformId, PlatformSection>,
	/// Redis connection settings; absent when the broker runs on the memory cache.
	#[cfg(feature = "redis")]
	#[serde(default)]
	pub redis: Option<RedisConfig>,
	/// Broker tunables.
	#[serde(default)]
	pub broker: BrokerSection,
}
impl BrokerConfig {
	/// Parses a YAML document.
	pub fn from_yaml_str(document: &str) -> Result<Self, ConfigError> {
		Ok(serde_yaml::from_str(document)?)
	}

	/// Reads and parses a YAML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let document = std::fs::read_to_string(path)
			.map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;

		Self::from_yaml_str(&document)
	}

	/// Validates the platform sections and builds the registry.
	pub fn registry(&self) -> Result<PlatformRegistry, ConfigError> {
		let platforms = self
			.platforms
			.iter()
			.map(|(id, section)| section.to_platform(id))
			.collect::<Result<Vec<_>, _>>()?;

		PlatformRegistry::new(platforms)
	}

	/// Broker tunables with defaults applied to omitted fields.
	pub fn options(&self) -> BrokerOptions {
		self.broker.options()
	}
}

/// One platform entry.
#[derive(Clone, Debug, Deserialize)]
pub struct PlatformSection {
	/// Display name; defaults to the identifier.
	#[serde(default)]
	pub name: Option<String>,
	/// Provider kind tag.
	#[serde(rename = "type")]
	pub kind: PlatformKind,
	/// Platforms are disabled unless switched on explicitly.
	#[serde(default)]
	pub enabled: bool,
	/// Provider base URL override; empty means the provider default.
	#[serde(default)]
	pub api_base_url: Option<String>,
	/// Applications keyed by identifier.
	#[serde(default)]
	pub apps: HashMap<AppId, AppConfig>,
}
impl PlatformSection {
	fn to_platform(&self, id: &PlatformId) -> Result<PlatformConfig, ConfigError> {
		let mut builder = PlatformConfig::builder(id.clone(), self.kind.clone())
			.enabled(self.enabled)
			.apps(self.apps.iter().map(|(app_id, app)| (app_id.clone(), app.clone())));

		if let Some(name) = self.name.as_deref().filter(|name| !name.trim().is_empty()) {
			builder = builder.name(name);
		}
		if let Some(raw) = self.api_base_url.as_deref().map(str::trim).filter(|raw| !raw.is_empty())
		{
			let url = Url::parse(raw)
				.map_err(|source| ConfigError::InvalidBaseUrl { platform: id.to_string(), source })?;

			builder = builder.api_base_url(url);
		}

		builder.build()
	}
}

/// Broker tunables as written in the configuration file.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BrokerSection {
	/// Deadline for each cache call, in seconds; `0` disables it.
	#[serde(default)]
	pub cache_timeout_secs: Option<u64>,
	/// Deadline for each provider call, in seconds; `0` disables it.
	#[serde(default)]
	pub provider_timeout_secs: Option<u64>,
	/// Early-refresh window, in seconds.
	#[serde(default)]
	pub refresh_buffer_secs: Option<u64>,
	/// Single-flight coalescing switch.
	#[serde(default)]
	pub single_flight: Option<bool>,
}
impl BrokerSection {
	/// Overlays the configured values on [`BrokerOptions::default`].
	pub fn options(&self) -> BrokerOptions {
		let mut options = BrokerOptions::default();

		if let Some(secs) = self.cache_timeout_secs {
			options = options.with_cache_timeout(seconds(secs));
		}
		if let Some(secs) = self.provider_timeout_secs {
			options = options.with_provider_timeout(seconds(secs));
		}
		if let Some(secs) = self.refresh_buffer_secs {
			options = options.with_refresh_buffer(seconds(secs));
		}
		if let Some(enabled) = self.single_flight {
			options = options.with_single_flight(enabled);
		}

		options
	}
}

fn seconds(secs: u64) -> Duration {
	Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}
