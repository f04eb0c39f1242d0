//! Process-wide platform registry consulted before any cache or network access.
//!
//! The registry is assembled once (programmatically or through [`crate::config`]) and is
//! read-only afterwards; the broker shares it behind an `Arc`.

pub mod platform;

pub use platform::*;

// self
use crate::{
	_prelude::*,
	auth::{AppId, PlatformId},
	error::ConfigError,
};

/// Read-only mapping from platform identifiers to their configuration.
#[derive(Clone, Debug, Default)]
pub struct PlatformRegistry {
	platforms: HashMap<PlatformId, PlatformConfig>,
}
impl PlatformRegistry {
	/// Builds a registry, rejecting duplicate platform identifiers.
	pub fn new<I>(platforms: I) -> Result<Self, ConfigError>
	where
		I: IntoIterator<Item = PlatformConfig>,
	{
		let mut map = HashMap::new();

		for platform in platforms {
			if map.contains_key(&platform.id) {
				return Err(ConfigError::DuplicatePlatform { platform: platform.id.to_string() });
			}

			map.insert(platform.id.clone(), platform);
		}

		Ok(Self { platforms: map })
	}

	/// Returns the platform entry regardless of its enabled flag.
	pub fn platform(&self, platform: &str) -> Option<&PlatformConfig> {
		self.platforms.get(platform)
	}

	/// Iterates over every registered platform.
	pub fn platforms(&self) -> impl Iterator<Item = &PlatformConfig> {
		self.platforms.values()
	}

	/// Number of registered platforms.
	pub fn len(&self) -> usize {
		self.platforms.len()
	}

	/// Returns `true` when no platform is registered.
	pub fn is_empty(&self) -> bool {
		self.platforms.is_empty()
	}

	/// Resolves an application, enforcing platform existence, enablement, and membership in
	/// that order.
	pub fn lookup_app(&self, platform: &str, app_id: &str) -> Result<ResolvedApp<'_>> {
		let config = self
			.platforms
			.get(platform)
			.ok_or_else(|| Error::ConfigNotFound { platform: platform.to_owned() })?;

		if !config.enabled {
			return Err(Error::PlatformDisabled { platform: platform.to_owned() });
		}

		let (app_id_ref, app) = config.app(app_id).ok_or_else(|| Error::AppNotFound {
			platform: platform.to_owned(),
			app_id: app_id.to_owned(),
		})?;

		Ok(ResolvedApp { platform: config, app_id: app_id_ref, app })
	}
}

/// Registry entry resolved for a `(platform, app)` pair.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedApp<'a> {
	/// Owning platform configuration.
	pub platform: &'a PlatformConfig,
	/// Registered application identifier.
	pub app_id: &'a AppId,
	/// Application configuration.
	pub app: &'a AppConfig,
}
