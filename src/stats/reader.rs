//! Read side of the usage statistics.

// self
use crate::{
	_prelude::*,
	auth::{AppId, PlatformId},
	cache::{HashFields, StatKey, StatsStore},
};

/// Queries the counters and hashes written by [`crate::stats::StatsRecorder`].
#[derive(Clone)]
pub struct StatsReader {
	store: Arc<dyn StatsStore>,
}
impl StatsReader {
	/// Wraps a statistics store.
	pub fn new(store: Arc<dyn StatsStore>) -> Self {
		Self { store }
	}

	/// Per-day fetch counts for an app; days without data report zero.
	pub async fn daily_counts<I>(
		&self,
		platform: &PlatformId,
		app_id: &AppId,
		dates: I,
	) -> Result<BTreeMap<Date, i64>>
	where
		I: IntoIterator<Item = Date>,
	{
		let mut counts = BTreeMap::new();

		for date in dates {
			let key =
				StatKey::DailyLogins { platform: platform.clone(), app_id: app_id.clone(), date };

			counts.insert(date, self.store.counter(&key).await?.unwrap_or(0));
		}

		Ok(counts)
	}

	/// Cumulative fetch count for an app.
	pub async fn total_count(&self, platform: &PlatformId, app_id: &AppId) -> Result<i64> {
		let key = StatKey::TotalLogins { platform: platform.clone(), app_id: app_id.clone() };

		Ok(self.store.counter(&key).await?.unwrap_or(0))
	}

	/// Every field of the per-app hash.
	pub async fn app_stats(&self, app_id: &AppId) -> Result<HashFields> {
		Ok(self.store.hgetall(&StatKey::App { app_id: app_id.clone() }).await?)
	}

	/// Time of the most recent fetch for an app, if recorded.
	pub async fn last_login(&self, app_id: &AppId) -> Result<Option<OffsetDateTime>> {
		let fields = self.app_stats(app_id).await?;

		Ok(fields
			.get(StatKey::LAST_LOGIN_FIELD)
			.and_then(|raw| raw.parse::<i64>().ok())
			.and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok()))
	}

	/// Number of upstream fetches across every app of a platform.
	pub async fn platform_total_calls(&self, platform: &PlatformId) -> Result<i64> {
		let key = StatKey::PlatformCalls { platform: platform.clone() };

		Ok(self.store.counter(&key).await?.unwrap_or(0))
	}

	/// Every field of the per-platform hash.
	pub async fn platform_stats(&self, platform: &PlatformId) -> Result<HashFields> {
		Ok(self.store.hgetall(&StatKey::Platform { platform: platform.clone() }).await?)
	}
}
impl Debug for StatsReader {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("StatsReader(..)")
	}
}
