//! Fire-and-forget usage statistics recorded after every successful upstream fetch.
//!
//! [`StatsRecorder::record`] hands the event to a background worker over an unbounded
//! channel and returns immediately. The worker applies four independent updates per event;
//! a failure in one is logged and never affects the others or the caller's request.

pub mod reader;

pub use reader::StatsReader;

// crates.io
use tokio::{
	runtime::Handle,
	sync::{mpsc, oneshot},
	task::JoinHandle,
};
// self
use crate::{
	_prelude::*,
	auth::{AppId, PlatformId},
	cache::{self, CacheError, StatKey, StatsStore},
	error::ConfigError,
	obs,
};

/// Deadline applied to each individual statistics update.
pub const STATS_OP_TIMEOUT: Duration = Duration::seconds(5);

/// One successful upstream fetch for an application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatsEvent {
	/// Platform the token was fetched for.
	pub platform: PlatformId,
	/// Application the token was fetched for.
	pub app_id: AppId,
	/// Fetch time.
	pub at: OffsetDateTime,
}
impl StatsEvent {
	/// Creates an event stamped with the current time.
	pub fn now(platform: PlatformId, app_id: AppId) -> Self {
		Self { platform, app_id, at: OffsetDateTime::now_utc() }
	}

	/// Keys touched when this event is applied.
	pub fn keys(&self) -> [StatKey; 4] {
		let platform = self.platform.clone();
		let app_id = self.app_id.clone();

		[
			StatKey::DailyLogins {
				platform: platform.clone(),
				app_id: app_id.clone(),
				date: self.at.to_offset(time::UtcOffset::UTC).date(),
			},
			StatKey::TotalLogins { platform: platform.clone(), app_id: app_id.clone() },
			StatKey::App { app_id },
			StatKey::PlatformCalls { platform },
		]
	}
}

enum Job {
	Record(StatsEvent),
	Flush(oneshot::Sender<()>),
}

/// Cheap, cloneable handle used by the broker to submit statistics events.
#[derive(Clone)]
pub struct StatsRecorder {
	tx: Option<mpsc::UnboundedSender<Job>>,
}
impl StatsRecorder {
	/// Starts a worker on the current Tokio runtime.
	pub fn spawn(store: Arc<dyn StatsStore>) -> Result<(Self, StatsWorker), ConfigError> {
		let handle = Handle::try_current().map_err(|_| ConfigError::NoRuntime { task: "statistics" })?;

		Ok(Self::spawn_on(&handle, store))
	}

	/// Starts a worker on the provided runtime handle.
	pub fn spawn_on(handle: &Handle, store: Arc<dyn StatsStore>) -> (Self, StatsWorker) {
		let (tx, rx) = mpsc::unbounded_channel();
		let task = handle.spawn(run(store, rx));

		(Self { tx: Some(tx) }, StatsWorker { task })
	}

	/// Builds a recorder that discards every event.
	pub fn disabled() -> Self {
		Self { tx: None }
	}

	/// Returns `true` when events reach a worker.
	pub fn is_enabled(&self) -> bool {
		self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
	}

	/// Submits an event without waiting for it to be applied.
	pub fn record(&self, event: StatsEvent) {
		let Some(tx) = &self.tx else {
			return;
		};

		if let Err(mpsc::error::SendError(Job::Record(event))) = tx.send(Job::Record(event)) {
			obs::log_stats_dropped(&event.platform, &event.app_id);
		}
	}

	/// Waits until every event submitted before this call has been applied.
	///
	/// Returns immediately for disabled recorders or when the worker is gone.
	pub async fn flush(&self) {
		let Some(tx) = &self.tx else {
			return;
		};
		let (ack, done) = oneshot::channel();

		if tx.send(Job::Flush(ack)).is_ok() {
			let _ = done.await;
		}
	}
}
impl Debug for StatsRecorder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("StatsRecorder").field("enabled", &self.is_enabled()).finish()
	}
}

/// Handle to the background statistics task.
///
/// Dropping it detaches the task; the worker stops once every [`StatsRecorder`] clone is gone.
#[derive(Debug)]
pub struct StatsWorker {
	task: JoinHandle<()>,
}
impl StatsWorker {
	/// Waits for the worker to drain its queue and exit.
	pub async fn join(self) {
		let _ = self.task.await;
	}

	/// Stops the worker immediately, discarding queued events.
	pub fn abort(&self) {
		self.task.abort();
	}
}

async fn run(store: Arc<dyn StatsStore>, mut rx: mpsc::UnboundedReceiver<Job>) {
	while let Some(job) = rx.recv().await {
		match job {
			Job::Record(event) => apply(store.as_ref(), &event).await,
			Job::Flush(ack) => {
				let _ = ack.send(());
			},
		}
	}
}

/// Applies the four updates of one event, logging each failure independently.
pub(crate) async fn apply(store: &dyn StatsStore, event: &StatsEvent) {
	let [daily, total, app, platform_calls] = event.keys();

	report("incr", &daily, cache::bounded("incr", STATS_OP_TIMEOUT, store.incr(&daily)).await);
	report("incr", &total, cache::bounded("incr", STATS_OP_TIMEOUT, store.incr(&total)).await);
	report(
		"hset",
		&app,
		cache::bounded(
			"hset",
			STATS_OP_TIMEOUT,
			store.hset(&app, StatKey::LAST_LOGIN_FIELD, event.at.unix_timestamp().to_string()),
		)
		.await,
	);
	report(
		"incr",
		&platform_calls,
		cache::bounded("incr", STATS_OP_TIMEOUT, store.incr(&platform_calls)).await,
	);
}

fn report<T>(operation: &'static str, key: &StatKey, result: Result<T, CacheError>) {
	if let Err(e) = result {
		obs::log_stats_failure(operation, key, &e);
	}
}
