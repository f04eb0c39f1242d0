//! Demonstrates loading a platform configuration, brokering a WeChat Mini Program access token
//! through the in-memory cache, and reading back the usage statistics.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use platform_token_broker::{
	auth::{AppId, PlatformId},
	broker::Broker,
	cache::MemoryCache,
	config::BrokerConfig,
	provider::ProviderRegistry,
	stats::{StatsReader, StatsRecorder},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/cgi-bin/token").query_param("appid", "wx123");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"expires_in\":7200}");
		})
		.await;
	let config = BrokerConfig::from_yaml_str(&format!(
		"platforms:
  wechat_miniprogram:
    name: WeChat Mini Program
    type: wechat_miniprogram
    enabled: true
    api_base_url: {}
    apps:
      wx123:
        app_secret: demo-secret
",
		server.base_url()
	))?;
	let cache = MemoryCache::default();
	let (stats, worker) = StatsRecorder::spawn(Arc::new(cache.clone()))?;
	let broker = Broker::new(
		Arc::new(config.registry()?),
		Arc::new(cache.clone()),
		Arc::new(ProviderRegistry::with_defaults()?),
	)
	.with_options(config.options())
	.with_stats(stats.clone());

	for _ in 0..2 {
		let token = broker.get_token("wechat_miniprogram", "wx123").await?;

		println!("Access token {} ({:?}).", token.expose(), token.origin);
	}

	stats.flush().await;

	let reader = StatsReader::new(Arc::new(cache));
	let platform = PlatformId::new("wechat_miniprogram")?;
	let app_id = AppId::new("wx123")?;

	println!("Upstream fetches recorded: {}.", reader.total_count(&platform, &app_id).await?);

	token_mock.assert_async().await;

	drop(broker);
	drop(stats);
	worker.join().await;

	Ok(())
}
