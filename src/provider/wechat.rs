//! WeChat Mini Program access-token client.
//!
//! Issues `GET {base}/cgi-bin/token?grant_type=client_credential&appid=..&secret=..` and maps
//! the JSON answer onto [`FetchedToken`]. WeChat reports most failures with HTTP 200 and a
//! non-zero `errcode`, so the body is always inspected before a token is accepted.

// self
use crate::{
	_prelude::*,
	error::{ConfigError, UpstreamError},
	http::{ReqwestHttpClient, parse_retry_after},
	provider::{FetchRequest, FetchedToken, ProviderClient, ProviderFuture, body_preview},
};

/// Platform kind served by [`WeChatClient`].
pub const WECHAT_KIND: &str = "wechat_miniprogram";
/// Public WeChat API host used when a platform does not override its base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.weixin.qq.com";

const GRANT_TYPE: &str = "client_credential";

/// [`ProviderClient`] for the WeChat Mini Program token endpoint.
#[derive(Clone, Debug)]
pub struct WeChatClient {
	http: ReqwestHttpClient,
}
impl WeChatClient {
	/// Builds a client with the default transport (30 second timeout, no redirects).
	pub fn new() -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(ReqwestHttpClient::new()?))
	}

	/// Builds a client on top of an existing transport.
	pub fn with_http_client(http: ReqwestHttpClient) -> Self {
		Self { http }
	}

	/// Builds the token endpoint for `base`, falling back to [`DEFAULT_BASE_URL`].
	pub fn endpoint(&self, request: &FetchRequest<'_>) -> Result<Url, UpstreamError> {
		let mut url = match request.base_url {
			Some(base) => base.clone(),
			None => Url::parse(DEFAULT_BASE_URL)
				.map_err(|_| UpstreamError::InvalidEndpoint { url: DEFAULT_BASE_URL.into() })?,
		};

		let raw = url.to_string();

		url.path_segments_mut()
			.map_err(|_| UpstreamError::InvalidEndpoint { url: raw })?
			.pop_if_empty()
			.extend(["cgi-bin", "token"]);
		url.query_pairs_mut()
			.clear()
			.append_pair("grant_type", GRANT_TYPE)
			.append_pair("appid", request.app_id.as_str())
			.append_pair("secret", request.secret.expose());

		Ok(url)
	}

	async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchedToken, UpstreamError> {
		let url = self.endpoint(&request)?;
		let response = self.http.get(url).send().await?;
		let status = response.status();
		let retry_after = parse_retry_after(response.headers());
		let body = response.bytes().await?;

		if !status.is_success() {
			return Err(UpstreamError::Status {
				status: status.as_u16(),
				body: body_preview(&body),
				retry_after,
			});
		}

		let payload: TokenPayload =
			serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_slice(&body))
				.map_err(|source| UpstreamError::Parse {
						source: Arc::new(source),
						status: Some(status.as_u16()),
					})?;

		payload.into_fetched()
	}
}
impl ProviderClient for WeChatClient {
	fn fetch_token<'a>(&'a self, request: FetchRequest<'a>) -> ProviderFuture<'a, FetchedToken> {
		Box::pin(self.fetch(request))
	}
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	errcode: i64,
	#[serde(default)]
	errmsg: Option<String>,
}
impl TokenPayload {
	fn into_fetched(self) -> Result<FetchedToken, UpstreamError> {
		if self.errcode != 0 {
			return Err(UpstreamError::Rejected {
				code: self.errcode,
				message: self.errmsg.unwrap_or_default(),
			});
		}

		let access_token = self
			.access_token
			.ok_or(UpstreamError::InvalidResponse { reason: "access_token is missing" })?;
		let expires_in =
			self.expires_in.ok_or(UpstreamError::InvalidResponse { reason: "expires_in is missing" })?;

		FetchedToken::new(access_token, expires_in)
	}
}
