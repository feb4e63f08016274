//! Authenticated browse API client with uniform request gating.
//!
//! Every network call goes through the same sequence: the request is validated and
//! rendered first, then a rate-limiter permit is acquired, then the bearer token is
//! resolved (renewing it when expired), and only then does the call go out. A request
//! that fails validation never consumes quota and never triggers a token exchange.

pub mod request;
pub use request::*;

// crates.io
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use tracing::debug;
// self
use crate::{
	_prelude::*,
	auth::AuthSession,
	error::{ApiError, ValidationError},
	limit::RateLimiter,
};

/// Production browse API base.
pub const BROWSE_ENDPOINT: &str = "https://api.ebay.com/buy/browse/v1/";
/// Header naming the marketplace a call is routed to.
pub const MARKETPLACE_HEADER: &str = "X-EBAY-C-MARKETPLACE-ID";

/// Raw search response payload.
pub type SearchResponse = Value;
/// Raw item record payload.
pub type ItemRecord = Value;

/// Browse API client sharing one auth session and one rate limiter across all calls.
///
/// Clones share the session, the limiter, and the connection pool, so a fleet of
/// concurrent sweeps stays inside one request budget and one token lifecycle.
#[derive(Clone, Debug)]
pub struct SearchClient {
	http: ReqwestClient,
	endpoint: Url,
	session: Arc<AuthSession>,
	limiter: Arc<RateLimiter>,
}
impl SearchClient {
	/// Creates a client against the production browse endpoint.
	pub fn new(session: Arc<AuthSession>, limiter: Arc<RateLimiter>) -> Self {
		Self {
			http: ReqwestClient::new(),
			endpoint: Url::parse(BROWSE_ENDPOINT)
				.expect("Production browse endpoint should parse."),
			session,
			limiter,
		}
	}

	/// Points the client at a different browse endpoint.
	pub fn with_endpoint(mut self, endpoint: Url) -> Self {
		self.endpoint = endpoint;

		self
	}

	/// Replaces the underlying HTTP client.
	pub fn with_http_client(mut self, http: ReqwestClient) -> Self {
		self.http = http;

		self
	}

	/// Runs one search call and returns the raw response payload.
	pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
		let query = request.query_string()?;
		let mut url = self.endpoint_url(&["item_summary", "search"])?;

		// The rendered string carries its own piecewise encoding.
		url.set_query(Some(&query));

		self.execute(url, request.marketplace_id(), "search").await
	}

	/// Fetches one item record by its full item id.
	pub async fn item(
		&self,
		item_id: &str,
		field_groups: &[FieldGroup],
		marketplace: MarketplaceId,
	) -> Result<ItemRecord> {
		let url = self.item_url(item_id, field_groups)?;

		self.execute(url, marketplace, "item").await
	}

	fn endpoint_url(&self, segments: &[&str]) -> Result<Url, ValidationError> {
		let mut url = self.endpoint.clone();

		url.path_segments_mut()
			.map_err(|_| ValidationError::OpaqueEndpoint)?
			.pop_if_empty()
			.extend(segments);

		Ok(url)
	}

	fn item_url(&self, item_id: &str, field_groups: &[FieldGroup]) -> Result<Url, ValidationError> {
		let mut url = self.endpoint_url(&["item"])?;
		// Item ids embed `|` separators, which the url crate leaves raw in paths;
		// upstream expects the whole id percent-encoded.
		let path = format!("{}/{}", url.path(), request::encode_segment(item_id));

		url.set_path(&path);

		if !field_groups.is_empty() {
			let groups = field_groups
				.iter()
				.map(|group| request::encode(group.as_str()))
				.collect::<Vec<_>>()
				.join(",");

			url.set_query(Some(&format!("fieldgroups={groups}")));
		}

		Ok(url)
	}

	async fn execute(
		&self,
		url: Url,
		marketplace: MarketplaceId,
		endpoint: &'static str,
	) -> Result<Value> {
		self.limiter.acquire().await;

		let token = self.session.auth_token().await?;
		let response = self
			.http
			.get(url)
			.header(AUTHORIZATION, format!("Bearer {}", token.expose()))
			.header(MARKETPLACE_HEADER, marketplace.as_str())
			.send()
			.await?;
		let status = response.status();
		let body = response.bytes().await?;

		debug!(endpoint, status = status.as_u16(), bytes = body.len(), "Upstream call finished");

		if !status.is_success() {
			return Err(ApiError::Status {
				endpoint,
				status: status.as_u16(),
				body: String::from_utf8_lossy(&body).into_owned(),
			}
			.into());
		}

		let payload = serde_json::from_slice(&body)
			.map_err(|source| ApiError::MalformedBody { endpoint, source })?;

		Ok(payload)
	}
}
