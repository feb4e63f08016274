//! Client-credentials session management with lazy, serialized token renewal.
//!
//! [`AuthSession`] caches one bearer token and refreshes it on demand:
//! [`AuthSession::auth_token`] returns the cached secret while it is live and performs
//! a credential exchange otherwise. The expiry check and the exchange run under a
//! single async mutex, so callers racing an expiry trigger one round-trip and everyone
//! else reuses its result.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::header::AUTHORIZATION;
use tracing::debug;
// self
use crate::{_prelude::*, error::AuthError};

/// Production token endpoint.
const TOKEN_ENDPOINT: &str = "https://api.ebay.com/identity/v1/oauth2/token";
/// Scope requested with every client-credentials exchange.
const SCOPE: &str = "https://api.ebay.com/oauth/api_scope";

/// Redacted wrapper keeping credential material out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);
impl Secret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl AsRef<str> for Secret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Secret").field(&"<redacted>").finish()
	}
}
impl Display for Secret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Application keyset for the client-credentials exchange.
#[derive(Clone, Debug)]
pub struct Credentials {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: Secret,
	/// Registered redirect name, sent as `redirect_uri`.
	pub runame: String,
}
impl Credentials {
	/// Creates credentials from the application keyset.
	pub fn new(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
		runame: impl Into<String>,
	) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: Secret::new(client_secret),
			runame: runame.into(),
		}
	}

	fn basic_authorization(&self) -> String {
		let material = format!("{}:{}", self.client_id, self.client_secret.expose());

		format!("Basic {}", BASE64.encode(material))
	}
}

/// Successful token endpoint payload.
#[derive(Debug, Deserialize)]
struct TokenGrant {
	access_token: String,
	expires_in: i64,
}

/// Cached bearer token; replaced whole on every renewal, never persisted.
#[derive(Clone, Debug)]
struct BearerToken {
	secret: Secret,
	expires_at: OffsetDateTime,
}
impl BearerToken {
	fn from_grant(grant: TokenGrant, issued_at: OffsetDateTime) -> Self {
		Self {
			secret: Secret::new(grant.access_token),
			expires_at: issued_at + Duration::seconds(grant.expires_in),
		}
	}

	// A token is usable up to and including its expiry instant.
	fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant > self.expires_at
	}
}

/// Observable lifecycle state of an [`AuthSession`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionState {
	/// No exchange has completed yet.
	Unauthenticated,
	/// A cached token exists and its lifetime has not elapsed.
	Valid,
	/// A cached token exists but its lifetime has elapsed.
	Expired,
}

/// Client-credentials bearer session with on-demand renewal.
///
/// Expiry is evaluated lazily on access; there is no background refresh task. The
/// session never spends rate-limit quota itself, renewals ride under the permit of
/// the API call that triggered them.
pub struct AuthSession {
	http: ReqwestClient,
	token_endpoint: Url,
	credentials: Credentials,
	token: AsyncMutex<Option<BearerToken>>,
}
impl AuthSession {
	/// Creates a session against the production token endpoint.
	pub fn new(credentials: Credentials) -> Self {
		Self {
			http: ReqwestClient::new(),
			token_endpoint: Url::parse(TOKEN_ENDPOINT)
				.expect("Production token endpoint should parse."),
			credentials,
			token: AsyncMutex::new(None),
		}
	}

	/// Overrides the token endpoint; integration tests point this at a mock server.
	pub fn with_token_endpoint(mut self, endpoint: Url) -> Self {
		self.token_endpoint = endpoint;

		self
	}

	/// Overrides the HTTP client, e.g. to share a connection pool.
	pub fn with_http_client(mut self, http: ReqwestClient) -> Self {
		self.http = http;

		self
	}

	/// Reports the lifecycle state at the current instant.
	pub async fn state(&self) -> SessionState {
		match self.token.lock().await.as_ref() {
			None => SessionState::Unauthenticated,
			Some(token) if token.is_expired_at(OffsetDateTime::now_utc()) => SessionState::Expired,
			Some(_) => SessionState::Valid,
		}
	}

	/// Returns a live bearer secret, exchanging credentials first when the cache is
	/// empty or expired.
	///
	/// The whole check-then-exchange sequence holds the session lock, so callers
	/// racing an expiry share a single exchange instead of stampeding the endpoint.
	pub async fn auth_token(&self) -> Result<Secret> {
		let mut slot = self.token.lock().await;

		if let Some(token) =
			slot.as_ref().filter(|token| !token.is_expired_at(OffsetDateTime::now_utc()))
		{
			return Ok(token.secret.clone());
		}

		let token = self.exchange().await?;
		let secret = token.secret.clone();

		*slot = Some(token);

		Ok(secret)
	}

	/// Performs the credential exchange eagerly.
	///
	/// Refused with [`AuthError::AlreadyAuthenticated`] while a live token is cached;
	/// an expired token is replaced. Most callers should rely on
	/// [`Self::auth_token`] instead.
	pub async fn authenticate(&self) -> Result<()> {
		let mut slot = self.token.lock().await;

		if slot.as_ref().is_some_and(|token| !token.is_expired_at(OffsetDateTime::now_utc())) {
			return Err(AuthError::AlreadyAuthenticated.into());
		}

		*slot = Some(self.exchange().await?);

		Ok(())
	}

	async fn exchange(&self) -> Result<BearerToken> {
		debug!(endpoint = %self.token_endpoint, "Exchanging client credentials");

		let response = self
			.http
			.post(self.token_endpoint.clone())
			.header(AUTHORIZATION, self.credentials.basic_authorization())
			.form(&[
				("grant_type", "client_credentials"),
				("redirect_uri", self.credentials.runame.as_str()),
				("scope", SCOPE),
			])
			.send()
			.await?;
		let issued_at = OffsetDateTime::now_utc();
		let status = response.status();
		let body = response.bytes().await?;

		if !status.is_success() {
			return Err(AuthError::Rejected {
				status: status.as_u16(),
				body: String::from_utf8_lossy(&body).into_owned(),
			}
			.into());
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&body);
		let grant: TokenGrant = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| AuthError::MalformedGrant { source })?;

		debug!(expires_in = grant.expires_in, "Credential exchange succeeded");

		Ok(BearerToken::from_grant(grant, issued_at))
	}
}
impl Debug for AuthSession {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthSession")
			.field("token_endpoint", &self.token_endpoint.as_str())
			.field("client_id", &self.credentials.client_id)
			.finish()
	}
}
