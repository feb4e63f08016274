//! Demonstrates lazy bearer-token renewal: one credential exchange serves many calls
//! and expiry is handled on the next access without caller involvement.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use url::Url;
// self
use trawl::auth::{AuthSession, Credentials};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"expires_in\":7200}");
		})
		.await;
	let session = AuthSession::new(Credentials::new("demo-client", "demo-secret", "demo-runame"))
		.with_token_endpoint(Url::parse(&server.url("/token"))?);

	println!("Session state before any call: {:?}.", session.state().await);

	let first = session.auth_token().await?;
	let second = session.auth_token().await?;

	assert_eq!(first.expose(), second.expose());

	println!("Bearer secret stays redacted in logs: {first}.");
	println!("Session state after the exchange: {:?}.", session.state().await);

	token_mock.assert_async().await;

	println!("Two accesses, one exchange.");

	Ok(())
}
