//! Demonstrates splitting an oversubscribed aspect histogram into quota-sized bins and
//! sweeping each bin as its own filtered search.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use trawl::{
	auth::{AuthSession, Credentials},
	client::{FieldGroup, SearchClient, SearchRequest},
	limit::RateLimiter,
	pack::{Distribution, QuotaPacker},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let _token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"demo-access\",\"expires_in\":7200}");
		})
		.await;
	let refinement = json!({
		"refinement": {
			"aspectDistributions": [{
				"localizedAspectName": "Brand",
				"aspectValueDistributions": [
					{ "localizedAspectValue": "Apple", "matchCount": 6_000 },
					{ "localizedAspectValue": "Dell", "matchCount": 4_000 },
					{ "localizedAspectValue": "HP", "matchCount": 5_000 },
					{ "localizedAspectValue": "Lenovo", "matchCount": 3_000 }
				]
			}]
		}
	});
	let _probe = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/browse/item_summary/search")
				.query_param("fieldgroups", "ASPECT_REFINEMENTS");
			then.status(200)
				.header("content-type", "application/json")
				.body(refinement.to_string());
		})
		.await;
	let _sweep = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/browse/item_summary/search")
				.query_param_exists("aspect_filter");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"itemSummaries\":[]}");
		})
		.await;
	let session = Arc::new(
		AuthSession::new(Credentials::new("demo-client", "demo-secret", "demo-runame"))
			.with_token_endpoint(Url::parse(&server.url("/token"))?),
	);
	let limiter = Arc::new(RateLimiter::new(5, Duration::from_secs(1)));
	let client =
		SearchClient::new(session, limiter).with_endpoint(Url::parse(&server.url("/browse/"))?);
	let probe_request = SearchRequest::new("laptop")
		.category_id(175_672)
		.field_group(FieldGroup::AspectRefinements)
		.limit(1);
	let response = client.search(&probe_request).await?;
	let distribution = Distribution::from_refinement(&response["refinement"], "Brand")?;

	println!(
		"Histogram covers {} results across {} brands.",
		distribution.total(),
		distribution.len(),
	);

	let solution = QuotaPacker::default().pack(&distribution)?;

	println!("Minimum sweeps required: {}.", solution.len());

	for (index, bin) in solution.bins().iter().enumerate() {
		let labels = bin.labels().collect::<Vec<_>>().join(", ");

		println!("Sweep {}: {} results from {labels}.", index + 1, bin.weight());

		let request =
			SearchRequest::new("laptop").category_id(175_672).aspect_bin(solution.field(), bin);

		client.search(&request).await?;
	}

	println!("Every brand fetched exhaustively without breaching the result ceiling.");

	Ok(())
}
