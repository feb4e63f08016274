// std
use std::{collections::BTreeSet, sync::Arc, time::Duration};
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use url::Url;
// self
use trawl::{
	auth::{AuthSession, Credentials},
	client::{FieldGroup, SearchClient, SearchRequest},
	limit::RateLimiter,
	pack::{Distribution, QuotaPacker, RESULT_CEILING},
};

#[tokio::test]
async fn packed_sweeps_cover_every_value_within_quota() {
	let server = MockServer::start_async().await;
	let session = Arc::new(
		AuthSession::new(Credentials::new("app-client", "app-secret", "app-runame"))
			.with_token_endpoint(
				Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."),
			),
	);
	let limiter = Arc::new(RateLimiter::new(60, Duration::from_secs(60)));
	let client = SearchClient::new(session, limiter).with_endpoint(
		Url::parse(&server.url("/browse/")).expect("Mock browse endpoint should parse."),
	);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"bearer-token\",\"expires_in\":7200}");
		})
		.await;
	let refinement_payload = json!({
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
	let probe = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/browse/item_summary/search")
				.query_param("fieldgroups", "ASPECT_REFINEMENTS");
			then.status(200)
				.header("content-type", "application/json")
				.body(refinement_payload.to_string());
		})
		.await;
	let sweep = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/browse/item_summary/search")
				.query_param_exists("aspect_filter");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"itemSummaries\":[]}");
		})
		.await;

	// Probe the aspect histogram, then split it into quota-sized sweeps.
	let probe_request = SearchRequest::new("laptop")
		.category_id(175_672)
		.field_group(FieldGroup::AspectRefinements)
		.limit(1);
	let probe_response = client.search(&probe_request).await.expect("Probe should succeed.");
	let distribution = Distribution::from_refinement(&probe_response["refinement"], "Brand")
		.expect("Refinement payload should parse.");
	let solution =
		QuotaPacker::default().pack(&distribution).expect("Packing 18k results should succeed.");

	assert_eq!(solution.len(), 2);

	let mut covered = BTreeSet::new();

	for bin in solution.bins() {
		assert!(bin.weight() <= RESULT_CEILING);

		let request =
			SearchRequest::new("laptop").category_id(175_672).aspect_bin(solution.field(), bin);

		client.search(&request).await.expect("Sweep should succeed.");
		covered.extend(bin.labels().map(str::to_owned));
	}

	let expected: BTreeSet<_> =
		["Apple", "Dell", "HP", "Lenovo"].into_iter().map(str::to_owned).collect();

	assert_eq!(covered, expected);

	token.assert_calls_async(1).await;
	probe.assert_async().await;
	sweep.assert_calls_async(2).await;
}
