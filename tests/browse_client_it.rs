// std
use std::{
	sync::Arc,
	time::{Duration, Instant},
};
// crates.io
use httpmock::prelude::*;
use url::Url;
// self
use trawl::{
	auth::{AuthSession, Credentials},
	client::{FieldGroup, MarketplaceId, SearchClient, SearchRequest},
	error::{ApiError, Error, ValidationError},
	limit::RateLimiter,
};

fn build_client(server: &MockServer, permits: usize, window: Duration) -> SearchClient {
	let session = Arc::new(
		AuthSession::new(Credentials::new("app-client", "app-secret", "app-runame"))
			.with_token_endpoint(
				Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."),
			),
	);
	let limiter = Arc::new(RateLimiter::new(permits, window));

	SearchClient::new(session, limiter).with_endpoint(
		Url::parse(&server.url("/browse/")).expect("Mock browse endpoint should parse."),
	)
}

async fn mount_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"bearer-token\",\"expires_in\":7200}");
		})
		.await
}

#[tokio::test]
async fn searches_carry_bearer_and_marketplace_headers() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, 60, Duration::from_secs(60));
	let token = mount_token(&server).await;
	let search = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/browse/item_summary/search")
				.header("authorization", "Bearer bearer-token")
				.header("x-ebay-c-marketplace-id", "EBAY_US")
				.query_param("q", "mac mini")
				.query_param("limit", "200")
				.query_param("offset", "0");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"total\":1,\"itemSummaries\":[]}");
		})
		.await;
	let response = client
		.search(&SearchRequest::new("mac mini"))
		.await
		.expect("Search should succeed.");

	assert_eq!(response["total"], 1);

	token.assert_async().await;
	search.assert_async().await;
}

#[tokio::test]
async fn aspect_filters_reach_the_wire_as_one_composite() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, 60, Duration::from_secs(60));
	let _token = mount_token(&server).await;
	let search = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/browse/item_summary/search")
				.header("x-ebay-c-marketplace-id", "EBAY_DE")
				.query_param("category_ids", "175669,9355")
				.query_param("aspect_filter", "categoryId:175669|9355,Brand:{Apple|Dell Inc.}");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	let request = SearchRequest::new("mac")
		.category_ids([175_669, 9_355])
		.aspect_values("Brand", ["Apple", "Dell Inc."])
		.marketplace(MarketplaceId::EbayDe);

	client.search(&request).await.expect("Filtered search should succeed.");

	search.assert_async().await;
}

#[tokio::test]
async fn item_lookups_authenticate_and_scope_field_groups() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, 60, Duration::from_secs(60));
	let token = mount_token(&server).await;
	let item = server
		.mock_async(|when, then| {
			when.method(GET)
				.header("authorization", "Bearer bearer-token")
				.header("x-ebay-c-marketplace-id", "EBAY_GB")
				.query_param("fieldgroups", "PRODUCT,COMPACT");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"itemId\":\"v1|339030157238|0\"}");
		})
		.await;
	let record = client
		.item(
			"v1|339030157238|0",
			&[FieldGroup::Product, FieldGroup::Compact],
			MarketplaceId::EbayGb,
		)
		.await
		.expect("Item lookup should succeed.");

	assert_eq!(record["itemId"], "v1|339030157238|0");

	token.assert_async().await;
	item.assert_async().await;
}

#[tokio::test]
async fn upstream_failures_surface_status_and_body() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, 60, Duration::from_secs(60));
	let _token = mount_token(&server).await;
	let _search = server
		.mock_async(|when, then| {
			when.method(GET).path("/browse/item_summary/search");
			then.status(500)
				.header("content-type", "application/json")
				.body("{\"errors\":[{\"errorId\":2001}]}");
		})
		.await;
	let err = client
		.search(&SearchRequest::new("mac"))
		.await
		.expect_err("Upstream failures should surface.");

	assert!(matches!(
		&err,
		Error::Api(ApiError::Status { endpoint: "search", status: 500, body })
			if body.contains("2001"),
	));
}

#[tokio::test]
async fn invalid_requests_consume_no_quota() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, 60, Duration::from_secs(60));
	let network = server
		.mock_async(|_, then| {
			then.status(500);
		})
		.await;
	let request = SearchRequest::new("mac").aspect_values("Brand", ["Apple"]);
	let err = client
		.search(&request)
		.await
		.expect_err("Invalid requests should fail before the wire.");

	assert!(matches!(err, Error::Validation(ValidationError::AspectFilterWithoutCategories)));

	network.assert_calls_async(0).await;
}

#[tokio::test]
async fn sweeps_pace_themselves_through_the_limiter() {
	let server = MockServer::start_async().await;
	let client = build_client(&server, 1, Duration::from_millis(200));
	let _token = mount_token(&server).await;
	let search = server
		.mock_async(|when, then| {
			when.method(GET).path("/browse/item_summary/search");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	let started = Instant::now();

	for _ in 0..3 {
		client.search(&SearchRequest::new("mac")).await.expect("Paced search should succeed.");
	}

	// Three calls through a one-permit window need two full rollovers.
	assert!(started.elapsed() >= Duration::from_millis(400));

	search.assert_calls_async(3).await;
}

#[tokio::test]
async fn token_renewals_draw_no_search_permit() {
	let server = MockServer::start_async().await;
	let session = Arc::new(
		AuthSession::new(Credentials::new("app-client", "app-secret", "app-runame"))
			.with_token_endpoint(
				Url::parse(&server.url("/token")).expect("Mock token endpoint should parse."),
			),
	);
	let limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(10)));
	let client = SearchClient::new(session.clone(), limiter).with_endpoint(
		Url::parse(&server.url("/browse/")).expect("Mock browse endpoint should parse."),
	);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"short-lived\",\"expires_in\":0}");
		})
		.await;
	let _search = server
		.mock_async(|when, then| {
			when.method(GET).path("/browse/item_summary/search");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;

	// The search drains the only permit for the next ten seconds.
	client.search(&SearchRequest::new("mac")).await.expect("Search should succeed.");

	// The cached token is already expired, so this renews; it must not block on the
	// drained limiter.
	tokio::time::timeout(Duration::from_secs(2), session.auth_token())
		.await
		.expect("Renewals should not wait for search quota.")
		.expect("Renewal should succeed.");

	token.assert_calls_async(2).await;
}
