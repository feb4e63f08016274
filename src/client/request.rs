//! Typed search requests and their wire rendering.
//!
//! [`SearchRequest`] collects the supported parameters and renders them into a query
//! string. Composite values (`filter`, `aspect_filter`) are percent-encoded piecewise
//! because upstream splits them on the raw `,` and `:` delimiters before decoding the
//! pieces; the rendered string therefore goes onto the URL verbatim instead of
//! through pair-wise serialization.

// std
use std::borrow::Cow;
// crates.io
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
// self
use crate::{error::ValidationError, pack::Bin};

/// Characters escaped inside composite query values: everything except unreserved
/// marks and `/`, mirroring how upstream encodes its own refinement links.
const COMPONENT: &AsciiSet =
	&NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~').remove(b'/');
/// Characters escaped inside path segments: everything except unreserved marks. Item
/// ids embed `|` separators, which the url crate would otherwise leave raw in paths.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

pub(crate) fn encode(value: &str) -> Cow<'_, str> {
	utf8_percent_encode(value, COMPONENT).into()
}

pub(crate) fn encode_segment(value: &str) -> Cow<'_, str> {
	utf8_percent_encode(value, SEGMENT).into()
}

/// Response sections beyond the default item summaries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldGroup {
	/// Aspect histogram for the queried categories.
	AspectRefinements,
	/// Buying option histogram.
	BuyingOptionRefinements,
	/// Category histogram.
	CategoryRefinements,
	/// Condition histogram.
	ConditionRefinements,
	/// Additional summary fields such as short descriptions.
	Extended,
	/// Every refinement histogram without the matching items.
	Full,
	/// Matching items only; the upstream default.
	MatchingItems,
	/// Condensed record on the item endpoint.
	Compact,
	/// Product details on the item endpoint.
	Product,
	/// Extended seller details on the item endpoint.
	AdditionalSellerDetails,
}
impl FieldGroup {
	/// Wire value for the `fieldgroups` parameter.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::AspectRefinements => "ASPECT_REFINEMENTS",
			Self::BuyingOptionRefinements => "BUYING_OPTION_REFINEMENTS",
			Self::CategoryRefinements => "CATEGORY_REFINEMENTS",
			Self::ConditionRefinements => "CONDITION_REFINEMENTS",
			Self::Extended => "EXTENDED",
			Self::Full => "FULL",
			Self::MatchingItems => "MATCHING_ITEMS",
			Self::Compact => "COMPACT",
			Self::Product => "PRODUCT",
			Self::AdditionalSellerDetails => "ADDITIONAL_SELLER_DETAILS",
		}
	}
}

/// Server-side sort orders.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortField {
	/// Ascending price plus shipping.
	Price,
	/// Descending price plus shipping.
	PriceDescending,
	/// Newest listings first.
	NewlyListed,
	/// Auctions ending soonest first.
	EndingSoonest,
	/// Nearest pickup location first.
	Distance,
}
impl SortField {
	/// Wire value for the `sort` parameter.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Price => "price",
			Self::PriceDescending => "-price",
			Self::NewlyListed => "newlyListed",
			Self::EndingSoonest => "endingSoonest",
			Self::Distance => "distance",
		}
	}
}

/// Keys accepted by the `filter` parameter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterField {
	/// Listing formats, e.g. `{FIXED_PRICE|AUCTION}`.
	BuyingOptions,
	/// Numeric condition identifiers.
	ConditionIds,
	/// Named conditions, e.g. `{NEW|USED}`.
	Conditions,
	/// Country the item can be delivered to.
	DeliveryCountry,
	/// Country the item is located in.
	ItemLocationCountry,
	/// Price range, e.g. `[50..500]`.
	Price,
	/// Currency the price filter is expressed in.
	PriceCurrency,
	/// Seller account names.
	Sellers,
}
impl FilterField {
	/// Wire value for the filter key.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::BuyingOptions => "buyingOptions",
			Self::ConditionIds => "conditionIds",
			Self::Conditions => "conditions",
			Self::DeliveryCountry => "deliveryCountry",
			Self::ItemLocationCountry => "itemLocationCountry",
			Self::Price => "price",
			Self::PriceCurrency => "priceCurrency",
			Self::Sellers => "sellers",
		}
	}
}

/// Marketplace a call is routed to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MarketplaceId {
	/// United States.
	#[default]
	EbayUs,
	/// Australia.
	EbayAu,
	/// Canada.
	EbayCa,
	/// Germany.
	EbayDe,
	/// Spain.
	EbayEs,
	/// France.
	EbayFr,
	/// United Kingdom.
	EbayGb,
	/// Italy.
	EbayIt,
}
impl MarketplaceId {
	/// Wire value for the marketplace header.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::EbayUs => "EBAY_US",
			Self::EbayAu => "EBAY_AU",
			Self::EbayCa => "EBAY_CA",
			Self::EbayDe => "EBAY_DE",
			Self::EbayEs => "EBAY_ES",
			Self::EbayFr => "EBAY_FR",
			Self::EbayGb => "EBAY_GB",
			Self::EbayIt => "EBAY_IT",
		}
	}
}

/// Builder-style description of one search call.
///
/// Requests are plain values; clone one and call [`SearchRequest::next_page`] to walk
/// a result set page by page.
#[derive(Clone, Debug)]
pub struct SearchRequest {
	query: String,
	field_groups: Vec<FieldGroup>,
	sorts: Vec<SortField>,
	category_ids: Vec<u64>,
	filters: Vec<(FilterField, String)>,
	aspect_filter: Vec<(String, Vec<String>)>,
	limit: u32,
	offset: u32,
	marketplace: MarketplaceId,
}
impl SearchRequest {
	/// Default page size; the upstream maximum.
	pub const DEFAULT_LIMIT: u32 = 200;

	/// Creates a request for `query` with default paging.
	pub fn new(query: impl Into<String>) -> Self {
		Self {
			query: query.into(),
			field_groups: Vec::new(),
			sorts: Vec::new(),
			category_ids: Vec::new(),
			filters: Vec::new(),
			aspect_filter: Vec::new(),
			limit: Self::DEFAULT_LIMIT,
			offset: 0,
			marketplace: MarketplaceId::default(),
		}
	}

	/// Requests an additional response section.
	pub fn field_group(mut self, group: FieldGroup) -> Self {
		self.field_groups.push(group);

		self
	}

	/// Orders results server-side; repeat to chain tie-breakers.
	pub fn sort(mut self, sort: SortField) -> Self {
		self.sorts.push(sort);

		self
	}

	/// Restricts results to a category subtree.
	pub fn category_id(mut self, id: u64) -> Self {
		self.category_ids.push(id);

		self
	}

	/// Restricts results to several category subtrees.
	pub fn category_ids(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
		self.category_ids.extend(ids);

		self
	}

	/// Adds a `filter` entry, e.g. a price range or buying option.
	pub fn filter(mut self, field: FilterField, value: impl Into<String>) -> Self {
		self.filters.push((field, value.into()));

		self
	}

	/// Keeps only results carrying one of `values` for the aspect `field`.
	///
	/// Aspect filters are scoped per category upstream, so the request must also name
	/// at least one category id; rendering fails otherwise.
	pub fn aspect_values<I, S>(mut self, field: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.aspect_filter.push((field.into(), values.into_iter().map(Into::into).collect()));

		self
	}

	/// Keeps only results whose `field` value landed in `bin`.
	pub fn aspect_bin(self, field: impl Into<String>, bin: &Bin) -> Self {
		self.aspect_values(field, bin.labels().map(str::to_owned))
	}

	/// Overrides the page size.
	pub fn limit(mut self, limit: u32) -> Self {
		self.limit = limit;

		self
	}

	/// Overrides the paging offset.
	pub fn offset(mut self, offset: u32) -> Self {
		self.offset = offset;

		self
	}

	/// Routes the call to a marketplace other than the default `EBAY_US`.
	pub fn marketplace(mut self, marketplace: MarketplaceId) -> Self {
		self.marketplace = marketplace;

		self
	}

	/// Advances the request to the next page.
	pub fn next_page(mut self) -> Self {
		self.offset += self.limit;

		self
	}

	pub(crate) fn marketplace_id(&self) -> MarketplaceId {
		self.marketplace
	}

	/// Renders the query string, validating cross-parameter rules first.
	pub(crate) fn query_string(&self) -> Result<String, ValidationError> {
		if !self.aspect_filter.is_empty() && self.category_ids.is_empty() {
			return Err(ValidationError::AspectFilterWithoutCategories);
		}

		let mut query =
			format!("q={}&limit={}&offset={}", encode(&self.query), self.limit, self.offset);

		if !self.field_groups.is_empty() {
			let groups = self
				.field_groups
				.iter()
				.map(|group| encode(group.as_str()))
				.collect::<Vec<_>>()
				.join(",");

			query.push_str("&fieldgroups=");
			query.push_str(&groups);
		}
		if !self.sorts.is_empty() {
			let sorts =
				self.sorts.iter().map(|sort| encode(sort.as_str())).collect::<Vec<_>>().join(",");

			query.push_str("&sort=");
			query.push_str(&sorts);
		}
		if !self.category_ids.is_empty() {
			let ids = self
				.category_ids
				.iter()
				.map(ToString::to_string)
				.collect::<Vec<_>>()
				.join(",");

			query.push_str("&category_ids=");
			query.push_str(&ids);
		}
		if !self.filters.is_empty() {
			let filters = self
				.filters
				.iter()
				.map(|(field, value)| format!("{}:{}", encode(field.as_str()), encode(value)))
				.collect::<Vec<_>>()
				.join(",");

			query.push_str("&filter=");
			query.push_str(&filters);
		}
		if !self.aspect_filter.is_empty() {
			// Aspect filters carry their category scope inline, pipe-joined and
			// encoded as one piece.
			let scope = self
				.category_ids
				.iter()
				.map(ToString::to_string)
				.collect::<Vec<_>>()
				.join("|");
			let mut segments = vec![format!("categoryId:{}", encode(&scope))];

			for (field, values) in &self.aspect_filter {
				let group = format!("{{{}}}", values.join("|"));

				segments.push(format!("{}:{}", encode(field), encode(&group)));
			}

			query.push_str("&aspect_filter=");
			query.push_str(&segments.join(","));
		}

		Ok(query)
	}
}
