//! Exact quota packing for skewed categorical distributions.
//!
//! Upstream caps every query at [`RESULT_CEILING`] visible results, so harvesting a
//! busy category exhaustively means splitting it along some categorical field into
//! filtered sub-queries. [`QuotaPacker`] performs that split optimally: it partitions
//! a [`Distribution`] into the provably minimum number of capacity-bounded [`Bin`]s,
//! one filtered query sweep per bin.

// crates.io
use good_lp::{
	Expression, ProblemVariables, Solution, SolverModel, constraint, default_solver, variable,
};
use serde_json::Value;
use tracing::debug;
// self
use crate::{
	_prelude::*,
	error::{SolverError, ValidationError},
};

/// Upstream per-query result ceiling; a single query never reveals more results.
pub const RESULT_CEILING: u64 = 10_000;

/// One categorical value and its reported result count.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValueCount {
	/// Value label as reported upstream.
	pub label: String,
	/// Number of results carrying the value.
	pub count: u64,
}
impl ValueCount {
	/// Creates a labeled count.
	pub fn new(label: impl Into<String>, count: u64) -> Self {
		Self { label: label.into(), count }
	}
}

/// Single-field categorical distribution, e.g. one aspect's value histogram.
///
/// Value order is preserved from construction so packings render reproducibly.
#[derive(Clone, Debug)]
pub struct Distribution {
	field: String,
	values: Vec<ValueCount>,
}
impl Distribution {
	/// Creates a distribution over `field` from labeled counts.
	pub fn new(field: impl Into<String>, values: impl IntoIterator<Item = ValueCount>) -> Self {
		Self { field: field.into(), values: values.into_iter().collect() }
	}

	/// Extracts the named aspect's histogram from a search refinement payload.
	///
	/// `refinement` is the `refinement` block of a search response requested with the
	/// aspect-refinements field group; entries outside the documented shape fail with
	/// [`ValidationError::MalformedRefinement`].
	pub fn from_refinement(refinement: &Value, aspect: &str) -> Result<Self, ValidationError> {
		let parsed: Refinement = serde_path_to_error::deserialize(refinement)
			.map_err(|source| ValidationError::MalformedRefinement { source })?;
		let distribution = parsed
			.aspect_distributions
			.into_iter()
			.find(|candidate| candidate.localized_aspect_name == aspect)
			.ok_or_else(|| ValidationError::UnknownAspect { aspect: aspect.into() })?;
		let values = distribution
			.aspect_value_distributions
			.into_iter()
			.map(|value| ValueCount::new(value.localized_aspect_value, value.match_count))
			.collect();

		Ok(Self { field: aspect.into(), values })
	}

	/// Field the values describe.
	pub fn field(&self) -> &str {
		&self.field
	}

	/// Labeled counts in construction order.
	pub fn values(&self) -> &[ValueCount] {
		&self.values
	}

	/// Number of values.
	pub fn len(&self) -> usize {
		self.values.len()
	}

	/// Whether the distribution has no values.
	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Sum of all value counts.
	pub fn total(&self) -> u64 {
		self.values.iter().map(|value| value.count).sum()
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Refinement {
	#[serde(default)]
	aspect_distributions: Vec<AspectDistribution>,
}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AspectDistribution {
	localized_aspect_name: String,
	#[serde(default)]
	aspect_value_distributions: Vec<AspectValueDistribution>,
}
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AspectValueDistribution {
	localized_aspect_value: String,
	match_count: u64,
}

/// One capacity-bounded group of values.
#[derive(Clone, Debug)]
pub struct Bin {
	members: Vec<ValueCount>,
	weight: u64,
}
impl Bin {
	/// Values assigned to the bin.
	pub fn members(&self) -> &[ValueCount] {
		&self.members
	}

	/// Member labels in assignment order.
	pub fn labels(&self) -> impl Iterator<Item = &str> {
		self.members.iter().map(|value| value.label.as_str())
	}

	/// Sum of member counts; never exceeds the packer capacity.
	pub fn weight(&self) -> u64 {
		self.weight
	}
}

/// Minimum partition of a [`Distribution`] into capacity-bounded bins.
#[derive(Clone, Debug)]
pub struct PackingSolution {
	field: String,
	bins: Vec<Bin>,
}
impl PackingSolution {
	/// Field the packed distribution describes.
	pub fn field(&self) -> &str {
		&self.field
	}

	/// Packed bins.
	pub fn bins(&self) -> &[Bin] {
		&self.bins
	}

	/// Number of bins, the minimized objective.
	pub fn len(&self) -> usize {
		self.bins.len()
	}

	/// Whether the packing has no bins.
	pub fn is_empty(&self) -> bool {
		self.bins.is_empty()
	}
}

/// Exact bin-packing optimizer for skewed categorical distributions.
///
/// Packs every value of a distribution into the minimum number of bins whose weights
/// stay at or below the capacity, so each bin can be fetched exhaustively with one
/// filtered query. The bin count is provably minimal; the concrete assignment may
/// vary between runs when several optimal packings exist.
#[derive(Clone, Copy, Debug)]
pub struct QuotaPacker {
	capacity: u64,
}
impl QuotaPacker {
	/// Largest distribution the exact solver accepts.
	pub const MAX_VALUES: usize = 128;

	/// Creates a packer with a custom bin capacity.
	pub fn new(capacity: u64) -> Self {
		Self { capacity }
	}

	/// Returns the bin capacity.
	pub fn capacity(&self) -> u64 {
		self.capacity
	}

	/// Packs `distribution` into the minimum number of capacity-bounded bins.
	///
	/// Fails before any solve when a single value outweighs the capacity or when the
	/// distribution exceeds [`Self::MAX_VALUES`]. An empty distribution packs into
	/// zero bins.
	pub fn pack(&self, distribution: &Distribution) -> Result<PackingSolution> {
		let values = distribution.values();

		if let Some(oversized) = values.iter().find(|value| value.count > self.capacity) {
			return Err(ValidationError::ValueExceedsCapacity {
				label: oversized.label.clone(),
				count: oversized.count,
				capacity: self.capacity,
			}
			.into());
		}
		if values.len() > Self::MAX_VALUES {
			return Err(SolverError::TooManyValues {
				values: values.len(),
				limit: Self::MAX_VALUES,
			}
			.into());
		}
		if values.is_empty() {
			return Ok(PackingSolution { field: distribution.field().into(), bins: Vec::new() });
		}

		// One slot per value is always enough; every count fits a bin on its own.
		let slots = values.len();
		let mut vars = ProblemVariables::new();
		let used: Vec<_> = (0..slots).map(|_| vars.add(variable().binary())).collect();
		let assign: Vec<Vec<_>> = (0..values.len())
			.map(|_| (0..slots).map(|_| vars.add(variable().binary())).collect())
			.collect();
		let open_bins: Expression = used.iter().copied().sum();
		let mut model = vars.minimise(open_bins).using(default_solver);

		// Every value lands in exactly one bin.
		for row in &assign {
			let placements: Expression = row.iter().copied().sum();

			model = model.with(constraint::eq(placements, 1.));
		}
		for (j, &slot) in used.iter().enumerate() {
			// Loads stay within capacity.
			let load: Expression =
				values.iter().zip(&assign).map(|(value, row)| value.count as f64 * row[j]).sum();

			model = model.with(constraint::leq(load, self.capacity as f64 * slot));

			// Values may only land in open bins. The capacity row alone would let
			// zero-weight values hide in closed bins and vanish from the partition.
			for row in &assign {
				model = model.with(constraint::leq(row[j], slot));
			}
		}
		// Open bins come first; interchangeable slots would otherwise blow up the
		// search space.
		for j in 1..slots {
			model = model.with(constraint::leq(used[j], used[j - 1]));
		}

		let solution =
			model.solve().map_err(|e| SolverError::Unsolved { reason: e.to_string() })?;
		let mut bins = Vec::new();

		for (j, &slot) in used.iter().enumerate() {
			if solution.value(slot) < 0.5 {
				continue;
			}

			let mut members = Vec::new();
			let mut weight = 0;

			for (value, row) in values.iter().zip(&assign) {
				if solution.value(row[j]) >= 0.5 {
					members.push(value.clone());
					weight += value.count;
				}
			}

			if members.is_empty() {
				continue;
			}

			bins.push(Bin { members, weight });
		}

		debug!(
			field = distribution.field(),
			values = values.len(),
			bins = bins.len(),
			"Packed distribution"
		);

		Ok(PackingSolution { field: distribution.field().into(), bins })
	}
}
impl Default for QuotaPacker {
	fn default() -> Self {
		Self::new(RESULT_CEILING)
	}
}
