//! Error taxonomy shared by the packing, session, and client layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Request construction or input validation failure.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Credential exchange failure.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// Upstream API failure that carried an HTTP status.
	#[error(transparent)]
	Api(#[from] ApiError),
	/// Bin-packing optimizer failure.
	#[error(transparent)]
	Solver(#[from] SolverError),
	/// Network failure that produced no HTTP status.
	#[error("Network error occurred while calling the upstream API.")]
	Transport {
		/// Underlying transport failure.
		#[from]
		source: ReqwestError,
	},
}

/// Validation failures raised before any quota or network activity.
#[derive(Debug, ThisError)]
pub enum ValidationError {
	/// Aspect filters are scoped to categories upstream.
	#[error("Aspect filters require at least one category id.")]
	AspectFilterWithoutCategories,
	/// A value that outgrows a bin can never be fetched exhaustively.
	#[error("Value `{label}` reports {count} results, which exceeds the bin capacity of {capacity}.")]
	ValueExceedsCapacity {
		/// Offending value label.
		label: String,
		/// Result count reported upstream.
		count: u64,
		/// Configured bin capacity.
		capacity: u64,
	},
	/// Requested aspect is absent from the refinement payload.
	#[error("Refinement payload does not contain the aspect `{aspect}`.")]
	UnknownAspect {
		/// Requested aspect name.
		aspect: String,
	},
	/// Refinement payload does not match the documented shape.
	#[error("Refinement payload is malformed.")]
	MalformedRefinement {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Endpoint override cannot carry additional path segments.
	#[error("Endpoint URL cannot be extended with path segments.")]
	OpaqueEndpoint,
}

/// Credential exchange failures raised by [`AuthSession`](crate::auth::AuthSession).
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// Token endpoint answered with a non-success status.
	#[error("Token endpoint rejected the exchange with status {status}: {body}.")]
	Rejected {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Raw response body, decoded lossily.
		body: String,
	},
	/// Token endpoint answered success with an undecodable grant.
	#[error("Token endpoint returned a malformed grant.")]
	MalformedGrant {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A live token is already cached; explicit re-authentication is refused.
	#[error("Session already holds a live token.")]
	AlreadyAuthenticated,
}

/// Upstream API failures raised by [`SearchClient`](crate::client::SearchClient).
#[derive(Debug, ThisError)]
pub enum ApiError {
	/// Upstream answered with a non-success status.
	#[error("The {endpoint} request failed with status {status}: {body}.")]
	Status {
		/// Logical endpoint name (`search` or `item`).
		endpoint: &'static str,
		/// HTTP status code returned upstream.
		status: u16,
		/// Raw response body, decoded lossily.
		body: String,
	},
	/// Upstream answered success with a body that is not JSON.
	#[error("The {endpoint} response body is not valid JSON.")]
	MalformedBody {
		/// Logical endpoint name (`search` or `item`).
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
}

/// Optimizer failures raised by [`QuotaPacker`](crate::pack::QuotaPacker).
#[derive(Debug, ThisError)]
pub enum SolverError {
	/// Distribution is too large for an exact solve.
	#[error("Distribution has {values} values, which exceeds the solve limit of {limit}.")]
	TooManyValues {
		/// Number of values in the distribution.
		values: usize,
		/// Largest distribution the exact solver accepts.
		limit: usize,
	},
	/// Solver terminated without an optimal assignment.
	#[error("Solver failed to produce an optimal packing: {reason}.")]
	Unsolved {
		/// Solver-supplied termination reason.
		reason: String,
	},
}
