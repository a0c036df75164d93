//! Adaptation of requests and responses to a client's capabilities
//!
//! Requests have their parameters clamped and simplified by
//! [`adapt_parameters`]. Responses go through [`format_response`]: the
//! client's output mode, then its escape strategy, then its size limit.
//! Errors are rendered by [`format_error`] at the client's verbosity tier.

pub mod escape;
pub mod format;
pub mod limit;
pub mod params;

pub use escape::escape_text;
pub use format::{error_kind, format_error, format_response, render, FormattedResponse};
pub use limit::{apply_size_limit, TRUNCATION_MARGIN, TRUNCATION_NOTICE};
pub use params::{
    adapt_parameters, limit_ceiling, DEFAULT_LIMIT_CEILING, LIMIT_FIELDS,
    LOW_COMPLEXITY_ALLOWLIST,
};
