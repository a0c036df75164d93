//! Tool/client compatibility
//!
//! [`is_compatible_with`] is the hard gate; [`compatibility_score`] ranks the
//! tools that pass it.

use super::ToolMetadata;
use crate::capability::Capabilities;

/// Tools scoring at or below this value are never listed
pub const MIN_LISTING_SCORE: f64 = 0.3;
/// Weight of one recorded call in the listing order
pub const USAGE_TIEBREAK_WEIGHT: f64 = 0.001;

const COMPLEXITY_MATCH: f64 = 0.2;
const COMPLEXITY_MISMATCH: f64 = -0.5;
const FEATURE_MATCH: f64 = 0.1;
const FEATURE_MISMATCH: f64 = -0.5;
const RATE_LIMIT_MATCH: f64 = 0.1;
const RATE_LIMIT_MISMATCH: f64 = -0.3;

/// Why a client cannot use a tool, if it cannot
pub fn incompatibility_reason(tool: &ToolMetadata, caps: &Capabilities) -> Option<String> {
    if caps.tool_complexity < tool.complexity {
        return Some(format!(
            "tool complexity '{}' exceeds client complexity '{}'",
            tool.complexity, caps.tool_complexity
        ));
    }
    if tool.requires_binary_content && !caps.supports_binary_content {
        return Some("requires binary content support".to_string());
    }
    if tool.requires_images && !caps.supports_images {
        return Some("requires image support".to_string());
    }
    if tool.requires_streaming && !caps.supports_streaming {
        return Some("requires streaming support".to_string());
    }
    None
}

/// Hard compatibility gate
///
/// False when the tool's complexity tier is above the client's, or when
/// the tool needs binary content, images or streaming and the client
/// lacks it.
pub fn is_compatible_with(tool: &ToolMetadata, caps: &Capabilities) -> bool {
    incompatibility_reason(tool, caps).is_none()
}

/// Requests per minute a client tolerates
fn requests_per_minute(caps: &Capabilities) -> f64 {
    if caps.rate_limit.window_ms == 0 {
        return 0.0;
    }
    f64::from(caps.rate_limit.requests) * 60_000.0 / caps.rate_limit.window_ms as f64
}

/// Compatibility score in `[0, 1]`
///
/// Starts from 1.0 and, for each applicable factor, adds a positive delta
/// on match or a larger negative delta on mismatch. The accumulated score
/// is divided by the number of applicable factors and clamped. Complexity
/// alignment always applies; the feature factors apply only when the tool
/// requires the feature, and rate-limit adequacy only when the tool
/// declares a requirement.
///
/// # Examples
///
/// ```
/// use clientfit::capability::{Capabilities, ToolComplexity};
/// use clientfit::tools::{compatibility_score, ToolMetadata};
///
/// let tool = ToolMetadata::new("accounts", ToolComplexity::Low);
/// assert_eq!(compatibility_score(&tool, &Capabilities::default()), 1.0);
/// ```
pub fn compatibility_score(tool: &ToolMetadata, caps: &Capabilities) -> f64 {
    let mut score = 1.0;
    let mut factors = 0u32;

    let mut factor = |matched: bool, gain: f64, loss: f64| {
        score += if matched { gain } else { loss };
        factors += 1;
    };

    factor(
        caps.tool_complexity >= tool.complexity,
        COMPLEXITY_MATCH,
        COMPLEXITY_MISMATCH,
    );
    if tool.requires_binary_content {
        factor(caps.supports_binary_content, FEATURE_MATCH, FEATURE_MISMATCH);
    }
    if tool.requires_images {
        factor(caps.supports_images, FEATURE_MATCH, FEATURE_MISMATCH);
    }
    if tool.requires_streaming {
        factor(caps.supports_streaming, FEATURE_MATCH, FEATURE_MISMATCH);
    }
    if let Some(required) = tool.rate_limit {
        factor(
            requests_per_minute(caps) >= f64::from(required),
            RATE_LIMIT_MATCH,
            RATE_LIMIT_MISMATCH,
        );
    }

    (score / f64::from(factors.max(1))).clamp(0.0, 1.0)
}
