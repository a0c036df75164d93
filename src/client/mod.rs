//! Client profiles and detection
//!
//! This module contains the static profile table and the detector that
//! resolves one [`ClientContext`] per session from connection metadata.

pub mod detector;
pub mod profile;

pub use detector::{ClientContext, ClientDetector, ConnectionMetadata, DetectionMethod};
pub use profile::{
    CapabilitySignature, ClientProfile, ProfileTable, SignatureCheck, GENERIC_PROFILE_ID,
};
