//! crates/quickscan_core/src/classify.rs
//!
//! Tags a raw extraction failure as an authorization problem or a generic one.
//!
//! The provider exposes no structured error codes, so this is a substring
//! heuristic over the lower-cased message. False positives are accepted.

use std::error::Error;
use std::fmt::Debug;

use crate::domain::{FailureGuidance, ScanFailure};
use crate::ports::ExtractionError;

/// Lower-case substrings that mark a failure as an authorization problem.
pub const AUTH_FAILURE_MARKERS: [&str; 4] = ["403", "permission_denied", "api key", "fetch failed"];

/// Shown instead of the raw message when the provider rejects our credentials.
pub const AUTH_REMEDIATION_STEPS: &[&str] = &[
    "Go to Google Cloud Console > APIs & Services > Library.",
    "Type \"Generative Language\" in the search bar.",
    "Click the result and click the blue ENABLE button.",
    "Wait 1 minute, then go to Credentials.",
    "Create a New API Key.",
    "Update your .env file and restart the server.",
];

/// A failure as it arrived, before normalization.
pub enum RawFailure<'a> {
    /// A structured error; its display message is used.
    Error(&'a (dyn Error + 'a)),
    /// A bare message.
    Text(&'a str),
    /// Anything else; serialized through its `Debug` form.
    Opaque(&'a dyn Debug),
}

impl RawFailure<'_> {
    /// The display string for this failure.
    pub fn message(&self) -> String {
        match self {
            RawFailure::Error(err) => err.to_string(),
            RawFailure::Text(text) => (*text).to_string(),
            RawFailure::Opaque(value) => format!("{:?}", value),
        }
    }
}

impl<'a> From<&'a ExtractionError> for RawFailure<'a> {
    fn from(err: &'a ExtractionError) -> Self {
        RawFailure::Error(err)
    }
}

impl<'a> From<&'a str> for RawFailure<'a> {
    fn from(text: &'a str) -> Self {
        RawFailure::Text(text)
    }
}

/// Normalizes a raw failure and decides whether it is an authorization failure.
pub fn classify<'a>(raw: impl Into<RawFailure<'a>>) -> ScanFailure {
    let message = raw.into().message();
    let lowered = message.to_lowercase();
    let is_auth_failure = AUTH_FAILURE_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker));

    ScanFailure {
        message,
        is_auth_failure,
    }
}

impl ScanFailure {
    /// What the error view shows for this failure.
    pub fn guidance(&self) -> FailureGuidance<'_> {
        if self.is_auth_failure {
            FailureGuidance::Remediation(AUTH_REMEDIATION_STEPS)
        } else {
            FailureGuidance::Message(&self.message)
        }
    }
}
