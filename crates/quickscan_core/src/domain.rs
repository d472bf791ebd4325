//! crates/quickscan_core/src/domain.rs
//!
//! Defines the pure, core data structures of the scan workflow.
//! These structs are independent of any transport, database or browser API.

use chrono::{DateTime, Duration, Utc};

/// Placeholder the extraction provider uses when a receipt carries no name.
pub const UNKNOWN_NAME: &str = "Unknown";

/// The structured result of one receipt scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPayment {
    pub name: String,
    /// Digits only, local format (`09…`).
    pub phone_number: String,
    /// Non-negative; `0` when the receipt shows no amount.
    pub amount: f64,
}

impl ExtractedPayment {
    pub fn new(name: impl Into<String>, phone_number: impl Into<String>, amount: f64) -> Self {
        Self {
            name: name.into(),
            phone_number: phone_number.into(),
            amount,
        }
    }

    /// The newline-joined block placed on the clipboard by "Copy All".
    pub fn summary(&self) -> String {
        format!(
            "Name: {}\nPhone: {}\nAmount: {}",
            self.name, self.phone_number, self.amount
        )
    }
}

/// A scan that the persistence collaborator has stored.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredScan {
    pub id: i64,
    pub payment: ExtractedPayment,
    pub recorded_at: DateTime<Utc>,
}

/// An image picked by the user, already read into memory.
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl CapturedImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

//=========================================================================================
// Scan Lifecycle
//=========================================================================================

/// The user-visible lifecycle of a scan session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanState {
    Idle,
    Analyzing,
    Success,
    Error,
}

/// A classified extraction failure, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub message: String,
    pub is_auth_failure: bool,
}

/// What the error view should render for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureGuidance<'a> {
    /// Fixed step-by-step remediation for authorization problems.
    Remediation(&'static [&'static str]),
    /// The provider's message, verbatim.
    Message(&'a str),
}

//=========================================================================================
// Copy Acknowledgment
//=========================================================================================

/// The UI affordance that triggered a clipboard write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CopyField {
    Phone,
    Amount,
    Name,
    Summary,
    /// The "copy number and open the payment app" action.
    PaymentApp,
}

impl CopyField {
    /// The exact text this affordance places on the clipboard.
    pub fn clipboard_text(self, payment: &ExtractedPayment) -> String {
        match self {
            CopyField::Phone | CopyField::PaymentApp => payment.phone_number.clone(),
            CopyField::Amount => payment.amount.to_string(),
            CopyField::Name => payment.name.clone(),
            CopyField::Summary => payment.summary(),
        }
    }
}

/// Transient "copied" marker for the view layer. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyAcknowledgment {
    pub field: CopyField,
    pub expires_at: DateTime<Utc>,
}

impl CopyAcknowledgment {
    pub fn new(field: CopyField, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            field,
            expires_at: now + ttl,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
