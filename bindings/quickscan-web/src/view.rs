//! bindings/quickscan-web/src/view.rs
//!
//! Plain view models handed to JavaScript. Field names are camelCase.

use quickscan_core::domain::{
    CopyField, ExtractedPayment, FailureGuidance, ScanFailure, ScanState, StoredScan,
};
use serde::Serialize;

pub fn state_label(state: ScanState) -> &'static str {
    match state {
        ScanState::Idle => "IDLE",
        ScanState::Analyzing => "ANALYZING",
        ScanState::Success => "SUCCESS",
        ScanState::Error => "ERROR",
    }
}

/// Maps the keys the page uses for its copy buttons.
pub fn parse_copy_field(key: &str) -> Option<CopyField> {
    match key {
        "phone" => Some(CopyField::Phone),
        "amount" => Some(CopyField::Amount),
        "name" => Some(CopyField::Name),
        "all" => Some(CopyField::Summary),
        "gcash" => Some(CopyField::PaymentApp),
        _ => None,
    }
}

pub fn copy_field_key(field: CopyField) -> &'static str {
    match field {
        CopyField::Phone => "phone",
        CopyField::Amount => "amount",
        CopyField::Name => "name",
        CopyField::Summary => "all",
        CopyField::PaymentApp => "gcash",
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub name: String,
    pub phone_number: String,
    pub amount: f64,
}

impl From<&ExtractedPayment> for PaymentView {
    fn from(payment: &ExtractedPayment) -> Self {
        Self {
            name: payment.name.clone(),
            phone_number: payment.phone_number.clone(),
            amount: payment.amount,
        }
    }
}

/// One row of the scan history.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanEntryView {
    pub id: i64,
    pub name: String,
    pub phone_number: String,
    pub amount: f64,
    /// RFC 3339, UTC.
    pub timestamp: String,
}

impl From<&StoredScan> for ScanEntryView {
    fn from(scan: &StoredScan) -> Self {
        Self {
            id: scan.id,
            name: scan.payment.name.clone(),
            phone_number: scan.payment.phone_number.clone(),
            amount: scan.payment.amount,
            timestamp: scan.recorded_at.to_rfc3339(),
        }
    }
}

/// An error as the page renders it: either remediation steps or the raw message.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailureView {
    pub message: String,
    pub is_auth_failure: bool,
    pub remediation: Option<Vec<&'static str>>,
}

impl From<&ScanFailure> for FailureView {
    fn from(failure: &ScanFailure) -> Self {
        let remediation = match failure.guidance() {
            FailureGuidance::Remediation(steps) => Some(steps.to_vec()),
            FailureGuidance::Message(_) => None,
        };
        Self {
            message: failure.message.clone(),
            is_auth_failure: failure.is_auth_failure,
            remediation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickscan_core::classify;

    #[test]
    fn copy_keys_map_both_ways() {
        for key in ["phone", "amount", "name", "all", "gcash"] {
            let field = parse_copy_field(key).unwrap();
            assert_eq!(copy_field_key(field), key);
        }
        assert_eq!(parse_copy_field("email"), None);
    }

    #[test]
    fn auth_failure_view_carries_remediation() {
        let view = FailureView::from(&classify("PERMISSION_DENIED: API key not valid"));
        assert!(view.is_auth_failure);
        assert!(!view.remediation.unwrap().is_empty());
    }

    #[test]
    fn generic_failure_view_has_only_the_message() {
        let view = FailureView::from(&classify("network timeout"));
        assert_eq!(
            view,
            FailureView {
                message: "network timeout".to_string(),
                is_auth_failure: false,
                remediation: None,
            }
        );
    }

    #[test]
    fn payment_view_serializes_camel_case() {
        let view = PaymentView::from(&ExtractedPayment::new("Juan", "09171234567", 500.0));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["phoneNumber"], "09171234567");
        assert_eq!(state_label(ScanState::Analyzing), "ANALYZING");
    }

    #[test]
    fn history_entry_has_utc_timestamp() {
        use chrono::TimeZone;
        let scan = StoredScan {
            id: 3,
            payment: ExtractedPayment::new("Ana", "09998887777", 75.25),
            recorded_at: chrono::Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
        };
        let view = ScanEntryView::from(&scan);
        assert_eq!(view.timestamp, "2024-06-01T10:00:00+00:00");
        assert_eq!(view.phone_number, "09998887777");
    }
}
