//! services/api/src/web/protocol.rs
//!
//! Defines the JSON bodies exchanged between the browser client and the API server.
//! Field names are camelCase on the wire.

use chrono::{DateTime, Utc};
use quickscan_core::domain::{ExtractedPayment, StoredScan};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

//=========================================================================================
// Bodies Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// A receipt image to read.
#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    /// Image bytes, base64 encoded, without a `data:` prefix.
    pub base64_image: String,
    pub mime_type: String,
}

/// A completed scan to remember.
#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveScanRequest {
    pub phone_number: String,
    pub amount: f64,
    pub name: String,
}

impl SaveScanRequest {
    pub fn into_domain(self) -> ExtractedPayment {
        ExtractedPayment {
            name: self.name,
            phone_number: self.phone_number,
            amount: self.amount,
        }
    }
}

//=========================================================================================
// Bodies Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// The structured payment fields read from a receipt.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedPaymentBody {
    pub name: String,
    pub phone_number: String,
    pub amount: f64,
}

impl From<ExtractedPayment> for ExtractedPaymentBody {
    fn from(payment: ExtractedPayment) -> Self {
        Self {
            name: payment.name,
            phone_number: payment.phone_number,
            amount: payment.amount,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct SaveScanResponse {
    pub id: i64,
}

/// One row of the scan history.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanEntry {
    pub id: i64,
    pub phone_number: String,
    pub amount: f64,
    pub name: String,
    pub timestamp: DateTime<Utc>,
}

impl From<StoredScan> for ScanEntry {
    fn from(scan: StoredScan) -> Self {
        Self {
            id: scan.id,
            phone_number: scan.payment.phone_number,
            amount: scan.payment.amount,
            name: scan.payment.name,
            timestamp: scan.recorded_at,
        }
    }
}

/// Reports a failure to the client, which shows or classifies `error`.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}
