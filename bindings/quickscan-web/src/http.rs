//! bindings/quickscan-web/src/http.rs
//!
//! HTTP clients for the QuickScan backend. They implement the core's
//! `ExtractionService` and `ScanRecorder` ports so the browser session talks to
//! the server exactly as the tests talk to their doubles.

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use quickscan_core::domain::{ExtractedPayment, StoredScan};
use quickscan_core::ports::{ExtractionError, ExtractionService, PortError, PortResult, ScanRecorder};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

//=========================================================================================
// Wire Bodies
//=========================================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExtractRequestBody {
    base64_image: String,
    mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentBody {
    name: String,
    phone_number: String,
    amount: f64,
}

impl From<PaymentBody> for ExtractedPayment {
    fn from(body: PaymentBody) -> Self {
        ExtractedPayment {
            name: body.name,
            phone_number: body.phone_number,
            amount: body.amount,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SaveScanResponseBody {
    id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanEntryBody {
    id: i64,
    phone_number: String,
    amount: f64,
    name: String,
    timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

//=========================================================================================
// Extraction Client
//=========================================================================================

/// Sends receipt images to `POST /api/extract`.
#[derive(Clone)]
pub struct RemoteExtractionClient {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteExtractionClient {
    /// `base_url` is the server origin, e.g. `http://localhost:3001`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ExtractionService for RemoteExtractionClient {
    async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<ExtractedPayment, ExtractionError> {
        let body = ExtractRequestBody {
            base64_image: base64::engine::general_purpose::STANDARD.encode(image),
            mime_type: mime_type.to_string(),
        };

        let response = self
            .client
            .post(endpoint(&self.base_url, "/api/extract"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        debug!(status, "Extraction response received.");
        decode_extraction(status, &text)
    }
}

/// Turns an `/api/extract` response into a payment or an extraction error.
///
/// Non-2xx responses keep their status in the message so the classifier can
/// see it, followed by the server's `error` text when there is one. A 2xx body
/// that is empty or does not hold the three fields is "no data returned".
pub fn decode_extraction(status: u16, body: &str) -> Result<ExtractedPayment, ExtractionError> {
    if !(200..300).contains(&status) {
        let mut message = format!("HTTP error! status: {}", status);
        if let Some(detail) = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .map(|b| b.error)
            .filter(|e| !e.trim().is_empty())
        {
            message.push_str(": ");
            message.push_str(&detail);
        }
        return Err(ExtractionError::Provider {
            status: Some(status),
            message,
        });
    }

    if body.trim().is_empty() {
        return Err(ExtractionError::NoData);
    }
    match serde_json::from_str::<Option<PaymentBody>>(body) {
        Ok(payload) => payload.map(ExtractedPayment::from).ok_or(ExtractionError::NoData),
        Err(e) => {
            warn!("Unusable extraction response body: {}", e);
            Err(ExtractionError::NoData)
        }
    }
}

//=========================================================================================
// Scan History Client
//=========================================================================================

/// Reads and writes the scan history through `/api/scans`.
#[derive(Clone)]
pub struct RemoteScanRecorder {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteScanRecorder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ScanRecorder for RemoteScanRecorder {
    async fn record_scan(&self, payment: &ExtractedPayment) -> PortResult<i64> {
        let body = PaymentBody {
            name: payment.name.clone(),
            phone_number: payment.phone_number.clone(),
            amount: payment.amount,
        };
        let response = self
            .client
            .post(endpoint(&self.base_url, "/api/scans"))
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let saved: SaveScanResponseBody = decode_body(status, &text)?;
        Ok(saved.id)
    }

    async fn list_scans(&self) -> PortResult<Vec<StoredScan>> {
        let response = self
            .client
            .get(endpoint(&self.base_url, "/api/scans"))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let entries: Vec<ScanEntryBody> = decode_body(status, &text)?;
        Ok(entries.into_iter().map(ScanEntryBody::into_domain).collect())
    }
}

impl ScanEntryBody {
    fn into_domain(self) -> StoredScan {
        StoredScan {
            id: self.id,
            payment: ExtractedPayment {
                name: self.name,
                phone_number: self.phone_number,
                amount: self.amount,
            },
            recorded_at: self.timestamp,
        }
    }
}

fn decode_body<T: serde::de::DeserializeOwned>(status: u16, body: &str) -> PortResult<T> {
    if !(200..300).contains(&status) {
        error!(status, "Scan history request failed.");
        let detail = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| format!("HTTP error! status: {}", status));
        return Err(PortError::Unexpected(detail));
    }
    serde_json::from_str(body).map_err(|e| PortError::Unexpected(e.to_string()))
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
