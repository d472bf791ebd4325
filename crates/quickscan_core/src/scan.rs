//! crates/quickscan_core/src/scan.rs
//!
//! The scan session: drives Idle -> Analyzing -> {Success, Error} and owns the
//! extracted result, the classified failure and the image preview.
//!
//! An attempt is split in three so a UI can keep the session borrowed only
//! while it changes state:
//! `begin` (sync) -> `ScanAttempt::run` (suspends on the provider) -> `finish` (sync).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::classify::classify;
use crate::domain::{
    CapturedImage, CopyAcknowledgment, CopyField, ExtractedPayment, ScanFailure, ScanState,
};
use crate::ports::{ExtractionError, ExtractionService, PreviewStore, ScanObserver};

/// Why a session refused a scan step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("an extraction is already in flight")]
    Busy,
    #[error("scan attempt {0} is no longer current")]
    StaleAttempt(u64),
}

//=========================================================================================
// Preview Reference
//=========================================================================================

/// A local preview of the selected image. Revoked when dropped.
pub struct PreviewRef {
    url: String,
    store: Arc<dyn PreviewStore>,
}

impl PreviewRef {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewRef {
    fn drop(&mut self) {
        self.store.revoke_preview(&self.url);
    }
}

//=========================================================================================
// Attempts
//=========================================================================================

/// The in-flight half of one scan attempt. Holds no borrow of the session.
pub struct ScanAttempt {
    id: u64,
    image: CapturedImage,
    extractor: Arc<dyn ExtractionService>,
}

impl ScanAttempt {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Calls the extraction provider.
    pub async fn run(self) -> AttemptOutcome {
        let result = self
            .extractor
            .extract(&self.image.bytes, &self.image.mime_type)
            .await;
        AttemptOutcome {
            id: self.id,
            result,
        }
    }
}

/// The provider's answer for one attempt, ready to be applied to the session.
pub struct AttemptOutcome {
    id: u64,
    result: Result<ExtractedPayment, ExtractionError>,
}

//=========================================================================================
// Session
//=========================================================================================

enum Phase {
    Idle,
    Analyzing,
    Success(ExtractedPayment),
    Error(ScanFailure),
}

/// Comparable view of a session, ignoring preview identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSnapshot {
    pub state: ScanState,
    pub result: Option<ExtractedPayment>,
    pub failure: Option<ScanFailure>,
    pub has_preview: bool,
    pub copied: Option<CopyAcknowledgment>,
}

/// The single active scan workflow of one user.
pub struct ScanSession {
    phase: Phase,
    preview: Option<PreviewRef>,
    copied: Option<CopyAcknowledgment>,
    attempt: u64,
    extractor: Arc<dyn ExtractionService>,
    previews: Arc<dyn PreviewStore>,
    observer: Arc<dyn ScanObserver>,
}

impl ScanSession {
    pub fn new(
        extractor: Arc<dyn ExtractionService>,
        previews: Arc<dyn PreviewStore>,
        observer: Arc<dyn ScanObserver>,
    ) -> Self {
        Self {
            phase: Phase::Idle,
            preview: None,
            copied: None,
            attempt: 0,
            extractor,
            previews,
            observer,
        }
    }

    pub fn state(&self) -> ScanState {
        match self.phase {
            Phase::Idle => ScanState::Idle,
            Phase::Analyzing => ScanState::Analyzing,
            Phase::Success(_) => ScanState::Success,
            Phase::Error(_) => ScanState::Error,
        }
    }

    /// Present iff the session is in `Success`.
    pub fn result(&self) -> Option<&ExtractedPayment> {
        match &self.phase {
            Phase::Success(payment) => Some(payment),
            _ => None,
        }
    }

    /// Present iff the session is in `Error`.
    pub fn failure(&self) -> Option<&ScanFailure> {
        match &self.phase {
            Phase::Error(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.preview.as_ref().map(PreviewRef::url)
    }

    /// The field whose "copied" marker is still showing at `now`.
    pub fn copied_field(&self, now: DateTime<Utc>) -> Option<CopyField> {
        self.copied
            .filter(|ack| ack.is_active(now))
            .map(|ack| ack.field)
    }

    /// Records a successful copy for the view layer.
    pub fn acknowledge_copy(&mut self, ack: CopyAcknowledgment) {
        self.copied = Some(ack);
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            state: self.state(),
            result: self.result().cloned(),
            failure: self.failure().cloned(),
            has_preview: self.preview.is_some(),
            copied: self.copied,
        }
    }

    /// Accepts a newly selected image and enters `Analyzing`.
    ///
    /// A finished session is reset first. While an extraction is in flight
    /// the image is refused.
    pub fn begin(&mut self, image: CapturedImage) -> Result<ScanAttempt, ScanError> {
        match self.phase {
            Phase::Analyzing => {
                warn!("Image selected while an extraction is in flight; ignoring it.");
                return Err(ScanError::Busy);
            }
            Phase::Success(_) | Phase::Error(_) => self.reset(),
            Phase::Idle => {}
        }

        // Replacing the preview drops (and so revokes) the old one.
        self.preview = match self.previews.create_preview(&image) {
            Ok(url) => Some(PreviewRef {
                url,
                store: self.previews.clone(),
            }),
            Err(e) => {
                warn!("Could not create image preview: {}", e);
                None
            }
        };

        self.attempt += 1;
        self.transition(Phase::Analyzing);
        info!(
            attempt = self.attempt,
            mime_type = %image.mime_type,
            image_size = image.bytes.len(),
            "Analyzing receipt image."
        );

        Ok(ScanAttempt {
            id: self.attempt,
            image,
            extractor: self.extractor.clone(),
        })
    }

    /// Applies an attempt's outcome and returns the resulting state.
    ///
    /// Outcomes of attempts that were reset or superseded are discarded.
    pub fn finish(&mut self, outcome: AttemptOutcome) -> Result<ScanState, ScanError> {
        if outcome.id != self.attempt || !matches!(self.phase, Phase::Analyzing) {
            warn!(attempt = outcome.id, "Discarding outcome of a stale scan attempt.");
            return Err(ScanError::StaleAttempt(outcome.id));
        }

        match outcome.result {
            Ok(payment) => {
                info!(amount = payment.amount, "Extraction succeeded.");
                self.observer.on_scan_completed(&payment);
                self.transition(Phase::Success(payment));
            }
            Err(e) => {
                error!("Extraction failed: {}", e);
                let failure = classify(&e);
                self.transition(Phase::Error(failure));
            }
        }
        Ok(self.state())
    }

    /// Runs a whole attempt for callers that own the session exclusively.
    pub async fn select_image(&mut self, image: CapturedImage) -> Result<ScanState, ScanError> {
        let attempt = self.begin(image)?;
        let outcome = attempt.run().await;
        self.finish(outcome)
    }

    /// Returns to `Idle` from any state, dropping the result, the failure,
    /// the copy marker and the preview.
    pub fn reset(&mut self) {
        if matches!(self.phase, Phase::Analyzing) {
            // Orphans the in-flight attempt.
            self.attempt += 1;
        }
        self.preview = None;
        self.copied = None;
        if !matches!(self.phase, Phase::Idle) {
            self.transition(Phase::Idle);
        }
    }

    fn transition(&mut self, next: Phase) {
        let from = self.state();
        self.phase = next;
        self.observer.on_transition(from, self.state());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FailureGuidance;
    use crate::testing::{RecordingObserver, RecordingPreviews, ScriptedExtractor};
    use chrono::Duration;

    struct Harness {
        extractor: Arc<ScriptedExtractor>,
        previews: Arc<RecordingPreviews>,
        observer: Arc<RecordingObserver>,
        session: ScanSession,
    }

    fn harness(extractor: ScriptedExtractor) -> Harness {
        let extractor = Arc::new(extractor);
        let previews = Arc::new(RecordingPreviews::default());
        let observer = Arc::new(RecordingObserver::default());
        let session = ScanSession::new(extractor.clone(), previews.clone(), observer.clone());
        Harness {
            extractor,
            previews,
            observer,
            session,
        }
    }

    fn receipt() -> CapturedImage {
        CapturedImage::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg")
    }

    fn juan() -> ExtractedPayment {
        ExtractedPayment::new("Juan Dela Cruz", "09171234567", 500.0)
    }

    #[tokio::test]
    async fn successful_scan_reaches_success_once() {
        let mut h = harness(ScriptedExtractor::succeeding(juan()));

        let state = h.session.select_image(receipt()).await.unwrap();

        assert_eq!(state, ScanState::Success);
        assert_eq!(h.session.result(), Some(&juan()));
        assert_eq!(h.session.failure(), None);
        assert_eq!(
            h.observer.transitions(),
            vec![
                (ScanState::Idle, ScanState::Analyzing),
                (ScanState::Analyzing, ScanState::Success),
            ]
        );
        assert_eq!(h.observer.completed(), vec![juan()]);
        assert_eq!(h.extractor.calls(), vec![(4, "image/jpeg".to_string())]);
        assert!(h.session.preview_url().is_some());
    }

    #[tokio::test]
    async fn provider_failure_is_classified() {
        let mut h = harness(ScriptedExtractor::failing(ExtractionError::Provider {
            status: Some(403),
            message: "Request failed with status code 403".to_string(),
        }));

        let state = h.session.select_image(receipt()).await.unwrap();

        assert_eq!(state, ScanState::Error);
        let failure = h.session.failure().unwrap();
        assert_eq!(failure.message, "Request failed with status code 403");
        assert!(failure.is_auth_failure);
        assert!(matches!(failure.guidance(), FailureGuidance::Remediation(_)));
        assert_eq!(h.session.result(), None);
        assert!(h.observer.completed().is_empty());
    }

    #[tokio::test]
    async fn generic_failure_keeps_raw_message() {
        let mut h = harness(ScriptedExtractor::failing(ExtractionError::Transport(
            "network timeout".to_string(),
        )));

        h.session.select_image(receipt()).await.unwrap();

        assert_eq!(
            h.session.failure(),
            Some(&ScanFailure {
                message: "network timeout".to_string(),
                is_auth_failure: false,
            })
        );
    }

    #[tokio::test]
    async fn reset_from_success_matches_a_fresh_session() {
        let mut h = harness(ScriptedExtractor::succeeding(juan()));
        let fresh = h.session.snapshot();

        h.session.select_image(receipt()).await.unwrap();
        h.session.acknowledge_copy(CopyAcknowledgment::new(
            CopyField::Phone,
            Utc::now(),
            Duration::seconds(2),
        ));
        h.session.reset();

        assert_eq!(h.session.snapshot(), fresh);
        assert_eq!(h.previews.revoked(), h.previews.created());
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let mut h = harness(ScriptedExtractor::failing(ExtractionError::NoData));
        h.session.select_image(receipt()).await.unwrap();

        h.session.reset();
        let once = h.session.snapshot();
        let transitions = h.observer.transitions().len();
        h.session.reset();

        assert_eq!(h.session.snapshot(), once);
        assert_eq!(h.observer.transitions().len(), transitions);
        assert_eq!(h.previews.revoked().len(), 1);
    }

    #[tokio::test]
    async fn new_image_replaces_and_revokes_previous_preview() {
        let mut h = harness(ScriptedExtractor::succeeding(juan()));

        h.session.select_image(receipt()).await.unwrap();
        let first = h.session.preview_url().unwrap().to_string();
        h.session.select_image(receipt()).await.unwrap();

        assert_eq!(h.previews.revoked(), vec![first]);
        assert_eq!(h.previews.created().len(), 2);
        assert_eq!(
            h.observer.transitions()[2..],
            [
                (ScanState::Success, ScanState::Idle),
                (ScanState::Idle, ScanState::Analyzing),
                (ScanState::Analyzing, ScanState::Success),
            ]
        );
    }

    #[tokio::test]
    async fn second_image_is_refused_while_analyzing() {
        let mut h = harness(ScriptedExtractor::succeeding(juan()));

        let attempt = h.session.begin(receipt()).unwrap();
        assert_eq!(h.session.state(), ScanState::Analyzing);
        assert_eq!(h.session.begin(receipt()).err(), Some(ScanError::Busy));

        let outcome = attempt.run().await;
        assert_eq!(h.session.finish(outcome), Ok(ScanState::Success));
        assert_eq!(h.extractor.calls().len(), 1);
    }

    #[tokio::test]
    async fn outcome_after_reset_is_discarded() {
        let mut h = harness(ScriptedExtractor::succeeding(juan()));

        let attempt = h.session.begin(receipt()).unwrap();
        let id = attempt.id();
        h.session.reset();
        let outcome = attempt.run().await;

        assert_eq!(h.session.finish(outcome), Err(ScanError::StaleAttempt(id)));
        assert_eq!(h.session.state(), ScanState::Idle);
        assert!(h.observer.completed().is_empty());
    }

    #[test]
    fn copy_marker_expires() {
        let mut h = harness(ScriptedExtractor::succeeding(juan()));
        let now = Utc::now();
        h.session.acknowledge_copy(CopyAcknowledgment::new(
            CopyField::Amount,
            now,
            Duration::seconds(2),
        ));

        assert_eq!(h.session.copied_field(now), Some(CopyField::Amount));
        assert_eq!(h.session.copied_field(now + Duration::seconds(3)), None);
    }
}
