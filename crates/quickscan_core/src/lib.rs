pub mod classify;
pub mod copy;
pub mod domain;
pub mod handoff;
pub mod ports;
pub mod scan;

#[cfg(test)]
mod testing;

pub use classify::{classify, RawFailure};
pub use copy::{copy_async, copy_field, copy_sync, copy_text, CopyTechnique};
pub use domain::{
    CapturedImage, CopyAcknowledgment, CopyField, ExtractedPayment, FailureGuidance, ScanFailure,
    ScanState, StoredScan,
};
pub use handoff::{Handoff, HandoffPlan, HandoffReport, HandoffSequencer, FALLBACK_LINK, PAYMENT_APP_URL};
pub use ports::{
    ExtractionError, ExtractionService, Platform, PortError, PortResult, PreviewStore,
    RuntimeFamily, ScanObserver, ScanRecorder,
};
pub use scan::{ScanAttempt, ScanError, ScanSession};
