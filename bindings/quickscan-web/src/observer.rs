//! bindings/quickscan-web/src/observer.rs
//!
//! Saves completed scans to the history in the background.

use std::sync::Arc;

use quickscan_core::domain::{ExtractedPayment, ScanState};
use quickscan_core::ports::{PortFuture, ScanObserver, ScanRecorder};
use tracing::{debug, error, info};

/// Runs a detached task. In the browser this is `spawn_local`.
pub type Spawner = Arc<dyn Fn(PortFuture<'static, ()>) + Send + Sync>;

/// A `ScanObserver` that records every successful scan.
///
/// Recording never delays the session; failures are only logged.
pub struct PersistingObserver {
    recorder: Arc<dyn ScanRecorder>,
    spawn: Spawner,
}

impl PersistingObserver {
    pub fn new(recorder: Arc<dyn ScanRecorder>, spawn: Spawner) -> Self {
        Self { recorder, spawn }
    }
}

impl ScanObserver for PersistingObserver {
    fn on_transition(&self, from: ScanState, to: ScanState) {
        debug!(?from, ?to, "Scan state changed.");
    }

    fn on_scan_completed(&self, payment: &ExtractedPayment) {
        let recorder = self.recorder.clone();
        let payment = payment.clone();
        (self.spawn)(Box::pin(async move {
            match recorder.record_scan(&payment).await {
                Ok(id) => info!(id, "Scan saved to history."),
                Err(e) => error!("Error saving scan: {}", e),
            }
        }));
    }
}
