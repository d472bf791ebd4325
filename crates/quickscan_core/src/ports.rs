//! crates/quickscan_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the scan workflow engine.
//! These traits form the boundary of the hexagonal architecture: the engine never
//! touches the network, the database, the clipboard or the browser location
//! directly, so every collaborator can be replaced by a test double.

use async_trait::async_trait;

use crate::domain::{CapturedImage, ExtractedPayment, ScanState, StoredScan};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The extraction provider failed or answered with something unusable.
///
/// Messages are carried unchanged; classification happens in `classify`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    #[error("no data returned")]
    NoData,
    #[error("{message}")]
    Provider { status: Option<u16>, message: String },
    #[error("{0}")]
    Transport(String),
    #[error("malformed extraction result: {0}")]
    Malformed(String),
}

/// Futures handed out by the platform. Browser futures are not `Send`.
#[cfg(not(target_arch = "wasm32"))]
pub type PortFuture<'a, T> = futures::future::BoxFuture<'a, T>;
#[cfg(target_arch = "wasm32")]
pub type PortFuture<'a, T> = futures::future::LocalBoxFuture<'a, T>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ExtractionService: Send + Sync {
    /// Turns a receipt image into structured payment fields.
    async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<ExtractedPayment, ExtractionError>;
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ScanRecorder: Send + Sync {
    /// Stores a completed scan and returns its id.
    async fn record_scan(&self, payment: &ExtractedPayment) -> PortResult<i64>;

    /// Lists stored scans, newest first.
    async fn list_scans(&self) -> PortResult<Vec<StoredScan>>;
}

/// Receives notifications from a `ScanSession`. The session never waits on it.
pub trait ScanObserver: Send + Sync {
    fn on_transition(&self, _from: ScanState, _to: ScanState) {}

    fn on_scan_completed(&self, _payment: &ExtractedPayment) {}
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}

/// Creates and revokes local preview references (object URLs in a browser).
pub trait PreviewStore: Send + Sync {
    fn create_preview(&self, image: &CapturedImage) -> PortResult<String>;

    fn revoke_preview(&self, preview_url: &str);
}

//=========================================================================================
// Platform Capabilities
//=========================================================================================

/// How a runtime attributes user activation once asynchronous work intervenes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeFamily {
    /// Any suspension before navigation may cost the gesture (iOS browsers).
    GestureFragile,
    /// One awaited clipboard write before navigation is tolerated (Android browsers).
    GestureTolerant,
}

/// Handle to an off-screen text container created for the synchronous copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(pub u32);

/// Clipboard, document and navigation access for the handoff.
///
/// Everything except `write_clipboard`'s returned future is non-suspending.
pub trait Platform: Send + Sync {
    fn runtime_family(&self) -> RuntimeFamily;

    /// Whether the asynchronous clipboard API is exposed (secure contexts only).
    fn has_async_clipboard(&self) -> bool;

    /// Starts an asynchronous clipboard write. The write is issued before this
    /// returns; the future only reports its settlement.
    fn write_clipboard(&self, text: &str) -> PortFuture<'static, PortResult<()>>;

    /// Builds an off-screen, focusable, editable text container holding `text`.
    fn create_copy_container(&self, text: &str) -> PortResult<ContainerId>;

    fn attach_container(&self, container: ContainerId) -> PortResult<()>;

    /// Selects the full text range of the container.
    fn select_container_text(&self, container: ContainerId) -> PortResult<()>;

    /// Runs the legacy synchronous copy command on the current selection.
    fn exec_copy_command(&self) -> PortResult<bool>;

    fn remove_container(&self, container: ContainerId);

    /// Points the top-level browsing context at `url`. Outcome is unobservable.
    fn navigate(&self, url: &str);
}
