//! crates/quickscan_core/src/copy.rs
//!
//! The two clipboard-write techniques and the field-copy policy built on them.
//!
//! The handoff sequencer picks a technique itself; the helpers here never
//! decide anything about navigation.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::domain::{CopyAcknowledgment, CopyField, ExtractedPayment};
use crate::ports::{ContainerId, Platform, PortError, PortResult};

/// How long a field's "copied" marker stays visible.
pub fn field_ack_ttl() -> Duration {
    Duration::seconds(2)
}

/// Which technique put the text on the clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyTechnique {
    /// Awaited asynchronous clipboard write.
    Async,
    /// Off-screen container plus the legacy copy command.
    Sync,
}

//=========================================================================================
// Techniques
//=========================================================================================

/// Copies `text` without suspending.
///
/// Builds an off-screen editable container, attaches it, selects its whole
/// text, runs the legacy copy command and removes the container again. Any
/// failure along the way yields `false`; the container is always removed once
/// it exists.
pub fn copy_sync(platform: &dyn Platform, text: &str) -> bool {
    let container = match platform.create_copy_container(text) {
        Ok(container) => container,
        Err(e) => {
            warn!("Sync copy failed: could not create container: {}", e);
            return false;
        }
    };

    let result = select_and_copy(platform, container);
    platform.remove_container(container);

    match result {
        Ok(copied) => {
            debug!(copied, "Sync copy finished.");
            copied
        }
        Err(e) => {
            warn!("Sync copy failed: {}", e);
            false
        }
    }
}

fn select_and_copy(platform: &dyn Platform, container: ContainerId) -> PortResult<bool> {
    platform.attach_container(container)?;
    platform.select_container_text(container)?;
    platform.exec_copy_command()
}

/// Copies `text` through the asynchronous clipboard and waits for settlement.
pub async fn copy_async(platform: &dyn Platform, text: &str) -> PortResult<()> {
    if !platform.has_async_clipboard() {
        return Err(PortError::Unexpected(
            "asynchronous clipboard is not available".to_string(),
        ));
    }
    platform.write_clipboard(text).await
}

//=========================================================================================
// Field Copy Policy
//=========================================================================================

/// Copies `text` when no navigation has to follow.
///
/// Prefers the asynchronous technique when exposed and falls back once to the
/// synchronous one. Returns the technique that succeeded.
pub async fn copy_text(platform: &dyn Platform, text: &str) -> Option<CopyTechnique> {
    if platform.has_async_clipboard() {
        match copy_async(platform, text).await {
            Ok(()) => return Some(CopyTechnique::Async),
            Err(e) => warn!("Async copy failed, falling back to sync copy: {}", e),
        }
    }

    if copy_sync(platform, text) {
        Some(CopyTechnique::Sync)
    } else {
        warn!("Could not copy automatically.");
        None
    }
}

/// Copies one field of a payment and returns the acknowledgment to display.
///
/// `None` means both techniques failed and nothing should be marked as copied.
pub async fn copy_field(
    platform: &dyn Platform,
    field: CopyField,
    payment: &ExtractedPayment,
    now: DateTime<Utc>,
) -> Option<CopyAcknowledgment> {
    let text = field.clipboard_text(payment);
    copy_text(platform, &text)
        .await
        .map(|_| CopyAcknowledgment::new(field, now, field_ack_ttl()))
}
