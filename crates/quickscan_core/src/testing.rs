//! crates/quickscan_core/src/testing.rs
//!
//! Recording test doubles for the engine's ports.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::channel::oneshot;

use crate::domain::{CapturedImage, ExtractedPayment, ScanState};
use crate::ports::{
    ContainerId, ExtractionError, ExtractionService, Platform, PortError, PortFuture, PortResult,
    PreviewStore, RuntimeFamily, ScanObserver,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformEvent {
    AsyncWriteStarted(String),
    AsyncWriteSettled(bool),
    ContainerCreated(String),
    ContainerAttached,
    ContainerSelected,
    ExecCopy(bool),
    ContainerRemoved,
    Navigated(String),
}

#[derive(Clone, Copy)]
enum ExecMode {
    Succeed,
    ReturnFalse,
    Error,
}

struct PlatformInner {
    events: Vec<PlatformEvent>,
    clipboard: Option<String>,
    async_available: bool,
    async_fails: bool,
    exec: ExecMode,
    gated: bool,
    pending_write: Option<oneshot::Sender<()>>,
    containers: HashMap<u32, String>,
    selected: Option<u32>,
    next_container: u32,
}

/// Records every platform call in order and simulates the clipboard.
pub struct RecordingPlatform {
    family: RuntimeFamily,
    inner: Arc<Mutex<PlatformInner>>,
}

impl RecordingPlatform {
    pub fn new(family: RuntimeFamily) -> Self {
        Self {
            family,
            inner: Arc::new(Mutex::new(PlatformInner {
                events: Vec::new(),
                clipboard: None,
                async_available: true,
                async_fails: false,
                exec: ExecMode::Succeed,
                gated: false,
                pending_write: None,
                containers: HashMap::new(),
                selected: None,
                next_container: 1,
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut PlatformInner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner)
    }

    pub fn events(&self) -> Vec<PlatformEvent> {
        self.with(|i| i.events.clone())
    }

    pub fn clipboard(&self) -> Option<String> {
        self.with(|i| i.clipboard.clone())
    }

    pub fn disable_async_clipboard(&self) {
        self.with(|i| i.async_available = false);
    }

    pub fn fail_async_writes(&self) {
        self.with(|i| i.async_fails = true);
    }

    pub fn fail_exec(&self) {
        self.with(|i| i.exec = ExecMode::ReturnFalse);
    }

    pub fn fail_exec_with_error(&self) {
        self.with(|i| i.exec = ExecMode::Error);
    }

    /// Holds asynchronous writes until `release_write` is called.
    pub fn gate_async_writes(&self) {
        self.with(|i| i.gated = true);
    }

    pub fn release_write(&self) {
        if let Some(tx) = self.with(|i| i.pending_write.take()) {
            let _ = tx.send(());
        }
    }
}

impl Platform for RecordingPlatform {
    fn runtime_family(&self) -> RuntimeFamily {
        self.family
    }

    fn has_async_clipboard(&self) -> bool {
        self.with(|i| i.async_available)
    }

    fn write_clipboard(&self, text: &str) -> PortFuture<'static, PortResult<()>> {
        let text = text.to_string();
        let (fails, gate) = self.with(|i| {
            i.events.push(PlatformEvent::AsyncWriteStarted(text.clone()));
            let gate = if i.gated {
                let (tx, rx) = oneshot::channel();
                i.pending_write = Some(tx);
                Some(rx)
            } else {
                None
            };
            (i.async_fails, gate)
        });
        let inner = self.inner.clone();

        Box::pin(async move {
            if let Some(rx) = gate {
                let _ = rx.await;
            }
            let mut i = inner.lock().unwrap();
            i.events.push(PlatformEvent::AsyncWriteSettled(!fails));
            if fails {
                Err(PortError::Unexpected("clipboard write rejected".to_string()))
            } else {
                i.clipboard = Some(text);
                Ok(())
            }
        })
    }

    fn create_copy_container(&self, text: &str) -> PortResult<ContainerId> {
        Ok(self.with(|i| {
            let id = i.next_container;
            i.next_container += 1;
            i.containers.insert(id, text.to_string());
            i.events.push(PlatformEvent::ContainerCreated(text.to_string()));
            ContainerId(id)
        }))
    }

    fn attach_container(&self, _container: ContainerId) -> PortResult<()> {
        self.with(|i| i.events.push(PlatformEvent::ContainerAttached));
        Ok(())
    }

    fn select_container_text(&self, container: ContainerId) -> PortResult<()> {
        self.with(|i| {
            i.selected = Some(container.0);
            i.events.push(PlatformEvent::ContainerSelected);
        });
        Ok(())
    }

    fn exec_copy_command(&self) -> PortResult<bool> {
        self.with(|i| match i.exec {
            ExecMode::Succeed => {
                let selected = i.selected.and_then(|id| i.containers.get(&id).cloned());
                let copied = selected.is_some();
                if copied {
                    i.clipboard = selected;
                }
                i.events.push(PlatformEvent::ExecCopy(copied));
                Ok(copied)
            }
            ExecMode::ReturnFalse => {
                i.events.push(PlatformEvent::ExecCopy(false));
                Ok(false)
            }
            ExecMode::Error => Err(PortError::Unexpected("execCommand threw".to_string())),
        })
    }

    fn remove_container(&self, container: ContainerId) {
        self.with(|i| {
            i.containers.remove(&container.0);
            if i.selected == Some(container.0) {
                i.selected = None;
            }
            i.events.push(PlatformEvent::ContainerRemoved);
        });
    }

    fn navigate(&self, url: &str) {
        self.with(|i| i.events.push(PlatformEvent::Navigated(url.to_string())));
    }
}

/// Answers every extraction with a scripted result and counts the calls.
pub struct ScriptedExtractor {
    result: Result<ExtractedPayment, ExtractionError>,
    calls: Mutex<Vec<(usize, String)>>,
}

impl ScriptedExtractor {
    pub fn succeeding(payment: ExtractedPayment) -> Self {
        Self {
            result: Ok(payment),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ExtractionError) -> Self {
        Self {
            result: Err(error),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(image length, mime type)` of every call.
    pub fn calls(&self) -> Vec<(usize, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionService for ScriptedExtractor {
    async fn extract(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<ExtractedPayment, ExtractionError> {
        self.calls
            .lock()
            .unwrap()
            .push((image.len(), mime_type.to_string()));
        self.result.clone()
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    transitions: Mutex<Vec<(ScanState, ScanState)>>,
    completed: Mutex<Vec<ExtractedPayment>>,
}

impl RecordingObserver {
    pub fn transitions(&self) -> Vec<(ScanState, ScanState)> {
        self.transitions.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Vec<ExtractedPayment> {
        self.completed.lock().unwrap().clone()
    }
}

impl ScanObserver for RecordingObserver {
    fn on_transition(&self, from: ScanState, to: ScanState) {
        self.transitions.lock().unwrap().push((from, to));
    }

    fn on_scan_completed(&self, payment: &ExtractedPayment) {
        self.completed.lock().unwrap().push(payment.clone());
    }
}

#[derive(Default)]
pub struct RecordingPreviews {
    created: Mutex<Vec<String>>,
    revoked: Mutex<Vec<String>>,
}

impl RecordingPreviews {
    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn revoked(&self) -> Vec<String> {
        self.revoked.lock().unwrap().clone()
    }
}

impl PreviewStore for RecordingPreviews {
    fn create_preview(&self, image: &CapturedImage) -> PortResult<String> {
        let mut created = self.created.lock().unwrap();
        let url = format!("blob:preview/{}/{}", created.len() + 1, image.mime_type);
        created.push(url.clone());
        Ok(url)
    }

    fn revoke_preview(&self, preview_url: &str) {
        self.revoked.lock().unwrap().push(preview_url.to_string());
    }
}
