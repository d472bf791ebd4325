//! bindings/quickscan-web/src/controller.rs
//!
//! The JavaScript entry point. One `ScanController` backs one page.
//!
//! Every tap handler must call straight into a method here. Methods that start
//! clipboard or navigation work do it before returning their promise.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use chrono::Utc;
use js_sys::Promise;
use quickscan_core::copy::copy_field;
use quickscan_core::domain::{CapturedImage, ScanState};
use quickscan_core::handoff::{Handoff, HandoffSequencer, FALLBACK_LINK};
use quickscan_core::ports::{PortFuture, ScanRecorder};
use quickscan_core::scan::ScanSession;
use serde::Serialize;
use tracing::info;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

use crate::browser::{self, BrowserPlatform, ObjectUrlPreviews};
use crate::http::{RemoteExtractionClient, RemoteScanRecorder};
use crate::logging;
use crate::observer::PersistingObserver;
use crate::view::{
    copy_field_key, parse_copy_field, state_label, FailureView, PaymentView, ScanEntryView,
};

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}

fn js_message(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

#[wasm_bindgen]
pub struct ScanController {
    session: Rc<RefCell<ScanSession>>,
    platform: Arc<BrowserPlatform>,
    sequencer: HandoffSequencer,
    history: Arc<RemoteScanRecorder>,
}

#[wasm_bindgen]
impl ScanController {
    /// `api_base` defaults to the page's own origin.
    #[wasm_bindgen(constructor)]
    pub fn new(api_base: Option<String>) -> Result<ScanController, JsValue> {
        logging::init();

        let api_base = match api_base {
            Some(base) => base,
            None => web_sys::window()
                .ok_or_else(|| js_message("no window"))?
                .location()
                .origin()?,
        };
        info!(%api_base, "Starting scan controller.");

        let history = Arc::new(RemoteScanRecorder::new(api_base.clone()));
        let observer = PersistingObserver::new(
            history.clone(),
            Arc::new(|task: PortFuture<'static, ()>| spawn_local(task)),
        );
        let session = ScanSession::new(
            Arc::new(RemoteExtractionClient::new(api_base)),
            Arc::new(ObjectUrlPreviews),
            Arc::new(observer),
        );
        let platform = Arc::new(BrowserPlatform);

        Ok(ScanController {
            session: Rc::new(RefCell::new(session)),
            sequencer: HandoffSequencer::new(platform.clone()),
            platform,
            history,
        })
    }

    /// One of `IDLE`, `ANALYZING`, `SUCCESS` or `ERROR`.
    pub fn state(&self) -> String {
        state_label(self.session.borrow().state()).to_string()
    }

    /// `{ name, phoneNumber, amount }` in `SUCCESS`, otherwise `null`.
    pub fn result(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.borrow().result().map(PaymentView::from))
    }

    /// `{ message, isAuthFailure, remediation }` in `ERROR`, otherwise `null`.
    pub fn failure(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.borrow().failure().map(FailureView::from))
    }

    #[wasm_bindgen(js_name = previewUrl)]
    pub fn preview_url(&self) -> Option<String> {
        self.session.borrow().preview_url().map(str::to_string)
    }

    /// The key of the copy button whose "copied" marker is showing.
    #[wasm_bindgen(js_name = copiedField)]
    pub fn copied_field(&self) -> Option<String> {
        self.session
            .borrow()
            .copied_field(Utc::now())
            .map(|field| copy_field_key(field).to_string())
    }

    /// The async clipboard and camera only work in a secure context.
    #[wasm_bindgen(js_name = isSecureContext)]
    pub fn is_secure_context(&self) -> bool {
        browser::is_secure_context()
    }

    #[wasm_bindgen(js_name = fallbackHref)]
    pub fn fallback_href() -> String {
        FALLBACK_LINK.href.to_string()
    }

    #[wasm_bindgen(js_name = fallbackLabel)]
    pub fn fallback_label() -> String {
        FALLBACK_LINK.label.to_string()
    }

    /// Starts a scan. Resolves with the state the attempt ended in.
    #[wasm_bindgen(js_name = selectImage)]
    pub fn select_image(&self, bytes: Vec<u8>, mime_type: String) -> Result<Promise, JsValue> {
        let attempt = self
            .session
            .borrow_mut()
            .begin(CapturedImage::new(bytes, mime_type))
            .map_err(js_message)?;

        let session = self.session.clone();
        Ok(future_to_promise(async move {
            let outcome = attempt.run().await;
            let mut session = session.borrow_mut();
            // A stale outcome leaves the session where the reset put it.
            let state = match session.finish(outcome) {
                Ok(state) => state,
                Err(_) => session.state(),
            };
            Ok(JsValue::from_str(state_label(state)))
        }))
    }

    pub fn reset(&self) {
        self.session.borrow_mut().reset();
    }

    /// Copies one field (`phone`, `amount`, `name` or `all`). Resolves with
    /// whether anything reached the clipboard.
    #[wasm_bindgen(js_name = copyField)]
    pub fn copy_field(&self, key: &str) -> Result<Promise, JsValue> {
        let field = parse_copy_field(key)
            .ok_or_else(|| js_message(format!("unknown field: {}", key)))?;
        let payment = self
            .session
            .borrow()
            .result()
            .cloned()
            .ok_or_else(|| js_message("no scan result to copy"))?;

        let platform = self.platform.clone();
        let session = self.session.clone();
        Ok(future_to_promise(async move {
            let ack = copy_field(platform.as_ref(), field, &payment, Utc::now()).await;
            let copied = ack.is_some();
            if let Some(ack) = ack {
                let mut session = session.borrow_mut();
                if session.state() == ScanState::Success {
                    session.acknowledge_copy(ack);
                }
            }
            Ok(JsValue::from_bool(copied))
        }))
    }

    /// Copies the phone number and opens the payment app.
    ///
    /// On iOS navigation has already happened when this returns. Resolves
    /// with whether the number reached the clipboard.
    #[wasm_bindgen(js_name = openPaymentApp)]
    pub fn open_payment_app(&self) -> Result<Promise, JsValue> {
        let phone_number = self
            .session
            .borrow()
            .result()
            .map(|p| p.phone_number.clone())
            .ok_or_else(|| js_message("no scan result to hand off"))?;

        match self.sequencer.start(&phone_number, Utc::now()) {
            Handoff::Completed(report) => {
                if let Some(ack) = report.acknowledgment {
                    self.session.borrow_mut().acknowledge_copy(ack);
                }
                Ok(Promise::resolve(&JsValue::from_bool(report.copied_with.is_some())))
            }
            Handoff::InFlight(pending) => {
                let session = self.session.clone();
                Ok(future_to_promise(async move {
                    let report = pending.await;
                    if let Some(ack) = report.acknowledgment {
                        let mut session = session.borrow_mut();
                        if session.state() == ScanState::Success {
                            session.acknowledge_copy(ack);
                        }
                    }
                    Ok(JsValue::from_bool(report.copied_with.is_some()))
                }))
            }
        }
    }

    /// Resolves with the stored scans, newest first.
    pub fn history(&self) -> Promise {
        let history = self.history.clone();
        future_to_promise(async move {
            let scans = history.list_scans().await.map_err(js_message)?;
            let entries: Vec<ScanEntryView> = scans.iter().map(ScanEntryView::from).collect();
            to_js(&entries)
        })
    }
}
