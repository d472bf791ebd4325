//! bindings/quickscan-web/src/browser.rs
//!
//! The `Platform` and `PreviewStore` ports over the DOM.
//!
//! DOM handles are not `Send`; copy containers live in a thread-local table and
//! the adapters themselves are zero-sized.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use js_sys::{Array, Function, Promise, Reflect, Uint8Array};
use quickscan_core::domain::CapturedImage;
use quickscan_core::ports::{
    ContainerId, Platform, PortError, PortFuture, PortResult, PreviewStore, RuntimeFamily,
};
use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, Document, HtmlDocument, HtmlTextAreaElement, Url, Window};

use crate::runtime::family_from_user_agent;

thread_local! {
    static CONTAINERS: RefCell<HashMap<u32, HtmlTextAreaElement>> = RefCell::new(HashMap::new());
}

static NEXT_CONTAINER: AtomicU32 = AtomicU32::new(1);

fn window() -> PortResult<Window> {
    web_sys::window().ok_or_else(|| PortError::Unexpected("no window".to_string()))
}

fn document() -> PortResult<Document> {
    window()?
        .document()
        .ok_or_else(|| PortError::Unexpected("no document".to_string()))
}

fn js_error(e: JsValue) -> PortError {
    PortError::Unexpected(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
}

fn container(id: ContainerId) -> PortResult<HtmlTextAreaElement> {
    CONTAINERS
        .with(|c| c.borrow().get(&id.0).cloned())
        .ok_or_else(|| PortError::NotFound(format!("copy container {}", id.0)))
}

/// Whether the page was served from a secure context (HTTPS or localhost).
pub fn is_secure_context() -> bool {
    window().map(|w| w.is_secure_context()).unwrap_or(false)
}

//=========================================================================================
// Platform
//=========================================================================================

pub struct BrowserPlatform;

impl BrowserPlatform {
    /// Issues `navigator.clipboard.writeText(text)` and returns its promise.
    fn start_clipboard_write(text: &str) -> PortResult<Promise> {
        let navigator = window()?.navigator();
        let clipboard = Reflect::get(&navigator, &JsValue::from_str("clipboard")).map_err(js_error)?;
        if clipboard.is_undefined() || clipboard.is_null() {
            return Err(PortError::Unexpected("Clipboard API not available".to_string()));
        }
        let write_text: Function = Reflect::get(&clipboard, &JsValue::from_str("writeText"))
            .map_err(js_error)?
            .dyn_into()
            .map_err(js_error)?;
        write_text
            .call1(&clipboard, &JsValue::from_str(text))
            .map_err(js_error)?
            .dyn_into::<Promise>()
            .map_err(js_error)
    }
}

impl Platform for BrowserPlatform {
    fn runtime_family(&self) -> RuntimeFamily {
        let Ok(window) = window() else {
            return RuntimeFamily::GestureTolerant;
        };
        let navigator = window.navigator();
        let user_agent = navigator.user_agent().unwrap_or_default();
        family_from_user_agent(&user_agent, navigator.max_touch_points())
    }

    fn has_async_clipboard(&self) -> bool {
        let Ok(window) = window() else {
            return false;
        };
        window.is_secure_context()
            && Reflect::get(&window.navigator(), &JsValue::from_str("clipboard"))
                .map(|c| !c.is_undefined() && !c.is_null())
                .unwrap_or(false)
    }

    fn write_clipboard(&self, text: &str) -> PortFuture<'static, PortResult<()>> {
        let promise = Self::start_clipboard_write(text);
        Box::pin(async move {
            JsFuture::from(promise?).await.map(|_| ()).map_err(js_error)
        })
    }

    fn create_copy_container(&self, text: &str) -> PortResult<ContainerId> {
        let element: HtmlTextAreaElement = document()?
            .create_element("textarea")
            .map_err(js_error)?
            .dyn_into()
            .map_err(|_| PortError::Unexpected("textarea has the wrong type".to_string()))?;
        element.set_value(text);

        // iOS only selects text in an editable element. 16px avoids the focus zoom.
        element.set_read_only(false);
        element.set_content_editable("true");
        let style = element.style();
        for (property, value) in [
            ("position", "fixed"),
            ("left", "-9999px"),
            ("top", "0"),
            ("opacity", "0"),
            ("font-size", "16px"),
        ] {
            style.set_property(property, value).map_err(js_error)?;
        }

        let id = NEXT_CONTAINER.fetch_add(1, Ordering::Relaxed);
        CONTAINERS.with(|c| c.borrow_mut().insert(id, element));
        Ok(ContainerId(id))
    }

    fn attach_container(&self, id: ContainerId) -> PortResult<()> {
        let element = container(id)?;
        let body = document()?
            .body()
            .ok_or_else(|| PortError::Unexpected("no document body".to_string()))?;
        body.append_child(&element).map_err(js_error)?;
        Ok(())
    }

    fn select_container_text(&self, id: ContainerId) -> PortResult<()> {
        let element = container(id)?;
        let range = document()?.create_range().map_err(js_error)?;
        range.select_node_contents(&element).map_err(js_error)?;
        if let Some(selection) = window()?.get_selection().map_err(js_error)? {
            selection.remove_all_ranges().map_err(js_error)?;
            selection.add_range(&range).map_err(js_error)?;
        }
        let length = element.value().encode_utf16().count() as u32;
        element
            .set_selection_range(0, length)
            .map_err(js_error)?;
        Ok(())
    }

    fn exec_copy_command(&self) -> PortResult<bool> {
        let document: HtmlDocument = document()?
            .dyn_into()
            .map_err(|_| PortError::Unexpected("not an HTML document".to_string()))?;
        document.exec_command("copy").map_err(js_error)
    }

    fn remove_container(&self, id: ContainerId) {
        if let Some(element) = CONTAINERS.with(|c| c.borrow_mut().remove(&id.0)) {
            element.remove();
        }
    }

    fn navigate(&self, url: &str) {
        let result = window().and_then(|w| w.location().set_href(url).map_err(js_error));
        if let Err(e) = result {
            warn!("Navigation to {} failed: {}", url, e);
        }
    }
}

//=========================================================================================
// Previews
//=========================================================================================

/// Object URLs for selected images.
pub struct ObjectUrlPreviews;

impl PreviewStore for ObjectUrlPreviews {
    fn create_preview(&self, image: &CapturedImage) -> PortResult<String> {
        let parts = Array::new();
        parts.push(&Uint8Array::from(image.bytes.as_slice()));
        let options = BlobPropertyBag::new();
        options.set_type(&image.mime_type);
        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &options).map_err(js_error)?;
        Url::create_object_url_with_blob(&blob).map_err(js_error)
    }

    fn revoke_preview(&self, preview_url: &str) {
        if let Err(e) = Url::revoke_object_url(preview_url) {
            warn!("Could not revoke preview {}: {:?}", preview_url, e);
        }
    }
}
