//! Browser side of QuickScan.
//!
//! The HTTP clients, the persisting observer and the view models build on every
//! target. The DOM platform and the `ScanController` JS API are wasm32 only.

pub mod http;
pub mod observer;
pub mod runtime;
pub mod view;

#[cfg(target_arch = "wasm32")]
pub mod browser;
#[cfg(target_arch = "wasm32")]
pub mod controller;
#[cfg(target_arch = "wasm32")]
mod logging;

pub use http::{decode_extraction, RemoteExtractionClient, RemoteScanRecorder};
pub use observer::{PersistingObserver, Spawner};
pub use runtime::family_from_user_agent;

#[cfg(target_arch = "wasm32")]
pub use controller::ScanController;
