//! bindings/quickscan-web/src/runtime.rs
//!
//! Classifies the browser from its user agent.

use quickscan_core::ports::RuntimeFamily;

/// iOS browsers are all WebKit and lose the tap as soon as anything is awaited.
///
/// iPadOS 13+ reports a desktop Safari user agent, so a Mac that has a
/// touch screen is treated as an iPad.
pub fn family_from_user_agent(user_agent: &str, max_touch_points: i32) -> RuntimeFamily {
    let ua = user_agent.to_ascii_lowercase();
    let ios_device = ["iphone", "ipad", "ipod"].iter().any(|d| ua.contains(d));
    let ipados_desktop_mode = ua.contains("macintosh") && max_touch_points > 1;

    if ios_device || ipados_desktop_mode {
        RuntimeFamily::GestureFragile
    } else {
        RuntimeFamily::GestureTolerant
    }
}
