//! crates/quickscan_core/src/handoff.rs
//!
//! Copies the phone number and activates the payment application.
//!
//! Custom-scheme navigation is only honoured while the browser still attributes
//! the call to the user's tap. Runtimes disagree on how long that lasts once
//! asynchronous work intervenes, so the order of "write clipboard" and
//! "navigate" is chosen here from one decision table:
//!
//! | runtime family    | async clipboard | plan                                   |
//! |-------------------|-----------------|----------------------------------------|
//! | gesture-fragile   | any             | sync copy, navigate in the same tick   |
//! | gesture-tolerant  | exposed         | await async write, navigate on settle  |
//! | gesture-tolerant  | missing         | sync copy, navigate in the same tick   |
//!
//! Copy failure never blocks navigation. Whether the app actually opened is
//! not observable; `FallbackLink` is the only mitigation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::copy::{copy_sync, CopyTechnique};
use crate::domain::{CopyAcknowledgment, CopyField};
use crate::ports::{Platform, PortFuture, RuntimeFamily};

/// The payment application's URL scheme. Never derived from scan data.
pub const PAYMENT_APP_URL: &str = "gcash://";

/// A plain link to the payment app for when scripted activation is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackLink {
    pub href: &'static str,
    pub label: &'static str,
}

pub const FALLBACK_LINK: FallbackLink = FallbackLink {
    href: PAYMENT_APP_URL,
    label: "If GCash didn't open, click here",
};

/// How a single handoff orders its clipboard write and navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffPlan {
    /// Synchronous copy and navigation in the caller's stack frame.
    Immediate,
    /// One awaited asynchronous write, navigation right on settlement.
    AfterAsyncWrite,
}

impl HandoffPlan {
    pub fn select(family: RuntimeFamily, has_async_clipboard: bool) -> Self {
        match (family, has_async_clipboard) {
            (RuntimeFamily::GestureTolerant, true) => HandoffPlan::AfterAsyncWrite,
            _ => HandoffPlan::Immediate,
        }
    }

    fn ack_ttl(self) -> Duration {
        match self {
            HandoffPlan::Immediate => Duration::seconds(3),
            HandoffPlan::AfterAsyncWrite => Duration::seconds(2),
        }
    }
}

/// What happened during one handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffReport {
    pub plan: HandoffPlan,
    /// The technique that placed the number on the clipboard, if any did.
    pub copied_with: Option<CopyTechnique>,
    pub navigated_to: &'static str,
    /// Present only when the copy succeeded.
    pub acknowledgment: Option<CopyAcknowledgment>,
}

/// A started handoff.
pub enum Handoff {
    /// Copy and navigation already ran, synchronously.
    Completed(HandoffReport),
    /// The clipboard write is in flight; poll to navigate on settlement.
    /// Do not put a timer in front of this future.
    InFlight(PortFuture<'static, HandoffReport>),
}

impl Handoff {
    /// Drives the handoff to completion.
    pub async fn finish(self) -> HandoffReport {
        match self {
            Handoff::Completed(report) => report,
            Handoff::InFlight(pending) => pending.await,
        }
    }
}

/// Orders "copy the number" and "open the payment app" for one tap.
#[derive(Clone)]
pub struct HandoffSequencer {
    platform: Arc<dyn Platform>,
}

impl HandoffSequencer {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    /// The plan the current runtime calls for.
    pub fn plan(&self) -> HandoffPlan {
        HandoffPlan::select(
            self.platform.runtime_family(),
            self.platform.has_async_clipboard(),
        )
    }

    /// Starts the handoff. Must be called directly from the tap handler.
    ///
    /// On the immediate plan everything, including navigation, has happened
    /// when this returns. Otherwise the asynchronous write has been issued and
    /// the returned future navigates as soon as it settles.
    pub fn start(&self, phone_number: &str, now: DateTime<Utc>) -> Handoff {
        match self.plan() {
            HandoffPlan::Immediate => Handoff::Completed(self.hand_off_immediate(phone_number, now)),
            HandoffPlan::AfterAsyncWrite => {
                let write = self.platform.write_clipboard(phone_number);
                let platform = self.platform.clone();
                let phone_number = phone_number.to_string();
                Handoff::InFlight(Box::pin(async move {
                    let copied_with = match write.await {
                        Ok(()) => Some(CopyTechnique::Async),
                        Err(e) => {
                            warn!("Async copy failed before handoff, trying sync copy: {}", e);
                            copy_sync(platform.as_ref(), &phone_number)
                                .then_some(CopyTechnique::Sync)
                        }
                    };
                    platform.navigate(PAYMENT_APP_URL);
                    report(HandoffPlan::AfterAsyncWrite, copied_with, now)
                }))
            }
        }
    }

    /// Synchronous copy then navigation, with no suspension in between.
    ///
    /// Navigation happens whatever the copy result was.
    pub fn hand_off_immediate(&self, phone_number: &str, now: DateTime<Utc>) -> HandoffReport {
        let copied = copy_sync(self.platform.as_ref(), phone_number);
        self.platform.navigate(PAYMENT_APP_URL);
        if !copied {
            warn!("Could not copy number. Opening payment app anyway.");
        }
        report(HandoffPlan::Immediate, copied.then_some(CopyTechnique::Sync), now)
    }
}

fn report(
    plan: HandoffPlan,
    copied_with: Option<CopyTechnique>,
    now: DateTime<Utc>,
) -> HandoffReport {
    info!(?plan, copied = copied_with.is_some(), "Handed off to payment app.");
    HandoffReport {
        plan,
        copied_with,
        navigated_to: PAYMENT_APP_URL,
        acknowledgment: copied_with
            .map(|_| CopyAcknowledgment::new(CopyField::PaymentApp, now, plan.ack_ttl())),
    }
}
