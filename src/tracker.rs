//! Instrumentation for a mounted variant.
//!
//! [`VariantTracker`] holds the per-instance tracking state for one rendered
//! variant: whether the exposure fired, whether the first interaction fired,
//! and which element ids carry per-click events. It is deliberately
//! framework agnostic; the host UI layer owns the actual observers (an
//! IntersectionObserver and a click listener in a browser, their equivalents
//! elsewhere) and forwards what they see.

use std::collections::HashMap;
use std::sync::Arc;

use crate::client::Client;
use crate::events::{event_types, EventCapture};
use crate::Str;

/// Fraction of the element that must be visible before an exposure fires.
pub const DEFAULT_VISIBILITY_THRESHOLD: f64 = 0.1;

/// Exposure and interaction tracking for one mounted variant.
///
/// # Examples
/// ```no_run
/// # use std::sync::Arc;
/// # use atomic_experiments::{Client, VariantTracker};
/// # let client = Arc::new(Client::disabled());
/// let mut tracker = VariantTracker::new(client, "checkout-button", 7, "variant-b")
///     .with_trackable_ids(["buy-now"]);
///
/// // Wired to whatever visibility/click observers the host UI has:
/// tracker.observe_visibility(0.4); // fires the one-shot exposure event
/// tracker.record_click(Some("buy-now")); // fires click + one-shot interaction
/// ```
pub struct VariantTracker {
    client: Arc<Client>,
    feature_flag: Str,
    epoch: u64,
    variant_id: Str,
    trackable_ids: Vec<Str>,
    visibility_threshold: f64,
    track_view: bool,
    track_interaction: bool,
    view_tracked: bool,
    interaction_tracked: bool,
    detached: bool,
}

impl VariantTracker {
    /// Creates a tracker for one rendered variant of an experiment.
    pub fn new(
        client: Arc<Client>,
        feature_flag: impl Into<Str>,
        epoch: u64,
        variant_id: impl Into<Str>,
    ) -> VariantTracker {
        VariantTracker {
            client,
            feature_flag: feature_flag.into(),
            epoch,
            variant_id: variant_id.into(),
            trackable_ids: Vec::new(),
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            track_view: true,
            track_interaction: true,
            view_tracked: false,
            interaction_tracked: false,
            detached: false,
        }
    }

    /// Sets the element ids whose clicks are reported as `click` events.
    pub fn with_trackable_ids(
        mut self,
        ids: impl IntoIterator<Item = impl Into<Str>>,
    ) -> VariantTracker {
        self.trackable_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the visibility ratio at which the exposure fires.
    pub fn with_visibility_threshold(mut self, threshold: f64) -> VariantTracker {
        self.visibility_threshold = threshold;
        self
    }

    /// Enables or disables exposure tracking.
    pub fn with_track_view(mut self, track_view: bool) -> VariantTracker {
        self.track_view = track_view;
        self
    }

    /// Enables or disables click and interaction tracking.
    pub fn with_track_interaction(mut self, track_interaction: bool) -> VariantTracker {
        self.track_interaction = track_interaction;
        self
    }

    /// Reports how much of the variant's element is currently visible.
    ///
    /// The first ratio at or above the threshold fires exactly one
    /// `exposure` event; everything after that is ignored for the life of
    /// this instance.
    pub fn observe_visibility(&mut self, visible_ratio: f64) {
        if self.detached || !self.track_view || self.view_tracked {
            return;
        }
        if visible_ratio < self.visibility_threshold {
            return;
        }
        self.view_tracked = true;
        self.emit(EventCapture::new().event_type(event_types::EXPOSURE));
    }

    /// Reports a click inside the variant's region, with the id of the
    /// clicked element if it has one.
    ///
    /// The first reported click fires the one-shot `interaction` event;
    /// later clicks do not repeat it. A click whose target matches a
    /// trackable id additionally fires a `click` event every time, carrying
    /// the id as `buttonId` metadata and preceding the interaction when
    /// both fire.
    pub fn record_click(&mut self, target_id: Option<&str>) {
        if self.detached || !self.track_interaction {
            return;
        }

        if let Some(target_id) = target_id {
            if self.trackable_ids.iter().any(|id| id.as_ref() == target_id) {
                self.emit(
                    EventCapture::new()
                        .event_type(event_types::CLICK)
                        .metadata(HashMap::from([(
                            // Historical wire name, kept for dashboard compatibility.
                            "buttonId".to_string(),
                            serde_json::Value::from(target_id),
                        )])),
                );
            }
        }

        if !self.interaction_tracked {
            self.interaction_tracked = true;
            self.emit(EventCapture::new().event_type(event_types::INTERACTION));
        }
    }

    /// Returns whether the exposure event has fired.
    pub fn view_tracked(&self) -> bool {
        self.view_tracked
    }

    /// Returns whether the interaction event has fired.
    pub fn interaction_tracked(&self) -> bool {
        self.interaction_tracked
    }

    /// Detaches the tracker: every later call is a no-op.
    ///
    /// Call on unmount, after removing the host-side observers.
    pub fn detach(&mut self) {
        self.detached = true;
    }

    fn emit(&self, capture: EventCapture) {
        let capture = capture
            .feature_flag(self.feature_flag.clone())
            .experiment_epoch(self.epoch)
            .variant_id(self.variant_id.clone());
        spawn_capture(Arc::clone(&self.client), capture);
    }
}

// Emission is fire-and-forget: the UI thread reporting a click must not wait
// on the collector.
#[cfg(not(target_arch = "wasm32"))]
fn spawn_capture(client: Arc<Client>, capture: EventCapture) {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(async move { client.capture(capture).await });
        }
        Err(_) => {
            log::warn!(target: "atomic", "no tokio runtime available; dropping instrumentation event");
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn spawn_capture(client: Arc<Client>, capture: EventCapture) {
    wasm_bindgen_futures::spawn_local(async move { client.capture(capture).await });
}
