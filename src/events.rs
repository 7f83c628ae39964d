//! Experiment events.
//!
//! Events are opaque to the SDK: they are serialized, posted to the
//! collector, and forgotten. [`EventCapture`] is what callers build;
//! [`EventRecord`] is the wire shape after the client stamps identity onto
//! it.

use std::collections::HashMap;

use serde::Serialize;

use crate::Str;

/// Conventional event types.
///
/// The collector accepts any string; these are the values its dashboards
/// group by default.
pub mod event_types {
    /// A variant became visible to the visitor.
    pub const EXPOSURE: &str = "exposure";
    /// First engagement with a tracked element.
    pub const INTERACTION: &str = "interaction";
    /// A click on a tracked element.
    pub const CLICK: &str = "click";
    /// A conversion goal was reached.
    pub const CONVERSION: &str = "conversion";
    /// An application-defined event, named by `custom_event_name`.
    pub const CUSTOM: &str = "custom";
}

/// Placeholder sent when identity or type is not known at capture time.
pub(crate) const UNKNOWN: &str = "unknown";

/// A fully-stamped event as it goes over the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Event type, `"unknown"` when the capture did not say.
    #[serde(rename = "type")]
    pub event_type: Str,
    /// Visitor id, `"unknown"` when no identity cookie exists.
    pub user_id: Str,
    /// Session id, `"unknown"` when no session cookie exists.
    pub session_id: Str,
    /// Flag of the experiment this event belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_flag: Option<Str>,
    /// Epoch of the experiment this event belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experiment_epoch: Option<u64>,
    /// Variant the visitor was exposed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<Str>,
    /// Name qualifying a `"custom"` event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_event_name: Option<Str>,
    /// Free-form payload, forwarded verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Options for capturing a single event.
///
/// Everything is optional; identity is stamped by the client at send time.
///
/// # Examples
/// ```
/// # use atomic_experiments::{event_types, EventCapture};
/// let capture = EventCapture::new()
///     .event_type(event_types::CONVERSION)
///     .feature_flag("checkout-button")
///     .experiment_epoch(7)
///     .variant_id("variant-b");
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventCapture {
    pub(crate) event_type: Option<Str>,
    pub(crate) feature_flag: Option<Str>,
    pub(crate) experiment_epoch: Option<u64>,
    pub(crate) variant_id: Option<Str>,
    pub(crate) custom_event_name: Option<Str>,
    pub(crate) metadata: Option<HashMap<String, serde_json::Value>>,
}

impl EventCapture {
    /// Creates an empty capture.
    pub fn new() -> EventCapture {
        EventCapture::default()
    }

    /// Sets the event type. See [`event_types`] for the conventional values.
    pub fn event_type(mut self, event_type: impl Into<Str>) -> EventCapture {
        self.event_type = Some(event_type.into());
        self
    }

    /// Associates the event with a feature flag.
    pub fn feature_flag(mut self, feature_flag: impl Into<Str>) -> EventCapture {
        self.feature_flag = Some(feature_flag.into());
        self
    }

    /// Associates the event with an experiment epoch.
    pub fn experiment_epoch(mut self, epoch: u64) -> EventCapture {
        self.experiment_epoch = Some(epoch);
        self
    }

    /// Associates the event with the variant the visitor saw.
    pub fn variant_id(mut self, variant_id: impl Into<Str>) -> EventCapture {
        self.variant_id = Some(variant_id.into());
        self
    }

    /// Names a `"custom"` event.
    pub fn custom_event_name(mut self, name: impl Into<Str>) -> EventCapture {
        self.custom_event_name = Some(name.into());
        self
    }

    /// Attaches a free-form payload.
    pub fn metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> EventCapture {
        self.metadata = Some(metadata);
        self
    }

    /// Stamps identity onto the capture, substituting `"unknown"` for
    /// anything missing.
    pub(crate) fn into_record(self, user_id: Option<Str>, session_id: Option<Str>) -> EventRecord {
        EventRecord {
            event_type: self.event_type.unwrap_or_else(|| UNKNOWN.into()),
            user_id: user_id.unwrap_or_else(|| UNKNOWN.into()),
            session_id: session_id.unwrap_or_else(|| UNKNOWN.into()),
            feature_flag: self.feature_flag,
            experiment_epoch: self.experiment_epoch,
            variant_id: self.variant_id,
            custom_event_name: self.custom_event_name,
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn serializes_camel_case_and_omits_absent_fields() {
        let record = EventCapture::new()
            .event_type(event_types::EXPOSURE)
            .into_record(Some("v-1".into()), Some("s-1".into()));

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "type": "exposure",
                "userId": "v-1",
                "sessionId": "s-1",
            })
        );
    }

    #[test]
    fn serializes_full_record() {
        let record = EventCapture::new()
            .event_type(event_types::CLICK)
            .feature_flag("checkout-button")
            .experiment_epoch(7)
            .variant_id("variant-b")
            .custom_event_name("cta")
            .metadata(HashMap::from([(
                "buttonId".to_string(),
                json!("buy-now"),
            )]))
            .into_record(Some("v-1".into()), Some("s-1".into()));

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "type": "click",
                "userId": "v-1",
                "sessionId": "s-1",
                "featureFlag": "checkout-button",
                "experimentEpoch": 7,
                "variantId": "variant-b",
                "customEventName": "cta",
                "metadata": {"buttonId": "buy-now"},
            })
        );
    }

    #[test]
    fn substitutes_unknown_for_missing_identity_and_type() {
        let record = EventCapture::new().into_record(None, None);
        assert_eq!(record.event_type, "unknown");
        assert_eq!(record.user_id, "unknown");
        assert_eq!(record.session_id, "unknown");
    }
}
