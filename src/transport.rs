//! Transport to the experiment service.
//!
//! The client talks to two endpoints, variant resolution and event intake,
//! through the [`Transport`] trait. [`HttpTransport`] is the real
//! implementation; tests swap in a scripted recorder. Failures are reduced
//! to [`TransportFailure`] because callers only branch on "did not complete"
//! versus "completed with garbage"; the underlying error is logged at debug
//! and dropped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::events::EventRecord;
use crate::Str;

/// Body of a variant resolution request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct VariantRequest {
    pub feature_flag: Str,
    pub hash_bucket: u64,
    pub variants_list: Vec<Str>,
}

/// Body of a variant resolution response.
///
/// Any well-formed JSON without a `variant_id` deserializes to `None`,
/// which the client reads as "the service declined to assign".
#[derive(Debug, Deserialize)]
pub(crate) struct VariantResponse {
    #[serde(default)]
    pub variant_id: Option<Str>,
}

/// Why a transport call produced nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub(crate) enum TransportFailure {
    /// The exchange did not complete: connect error, timeout, or an error
    /// status from the service.
    #[error("request to the experiment service failed")]
    Request,
    /// The exchange completed but the body is not the expected JSON.
    #[error("experiment service response is malformed")]
    MalformedResponse,
}

/// HTTP seam of the client.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub(crate) trait Transport {
    /// Asks the service which variant the given bucket falls into.
    async fn resolve_variant(
        &self,
        request: &VariantRequest,
    ) -> Result<VariantResponse, TransportFailure>;

    /// Posts one event to the collector. The response body is ignored.
    async fn deliver_event(&self, record: &EventRecord) -> Result<(), TransportFailure>;
}

// Browser transports are single-threaded and hold JS handles, so the boxed
// transport is only thread-safe off wasm.
#[cfg(not(target_arch = "wasm32"))]
pub(crate) type DynTransport = dyn Transport + Send + Sync;
#[cfg(target_arch = "wasm32")]
pub(crate) type DynTransport = dyn Transport;

/// [`Transport`] over HTTP with bearer authentication.
pub(crate) struct HttpTransport {
    // reqwest::Client holds a connection pool internally, so we're reusing
    // one client for all requests.
    client: reqwest::Client,
    variant_url: Url,
    event_url: Url,
    service_role_key: String,
}

impl HttpTransport {
    pub(crate) fn new(variant_url: Url, event_url: Url, service_role_key: String) -> HttpTransport {
        HttpTransport {
            client: reqwest::Client::new(),
            variant_url,
            event_url,
            service_role_key,
        }
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &Url,
        body: &T,
    ) -> Result<reqwest::Response, TransportFailure> {
        let response = self
            .client
            .post(url.clone())
            .bearer_auth(&self.service_role_key)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                log::debug!(target: "atomic", "failed to send request to {url}: {err:?}");
                TransportFailure::Request
            })?;
        response.error_for_status().map_err(|err| {
            log::debug!(target: "atomic", "experiment service returned an error status: {err:?}");
            TransportFailure::Request
        })
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Transport for HttpTransport {
    async fn resolve_variant(
        &self,
        request: &VariantRequest,
    ) -> Result<VariantResponse, TransportFailure> {
        let response = self.post(&self.variant_url, request).await?;
        response.json().await.map_err(|err| {
            log::debug!(target: "atomic", "failed to decode variant response: {err:?}");
            TransportFailure::MalformedResponse
        })
    }

    async fn deliver_event(&self, record: &EventRecord) -> Result<(), TransportFailure> {
        self.post(&self.event_url, record).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    /// What a scripted transport answers to variant resolutions.
    pub(crate) enum VariantScript {
        Variant(&'static str),
        NoVariant,
        Fail(TransportFailure),
    }

    /// Everything a [`RecordingTransport`] has seen, shared with the test.
    #[derive(Default)]
    pub(crate) struct TransportLog {
        variant_calls: AtomicUsize,
        event_calls: AtomicUsize,
        variant_requests: Mutex<Vec<VariantRequest>>,
        events: Mutex<Vec<EventRecord>>,
    }

    impl TransportLog {
        pub fn variant_calls(&self) -> usize {
            self.variant_calls.load(Ordering::SeqCst)
        }

        pub fn event_calls(&self) -> usize {
            self.event_calls.load(Ordering::SeqCst)
        }

        pub fn variant_requests(&self) -> Vec<VariantRequest> {
            self.variant_requests.lock().unwrap().clone()
        }

        pub fn events(&self) -> Vec<EventRecord> {
            self.events.lock().unwrap().clone()
        }
    }

    /// Scripted in-memory transport.
    pub(crate) struct RecordingTransport {
        log: Arc<TransportLog>,
        script: VariantScript,
        event_result: Result<(), TransportFailure>,
    }

    impl RecordingTransport {
        pub fn with_script(script: VariantScript) -> RecordingTransport {
            RecordingTransport {
                log: Arc::default(),
                script,
                event_result: Ok(()),
            }
        }

        /// Transport that resolves every request to the given variant.
        pub fn returning(variant: &'static str) -> RecordingTransport {
            Self::with_script(VariantScript::Variant(variant))
        }

        /// Transport whose responses carry no variant.
        pub fn no_variant() -> RecordingTransport {
            Self::with_script(VariantScript::NoVariant)
        }

        /// Transport that fails every variant resolution.
        pub fn failing(failure: TransportFailure) -> RecordingTransport {
            Self::with_script(VariantScript::Fail(failure))
        }

        /// Makes event delivery fail too.
        pub fn event_failure(mut self, failure: TransportFailure) -> RecordingTransport {
            self.event_result = Err(failure);
            self
        }

        /// Handle to the call log, kept by the test before the transport
        /// moves into a client.
        pub fn log(&self) -> Arc<TransportLog> {
            Arc::clone(&self.log)
        }
    }

    #[cfg_attr(not(target_arch = "wasm32"), async_trait)]
    #[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
    impl Transport for RecordingTransport {
        async fn resolve_variant(
            &self,
            request: &VariantRequest,
        ) -> Result<VariantResponse, TransportFailure> {
            self.log.variant_calls.fetch_add(1, Ordering::SeqCst);
            self.log.variant_requests.lock().unwrap().push(request.clone());
            match &self.script {
                VariantScript::Variant(variant) => Ok(VariantResponse {
                    variant_id: Some((*variant).into()),
                }),
                VariantScript::NoVariant => Ok(VariantResponse { variant_id: None }),
                VariantScript::Fail(failure) => Err(*failure),
            }
        }

        async fn deliver_event(&self, record: &EventRecord) -> Result<(), TransportFailure> {
            self.log.event_calls.fetch_add(1, Ordering::SeqCst);
            self.log.events.lock().unwrap().push(record.clone());
            self.event_result
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn variant_request_serializes_snake_case() {
        let request = VariantRequest {
            feature_flag: "checkout-button".into(),
            hash_bucket: 971,
            variants_list: vec!["variant-a".into(), "variant-b".into()],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "feature_flag": "checkout-button",
                "hash_bucket": 971,
                "variants_list": ["variant-a", "variant-b"],
            })
        );
    }

    #[test]
    fn variant_response_reads_variant_id() {
        let response: VariantResponse =
            serde_json::from_value(json!({"variant_id": "variant-b"})).unwrap();
        assert_eq!(response.variant_id, Some("variant-b".into()));
    }

    #[test]
    fn variant_response_tolerates_missing_variant() {
        let empty: VariantResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.variant_id, None);

        let unrelated: VariantResponse =
            serde_json::from_value(json!({"assignment": "variant-b"})).unwrap();
        assert_eq!(unrelated.variant_id, None);

        let null: VariantResponse = serde_json::from_value(json!({"variant_id": null})).unwrap();
        assert_eq!(null.variant_id, None);
    }

    #[test]
    fn variant_response_rejects_non_objects() {
        assert!(serde_json::from_value::<VariantResponse>(json!("variant-b")).is_err());
        assert!(serde_json::from_value::<VariantResponse>(json!(42)).is_err());
    }
}
