//! Experiment client.

use url::Url;

use crate::bucketing::{bucket_input, Bucketer, Sha256Bucketer, TOTAL_BUCKETS};
use crate::config::ClientConfig;
use crate::cookie_store::CookieStore;
use crate::error::{Error, Result};
use crate::events::EventCapture;
use crate::transport::{DynTransport, HttpTransport, TransportFailure, VariantRequest};
use crate::Str;

/// Visitor and session identity, as persisted in cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable id of the device or browser profile.
    pub visitor_id: Str,
    /// Id of the current browsing session.
    pub session_id: Str,
}

/// Outcome of a variant lookup.
///
/// The two successful arms distinguish where the variant came from, which is
/// what integrations usually want to know when debugging traffic splits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantOutcome {
    /// Variant served from the assignment cookie. No network was involved.
    Preassigned(Str),
    /// Variant resolved by the experiment service and pinned to the
    /// assignment cookie for later lookups.
    Resolved(Str),
    /// No variant. The reason tells whether that is expected (not ready,
    /// no identity) or a degradation (transport trouble).
    Absent(AbsentReason),
}

impl VariantOutcome {
    /// Returns the variant id, if any.
    pub fn variant(&self) -> Option<&Str> {
        match self {
            VariantOutcome::Preassigned(variant_id) | VariantOutcome::Resolved(variant_id) => {
                Some(variant_id)
            }
            VariantOutcome::Absent(_) => None,
        }
    }

    /// Consumes the outcome, returning the variant id, if any.
    pub fn into_variant(self) -> Option<Str> {
        match self {
            VariantOutcome::Preassigned(variant_id) | VariantOutcome::Resolved(variant_id) => {
                Some(variant_id)
            }
            VariantOutcome::Absent(_) => None,
        }
    }
}

/// Why a variant lookup came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum AbsentReason {
    /// The client is disabled and never resolves anything.
    NotReady,
    /// No visitor id cookie exists. Call
    /// [`Client::ensure_identity`] first.
    MissingVisitorId,
    /// The experiment service could not be reached or answered with an
    /// error status.
    Transport,
    /// The experiment service answered with a body that is not the expected
    /// JSON.
    MalformedResponse,
    /// The experiment service answered well-formed JSON without a variant.
    MissingVariant,
}

/// A client for the Atomic experiment service.
///
/// The client resolves variant assignments and captures experiment events.
/// It is cheap to share behind an `Arc` and keeps no mutable state of its
/// own; everything durable lives in cookies.
///
/// In order to create a client instance, first create [`ClientConfig`].
///
/// # Examples
/// ```
/// # use atomic_experiments::{Client, ClientConfig, MemoryCookies};
/// let client = Client::new(
///     ClientConfig::new("https://experiments.example.com", "service-role-key")
///         .cookies(MemoryCookies::new()),
/// )
/// .unwrap();
/// ```
pub struct Client {
    // `None` is the disabled client.
    inner: Option<ClientInner>,
}

struct ClientInner {
    store: CookieStore,
    transport: Box<DynTransport>,
    bucketer: Sha256Bucketer,
}

impl Client {
    /// Create a new `Client` using the specified configuration.
    ///
    /// # Errors
    ///
    /// Misconfiguration is the only thing that fails a client: a missing or
    /// unparseable api_url, a missing service_role_key, or absent cookie
    /// handles on targets without a default backend. Runtime trouble
    /// (network, bad responses) never errors; lookups degrade to
    /// [`VariantOutcome::Absent`] instead.
    pub fn new(config: ClientConfig) -> Result<Client> {
        if config.api_url.is_empty() {
            return Err(Error::MissingApiUrl);
        }
        if config.service_role_key.is_empty() {
            return Err(Error::MissingServiceRoleKey);
        }
        let base = config.api_url.trim_end_matches('/');
        let variant_url =
            Url::parse(&format!("{base}/experiments/get-variant")).map_err(Error::InvalidApiUrl)?;
        let event_url =
            Url::parse(&format!("{base}/experiments/event")).map_err(Error::InvalidApiUrl)?;
        let store = CookieStore::new(config.cookies)?;
        let transport = HttpTransport::new(variant_url, event_url, config.service_role_key);

        Ok(Client {
            inner: Some(ClientInner {
                store,
                transport: Box::new(transport),
                bucketer: Sha256Bucketer,
            }),
        })
    }

    /// Create a disabled client.
    ///
    /// A disabled client is inert: every lookup returns
    /// [`AbsentReason::NotReady`] and every captured event is dropped. It
    /// stands in wherever a `Client` value is required before configuration
    /// is available, e.g. as the default in an application context.
    pub fn disabled() -> Client {
        Client { inner: None }
    }

    #[cfg(test)]
    pub(crate) fn with_parts(store: CookieStore, transport: Box<DynTransport>) -> Client {
        Client {
            inner: Some(ClientInner {
                store,
                transport,
                bucketer: Sha256Bucketer,
            }),
        }
    }

    /// Returns whether this client is configured and able to resolve
    /// variants.
    pub fn is_ready(&self) -> bool {
        self.inner.is_some()
    }

    /// Returns the cookie store, or `None` on a disabled client.
    pub fn cookie_store(&self) -> Option<&CookieStore> {
        self.inner.as_ref().map(|inner| &inner.store)
    }

    /// Ensures visitor and session identity cookies exist, creating and
    /// persisting them if needed.
    ///
    /// Call this at a point where setting cookies is possible (on a server:
    /// before the response is finalized). The read path never creates
    /// identity on its own.
    ///
    /// `provided_*` ids are used instead of generated ones when the
    /// respective cookie does not exist yet; existing cookies always win.
    /// Returns `None` on a disabled client.
    pub fn ensure_identity(
        &self,
        provided_visitor: Option<&str>,
        provided_session: Option<&str>,
    ) -> Option<Identity> {
        let inner = self.inner.as_ref()?;
        Some(Identity {
            visitor_id: inner.store.get_or_create_visitor_id(provided_visitor),
            session_id: inner.store.get_or_create_session_id(provided_session),
        })
    }

    /// Get the variant assigned to this visitor for an experiment.
    ///
    /// Convenience over [`get_variant_details`][Self::get_variant_details]
    /// for callers that only branch on the variant id.
    ///
    /// # Examples
    /// ```no_run
    /// # async fn example() {
    /// # use atomic_experiments::{ClientConfig, MemoryCookies};
    /// let client = ClientConfig::new("https://experiments.example.com", "service-role-key")
    ///     .cookies(MemoryCookies::from_cookie_header("atomic_uid=v-1"))
    ///     .to_client()
    ///     .unwrap();
    ///
    /// match client
    ///     .get_variant("checkout-button", 7, &["variant-a".into(), "variant-b".into()])
    ///     .await
    ///     .as_deref()
    /// {
    ///     Some("variant-b") => { /* render the challenger */ }
    ///     _ => { /* render the control */ }
    /// }
    /// # }
    /// ```
    pub async fn get_variant(
        &self,
        feature_flag: &str,
        epoch: u64,
        variants: &[Str],
    ) -> Option<Str> {
        self.get_variant_details(feature_flag, epoch, variants)
            .await
            .into_variant()
    }

    /// Get the variant assigned to this visitor for an experiment, with the
    /// origin of the answer.
    ///
    /// The lookup runs at most four steps and stops at the first that
    /// applies:
    ///
    /// 1. a disabled client is [`AbsentReason::NotReady`];
    /// 2. an existing assignment cookie for `(feature_flag, epoch)` is
    ///    returned as [`VariantOutcome::Preassigned`] without touching the
    ///    network;
    /// 3. a missing visitor id is [`AbsentReason::MissingVisitorId`]
    ///    (identity is never created here);
    /// 4. otherwise the visitor's hash bucket and the candidate list are
    ///    sent to the experiment service. A well-formed answer is pinned to
    ///    the assignment cookie and returned as
    ///    [`VariantOutcome::Resolved`]; everything else degrades to
    ///    [`VariantOutcome::Absent`].
    ///
    /// This method does not return errors: in an experiment, "no variant"
    /// (control experience) is always an acceptable answer.
    pub async fn get_variant_details(
        &self,
        feature_flag: &str,
        epoch: u64,
        variants: &[Str],
    ) -> VariantOutcome {
        let Some(inner) = &self.inner else {
            log::trace!(target: "atomic", feature_flag, epoch; "variant lookup on a disabled client");
            return VariantOutcome::Absent(AbsentReason::NotReady);
        };

        if let Some(variant_id) = inner.store.assignment(feature_flag, epoch) {
            log::trace!(target: "atomic", feature_flag, epoch, variant_id; "serving pre-assigned variant");
            return VariantOutcome::Preassigned(variant_id);
        }

        let Some(visitor_id) = inner.store.visitor_id() else {
            log::warn!(target: "atomic", feature_flag, epoch; "visitor id cookie is missing; call ensure_identity() before looking up variants");
            return VariantOutcome::Absent(AbsentReason::MissingVisitorId);
        };

        let hash_bucket = inner
            .bucketer
            .bucket(bucket_input(&visitor_id, feature_flag, epoch), TOTAL_BUCKETS);
        let request = VariantRequest {
            feature_flag: feature_flag.into(),
            hash_bucket,
            variants_list: variants.to_vec(),
        };

        let resolved = inner
            .transport
            .resolve_variant(&request)
            .await
            // The service signals "no assignment" as a missing, null, or
            // empty variant id.
            .map(|response| response.variant_id.filter(|variant_id| !variant_id.is_empty()));
        match resolved {
            Ok(Some(variant_id)) => {
                // Pin the answer so later lookups stay local.
                inner.store.set_assignment(feature_flag, epoch, &variant_id);
                log::debug!(target: "atomic", feature_flag, epoch, variant_id, hash_bucket; "resolved variant");
                VariantOutcome::Resolved(variant_id)
            }
            Ok(None) => {
                log::debug!(target: "atomic", feature_flag, epoch; "experiment service returned no variant");
                VariantOutcome::Absent(AbsentReason::MissingVariant)
            }
            Err(failure) => {
                log::debug!(target: "atomic", feature_flag, epoch; "variant resolution failed: {failure}");
                let reason = match failure {
                    TransportFailure::Request => AbsentReason::Transport,
                    TransportFailure::MalformedResponse => AbsentReason::MalformedResponse,
                };
                VariantOutcome::Absent(reason)
            }
        }
    }

    /// Capture an experiment event.
    ///
    /// Identity is read from the cookies at send time; anything missing
    /// (visitor id, session id, event type) is sent as `"unknown"` rather
    /// than failing. This method never returns an error and never panics:
    /// delivery failures are logged at debug level and dropped, and a
    /// disabled client drops the event outright.
    pub async fn capture(&self, capture: EventCapture) {
        let Some(inner) = &self.inner else {
            log::trace!(target: "atomic", "dropping event captured on a disabled client");
            return;
        };

        let record = capture.into_record(inner.store.visitor_id(), inner.store.session_id());
        if let Err(failure) = inner.transport.deliver_event(&record).await {
            log::debug!(target: "atomic", event_type = record.event_type; "failed to deliver event: {failure}");
        }
    }
}
