//! The Rust SDK for Atomic, a cookie-based A/B experimentation platform.
//!
//! # Overview
//!
//! The SDK revolves around a [`Client`] that assigns visitors to experiment
//! variants and captures the events (exposures, interactions, conversions)
//! that make the experiment measurable. A visitor's identity and resolved
//! assignments live in cookies, so assignments are stable across requests
//! and page loads without any server-side session state.
//!
//! Variant lookup is layered: an existing assignment cookie answers locally
//! and instantly; otherwise the visitor's deterministic hash bucket is sent
//! to the experiment service and the answer is pinned to a cookie for next
//! time. [`VariantOutcome`] tells these cases apart.
//!
//! # Cookies
//!
//! Cookie access differs per host environment, so the client is generic over
//! [`CookieHandles`]. Server integrations hand the client a request-scoped
//! [`MemoryCookies`] jar seeded from the `Cookie:` header and relay the jar's
//! accumulated `Set-Cookie` headers into the response. On `wasm32` the
//! browser's `document.cookie` is the default backend.
//!
//! # Error Handling
//!
//! Only construction can fail, with an [`Error`]. Everything at runtime
//! degrades instead: lookups come back [`VariantOutcome::Absent`] and event
//! captures are dropped after a log message, because an experiment must
//! never take the feature it is testing down with it.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for
//! logging messages, all under the `atomic` target. Consider integrating a
//! `log`-compatible logger implementation for better visibility into SDK
//! operations.
//!
//! # Examples
//!
//! ```no_run
//! # async fn example() {
//! use atomic_experiments::{ClientConfig, EventCapture, MemoryCookies, event_types};
//!
//! let client = ClientConfig::new("https://experiments.example.com", "service-role-key")
//!     .cookies(MemoryCookies::from_cookie_header("atomic_uid=v-1"))
//!     .to_client()
//!     .unwrap();
//!
//! let variant = client
//!     .get_variant("checkout-button", 7, &["variant-a".into(), "variant-b".into()])
//!     .await;
//! println!("Variant: {variant:?}");
//!
//! client
//!     .capture(
//!         EventCapture::new()
//!             .event_type(event_types::CONVERSION)
//!             .feature_flag("checkout-button")
//!             .experiment_epoch(7),
//!     )
//!     .await;
//! # }
//! ```
//!
//! A complete runnable walkthrough lives in `demos/simple.rs`.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod bucketing;
mod client;
mod config;
mod cookie_store;
mod cookies;
mod error;
mod events;
mod str;
mod tracker;
mod transport;

pub use bucketing::{bucket_input, Bucketer, Sha256Bucketer, TOTAL_BUCKETS};
pub use client::{AbsentReason, Client, Identity, VariantOutcome};
pub use config::ClientConfig;
pub use cookie_store::{assignment_cookie_name, CookieStore, SESSION_COOKIE, VISITOR_COOKIE};
#[cfg(target_arch = "wasm32")]
pub use cookies::BrowserCookies;
pub use cookies::{
    format_set_cookie, parse_cookie_header, CookieHandles, CookieOptions, CookiePriority,
    MemoryCookies, SameSite,
};
pub use error::{Error, Result};
pub use events::{event_types, EventCapture, EventRecord};
pub use str::Str;
pub use tracker::{VariantTracker, DEFAULT_VISIBILITY_THRESHOLD};
