//! Identity and assignment persistence.
//!
//! [`CookieStore`] owns a [`CookieHandles`] backend and implements the cookie
//! naming scheme shared by all SDKs talking to the same collector: who the
//! visitor is (`atomic_uid`), which browsing session this is (`atomic_sid`),
//! and which variant a flag/epoch pair resolved to
//! (`atomic_{feature_flag}_{epoch}`).

use crate::cookies::{CookieHandles, CookieOptions};
use crate::error::Result;
use crate::Str;

/// Name of the visitor identity cookie.
pub const VISITOR_COOKIE: &str = "atomic_uid";

/// Name of the session identity cookie.
pub const SESSION_COOKIE: &str = "atomic_sid";

// Visitor identity must outlive any individual experiment.
const VISITOR_MAX_AGE: u64 = 60 * 60 * 24 * 365 * 100;

// Resolved assignments stay pinned for a year. An epoch bump moves traffic
// to a fresh cookie name well before this expires.
const ASSIGNMENT_MAX_AGE: u64 = 60 * 60 * 24 * 365;

/// Returns the name of the assignment cookie for a flag and epoch.
///
/// # Examples
/// ```
/// # use atomic_experiments::assignment_cookie_name;
/// assert_eq!(assignment_cookie_name("checkout-button", 7), "atomic_checkout-button_7");
/// ```
pub fn assignment_cookie_name(feature_flag: &str, epoch: u64) -> String {
    format!("atomic_{feature_flag}_{epoch}")
}

/// Visitor identity and variant assignments, persisted as cookies.
///
/// Reads named `*_id`/`assignment` are pure; the `get_or_create_*`
/// operations persist on first use and are idempotent for the lifetime of
/// the underlying cookie.
pub struct CookieStore {
    handles: Box<dyn CookieHandles>,
}

impl CookieStore {
    /// Creates a store over the given cookie backend.
    pub fn with_handles(handles: impl CookieHandles + 'static) -> CookieStore {
        CookieStore {
            handles: Box::new(handles),
        }
    }

    /// Creates a store from optional caller-supplied handles, falling back
    /// to the target's default backend.
    pub(crate) fn new(handles: Option<Box<dyn CookieHandles>>) -> Result<CookieStore> {
        match handles {
            Some(handles) => Ok(CookieStore { handles }),
            None => CookieStore::default_handles(),
        }
    }

    // In a browser build the document's cookies are the natural backend.
    #[cfg(target_arch = "wasm32")]
    fn default_handles() -> Result<CookieStore> {
        Ok(CookieStore {
            handles: Box::new(crate::cookies::BrowserCookies::new()),
        })
    }

    // Everywhere else the host application owns the cookie exchange and has
    // to say how cookies are read and written.
    #[cfg(not(target_arch = "wasm32"))]
    fn default_handles() -> Result<CookieStore> {
        Err(crate::error::Error::MissingCookieHandles)
    }

    /// Returns the visitor id, creating and persisting one if absent.
    ///
    /// An existing cookie always wins. Otherwise `provided` is used when
    /// given (e.g. an id carried over from another system), or a fresh
    /// UUID v4 is generated. The resulting id is persisted with a 100-year
    /// max-age, so repeated calls return the same value.
    pub fn get_or_create_visitor_id(&self, provided: Option<&str>) -> Str {
        if let Some(existing) = self.visitor_id() {
            return existing;
        }
        let visitor_id = new_id(provided);
        self.handles.set(
            VISITOR_COOKIE,
            &visitor_id,
            &CookieOptions::new().max_age(VISITOR_MAX_AGE),
        );
        log::debug!(target: "atomic", visitor_id; "created visitor id");
        visitor_id
    }

    /// Returns the session id, creating and persisting one if absent.
    ///
    /// Same contract as [`get_or_create_visitor_id`][Self::get_or_create_visitor_id],
    /// but the cookie carries no max-age: its lifetime is the host's notion
    /// of a browsing session.
    pub fn get_or_create_session_id(&self, provided: Option<&str>) -> Str {
        if let Some(existing) = self.session_id() {
            return existing;
        }
        let session_id = new_id(provided);
        self.handles
            .set(SESSION_COOKIE, &session_id, &CookieOptions::new());
        session_id
    }

    /// Returns the visitor id cookie value without creating one.
    pub fn visitor_id(&self) -> Option<Str> {
        self.handles.get(VISITOR_COOKIE).map(Str::from)
    }

    /// Returns the session id cookie value without creating one.
    pub fn session_id(&self) -> Option<Str> {
        self.handles.get(SESSION_COOKIE).map(Str::from)
    }

    /// Returns the persisted variant for a flag and epoch, if any.
    ///
    /// An empty cookie value reads as no assignment.
    pub fn assignment(&self, feature_flag: &str, epoch: u64) -> Option<Str> {
        self.handles
            .get(&assignment_cookie_name(feature_flag, epoch))
            .filter(|variant_id| !variant_id.is_empty())
            .map(Str::from)
    }

    /// Persists a resolved variant for a flag and epoch.
    ///
    /// Once written, [`assignment`][Self::assignment] serves this value for
    /// every later lookup of the same pair, so resolution happens at most
    /// once per visitor and epoch.
    pub fn set_assignment(&self, feature_flag: &str, epoch: u64, variant_id: &str) {
        self.handles.set(
            &assignment_cookie_name(feature_flag, epoch),
            variant_id,
            &CookieOptions::new().max_age(ASSIGNMENT_MAX_AGE),
        );
    }
}

fn new_id(provided: Option<&str>) -> Str {
    match provided {
        Some(provided) => provided.into(),
        None => uuid::Uuid::new_v4().to_string().into(),
    }
}
