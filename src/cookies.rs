//! Cookie abstraction.
//!
//! Every host environment exposes cookies differently: server frameworks hand
//! out request/response header access, browsers expose `document.cookie`.
//! [`CookieHandles`] is the small trait the rest of the crate programs
//! against, with [`MemoryCookies`] as the request-scoped server adapter and
//! `BrowserCookies` (wasm32 only) as the `document.cookie` backend.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters percent-encoded in cookie values. Controls plus the separators
/// that would corrupt a `Cookie:`/`Set-Cookie:` line.
const COOKIE_VALUE_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'%')
    .add(b',')
    .add(b';')
    .add(b'\\');

/// `SameSite` attribute of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// Sent on same-site requests and top-level navigations.
    Lax,
    /// Sent on same-site requests only.
    Strict,
    /// Sent on all requests. Browsers require `Secure` alongside this.
    None,
}

impl std::fmt::Display for SameSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        })
    }
}

/// `Priority` attribute of a cookie (eviction hint, Chromium extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookiePriority {
    /// First to be evicted under pressure.
    Low,
    /// Default eviction priority.
    Medium,
    /// Last to be evicted under pressure.
    High,
}

impl std::fmt::Display for CookiePriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CookiePriority::Low => "Low",
            CookiePriority::Medium => "Medium",
            CookiePriority::High => "High",
        })
    }
}

/// Attributes applied when persisting a cookie.
///
/// The default options describe a session cookie: no expiry, no max-age, no
/// scoping attributes.
///
/// # Examples
/// ```
/// # use atomic_experiments::{CookieOptions, SameSite};
/// let options = CookieOptions::new()
///     .max_age(3600)
///     .path("/")
///     .secure(true)
///     .same_site(SameSite::Lax);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CookieOptions {
    /// Absolute expiry, rendered as an RFC 1123 `Expires` attribute.
    pub expires: Option<DateTime<Utc>>,
    /// Lifetime in seconds. Takes precedence over `expires` in browsers.
    pub max_age: Option<u64>,
    /// Host scope of the cookie.
    pub domain: Option<String>,
    /// Path scope of the cookie.
    pub path: Option<String>,
    /// Only send over TLS.
    pub secure: bool,
    /// Hide from client-side script access.
    pub http_only: bool,
    /// Cross-site sending policy.
    pub same_site: Option<SameSite>,
    /// Partition the cookie by top-level site.
    pub partitioned: bool,
    /// Eviction priority hint.
    pub priority: Option<CookiePriority>,
    /// Store the value byte-for-byte instead of percent-encoding it. The
    /// caller is then responsible for keeping separators out of the value.
    pub raw_value: bool,
}

impl CookieOptions {
    /// Creates options for a session cookie with no attributes set.
    pub fn new() -> CookieOptions {
        CookieOptions::default()
    }

    /// Sets an absolute expiry date.
    pub fn expires(mut self, expires: DateTime<Utc>) -> CookieOptions {
        self.expires = Some(expires);
        self
    }

    /// Sets the lifetime in seconds.
    pub fn max_age(mut self, seconds: u64) -> CookieOptions {
        self.max_age = Some(seconds);
        self
    }

    /// Sets the host scope.
    pub fn domain(mut self, domain: impl Into<String>) -> CookieOptions {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the path scope.
    pub fn path(mut self, path: impl Into<String>) -> CookieOptions {
        self.path = Some(path.into());
        self
    }

    /// Restricts the cookie to TLS connections.
    pub fn secure(mut self, secure: bool) -> CookieOptions {
        self.secure = secure;
        self
    }

    /// Hides the cookie from client-side scripts.
    pub fn http_only(mut self, http_only: bool) -> CookieOptions {
        self.http_only = http_only;
        self
    }

    /// Sets the cross-site sending policy.
    pub fn same_site(mut self, same_site: SameSite) -> CookieOptions {
        self.same_site = Some(same_site);
        self
    }

    /// Partitions the cookie by top-level site.
    pub fn partitioned(mut self, partitioned: bool) -> CookieOptions {
        self.partitioned = partitioned;
        self
    }

    /// Sets the eviction priority hint.
    pub fn priority(mut self, priority: CookiePriority) -> CookieOptions {
        self.priority = Some(priority);
        self
    }

    /// Disables percent-encoding of the value.
    pub fn raw_value(mut self, raw_value: bool) -> CookieOptions {
        self.raw_value = raw_value;
        self
    }
}

/// Uniform cookie access for one host environment.
///
/// Implementations adapt whatever the host exposes to plain get/set/delete
/// calls. Reads return the logical (decoded) value; writes receive it and
/// apply their own encoding. Implementations must be safe to share across
/// threads because the client that owns them is.
pub trait CookieHandles: Send + Sync {
    /// Returns the value of a single cookie, if present.
    fn get(&self, name: &str) -> Option<String>;

    /// Returns every cookie visible to this backend.
    fn all(&self) -> HashMap<String, String>;

    /// Persists a cookie with the given attributes.
    fn set(&self, name: &str, value: &str, options: &CookieOptions);

    /// Removes a cookie.
    fn delete(&self, name: &str);
}

// Lets a caller keep a handle on a jar (e.g. to export headers at the end
// of a request) after handing it to the client.
impl<T: CookieHandles + ?Sized> CookieHandles for std::sync::Arc<T> {
    fn get(&self, name: &str) -> Option<String> {
        (**self).get(name)
    }

    fn all(&self) -> HashMap<String, String> {
        (**self).all()
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) {
        (**self).set(name, value, options)
    }

    fn delete(&self, name: &str) {
        (**self).delete(name)
    }
}

/// Renders a `Set-Cookie`-style string for a name, value, and attributes.
///
/// This is the exact string `BrowserCookies` assigns to `document.cookie`
/// and [`MemoryCookies`] exports per mutation, so server adapters can relay
/// it as a response header verbatim.
pub fn format_set_cookie(name: &str, value: &str, options: &CookieOptions) -> String {
    let mut header = if options.raw_value {
        format!("{name}={value}")
    } else {
        format!("{name}={}", utf8_percent_encode(value, COOKIE_VALUE_ENCODE))
    };
    if let Some(domain) = &options.domain {
        header.push_str(&format!("; Domain={domain}"));
    }
    if let Some(path) = &options.path {
        header.push_str(&format!("; Path={path}"));
    }
    if let Some(expires) = &options.expires {
        header.push_str(&format!(
            "; Expires={}",
            expires.format("%a, %d %b %Y %H:%M:%S GMT")
        ));
    }
    if let Some(max_age) = options.max_age {
        header.push_str(&format!("; Max-Age={max_age}"));
    }
    if options.http_only {
        header.push_str("; HttpOnly");
    }
    if options.secure {
        header.push_str("; Secure");
    }
    if let Some(same_site) = options.same_site {
        header.push_str(&format!("; SameSite={same_site}"));
    }
    if options.partitioned {
        header.push_str("; Partitioned");
    }
    if let Some(priority) = options.priority {
        header.push_str(&format!("; Priority={priority}"));
    }
    header
}

/// Parses a `Cookie:` request header (or a `document.cookie` string) into a
/// name/value map.
///
/// Segments without `=` are skipped. Values are percent-decoded; a value
/// that fails to decode as UTF-8 is kept byte-for-byte.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|segment| {
            let (name, value) = segment.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim();
            // Cookie values are occasionally shipped inside double quotes.
            let value = value
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
                .unwrap_or(value);
            Some((name.to_string(), decode_value(value)))
        })
        .collect()
}

fn decode_value(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// In-memory cookie jar for server-side use.
///
/// A server integration creates one per request, seeded from the incoming
/// `Cookie:` header, and relays [`set_cookie_headers`][Self::set_cookie_headers]
/// back as `Set-Cookie` response headers once the request is done.
///
/// # Examples
/// ```
/// # use atomic_experiments::{CookieHandles, MemoryCookies};
/// let cookies = MemoryCookies::from_cookie_header("atomic_uid=v-1; theme=dark");
/// assert_eq!(cookies.get("atomic_uid").as_deref(), Some("v-1"));
/// ```
#[derive(Default)]
pub struct MemoryCookies {
    inner: Mutex<MemoryJar>,
}

#[derive(Default)]
struct MemoryJar {
    values: HashMap<String, String>,
    // Rendered Set-Cookie headers in mutation order. Duplicates are kept;
    // receivers apply them sequentially like a browser would.
    headers: Vec<String>,
}

impl MemoryCookies {
    /// Creates an empty jar.
    pub fn new() -> MemoryCookies {
        MemoryCookies::default()
    }

    /// Creates a jar seeded from a `Cookie:` request header.
    pub fn from_cookie_header(header: &str) -> MemoryCookies {
        MemoryCookies {
            inner: Mutex::new(MemoryJar {
                values: parse_cookie_header(header),
                headers: Vec::new(),
            }),
        }
    }

    /// Returns the `Set-Cookie` header strings accumulated by `set` and
    /// `delete` calls, in mutation order.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.lock().headers.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<MemoryJar> {
        // Only lock poisoning can fail here and jar operations do not panic.
        self.inner
            .lock()
            .expect("thread holding cookie jar lock should not panic")
    }
}

impl CookieHandles for MemoryCookies {
    fn get(&self, name: &str) -> Option<String> {
        self.lock().values.get(name).cloned()
    }

    fn all(&self) -> HashMap<String, String> {
        self.lock().values.clone()
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) {
        let header = format_set_cookie(name, value, options);
        let mut jar = self.lock();
        jar.values.insert(name.to_string(), value.to_string());
        jar.headers.push(header);
    }

    fn delete(&self, name: &str) {
        let mut jar = self.lock();
        jar.values.remove(name);
        jar.headers.push(format!("{name}=; Max-Age=0"));
    }
}

/// Cookie backend over `document.cookie`.
///
/// This is the default backend on `wasm32` when the client is built without
/// explicit handles. Reads parse the full `document.cookie` string; writes
/// assign a rendered cookie string back to it. Outside a browsing context
/// (no `window`/`document`) reads come back empty and writes are dropped
/// with a warning.
#[cfg(target_arch = "wasm32")]
#[derive(Default)]
pub struct BrowserCookies;

#[cfg(target_arch = "wasm32")]
impl BrowserCookies {
    /// Creates the `document.cookie` backend.
    pub fn new() -> BrowserCookies {
        BrowserCookies
    }

    fn document() -> Option<web_sys::HtmlDocument> {
        use wasm_bindgen::JsCast;
        web_sys::window()?
            .document()?
            .dyn_into::<web_sys::HtmlDocument>()
            .ok()
    }

    fn raw_cookies() -> Option<String> {
        Self::document()?.cookie().ok()
    }

    fn write(cookie: &str) {
        let Some(document) = Self::document() else {
            log::warn!(target: "atomic", "no browser document available; dropping cookie write");
            return;
        };
        if document.set_cookie(cookie).is_err() {
            log::warn!(target: "atomic", "failed to write document.cookie");
        }
    }
}

#[cfg(target_arch = "wasm32")]
impl CookieHandles for BrowserCookies {
    fn get(&self, name: &str) -> Option<String> {
        let raw = Self::raw_cookies()?;
        parse_cookie_header(&raw).remove(name)
    }

    fn all(&self) -> HashMap<String, String> {
        Self::raw_cookies()
            .map(|raw| parse_cookie_header(&raw))
            .unwrap_or_default()
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) {
        Self::write(&format_set_cookie(name, value, options));
    }

    fn delete(&self, name: &str) {
        Self::write(&format!("{name}=; Max-Age=0"));
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parses_cookie_header() {
        let cookies = parse_cookie_header("atomic_uid=v-1; theme=dark;lang=en");
        assert_eq!(cookies.get("atomic_uid").map(String::as_str), Some("v-1"));
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(cookies.get("lang").map(String::as_str), Some("en"));
    }

    #[test]
    fn parse_skips_malformed_segments() {
        let cookies = parse_cookie_header("orphan; =nameless; ok=1;");
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies.get("ok").map(String::as_str), Some("1"));
    }

    #[test]
    fn parse_handles_empty_header() {
        assert!(parse_cookie_header("").is_empty());
    }

    #[test]
    fn parse_decodes_values() {
        let cookies = parse_cookie_header("a=hello%20world; b=\"quoted\"");
        assert_eq!(cookies.get("a").map(String::as_str), Some("hello world"));
        assert_eq!(cookies.get("b").map(String::as_str), Some("quoted"));
    }

    #[test]
    fn parse_keeps_undecodable_values() {
        let cookies = parse_cookie_header("bad=%FF%FE");
        assert_eq!(cookies.get("bad").map(String::as_str), Some("%FF%FE"));
    }

    #[test]
    fn formats_session_cookie() {
        assert_eq!(
            format_set_cookie("atomic_sid", "s-1", &CookieOptions::new()),
            "atomic_sid=s-1"
        );
    }

    #[test]
    fn formats_all_attributes() {
        let expires = chrono::Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let options = CookieOptions::new()
            .domain("example.com")
            .path("/")
            .expires(expires)
            .max_age(600)
            .http_only(true)
            .secure(true)
            .same_site(SameSite::None)
            .partitioned(true)
            .priority(CookiePriority::High);
        assert_eq!(
            format_set_cookie("name", "value", &options),
            "name=value; Domain=example.com; Path=/; \
             Expires=Wed, 02 Jan 2030 03:04:05 GMT; Max-Age=600; \
             HttpOnly; Secure; SameSite=None; Partitioned; Priority=High"
        );
    }

    #[test]
    fn format_encodes_value() {
        assert_eq!(
            format_set_cookie("a", "hello world;", &CookieOptions::new()),
            "a=hello%20world%3B"
        );
        assert_eq!(
            format_set_cookie("a", "hello world", &CookieOptions::new().raw_value(true)),
            "a=hello world"
        );
    }

    #[test]
    fn format_then_parse_round_trips() {
        let header = format_set_cookie("k", "v with spaces", &CookieOptions::new());
        let parsed = parse_cookie_header(&header);
        assert_eq!(parsed.get("k").map(String::as_str), Some("v with spaces"));
    }

    #[test]
    fn memory_jar_set_get_delete() {
        let cookies = MemoryCookies::new();
        assert_eq!(cookies.get("missing"), None);

        cookies.set("atomic_uid", "v-1", &CookieOptions::new());
        assert_eq!(cookies.get("atomic_uid").as_deref(), Some("v-1"));
        assert_eq!(cookies.all().len(), 1);

        cookies.delete("atomic_uid");
        assert_eq!(cookies.get("atomic_uid"), None);
    }

    #[test]
    fn memory_jar_seeds_from_header() {
        let cookies = MemoryCookies::from_cookie_header("atomic_uid=v-1; other=x");
        assert_eq!(cookies.get("atomic_uid").as_deref(), Some("v-1"));
        assert_eq!(cookies.all().len(), 2);
        // Seeding is not a mutation; nothing to relay yet.
        assert!(cookies.set_cookie_headers().is_empty());
    }

    #[test]
    fn memory_jar_exports_mutations_in_order() {
        let cookies = MemoryCookies::new();
        cookies.set("a", "1", &CookieOptions::new().max_age(60));
        cookies.set("b", "2", &CookieOptions::new());
        cookies.delete("a");

        assert_eq!(
            cookies.set_cookie_headers(),
            vec![
                "a=1; Max-Age=60".to_string(),
                "b=2".to_string(),
                "a=; Max-Age=0".to_string(),
            ]
        );
    }

    #[test]
    fn memory_jar_get_returns_logical_value() {
        let cookies = MemoryCookies::new();
        cookies.set("a", "hello world", &CookieOptions::new());
        // The exported header is encoded; reads are not.
        assert_eq!(cookies.get("a").as_deref(), Some("hello world"));
        assert_eq!(cookies.set_cookie_headers(), vec!["a=hello%20world".to_string()]);
    }
}
