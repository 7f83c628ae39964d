//! Error types for client construction.
//!
//! Variant resolution and event capture never surface errors to the caller.
//! Failures there degrade to an absent variant (or a dropped event) and are
//! reported through [`log`], so everything in this module is produced by
//! [`Client::new`][crate::Client::new] alone.

use thiserror::Error;

/// Convenience alias for `Result` with [`enum@Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Enumeration of errors returned while configuring the client.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// API url was not provided.
    #[error("api_url is required for the client to work")]
    MissingApiUrl,

    /// Service role key was not provided.
    #[error("service_role_key is required for the client to work")]
    MissingServiceRoleKey,

    /// API url failed to parse as an absolute URL.
    #[error("invalid api_url configuration")]
    InvalidApiUrl(#[source] url::ParseError),

    /// No cookie handles were supplied and the target has no browser to fall
    /// back to. On non-wasm targets the host application owns the cookie
    /// exchange and must pass handles explicitly.
    #[error("cookie handles are required outside the browser")]
    MissingCookieHandles,
}
