//! Client configuration.

use crate::client::Client;
use crate::cookies::CookieHandles;
use crate::error::Result;

/// Configuration for [`Client`].
pub struct ClientConfig {
    pub(crate) api_url: String,
    pub(crate) service_role_key: String,
    pub(crate) cookies: Option<Box<dyn CookieHandles>>,
}

impl ClientConfig {
    /// Create a configuration from the two required options: the base URL of
    /// the experiment service and the key authorizing access to it.
    ///
    /// ```
    /// # use atomic_experiments::ClientConfig;
    /// ClientConfig::new("https://experiments.example.com", "service-role-key");
    /// ```
    pub fn new(api_url: impl Into<String>, service_role_key: impl Into<String>) -> ClientConfig {
        ClientConfig {
            api_url: api_url.into(),
            service_role_key: service_role_key.into(),
            cookies: None,
        }
    }

    /// Set the cookie backend identity and assignments are persisted
    /// through.
    ///
    /// Server integrations pass a request-scoped jar here (see
    /// [`MemoryCookies`][crate::MemoryCookies]). On `wasm32` this call is
    /// optional and the browser's own cookies are the default backend; on
    /// every other target leaving it out fails client construction.
    pub fn cookies(mut self, cookies: impl CookieHandles + 'static) -> ClientConfig {
        self.cookies = Some(Box::new(cookies));
        self
    }

    /// Create a new [`Client`] using the specified configuration.
    ///
    /// ```
    /// # use atomic_experiments::{Client, ClientConfig, MemoryCookies};
    /// let client: Client = ClientConfig::new("https://experiments.example.com", "service-role-key")
    ///     .cookies(MemoryCookies::new())
    ///     .to_client()
    ///     .unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is incomplete or invalid. See
    /// [`Error`][crate::Error] for the possible failures.
    pub fn to_client(self) -> Result<Client> {
        Client::new(self)
    }
}
