//! Configuration for the lookup service.
//!
//! The configuration is built once at startup and shared read-only afterwards. Nothing in the
//! lookup path reads process state; [`ServiceConfig::from_lookup`] takes the key lookup as a
//! parameter so callers decide where values come from.

use crate::{Error, Result};
use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Default search base for user entries.
pub const DEFAULT_BASE_DN: &str = "ou=Addressbook,dc=kth,dc=se";
/// Default mail domain used by the consistency check.
pub const DEFAULT_MAIL_DOMAIN: &str = "kth.se";
/// Default connection timeout (seconds).
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 10;
/// Default operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

/// Environment keys understood by [`ServiceConfig::from_lookup`].
pub mod keys {
    /// Directory server URL (required).
    pub const LDAP_URL: &str = "LDAP_URL";
    /// Local listen address (required).
    pub const LISTEN_ADDRESS: &str = "LISTEN_ADDRESS";
    /// Search base DN.
    pub const LDAP_BASE_DN: &str = "LDAP_BASE_DN";
    /// Mail domain for the consistency check.
    pub const MAIL_DOMAIN: &str = "MAIL_DOMAIN";
    /// Optional bind DN.
    pub const LDAP_BIND_DN: &str = "LDAP_BIND_DN";
    /// Optional bind password.
    pub const LDAP_BIND_PASSWORD: &str = "LDAP_BIND_PASSWORD";
    /// TLS certificate verification toggle.
    pub const LDAP_TLS_VERIFY: &str = "LDAP_TLS_VERIFY";
    /// Custom CA certificate path.
    pub const LDAP_TLS_CA_CERT: &str = "LDAP_TLS_CA_CERT";
    /// Connection timeout in seconds.
    pub const LDAP_CONNECT_TIMEOUT_SECS: &str = "LDAP_CONNECT_TIMEOUT_SECS";
    /// Operation timeout in seconds.
    pub const LDAP_OPERATION_TIMEOUT_SECS: &str = "LDAP_OPERATION_TIMEOUT_SECS";
}

/// Credentials for an authenticated bind before searching.
#[derive(Debug)]
pub struct BindCredentials {
    bind_dn: String,
    password: SecretString,
}

impl BindCredentials {
    /// Creates new bind credentials.
    #[must_use]
    pub fn new(bind_dn: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            bind_dn: bind_dn.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Get the LDAP bind DN.
    #[must_use]
    pub fn bind_dn(&self) -> &str {
        &self.bind_dn
    }

    /// Get the LDAP bind password.
    #[must_use]
    pub const fn password(&self) -> &SecretString {
        &self.password
    }
}

/// Configuration for the lookup service.
#[derive(Debug, Validate)]
pub struct ServiceConfig {
    #[validate(url)]
    ldap_url: String,

    listen_address: SocketAddr,

    #[validate(length(min = 1))]
    base_dn: String,

    #[validate(length(min = 1))]
    mail_domain: String,

    bind: Option<BindCredentials>,

    tls_verify: bool,

    tls_ca_cert: Option<PathBuf>,

    #[validate(range(min = 1, max = 300))]
    connection_timeout_secs: u64,

    #[validate(range(min = 1, max = 300))]
    operation_timeout_secs: u64,
}

impl ServiceConfig {
    /// Creates a configuration from the two required values, using defaults for the rest.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the URL is invalid.
    pub fn new(ldap_url: impl Into<String>, listen_address: SocketAddr) -> Result<Self> {
        let ldap_url = ldap_url.into();
        Url::parse(&ldap_url)?;

        let config = Self {
            ldap_url,
            listen_address,
            base_dn: DEFAULT_BASE_DN.to_string(),
            mail_domain: DEFAULT_MAIL_DOMAIN.to_string(),
            bind: None,
            tls_verify: true,
            tls_ca_cert: None,
            connection_timeout_secs: DEFAULT_CONNECTION_TIMEOUT_SECS,
            operation_timeout_secs: DEFAULT_OPERATION_TIMEOUT_SECS,
        };
        config.validate()?;
        Ok(config)
    }

    /// Builds the configuration from a key lookup such as `|key| std::env::var(key).ok()`.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] when a required key is missing or any value fails to
    /// parse or validate.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let ldap_url = get(keys::LDAP_URL).ok_or_else(|| missing(keys::LDAP_URL))?;
        let listen_address = get(keys::LISTEN_ADDRESS)
            .ok_or_else(|| missing(keys::LISTEN_ADDRESS))?
            .parse::<SocketAddr>()
            .map_err(|err| {
                Error::ConfigError(format!("{} is not a socket address: {err}", keys::LISTEN_ADDRESS))
            })?;

        let mut config = Self::new(ldap_url, listen_address)?;

        if let Some(base_dn) = get(keys::LDAP_BASE_DN) {
            config = config.with_base_dn(base_dn);
        }
        if let Some(domain) = get(keys::MAIL_DOMAIN) {
            config = config.with_mail_domain(domain);
        }
        match (get(keys::LDAP_BIND_DN), get(keys::LDAP_BIND_PASSWORD)) {
            (Some(dn), Some(password)) => {
                config = config.with_bind_credentials(BindCredentials::new(dn, password));
            }
            (None, None) => {}
            _ => {
                return Err(Error::ConfigError(format!(
                    "{} and {} must be set together",
                    keys::LDAP_BIND_DN,
                    keys::LDAP_BIND_PASSWORD
                )))
            }
        }
        if let Some(verify) = get(keys::LDAP_TLS_VERIFY) {
            config = config.with_tls_verification(parse_bool(keys::LDAP_TLS_VERIFY, &verify)?);
        }
        if let Some(path) = get(keys::LDAP_TLS_CA_CERT) {
            config = config.with_tls_ca_cert(PathBuf::from(path));
        }
        if let Some(secs) = get(keys::LDAP_CONNECT_TIMEOUT_SECS) {
            config = config
                .with_connection_timeout_secs(parse_secs(keys::LDAP_CONNECT_TIMEOUT_SECS, &secs)?);
        }
        if let Some(secs) = get(keys::LDAP_OPERATION_TIMEOUT_SECS) {
            config = config
                .with_operation_timeout_secs(parse_secs(keys::LDAP_OPERATION_TIMEOUT_SECS, &secs)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Returns the directory server URL.
    #[must_use]
    pub fn ldap_url(&self) -> &str {
        &self.ldap_url
    }

    /// Returns the address the HTTP listener binds to.
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Returns the search base distinguished name.
    #[must_use]
    pub fn base_dn(&self) -> &str {
        &self.base_dn
    }

    /// Returns the mail domain expected in user entries.
    #[must_use]
    pub fn mail_domain(&self) -> &str {
        &self.mail_domain
    }

    /// Returns the bind credentials, if the directory requires an authenticated bind.
    #[must_use]
    pub const fn bind_credentials(&self) -> Option<&BindCredentials> {
        self.bind.as_ref()
    }

    /// Returns whether TLS certificate verification is enabled.
    #[must_use]
    pub const fn tls_verify(&self) -> bool {
        self.tls_verify
    }

    /// Optional custom CA certificate path.
    #[must_use]
    pub fn tls_ca_cert(&self) -> Option<&PathBuf> {
        self.tls_ca_cert.as_ref()
    }

    /// Returns the connection timeout duration.
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// Returns the operation timeout duration.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Overrides the search base distinguished name.
    #[must_use]
    pub fn with_base_dn(mut self, dn: impl Into<String>) -> Self {
        self.base_dn = dn.into();
        self
    }

    /// Overrides the mail domain used by the consistency check.
    #[must_use]
    pub fn with_mail_domain(mut self, domain: impl Into<String>) -> Self {
        self.mail_domain = domain.into();
        self
    }

    /// Binds with the given credentials before every search.
    #[must_use]
    pub fn with_bind_credentials(mut self, credentials: BindCredentials) -> Self {
        self.bind = Some(credentials);
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets the custom CA certificate path for TLS verification.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connection_timeout_secs(mut self, seconds: u64) -> Self {
        self.connection_timeout_secs = seconds;
        self
    }

    /// Overrides the operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }
}

fn missing(key: &str) -> Error {
    Error::ConfigError(format!("{key} must be set"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(Error::ConfigError(format!("{key} is not a boolean: `{other}`"))),
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|err| Error::ConfigError(format!("{key} is not a number of seconds: {err}")))
}
