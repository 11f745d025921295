//! Directory client: one connection and one paged search per lookup.

use crate::{
    entry::DirectoryEntry,
    filter::{LookupRequest, SearchFilter},
    Result,
};
use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{DerefAliases, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions};
use native_tls::{Certificate, TlsConnector};
use secrecy::ExposeSecret;
use std::fmt;
use std::fs;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use userlookup_core::{Error, ServiceConfig};

/// Attributes requested for every user search.
pub const USER_ATTRIBUTES: &[&str] = &[
    "ugUsername",
    "ugKthid",
    "givenName",
    "sn",
    "displayName",
    "mail",
    "cn",
];

/// Page size for the paged search. Only the first entry is ever used.
pub const SEARCH_PAGE_SIZE: i32 = 1;

/// One open directory connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LdapSession: Send {
    /// Authenticates the connection.
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;

    /// Runs a subtree search with alias dereferencing disabled, collecting every page.
    async fn paged_search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[&'static str],
        page_size: i32,
    ) -> Result<Vec<DirectoryEntry>>;

    /// Closes the connection.
    async fn unbind(&mut self) -> Result<()>;
}

/// Opens a fresh [`LdapSession`] per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LdapConnector: Send + Sync {
    /// Connects to the directory server.
    async fn connect(&self) -> Result<Box<dyn LdapSession>>;
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Connect,
    Bind,
    Search,
}

impl Stage {
    fn timed_out(self, limit: Duration) -> Error {
        let message = format!("directory {self} timed out after {}s", limit.as_secs());
        match self {
            Self::Connect | Self::Bind => Error::DirectoryUnavailable(message),
            Self::Search => Error::DirectorySearchFailed(message),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Bind => "bind",
            Self::Search => "search",
        })
    }
}

/// Directory client with a pluggable LDAP backend.
///
/// Every [`lookup`](Self::lookup) opens its own connection, runs one search and closes the
/// connection again; nothing is shared between lookups.
pub struct DirectoryClient {
    config: Arc<ServiceConfig>,
    connector: Box<dyn LdapConnector>,
}

impl DirectoryClient {
    /// Creates a client that uses the real LDAP connector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if the TLS settings cannot be built.
    pub fn new(config: Arc<ServiceConfig>) -> Result<Self> {
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(config.clone())?);
        Ok(Self { config, connector })
    }

    /// Creates a client backed by a custom connector.
    #[must_use]
    pub fn with_connector(config: Arc<ServiceConfig>, connector: Box<dyn LdapConnector>) -> Self {
        Self { config, connector }
    }

    /// Looks up the single entry matching the request.
    ///
    /// Connecting and searching both race against `cancel`; whatever happens, a session that was
    /// opened is unbound exactly once before this returns. When the search yields more than one
    /// entry the first one wins and a warning is logged.
    ///
    /// # Errors
    ///
    /// - [`Error::DirectoryUnavailable`] if connecting or binding fails
    /// - [`Error::DirectorySearchFailed`] if the search fails or times out
    /// - [`Error::Cancelled`] if `cancel` fires first
    /// - [`Error::UserNotFound`] if nothing matched
    pub async fn lookup(
        &self,
        request: &LookupRequest,
        cancel: &CancellationToken,
    ) -> Result<DirectoryEntry> {
        let mut session = guarded(
            cancel,
            self.config.connection_timeout(),
            Stage::Connect,
            self.connector.connect(),
        )
        .await
        .map_err(|err| log_failure(request, Stage::Connect, err))?;

        let outcome = self.search(&mut *session, request, cancel).await;
        self.release(&mut *session).await;

        select_first(request, outcome?)
    }

    /// Binds if credentials are configured, then searches. Failures are logged with the stage
    /// that produced them.
    async fn search(
        &self,
        session: &mut dyn LdapSession,
        request: &LookupRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<DirectoryEntry>> {
        let limit = self.config.operation_timeout();

        if let Some(credentials) = self.config.bind_credentials() {
            guarded(
                cancel,
                limit,
                Stage::Bind,
                session.simple_bind(credentials.bind_dn(), credentials.password().expose_secret()),
            )
            .await
            .map_err(|err| log_failure(request, Stage::Bind, err))?;
        }

        let filter = SearchFilter::for_request(request);
        debug!(base_dn = self.config.base_dn(), %filter, "searching directory");
        guarded(
            cancel,
            limit,
            Stage::Search,
            session.paged_search(
                self.config.base_dn(),
                filter.as_str(),
                USER_ATTRIBUTES,
                SEARCH_PAGE_SIZE,
            ),
        )
        .await
        .map_err(|err| log_failure(request, Stage::Search, err))
    }

    async fn release(&self, session: &mut dyn LdapSession) {
        match timeout(self.config.operation_timeout(), session.unbind()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "failed to unbind directory session"),
            Err(_) => warn!("directory unbind timed out"),
        }
    }
}

async fn guarded<F, T>(
    cancel: &CancellationToken,
    limit: Duration,
    stage: Stage,
    operation: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled(format!("directory {stage} cancelled"))),
        outcome = timeout(limit, operation) => outcome.map_err(|_| stage.timed_out(limit))?,
    }
}

fn log_failure(request: &LookupRequest, stage: Stage, err: Error) -> Error {
    match &err {
        Error::Cancelled(_) => warn!(%request, %stage, error = %err, "directory lookup cancelled"),
        _ if err.should_log() => {
            error!(%request, %stage, error = %err, "directory lookup failed");
        }
        _ => debug!(%request, %stage, error = %err, "directory lookup failed"),
    }
    err
}

fn select_first(request: &LookupRequest, entries: Vec<DirectoryEntry>) -> Result<DirectoryEntry> {
    let count = entries.len();
    if count > 1 {
        // Directory order is not guaranteed to be stable across searches.
        warn!(%request, count, "found multiple entries, using the first");
    }
    entries.into_iter().next().ok_or_else(|| {
        debug!(%request, "no such user");
        Error::UserNotFound(request.to_string())
    })
}

/// Real LDAP connector backed by `ldap3`.
struct RealLdapConnector {
    config: Arc<ServiceConfig>,
    settings: LdapConnSettings,
}

impl RealLdapConnector {
    fn new(config: Arc<ServiceConfig>) -> Result<Self> {
        let settings = build_ldap_settings(&config)?;
        Ok(Self { config, settings })
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        let (conn, ldap) = LdapConnAsync::with_settings(self.settings.clone(), self.config.ldap_url())
            .await
            .map_err(|err| Error::DirectoryUnavailable(err.to_string()))?;
        let driver = tokio::spawn(async move {
            if let Err(err) = conn.drive().await {
                warn!(error = %err, "directory connection driver error");
            }
        });
        Ok(Box::new(RealLdapSession {
            inner: ldap,
            driver,
        }))
    }
}

/// Owns the connection driver so dropping the session mid-operation tears the socket down.
struct RealLdapSession {
    inner: ldap3::Ldap,
    driver: JoinHandle<()>,
}

impl Drop for RealLdapSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        self.inner
            .simple_bind(dn, password)
            .await
            .map_err(unavailable)?
            .success()
            .map_err(unavailable)?;
        Ok(())
    }

    async fn paged_search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[&'static str],
        page_size: i32,
    ) -> Result<Vec<DirectoryEntry>> {
        let adapters: Vec<Box<dyn Adapter<_, _>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(page_size)),
        ];
        let mut stream = self
            .inner
            .with_search_options(SearchOptions::new().deref(DerefAliases::Never))
            .streaming_search_with(adapters, base_dn, Scope::Subtree, filter, attributes.to_vec())
            .await
            .map_err(search_failed)?;

        let mut entries = Vec::new();
        while let Some(entry) = stream.next().await.map_err(search_failed)? {
            entries.push(DirectoryEntry::from(SearchEntry::construct(entry)));
        }
        stream.finish().await.success().map_err(search_failed)?;

        Ok(entries)
    }

    async fn unbind(&mut self) -> Result<()> {
        self.inner.unbind().await.map_err(unavailable)
    }
}

fn build_ldap_settings(config: &ServiceConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new().set_conn_timeout(config.connection_timeout());

    if !config.tls_verify() {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to construct TLS connector: {err}"))
            })?;
        settings = settings.set_connector(connector).set_no_tls_verify(true);
    } else if let Some(cert_path) = config.tls_ca_cert() {
        let pem = fs::read(cert_path).map_err(|err| {
            Error::ConfigError(format!(
                "failed to read LDAP CA certificate {}: {err}",
                cert_path.display()
            ))
        })?;
        let certificate = Certificate::from_pem(&pem)
            .map_err(|err| Error::ConfigError(format!("invalid LDAP CA certificate: {err}")))?;
        let connector = TlsConnector::builder()
            .add_root_certificate(certificate)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("failed to load LDAP CA certificate: {err}"))
            })?;
        settings = settings.set_connector(connector);
    }

    Ok(settings)
}

fn unavailable(err: ldap3::LdapError) -> Error {
    Error::DirectoryUnavailable(err.to_string())
}

fn search_failed(err: ldap3::LdapError) -> Error {
    Error::DirectorySearchFailed(err.to_string())
}
