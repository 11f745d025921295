//! Shared fakes for driving the router without a directory server.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tracing::subscriber::DefaultGuard;
use userlookup_core::{Error, Result, ServiceConfig};
use userlookup_ldap::{DirectoryClient, DirectoryEntry, LdapConnector, LdapSession};
use userlookup_server::{build_router, AppState};

/// Counters observed by the tests.
#[derive(Debug, Default)]
pub struct Recorder {
    pub connects: AtomicUsize,
    pub searches: AtomicUsize,
    pub unbinds: AtomicUsize,
    pub dropped: AtomicBool,
    pub search_started: Notify,
}

impl Recorder {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn unbinds(&self) -> usize {
        self.unbinds.load(Ordering::SeqCst)
    }

    pub fn dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

/// How the fake directory answers a search.
#[derive(Debug, Clone)]
pub enum Behaviour {
    Entries(Vec<DirectoryEntry>),
    BindError,
    SearchError,
    ConnectError,
    Hang,
}

pub struct FakeConnector {
    behaviour: Behaviour,
    recorder: Arc<Recorder>,
}

#[async_trait]
impl LdapConnector for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        self.recorder.connects.fetch_add(1, Ordering::SeqCst);
        if matches!(self.behaviour, Behaviour::ConnectError) {
            return Err(Error::DirectoryUnavailable("connection refused".to_string()));
        }
        Ok(Box::new(FakeSession {
            behaviour: self.behaviour.clone(),
            recorder: self.recorder.clone(),
        }))
    }
}

struct FakeSession {
    behaviour: Behaviour,
    recorder: Arc<Recorder>,
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.recorder.dropped.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl LdapSession for FakeSession {
    async fn simple_bind(&mut self, _dn: &str, _password: &str) -> Result<()> {
        if matches!(self.behaviour, Behaviour::BindError) {
            return Err(Error::DirectoryUnavailable("invalidCredentials".to_string()));
        }
        Ok(())
    }

    async fn paged_search(
        &mut self,
        _base_dn: &str,
        _filter: &str,
        _attributes: &[&'static str],
        _page_size: i32,
    ) -> Result<Vec<DirectoryEntry>> {
        self.recorder.searches.fetch_add(1, Ordering::SeqCst);
        self.recorder.search_started.notify_one();
        match &self.behaviour {
            Behaviour::Entries(entries) => Ok(entries.clone()),
            Behaviour::SearchError => Err(Error::DirectorySearchFailed(
                "operations error".to_string(),
            )),
            Behaviour::ConnectError | Behaviour::BindError => {
                unreachable!("session failed before searching")
            }
            Behaviour::Hang => std::future::pending().await,
        }
    }

    async fn unbind(&mut self) -> Result<()> {
        self.recorder.unbinds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub recorder: Arc<Recorder>,
    pub shutdown: CancellationToken,
}

pub fn test_config() -> ServiceConfig {
    ServiceConfig::new("ldap://ldap.example.com", "127.0.0.1:0".parse().unwrap()).unwrap()
}

pub fn app(behaviour: Behaviour) -> TestApp {
    app_with_config(behaviour, test_config())
}

pub fn app_with_config(behaviour: Behaviour, config: ServiceConfig) -> TestApp {
    let recorder = Arc::new(Recorder::default());
    let config = Arc::new(config);
    let connector = FakeConnector {
        behaviour,
        recorder: recorder.clone(),
    };
    let directory = DirectoryClient::with_connector(config.clone(), Box::new(connector));
    let shutdown = CancellationToken::new();
    let state = AppState::new(config, directory, shutdown.clone());
    TestApp {
        router: build_router(state),
        recorder,
        shutdown,
    }
}

pub fn user_entry(pairs: &[(&str, &str)]) -> DirectoryEntry {
    let attributes = pairs
        .iter()
        .map(|(name, value)| ((*name).to_string(), vec![(*value).to_string()]))
        .collect::<HashMap<_, _>>();
    DirectoryEntry::new("ugUsername=abc123,ou=Addressbook,dc=kth,dc=se", attributes)
}

pub fn ada() -> DirectoryEntry {
    user_entry(&[
        ("ugUsername", "abc123"),
        ("ugKthid", "u1x2y3"),
        ("givenName", "Ada"),
        ("sn", "Lovelace"),
        ("displayName", "Ada Lovelace"),
        ("mail", "abc123@kth.se"),
        ("cn", "Ada Lovelace (abc123)"),
    ])
}

pub async fn get(router: Router, uri: &str) -> Response {
    router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn post_form(router: Router, uri: &str, body: &str) -> Response {
    router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Log lines captured from the current thread.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Routes this thread's events into the buffer until the guard drops.
    pub fn install(&self) -> DefaultGuard {
        let sink = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// The first captured line containing `needle`.
    pub fn line_with(&self, needle: &str) -> Option<String> {
        self.contents()
            .lines()
            .find(|line| line.contains(needle))
            .map(str::to_owned)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
