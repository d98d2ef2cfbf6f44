//! Test doubles standing in for the network and the store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use swcache_client::Fetcher;
use swcache_core::{BlobStore, Error, MemoryStore, Request, Response, ResponseType};

pub(crate) const ORIGIN: &str = "https://user.github.io";

pub(crate) fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

struct Route {
    status: u16,
    response_type: ResponseType,
    body: String,
}

/// Fetcher answering from a fixed route table.
#[derive(Default)]
pub(crate) struct StubFetcher {
    routes: Mutex<HashMap<String, Route>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route(self, url: &str, status: u16, response_type: ResponseType, body: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route { status, response_type, body: body.to_string() });
        self
    }

    pub(crate) fn page(self, url: &str, body: &str) -> Self {
        self.route(url, 200, ResponseType::Basic, body)
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".to_string()));
        }
        let routes = self.routes.lock().unwrap();
        match routes.get(&request.url) {
            Some(route) => Ok(Response::new(&request.url, route.status, route.response_type, route.body.clone())),
            None => Err(Error::Network(format!("no route to {}", request.url))),
        }
    }
}

/// Memory store with knobs for failing reads, or failing and stalling writes.
#[derive(Default)]
pub(crate) struct TestStore {
    pub(crate) inner: MemoryStore,
    gate: Option<Semaphore>,
    fail_puts: AtomicBool,
    fail_lookups: AtomicBool,
    fail_deletes: Mutex<HashSet<String>>,
    puts: AtomicUsize,
}

impl TestStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every single-entry write blocks until [`TestStore::release`] is called.
    pub(crate) fn gated() -> Self {
        Self { gate: Some(Semaphore::new(0)), ..Self::default() }
    }

    pub(crate) fn release(&self, writes: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(writes);
        }
    }

    pub(crate) fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_delete(&self, generation: &str) {
        self.fail_deletes.lock().unwrap().insert(generation.to_string());
    }

    pub(crate) fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for TestStore {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        self.inner.open(generation).await
    }

    async fn put(&self, generation: &str, request: &Request, response: Response) -> Result<(), Error> {
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| Error::InvalidInput(e.to_string()))?
                .forget();
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::InvalidInput("disk full".to_string()));
        }
        self.inner.put(generation, request, response).await
    }

    async fn put_all(&self, generation: &str, entries: Vec<(Request, Response)>) -> Result<(), Error> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::InvalidInput("disk full".to_string()));
        }
        self.inner.put_all(generation, entries).await
    }

    async fn lookup(&self, request: &Request) -> Result<Option<Response>, Error> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(Error::CorruptEntry(format!("unreadable entry for {}", request.url)));
        }
        self.inner.lookup(request).await
    }

    async fn lookup_in(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error> {
        self.inner.lookup_in(generation, request).await
    }

    async fn generations(&self) -> Result<Vec<String>, Error> {
        self.inner.generations().await
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        if self.fail_deletes.lock().unwrap().contains(generation) {
            return Err(Error::InvalidInput(format!("{generation} is locked")));
        }
        self.inner.delete(generation).await
    }

    async fn keys(&self, generation: &str) -> Result<Vec<Request>, Error> {
        self.inner.keys(generation).await
    }
}
