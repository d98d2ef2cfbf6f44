//! In-memory [`BlobStore`] backend.
//!
//! Uses a tokio RwLock over an ordered list of generations. Nothing
//! survives the process; intended for tests and throwaway hosts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::BlobStore;
use crate::Error;
use crate::http::{Request, Response};

#[derive(Default)]
struct Generation {
    name: String,
    entries: Vec<(Request, Response)>,
    index: HashMap<String, usize>,
}

impl Generation {
    fn named(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    fn insert(&mut self, request: Request, response: Response) {
        let key = request.key();
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot] = (request, response),
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((request, response));
            }
        }
    }

    fn get(&self, request: &Request) -> Option<Response> {
        self.index
            .get(&request.key())
            .map(|&slot| self.entries[slot].1.duplicate())
    }
}

/// Process-local store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    generations: Arc<RwLock<Vec<Generation>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn position(generations: &[Generation], name: &str) -> Option<usize> {
    generations.iter().position(|g| g.name == name)
}

fn open_slot(generations: &mut Vec<Generation>, name: &str) -> usize {
    match position(generations, name) {
        Some(slot) => slot,
        None => {
            generations.push(Generation::named(name));
            generations.len() - 1
        }
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn open(&self, generation: &str) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        open_slot(&mut generations, generation);
        Ok(())
    }

    async fn put(&self, generation: &str, request: &Request, response: Response) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        let slot = open_slot(&mut generations, generation);
        generations[slot].insert(request.clone(), response);
        Ok(())
    }

    async fn put_all(&self, generation: &str, entries: Vec<(Request, Response)>) -> Result<(), Error> {
        let mut generations = self.generations.write().await;
        let slot = open_slot(&mut generations, generation);
        for (request, response) in entries {
            generations[slot].insert(request, response);
        }
        Ok(())
    }

    async fn lookup(&self, request: &Request) -> Result<Option<Response>, Error> {
        let generations = self.generations.read().await;
        Ok(generations.iter().find_map(|g| g.get(request)))
    }

    async fn lookup_in(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error> {
        let generations = self.generations.read().await;
        Ok(position(&generations, generation).and_then(|slot| generations[slot].get(request)))
    }

    async fn generations(&self) -> Result<Vec<String>, Error> {
        let generations = self.generations.read().await;
        Ok(generations.iter().map(|g| g.name.clone()).collect())
    }

    async fn delete(&self, generation: &str) -> Result<bool, Error> {
        let mut generations = self.generations.write().await;
        match position(&generations, generation) {
            Some(slot) => {
                generations.remove(slot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn keys(&self, generation: &str) -> Result<Vec<Request>, Error> {
        let generations = self.generations.read().await;
        Ok(position(&generations, generation)
            .map(|slot| generations[slot].entries.iter().map(|(r, _)| r.clone()).collect())
            .unwrap_or_default())
    }
}
