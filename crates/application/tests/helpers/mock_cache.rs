use async_trait::async_trait;
use ferrous_netdiag_application::ports::{
    CacheStats, CachedResponse, DnsCachePort, MalformedReplySink,
};
use ferrous_netdiag_domain::{DnsQuestion, DomainError};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Key = (String, u16, u16);

fn key(question: &DnsQuestion) -> Key {
    (
        question.name.to_ascii_lowercase(),
        question.record_type.to_u16(),
        question.class.to_u16(),
    )
}

/// Map-backed cache that reports a fixed age for every entry.
#[derive(Clone, Default)]
pub struct InMemoryDnsCache {
    entries: Arc<Mutex<HashMap<Key, (Vec<u8>, u32)>>>,
    stats: Arc<Mutex<CacheStats>>,
    age: Duration,
}

impl InMemoryDnsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_age(mut self, age: Duration) -> Self {
        self.age = age;
        self
    }

    pub fn ttl_of(&self, question: &DnsQuestion) -> Option<u32> {
        self.entries
            .lock()
            .unwrap()
            .get(&key(question))
            .map(|(_, ttl)| *ttl)
    }
}

impl DnsCachePort for InMemoryDnsCache {
    fn get(&self, question: &DnsQuestion) -> Option<CachedResponse> {
        let entries = self.entries.lock().unwrap();
        let mut stats = self.stats.lock().unwrap();
        match entries.get(&key(question)) {
            Some((bytes, _)) => {
                stats.hits += 1;
                Some(CachedResponse {
                    bytes: bytes.clone(),
                    age: self.age,
                })
            }
            None => {
                stats.misses += 1;
                None
            }
        }
    }

    fn insert(&self, question: &DnsQuestion, response: Vec<u8>, ttl: u32) {
        self.entries
            .lock()
            .unwrap()
            .insert(key(question), (response, ttl));
        self.stats.lock().unwrap().insertions += 1;
    }

    fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            ..*self.stats.lock().unwrap()
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    persisted: Arc<Mutex<Vec<(SocketAddr, Vec<u8>)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn persisted(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        self.persisted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MalformedReplySink for RecordingSink {
    async fn persist(&self, upstream: SocketAddr, bytes: &[u8]) -> Result<(), DomainError> {
        self.persisted
            .lock()
            .unwrap()
            .push((upstream, bytes.to_vec()));
        Ok(())
    }
}
