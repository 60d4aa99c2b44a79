//! Ephemeral store for generated images too large to hand back inline.
//!
//! Keys are `sessionId:imageId`. Entries expire after a TTL and the least
//! recently used entry is evicted once the store is full.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use felos_domain::config::ImageStoreConfig;
use felos_domain::trace::TraceEvent;

use crate::image::ImagePayload;

struct Entry {
    data: Arc<str>,
    inserted_at: Instant,
    last_used: u64,
}

struct Inner {
    entries: HashMap<String, Entry>,
    /// Monotonic access counter for LRU ordering.
    clock: u64,
}

pub struct ImageStore {
    inner: Mutex<Inner>,
    max_entries: usize,
    ttl: Duration,
}

pub fn image_key(session_id: &str, image_id: &str) -> String {
    format!("{session_id}:{image_id}")
}

impl ImageStore {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                clock: 0,
            }),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    pub fn from_config(cfg: &ImageStoreConfig) -> Self {
        Self::new(cfg.max_entries, Duration::from_secs(cfg.ttl_secs))
    }

    /// Insert or replace `key`. Returns how many entries were evicted.
    pub fn put(&self, key: &str, data: impl Into<Arc<str>>) -> usize {
        let data: Arc<str> = data.into();
        let bytes = data.len();
        let now = Instant::now();

        let evicted = {
            let mut inner = self.inner.lock();
            let before = inner.entries.len();
            let ttl = self.ttl;
            inner
                .entries
                .retain(|k, e| k == key || now.duration_since(e.inserted_at) < ttl);
            let mut evicted = before - inner.entries.len();

            if !inner.entries.contains_key(key) {
                while inner.entries.len() >= self.max_entries {
                    let oldest = inner
                        .entries
                        .iter()
                        .min_by_key(|(_, e)| e.last_used)
                        .map(|(k, _)| k.clone());
                    match oldest {
                        Some(k) => {
                            inner.entries.remove(&k);
                            evicted += 1;
                        }
                        None => break,
                    }
                }
            }

            inner.clock += 1;
            let last_used = inner.clock;
            inner.entries.insert(
                key.to_owned(),
                Entry {
                    data,
                    inserted_at: now,
                    last_used,
                },
            );
            evicted
        };

        TraceEvent::ImageStored {
            key: key.to_owned(),
            bytes,
            evicted,
        }
        .emit();
        evicted
    }

    /// Fetch `key`, refreshing its LRU position. Expired entries are dropped.
    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        let mut inner = self.inner.lock();
        let expired = match inner.entries.get(key) {
            None => return None,
            Some(e) => e.inserted_at.elapsed() >= self.ttl,
        };
        if expired {
            inner.entries.remove(key);
            return None;
        }

        inner.clock += 1;
        let clock = inner.clock;
        let entry = inner.entries.get_mut(key)?;
        entry.last_used = clock;
        Some(Arc::clone(&entry.data))
    }

    /// Drop every image belonging to `session_id`. Returns how many.
    pub fn clear_session(&self, session_id: &str) -> usize {
        let prefix = format!("{session_id}:");
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|k, _| !k.starts_with(&prefix));
        before - inner.entries.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Turn a backend payload into something a client can load.
    ///
    /// URLs pass through. Base64 up to `inline_limit` bytes becomes a data
    /// URL; anything larger is stored and replaced by the image route.
    pub fn hand_off(&self, session_id: &str, payload: ImagePayload, inline_limit: usize) -> String {
        match payload {
            ImagePayload::Url(url) => url,
            ImagePayload::Base64(data) if data.len() <= inline_limit => {
                format!("data:image/png;base64,{data}")
            }
            ImagePayload::Base64(data) => {
                let image_id = uuid::Uuid::new_v4().simple().to_string();
                self.put(&image_key(session_id, &image_id), data);
                let session: String =
                    url::form_urlencoded::byte_serialize(session_id.as_bytes()).collect();
                format!("/api/image/{image_id}?session={session}")
            }
        }
    }
}
