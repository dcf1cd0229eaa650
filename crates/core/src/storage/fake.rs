//! In-process backend with scripted behaviour, for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::backend::{StorageBackend, StoredObject};
use super::error::StorageError;
use crate::artifact::Artifact;

pub(crate) struct FakeBackend {
    name: String,
    healthy: bool,
    health_delay: Duration,
    put_delay: Duration,
    put_error: Option<StorageError>,
    get_error: Option<StorageError>,
    delete_error: Option<StorageError>,
    pub(crate) puts: AtomicUsize,
    pub(crate) deletes: AtomicUsize,
    objects: Mutex<HashMap<String, Bytes>>,
}

impl FakeBackend {
    pub(crate) fn healthy(name: &str) -> Self {
        Self {
            name: name.to_string(),
            healthy: true,
            health_delay: Duration::ZERO,
            put_delay: Duration::ZERO,
            put_error: None,
            get_error: None,
            delete_error: None,
            puts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn unhealthy(name: &str) -> Self {
        Self {
            healthy: false,
            ..Self::healthy(name)
        }
    }

    pub(crate) fn with_health_delay(mut self, delay: Duration) -> Self {
        self.health_delay = delay;
        self
    }

    pub(crate) fn with_put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = delay;
        self
    }

    pub(crate) fn failing_put(mut self, err: StorageError) -> Self {
        self.put_error = Some(err);
        self
    }

    pub(crate) fn failing_get(mut self, err: StorageError) -> Self {
        self.get_error = Some(err);
        self
    }

    pub(crate) fn failing_delete(mut self, err: StorageError) -> Self {
        self.delete_error = Some(err);
        self
    }

    pub(crate) fn into_dyn(self) -> Arc<dyn StorageBackend> {
        Arc::new(self)
    }

    pub(crate) fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub(crate) fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl StorageBackend for FakeBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "fake"
    }

    async fn put(&self, artifact: &Artifact) -> Result<StoredObject, StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if !self.put_delay.is_zero() {
            tokio::time::sleep(self.put_delay).await;
        }
        if let Some(err) = &self.put_error {
            return Err(err.clone());
        }

        let key = artifact.storage_key("qr-codes");
        self.objects
            .lock()
            .unwrap()
            .insert(key.clone(), artifact.bytes().clone());
        Ok(StoredObject {
            url: format!("fake://{}/{key}", self.name),
            key,
        })
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        if let Some(err) = &self.get_error {
            return Err(err.clone());
        }
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.delete_error {
            return Err(err.clone());
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        if !self.health_delay.is_zero() {
            tokio::time::sleep(self.health_delay).await;
        }
        if self.healthy {
            Ok(())
        } else {
            Err(StorageError::TransientNetwork("connection refused".to_string()))
        }
    }
}
