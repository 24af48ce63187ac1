use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::storage::{KeyValueStore, StorageError};

/// Key-value double that records every successful `set` and can be told to fail.
#[derive(Default)]
pub struct RecordingKv {
    entries: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<String>>,
    failing: AtomicBool,
    failed_writes: AtomicUsize,
    reads: AtomicUsize,
}

impl RecordingKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let kv = Self::new();
        kv.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        kv
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn failed_writes(&self) -> usize {
        self.failed_writes.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for RecordingKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("storage unavailable")));
        }
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            self.failed_writes.fetch_add(1, Ordering::SeqCst);
            return Err(StorageError::Io(std::io::Error::other("storage full")));
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self.writes.lock().unwrap().push(value.to_string());
        Ok(())
    }
}
