//! Cache / active configuration pair with byte-wise persistence.
//!
//! The cache is what the serial protocol edits.  The active copy is what
//! drives the outputs; it changes only through [`ConfigStore::promote`].
//! Storage transfers run inside a critical section; promotion relies on
//! the caller's (see [`Controller`](crate::app::service::Controller)).

use crate::app::ports::StoragePort;
use crate::config::{ConfigRecord, RECORD_SIZE, STORAGE_BASE};

pub struct ConfigStore<S: StoragePort> {
    storage: S,
    cache: ConfigRecord,
    active: ConfigRecord,
}

impl<S: StoragePort> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            cache: ConfigRecord::default(),
            active: ConfigRecord::default(),
        }
    }

    /// Read the record from storage into the cache.
    ///
    /// Uninitialised storage yields whatever bytes are there; out-of-range
    /// indices and duties are clamped on the way in.
    pub fn load(&mut self) {
        let storage = &mut self.storage;
        let bytes = critical_section::with(|_| {
            let mut bytes = [0u8; RECORD_SIZE];
            for (addr, b) in (STORAGE_BASE..).zip(bytes.iter_mut()) {
                *b = storage.read_byte(addr);
            }
            bytes
        });
        self.cache = ConfigRecord::from_bytes(&bytes);
    }

    /// Write the cache to storage, then commit.
    pub fn save(&mut self) {
        let bytes = self.cache.to_bytes();
        let storage = &mut self.storage;
        critical_section::with(|_| {
            for (addr, b) in (STORAGE_BASE..).zip(bytes) {
                storage.write_byte(addr, b);
            }
        });
        self.storage.commit();
    }

    /// Copy the cache into the active record.
    ///
    /// Callers hold a critical section across this and any re-derivation
    /// of runtime state from the new record.
    pub fn promote(&mut self) -> &ConfigRecord {
        self.active = self.cache;
        &self.active
    }

    pub fn cache(&self) -> &ConfigRecord {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ConfigRecord {
        &mut self.cache
    }

    pub fn active(&self) -> &ConfigRecord {
        &self.active
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}
