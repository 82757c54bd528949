//! Storage for the bridge API key.

use std::sync::{Mutex, PoisonError};

/// Somewhere to keep the API key between runs.
///
/// Read when a [`crate::BridgeDirectory`] starts, written whenever the session
/// obtains a new key.
pub trait KeyStore: Send + Sync {
    fn api_key(&self) -> Option<String>;
    fn set_api_key(&self, api_key: &str);
}

/// A [`KeyStore`] that forgets everything when dropped.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    api_key: Mutex<Option<String>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(api_key: &str) -> Self {
        Self {
            api_key: Mutex::new(Some(api_key.to_string())),
        }
    }
}

impl KeyStore for MemoryKeyStore {
    fn api_key(&self) -> Option<String> {
        self.api_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_api_key(&self, api_key: &str) {
        *self.api_key.lock().unwrap_or_else(PoisonError::into_inner) = Some(api_key.to_string());
    }
}
