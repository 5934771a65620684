//! In-memory storage provider for testing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::provider::StorageProvider;
use envsecrets_common::{EnvName, Error, Result};

/// In-memory storage provider.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop. Clones share the same storage.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    storage: Arc<RwLock<HashMap<EnvName, Vec<u8>>>>,
}

impl MemoryProvider {
    /// Create a new empty memory provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite stored bytes directly, bypassing create/upload semantics.
    ///
    /// Lets tests plant damaged or substituted vault files.
    pub fn insert_raw(&self, env: &EnvName, data: Vec<u8>) {
        self.storage
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(env.clone(), data);
    }
}

impl StorageProvider for MemoryProvider {
    fn location(&self, env: &EnvName) -> String {
        format!("memory://{}", env)
    }

    fn exists(&self, env: &EnvName) -> Result<bool> {
        let storage = self.storage.read().unwrap_or_else(|e| e.into_inner());
        Ok(storage.contains_key(env))
    }

    fn create(&self, env: &EnvName, data: &[u8]) -> Result<()> {
        let mut storage = self.storage.write().unwrap_or_else(|e| e.into_inner());
        if storage.contains_key(env) {
            return Err(Error::AlreadyExists(format!("vault {} already exists", env)));
        }
        storage.insert(env.clone(), data.to_vec());
        Ok(())
    }

    fn upload(&self, env: &EnvName, data: &[u8]) -> Result<()> {
        let mut storage = self.storage.write().unwrap_or_else(|e| e.into_inner());
        storage.insert(env.clone(), data.to_vec());
        Ok(())
    }

    fn download(&self, env: &EnvName) -> Result<Vec<u8>> {
        let storage = self.storage.read().unwrap_or_else(|e| e.into_inner());
        storage
            .get(env)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("vault not found for environment {:?}", env.as_str())))
    }

    fn delete(&self, env: &EnvName) -> Result<()> {
        let mut storage = self.storage.write().unwrap_or_else(|e| e.into_inner());
        storage
            .remove(env)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("vault not found for environment {:?}", env.as_str())))
    }
}
