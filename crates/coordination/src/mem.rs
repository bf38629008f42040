use std::collections::HashMap;
use std::sync::Mutex;

use super::{Acl, CounterStore, Error, Version};

/// In-memory [`CounterStore`] with faithful versioned compare-and-set
/// semantics. Shared across tasks via `Arc` in tests which exercise multiple
/// allocator instances against one store.
#[derive(Debug, Default)]
pub struct MemStore {
    nodes: Mutex<HashMap<String, (Vec<u8>, Version)>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: the node's value as UTF-8, if it exists.
    pub fn value(&self, path: &str) -> Option<String> {
        let nodes = self.nodes.lock().unwrap();
        nodes
            .get(path)
            .map(|(value, _)| String::from_utf8_lossy(value).into_owned())
    }
}

#[async_trait::async_trait]
impl CounterStore for MemStore {
    async fn exists(&self, path: &str) -> Result<Option<Version>, Error> {
        let nodes = self.nodes.lock().unwrap();
        Ok(nodes.get(path).map(|(_, version)| *version))
    }

    async fn create(&self, path: &str, value: &[u8], _acl: Acl) -> Result<(), Error> {
        let mut nodes = self.nodes.lock().unwrap();
        if nodes.contains_key(path) {
            return Err(Error::Conflict {
                path: path.to_string(),
            });
        }
        nodes.insert(path.to_string(), (value.to_vec(), 0));
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Version), Error> {
        let nodes = self.nodes.lock().unwrap();
        match nodes.get(path) {
            Some((value, version)) => Ok((value.clone(), *version)),
            None => Err(Error::Fatal {
                path: path.to_string(),
                reason: "no such node".to_string(),
            }),
        }
    }

    async fn compare_and_set(
        &self,
        path: &str,
        value: &[u8],
        expected: Version,
    ) -> Result<Version, Error> {
        let mut nodes = self.nodes.lock().unwrap();
        match nodes.get_mut(path) {
            Some((stored, version)) if *version == expected => {
                *stored = value.to_vec();
                *version += 1;
                Ok(*version)
            }
            Some(_) => Err(Error::Conflict {
                path: path.to_string(),
            }),
            None => Err(Error::Fatal {
                path: path.to_string(),
                reason: "no such node".to_string(),
            }),
        }
    }

    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}
