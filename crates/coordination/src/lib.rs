//! Narrow capability over a linearizable key-value node store, used by the
//! id allocator to claim counter leases. The production implementation is a
//! ZooKeeper session ([`ZkStore`]); [`MemStore`] implements the same
//! versioned compare-and-set semantics in memory for tests.

mod mem;
mod zk;

pub use mem::MemStore;
pub use zk::ZkStore;

/// Version of a stored node, as maintained by the store. A freshly created
/// node has version 0, and every successful write advances it by one.
pub type Version = i32;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The node already exists (on create), or its version no longer equals
    /// the caller's (on compare-and-set).
    #[error("version conflict at {path}")]
    Conflict { path: String },
    /// Connectivity or session failure. The operation may be retried.
    #[error("transient coordination-store error at {path}: {reason}")]
    Transient { path: String, reason: String },
    /// Malformed data, ACL refusal, or other non-retryable failure.
    #[error("fatal coordination-store error at {path}: {reason}")]
    Fatal { path: String, reason: String },
}

impl Error {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient { .. })
    }
}

/// Access control applied to a node on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Acl {
    /// World-readable and writable. The reference deployment choice.
    #[default]
    Open,
    /// Restricted to the authenticated service identity.
    Restricted,
}

/// The five operations the allocator needs from a coordination store.
///
/// Implementations must be linearizable: a `compare_and_set` succeeds only
/// if no other write has advanced the node since the version was observed.
#[async_trait::async_trait]
pub trait CounterStore: Send + Sync {
    /// Returns the node's version if `path` exists.
    async fn exists(&self, path: &str) -> Result<Option<Version>, Error>;

    /// Creates `path` holding `value`. Fails with [`Error::Conflict`] if the
    /// node already exists.
    async fn create(&self, path: &str, value: &[u8], acl: Acl) -> Result<(), Error>;

    /// Returns the node's value and current version.
    async fn get(&self, path: &str) -> Result<(Vec<u8>, Version), Error>;

    /// Writes `value` if the stored version still equals `expected`,
    /// returning the new version. Fails with [`Error::Conflict`] if another
    /// writer advanced the node first.
    async fn compare_and_set(
        &self,
        path: &str,
        value: &[u8],
        expected: Version,
    ) -> Result<Version, Error>;

    /// Releases the underlying session or connection.
    async fn close(&self) -> Result<(), Error>;
}
