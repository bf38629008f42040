use std::sync::Arc;
use std::time::Duration;

use zookeeper::{CreateMode, WatchedEvent, Watcher, ZkError, ZooKeeper};

use super::{Acl, CounterStore, Error, Version};

/// [`CounterStore`] over a shared ZooKeeper session.
///
/// The client is blocking; every operation is bridged onto the runtime's
/// blocking pool. Session re-establishment and watch plumbing stay inside
/// the client and are surfaced here only as error classifications.
pub struct ZkStore {
    session: Arc<ZooKeeper>,
}

/// Logs session-state transitions pushed by the client.
struct SessionWatcher;

impl Watcher for SessionWatcher {
    fn handle(&self, event: WatchedEvent) {
        tracing::debug!(?event, "zookeeper session event");
    }
}

impl ZkStore {
    /// Connects to the `host:port[,host:port...]` ensemble with the given
    /// session timeout.
    pub async fn connect(hosts: &str, session_timeout: Duration) -> Result<Self, Error> {
        let ensemble = hosts.to_string();
        let session = run_blocking(hosts, move || {
            ZooKeeper::connect(&ensemble, session_timeout, SessionWatcher)
        })
        .await?;

        Ok(Self {
            session: Arc::new(session),
        })
    }
}

/// Runs a blocking client call on the blocking pool, classifying its error.
async fn run_blocking<T, F>(path: &str, op: F) -> Result<T, Error>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ZkError> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(op)
        .await
        .map_err(|err| Error::Transient {
            path: path.to_string(),
            reason: format!("blocking task failed: {err}"),
        })?;

    result.map_err(|err| classify(path, err))
}

fn classify(path: &str, err: ZkError) -> Error {
    match err {
        ZkError::NodeExists | ZkError::BadVersion => Error::Conflict {
            path: path.to_string(),
        },
        ZkError::NoNode
        | ZkError::NoAuth
        | ZkError::AuthFailed
        | ZkError::InvalidACL
        | ZkError::MarshallingError
        | ZkError::DataInconsistency => Error::Fatal {
            path: path.to_string(),
            reason: err.to_string(),
        },
        // Connection loss, session expiry, operation timeout, and the rest
        // of the session-level failures may succeed on retry.
        other => Error::Transient {
            path: path.to_string(),
            reason: other.to_string(),
        },
    }
}

fn zk_acl(acl: Acl) -> Vec<zookeeper::Acl> {
    match acl {
        Acl::Open => zookeeper::Acl::open_unsafe().clone(),
        Acl::Restricted => zookeeper::Acl::creator_all().clone(),
    }
}

#[async_trait::async_trait]
impl CounterStore for ZkStore {
    async fn exists(&self, path: &str) -> Result<Option<Version>, Error> {
        let session = self.session.clone();
        let owned = path.to_string();
        let stat = run_blocking(path, move || session.exists(&owned, false)).await?;
        Ok(stat.map(|stat| stat.version))
    }

    async fn create(&self, path: &str, value: &[u8], acl: Acl) -> Result<(), Error> {
        let session = self.session.clone();
        let owned = path.to_string();
        let value = value.to_vec();
        run_blocking(path, move || {
            session.create(&owned, value, zk_acl(acl), CreateMode::Persistent)
        })
        .await?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<(Vec<u8>, Version), Error> {
        let session = self.session.clone();
        let owned = path.to_string();
        let (value, stat) = run_blocking(path, move || session.get_data(&owned, false)).await?;
        Ok((value, stat.version))
    }

    async fn compare_and_set(
        &self,
        path: &str,
        value: &[u8],
        expected: Version,
    ) -> Result<Version, Error> {
        let session = self.session.clone();
        let owned = path.to_string();
        let value = value.to_vec();
        let stat =
            run_blocking(path, move || session.set_data(&owned, value, Some(expected))).await?;
        Ok(stat.version)
    }

    async fn close(&self) -> Result<(), Error> {
        let session = self.session.clone();
        run_blocking("", move || session.close()).await
    }
}
