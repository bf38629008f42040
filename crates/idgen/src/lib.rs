//! Distributed id allocation.
//!
//! [`IdAllocator`] vends globally unique, process-monotonic `i64` ids by
//! leasing contiguous ranges of a shared counter held in a coordination
//! store. A lease of `L` ids costs one store round-trip (a read plus a
//! versioned compare-and-set); all other calls are served from process-local
//! state. Ranges claimed by distinct instances are disjoint, so ids never
//! repeat even though instances never talk to each other.
//!
//! The first id vended from a freshly-claimed range `[base, base+L)` is
//! `base + 1` and the last is `base + L`: the integer `base` itself is
//! skipped. An unvended range suffix is permanently skipped when the process
//! exits; the id space is practically unbounded and reuse is never risked.

use std::sync::Arc;

use coordination::{Acl, CounterStore};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The counter node holds something other than a non-negative decimal
    /// integer. Never self-healed; an operator must intervene.
    #[error("counter node {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
    /// Advancing the counter by one more lease would overflow i64.
    #[error("counter node {path} has exhausted the id space")]
    Exhausted { path: String },
    /// Lost the compare-and-set race on every permitted attempt.
    #[error("counter node {path} is contended: lost {attempts} compare-and-set races")]
    Contention { path: String, attempts: u32 },
    #[error(transparent)]
    Store(#[from] coordination::Error),
}

impl Error {
    /// Whether the caller may expect a retry to succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Contention { .. } => true,
            Error::Store(err) => err.is_transient(),
            Error::Corrupt { .. } | Error::Exhausted { .. } => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Coordination-store path of the shared counter node.
    pub path: String,
    /// Number of ids claimed per coordination round-trip.
    pub lease: i64,
    /// Bound on compare-and-set retries within a single refill.
    pub retry_cap: u32,
    /// ACL applied to the counter node if this instance creates it.
    pub acl: Acl,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: "/counter".to_string(),
            lease: 10_000,
            retry_cap: 16,
            acl: Acl::Open,
        }
    }
}

/// Process-local lease over a claimed range of the shared counter.
#[derive(Debug, Default)]
struct Lease {
    /// Most recently vended id; the next call returns `current + 1`.
    current: i64,
    /// Exclusive upper bound of the claimed range.
    limit: i64,
    /// Whether the counter node has been observed to exist.
    initialized: bool,
}

pub struct IdAllocator {
    store: Arc<dyn CounterStore>,
    config: Config,
    lease: tokio::sync::Mutex<Lease>,
}

impl IdAllocator {
    pub fn new(store: Arc<dyn CounterStore>, config: Config) -> Self {
        Self {
            store,
            config,
            lease: tokio::sync::Mutex::new(Lease::default()),
        }
    }

    /// Returns the next id: strictly positive, unique across all instances
    /// sharing the counter node, and strictly increasing within this one.
    ///
    /// The lease mutex is held across any refill I/O, so at most one refill
    /// is in flight per process and callers arriving during it observe its
    /// result. Store errors surface to the caller without disturbing the
    /// lease; the next call retries from scratch.
    pub async fn next(&self) -> Result<i64, Error> {
        let mut lease = self.lease.lock().await;

        if lease.current >= lease.limit {
            if !lease.initialized {
                self.ensure_counter_node().await?;
                lease.initialized = true;
            }
            self.refill(&mut lease).await?;
        }
        lease.current += 1;
        Ok(lease.current)
    }

    /// Creates the counter node with value `"0"` if it does not yet exist.
    /// Losing the creation race to another instance is success.
    async fn ensure_counter_node(&self) -> Result<(), Error> {
        let path = &self.config.path;

        if self.store.exists(path).await?.is_some() {
            return Ok(());
        }
        match self.store.create(path, b"0", self.config.acl).await {
            Ok(()) => {
                tracing::info!(path, "created counter node");
                Ok(())
            }
            Err(err) if err.is_conflict() => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Claims the next `lease` ids by advancing the counter node with a
    /// versioned compare-and-set, retrying lost races up to `retry_cap`
    /// times. On success the local lease covers `[base, limit)`.
    async fn refill(&self, lease: &mut Lease) -> Result<(), Error> {
        let path = &self.config.path;

        for attempt in 0..self.config.retry_cap {
            let (value, version) = self.store.get(path).await?;
            let base = parse_counter(path, &value)?;
            let limit = base
                .checked_add(self.config.lease)
                .ok_or_else(|| Error::Exhausted { path: path.clone() })?;

            match self
                .store
                .compare_and_set(path, limit.to_string().as_bytes(), version)
                .await
            {
                Ok(new_version) => {
                    lease.current = base;
                    lease.limit = limit;
                    // Always log the claimed range so operators can
                    // reconstruct vended ranges post-hoc.
                    tracing::info!(path, base, limit, version = new_version, "claimed id lease");
                    return Ok(());
                }
                Err(err) if err.is_conflict() => {
                    tracing::debug!(path, attempt, "lost compare-and-set race; reloading counter");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(Error::Contention {
            path: path.clone(),
            attempts: self.config.retry_cap,
        })
    }
}

fn parse_counter(path: &str, value: &[u8]) -> Result<i64, Error> {
    let corrupt = |reason: String| Error::Corrupt {
        path: path.to_string(),
        reason,
    };

    let text = std::str::from_utf8(value).map_err(|_| corrupt("value is not UTF-8".to_string()))?;
    let base: i64 = text
        .parse()
        .map_err(|_| corrupt(format!("value {text:?} is not a decimal integer")))?;
    if base < 0 {
        return Err(corrupt(format!("value {base} is negative")));
    }
    Ok(base)
}

#[cfg(test)]
mod test;
