//! Registry of live instances keyed by listening port
//!
//! The key set is exactly the set of ports the harness believes have a
//! running instance. The lock is held for map operations only; callers must
//! never keep it across a sleep or a process wait.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Child;
use tokio::sync::Mutex;

use crate::error::{HarnessError, HarnessResult};

/// OS-level handle of one supervised instance
#[derive(Debug)]
pub struct InstanceProcess {
    pub pid: u32,
    /// Instances are spawned as group leaders, so this equals `pid`
    pub pgid: u32,
    /// Owned child; taken out while the supervisor waits for it to exit
    pub child: Option<Child>,
    pub log_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
}

impl InstanceProcess {
    /// Wrap a freshly spawned group-leader child
    pub fn from_child(port: u16, child: Child, log_path: PathBuf) -> HarnessResult<Self> {
        let pid = child.id().ok_or_else(|| HarnessError::SpawnFailed {
            port,
            source: std::io::Error::other("process exited before its pid could be recorded"),
        })?;
        Ok(Self {
            pid,
            pgid: pid,
            child: Some(child),
            log_path: Some(log_path),
            started_at: Utc::now(),
        })
    }

    /// Handle for a process the harness does not own a child for
    pub fn detached(pid: u32) -> Self {
        Self {
            pid,
            pgid: pid,
            child: None,
            log_path: None,
            started_at: Utc::now(),
        }
    }
}

/// Shared port → instance map
#[derive(Debug, Clone, Default)]
pub struct InstanceRegistry {
    inner: Arc<Mutex<BTreeMap<u16, InstanceProcess>>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the port is already registered; hands the process back on conflict
    pub async fn insert_if_absent(&self, port: u16, process: InstanceProcess) -> Result<(), InstanceProcess> {
        let mut map = self.inner.lock().await;
        if map.contains_key(&port) {
            return Err(process);
        }
        map.insert(port, process);
        Ok(())
    }

    pub async fn contains(&self, port: u16) -> bool {
        self.inner.lock().await.contains_key(&port)
    }

    /// `(pid, pgid)` recorded for `port`
    pub async fn pids(&self, port: u16) -> Option<(u32, u32)> {
        self.inner.lock().await.get(&port).map(|p| (p.pid, p.pgid))
    }

    /// Move the child handle out, leaving the entry itself in place
    pub async fn take_child(&self, port: u16) -> Option<Child> {
        self.inner.lock().await.get_mut(&port).and_then(|p| p.child.take())
    }

    pub async fn remove(&self, port: u16) -> Option<InstanceProcess> {
        self.inner.lock().await.remove(&port)
    }

    /// Registered ports, ascending
    pub async fn ports(&self) -> Vec<u16> {
        self.inner.lock().await.keys().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
