use crate::core::cache::SnapshotStore;
use crate::core::currency::ExchangeRateSnapshot;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory snapshot store, useful when persistence is disabled and in tests.
#[derive(Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<Option<ExchangeRateSnapshot>>,
}

impl MemorySnapshotStore {
    /// Creates an empty MemorySnapshotStore
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `snapshot`
    pub fn with_snapshot(snapshot: ExchangeRateSnapshot) -> Self {
        Self {
            inner: Mutex::new(Some(snapshot)),
        }
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self) -> Option<ExchangeRateSnapshot> {
        let slot = self.inner.lock().await;
        if slot.is_some() {
            debug!("Snapshot store HIT");
        } else {
            debug!("Snapshot store MISS");
        }
        slot.clone()
    }

    async fn save(&self, snapshot: &ExchangeRateSnapshot) {
        let mut slot = self.inner.lock().await;
        debug!(pivot = snapshot.pivot(), "Snapshot store PUT");
        *slot = Some(snapshot.clone());
    }
}
