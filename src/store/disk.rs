use crate::core::cache::SnapshotStore;
use crate::core::currency::ExchangeRateSnapshot;
use anyhow::Result;
use async_trait::async_trait;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "rates";
const LATEST_KEY: &str = "latest";

/// Snapshot store backed by an fjall keyspace on disk.
pub struct DiskSnapshotStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskSnapshotStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let keyspace = Config::new(path).open()?;
        let partition = keyspace.open_partition(PARTITION, PartitionCreateOptions::default())?;
        Ok(Self {
            keyspace,
            partition,
        })
    }
}

#[async_trait]
impl SnapshotStore for DiskSnapshotStore {
    async fn load(&self) -> Option<ExchangeRateSnapshot> {
        let res: Result<Option<ExchangeRateSnapshot>> = (|| {
            let Some(bytes) = self.partition.get(LATEST_KEY)? else {
                debug!("Snapshot store MISS");
                return Ok(None);
            };
            let snapshot: ExchangeRateSnapshot = serde_json::from_slice(&bytes)?;
            snapshot.validate()?;
            debug!(pivot = snapshot.pivot(), "Snapshot store HIT");
            Ok(Some(snapshot))
        })();

        match res {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!("DiskSnapshotStore load error: {}", e);
                None
            }
        }
    }

    async fn save(&self, snapshot: &ExchangeRateSnapshot) {
        let res: Result<()> = (|| {
            self.partition
                .insert(LATEST_KEY, serde_json::to_vec(snapshot)?)?;
            self.keyspace.persist(PersistMode::SyncAll)?;
            debug!(pivot = snapshot.pivot(), "Snapshot store PUT");
            Ok(())
        })();
        if let Err(e) = res {
            debug!("DiskSnapshotStore save error: {}", e);
        }
    }
}
