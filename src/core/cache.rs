//! Storage abstraction for the last good rate snapshot.

use crate::core::currency::ExchangeRateSnapshot;
use async_trait::async_trait;

/// Keeps the most recent snapshot across process restarts.
///
/// Implementations swallow their own I/O errors: a store that cannot read
/// or write simply behaves as empty.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> Option<ExchangeRateSnapshot>;

    async fn save(&self, snapshot: &ExchangeRateSnapshot);
}
