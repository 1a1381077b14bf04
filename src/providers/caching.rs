//! Stale-while-revalidate cache in front of a [`RateSource`].
//!
//! The cache is a single slot holding an `Arc<ExchangeRateSnapshot>`, replaced
//! wholesale on every applied refresh. Readers never wait on the network:
//! [`RateProvider::get_snapshot`] returns whatever is cached and, when the
//! slot is empty or past its TTL, starts at most one background refresh.
//!
//! Every refresh is stamped with a request number when it starts. A response
//! is applied only if its number is newer than the one that produced the
//! current snapshot, so the latest-started request wins regardless of the
//! order in which responses arrive.

use crate::core::cache::SnapshotStore;
use crate::core::config::RatesConfig;
use crate::core::currency::{ExchangeRateSnapshot, RateSource, SnapshotSource, SnapshotView};
use crate::core::error::RateFetchError;
use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateProviderOptions {
    /// Age after which a snapshot is stale and a background refresh starts.
    pub ttl: Duration,
    /// Upper bound for a single refresh, including retries.
    pub timeout: Duration,
    /// Automatic refreshes are suppressed this long after a failure.
    pub retry_backoff: Duration,
}

impl Default for RateProviderOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(30),
        }
    }
}

impl From<&RatesConfig> for RateProviderOptions {
    fn from(config: &RatesConfig) -> Self {
        Self {
            ttl: config.ttl(),
            timeout: config.timeout(),
            retry_backoff: config.retry_backoff(),
        }
    }
}

/// Result of one refresh request.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// The fetched snapshot is now the current one.
    Applied(Arc<ExchangeRateSnapshot>),
    /// The fetch succeeded but a newer request had already been applied.
    Superseded,
    Failed(RateFetchError),
}

struct Applied {
    snapshot: Arc<ExchangeRateSnapshot>,
    request: u64,
    /// `None` when the TTL reaches past what `Instant` can represent.
    fresh_until: Option<Instant>,
}

impl Applied {
    fn is_stale(&self, now: Instant) -> bool {
        self.fresh_until.is_some_and(|until| now >= until)
    }
}

#[derive(Default)]
struct CacheState {
    current: Option<Applied>,
    in_flight: BTreeSet<u64>,
    last_request: u64,
    error: Option<RateFetchError>,
    last_failure: Option<Instant>,
}

impl CacheState {
    fn begin(&mut self) -> u64 {
        self.last_request += 1;
        self.in_flight.insert(self.last_request);
        self.last_request
    }

    fn view(&self, now: Instant) -> SnapshotView {
        SnapshotView {
            snapshot: self.current.as_ref().map(|c| Arc::clone(&c.snapshot)),
            is_loading: !self.in_flight.is_empty(),
            is_stale: self.current.as_ref().is_some_and(|c| c.is_stale(now)),
            error: self.error.clone(),
        }
    }

    fn is_newer(&self, request: u64) -> bool {
        self.current.as_ref().is_none_or(|c| request > c.request)
    }

    fn is_backing_off(&self, now: Instant, backoff: Duration) -> bool {
        self.last_failure.is_some_and(|failed| {
            failed
                .checked_add(backoff)
                .is_none_or(|until| now < until)
        })
    }
}

struct Inner {
    source: Arc<dyn RateSource>,
    store: Option<Arc<dyn SnapshotStore>>,
    options: RateProviderOptions,
    state: RwLock<CacheState>,
    updates: watch::Sender<Option<Arc<ExchangeRateSnapshot>>>,
    runtime: Option<Handle>,
}

impl Inner {
    fn write_state(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[instrument(name = "RateRefresh", skip(self), fields(source = self.source.name()))]
    async fn refresh(self: Arc<Self>, request: u64) -> RefreshOutcome {
        debug!("Starting rate refresh");
        let timeout = self.options.timeout;
        let result = match tokio::time::timeout(timeout, self.source.fetch_snapshot()).await {
            Ok(Ok(snapshot)) => Ok(snapshot),
            Ok(Err(e)) => Err(RateFetchError::Failed(format!("{e:#}"))),
            Err(_) => Err(RateFetchError::Timeout(timeout)),
        };

        let outcome = self.complete(request, result);
        if let (RefreshOutcome::Applied(snapshot), Some(store)) = (&outcome, &self.store) {
            store.save(snapshot).await;
        }
        outcome
    }

    fn complete(
        &self,
        request: u64,
        result: Result<ExchangeRateSnapshot, RateFetchError>,
    ) -> RefreshOutcome {
        let mut state = self.write_state();
        state.in_flight.remove(&request);

        match result {
            Ok(snapshot) if state.is_newer(request) => {
                let snapshot = Arc::new(snapshot);
                info!(
                    request,
                    pivot = snapshot.pivot(),
                    currencies = snapshot.rates().len(),
                    "Applied rate snapshot"
                );
                state.current = Some(Applied {
                    snapshot: Arc::clone(&snapshot),
                    request,
                    fresh_until: Instant::now().checked_add(self.options.ttl),
                });
                state.error = None;
                state.last_failure = None;
                drop(state);
                self.updates.send_replace(Some(Arc::clone(&snapshot)));
                RefreshOutcome::Applied(snapshot)
            }
            Ok(_) => {
                debug!(request, "Discarding response from superseded request");
                RefreshOutcome::Superseded
            }
            Err(error) => {
                if state.is_newer(request) {
                    warn!(request, %error, "Rate refresh failed");
                    state.error = Some(error.clone());
                    state.last_failure = Some(Instant::now());
                } else {
                    debug!(request, %error, "Ignoring failure from superseded request");
                }
                RefreshOutcome::Failed(error)
            }
        }
    }
}

/// Cached, self-refreshing access to exchange rates. Cloning yields another
/// handle to the same cache.
#[derive(Clone)]
pub struct RateProvider {
    inner: Arc<Inner>,
}

impl RateProvider {
    /// Creates a provider. Background refreshes run on the Tokio runtime
    /// current at construction, or failing that, at the time of the refresh.
    pub fn new(source: Arc<dyn RateSource>, options: RateProviderOptions) -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                source,
                store: None,
                options,
                state: RwLock::new(CacheState::default()),
                updates,
                runtime: Handle::try_current().ok(),
            }),
        }
    }

    /// Persists applied snapshots to `store` and allows warm starts from it.
    pub fn with_store(self, store: Arc<dyn SnapshotStore>) -> Self {
        self.rebuild(|inner| inner.store = Some(store))
    }

    fn rebuild(self, change: impl FnOnce(&mut Inner)) -> Self {
        match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                change(&mut inner);
                Self {
                    inner: Arc::new(inner),
                }
            }
            Err(inner) => {
                warn!("Rate provider is already shared, configuration change ignored");
                Self { inner }
            }
        }
    }

    pub fn options(&self) -> &RateProviderOptions {
        &self.inner.options
    }

    /// Loads the persisted snapshot, if any, as the initial cache content.
    /// Its freshness is measured from its original fetch time. Returns
    /// whether a snapshot was installed.
    pub async fn warm_start(&self) -> bool {
        let Some(store) = &self.inner.store else {
            return false;
        };
        let Some(snapshot) = store.load().await else {
            return false;
        };

        let age = (Utc::now() - snapshot.fetched_at())
            .to_std()
            .unwrap_or_default();
        let remaining = self.inner.options.ttl.saturating_sub(age);
        let fresh_until = Instant::now().checked_add(remaining);
        let snapshot = Arc::new(snapshot);

        let mut state = self.inner.write_state();
        if state.current.is_some() {
            return false;
        }
        info!(
            pivot = snapshot.pivot(),
            provenance = snapshot.provenance(),
            age_secs = age.as_secs(),
            "Warm start from stored rate snapshot"
        );
        state.current = Some(Applied {
            snapshot: Arc::clone(&snapshot),
            request: 0,
            fresh_until,
        });
        drop(state);
        self.inner.updates.send_replace(Some(snapshot));
        true
    }

    /// Returns the cached snapshot immediately. If it is missing or stale,
    /// and no refresh is already running, starts one in the background.
    pub fn get_snapshot(&self) -> SnapshotView {
        let now = Instant::now();
        let (view, request) = {
            let mut state = self.inner.write_state();
            let stale = state.current.as_ref().is_none_or(|c| c.is_stale(now));
            let backing_off = state.is_backing_off(now, self.inner.options.retry_backoff);
            let request = (stale && state.in_flight.is_empty() && !backing_off)
                .then(|| state.begin());
            (state.view(now), request)
        };

        if let Some(request) = request {
            self.spawn_refresh(request);
        }
        view
    }

    /// Current view without triggering a refresh.
    pub fn peek(&self) -> SnapshotView {
        let state = self.inner.state.read().unwrap_or_else(PoisonError::into_inner);
        state.view(Instant::now())
    }

    /// Starts a refresh regardless of any in-flight request and waits for it.
    pub async fn refresh_now(&self) -> RefreshOutcome {
        let request = self.inner.write_state().begin();
        Arc::clone(&self.inner).refresh(request).await
    }

    /// Receiver notified with every applied snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<ExchangeRateSnapshot>>> {
        self.inner.updates.subscribe()
    }

    fn spawn_refresh(&self, request: u64) {
        let runtime = self
            .inner
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok());
        match runtime {
            Some(runtime) => {
                debug!(request, "Spawning background rate refresh");
                runtime.spawn(Arc::clone(&self.inner).refresh(request));
            }
            None => {
                warn!("No async runtime available for rate refresh");
                self.inner.complete(
                    request,
                    Err(RateFetchError::Failed("no async runtime".to_string())),
                );
            }
        }
    }
}

impl SnapshotSource for RateProvider {
    fn snapshot(&self) -> SnapshotView {
        self.get_snapshot()
    }
}
