//! Runs the same schedule across several assets concurrently.
use crate::core::debounce::Debouncer;
use crate::core::price::{AssetId, PriceHistoryProvider};
use crate::core::schedule::ScheduleParameters;
use crate::core::simulation::{InvestmentResult, simulate};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

/// Per-asset outcome; `None` marks an asset whose data could not be used.
pub type ComparisonResults = HashMap<AssetId, Option<InvestmentResult>>;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

async fn run_pipeline(
    provider: Arc<dyn PriceHistoryProvider>,
    asset: AssetId,
    params: ScheduleParameters,
) -> Option<InvestmentResult> {
    match provider.fetch_history(&asset).await {
        Ok(prices) if prices.is_empty() => {
            warn!(asset = %asset, "No price history available");
            None
        }
        Ok(prices) => Some(simulate(&prices, &params)),
        Err(e) => {
            warn!(asset = %asset, error = %e, "Price history fetch failed");
            None
        }
    }
}

/// Aborts the pipeline tasks once the comparison that spawned them is gone.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Fetches and simulates every asset in parallel.
///
/// Each asset runs in its own task, so a failing, empty or panicking
/// pipeline only turns its own entry into `None`. `update_callback` is
/// invoked once per settled asset. Dropping the returned future aborts
/// every pipeline still running.
pub async fn compare_assets(
    provider: Arc<dyn PriceHistoryProvider>,
    assets: &[AssetId],
    params: &ScheduleParameters,
    update_callback: &(dyn Fn() + Sync),
) -> ComparisonResults {
    let handles: Vec<JoinHandle<Option<InvestmentResult>>> = assets
        .iter()
        .map(|asset| {
            tokio::spawn(run_pipeline(
                Arc::clone(&provider),
                asset.clone(),
                params.clone(),
            ))
        })
        .collect();
    let _abort = AbortOnDrop(handles.iter().map(JoinHandle::abort_handle).collect());

    let pipelines = handles.into_iter().map(|handle| async move {
        let outcome = handle.await;
        update_callback();
        outcome
    });

    let outcomes = join_all(pipelines).await;

    assets
        .iter()
        .cloned()
        .zip(outcomes)
        .map(|(asset, outcome)| {
            let result = outcome.unwrap_or_else(|e| {
                warn!(asset = %asset, error = %e, "Comparison pipeline aborted");
                None
            });
            (asset, result)
        })
        .collect()
}

struct ComparisonState {
    assets: Vec<AssetId>,
    params: ScheduleParameters,
    /// Bumped on every parameter change so late results can be recognised.
    generation: u64,
    results: ComparisonResults,
}

struct Inner {
    provider: Arc<dyn PriceHistoryProvider>,
    state: Mutex<ComparisonState>,
    in_flight: AtomicUsize,
    debouncer: Debouncer,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, ComparisonState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Counts a running computation for as long as it is alive, including when
/// its task is aborted.
struct InFlightGuard(Arc<Inner>);

impl InFlightGuard {
    fn new(inner: &Arc<Inner>) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(inner))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A live comparison of several assets under one shared schedule.
///
/// Cloning yields another handle to the same comparison.
#[derive(Clone)]
pub struct Comparison {
    inner: Arc<Inner>,
}

impl Comparison {
    pub fn new(
        provider: Arc<dyn PriceHistoryProvider>,
        assets: Vec<AssetId>,
        params: ScheduleParameters,
        debounce: Duration,
    ) -> Self {
        let mut unique = Vec::with_capacity(assets.len());
        for asset in assets {
            if !unique.contains(&asset) {
                unique.push(asset);
            }
        }

        Self {
            inner: Arc::new(Inner {
                provider,
                state: Mutex::new(ComparisonState {
                    assets: unique,
                    params,
                    generation: 0,
                    results: HashMap::new(),
                }),
                in_flight: AtomicUsize::new(0),
                debouncer: Debouncer::new(debounce),
            }),
        }
    }

    /// Recomputes every asset with the current parameters and stores the
    /// outcome. Results are dropped if the parameters change while running.
    pub async fn recompute(&self) -> ComparisonResults {
        self.recompute_with_progress(&|| ()).await
    }

    /// Like [`Comparison::recompute`], calling `on_settled` as each asset finishes.
    pub async fn recompute_with_progress(
        &self,
        on_settled: &(dyn Fn() + Sync),
    ) -> ComparisonResults {
        let _guard = InFlightGuard::new(&self.inner);
        let (assets, params, generation) = {
            let state = self.inner.state();
            (state.assets.clone(), state.params.clone(), state.generation)
        };
        info!(count = assets.len(), "Recomputing comparison");

        let results =
            compare_assets(Arc::clone(&self.inner.provider), &assets, &params, on_settled).await;

        let mut state = self.inner.state();
        if state.generation != generation {
            debug!("Parameters changed during recompute, discarding results");
            return results;
        }
        for (asset, result) in &results {
            // assets removed while we were running stay removed
            if state.assets.contains(asset) {
                state.results.insert(asset.clone(), result.clone());
            }
        }
        results
    }

    /// Replaces the schedule and recomputes once the debounce window passes
    /// without further changes.
    pub fn update_params(&self, params: ScheduleParameters) {
        {
            let mut state = self.inner.state();
            state.params = params;
            state.generation += 1;
        }
        let this = self.clone();
        self.inner.debouncer.schedule(async move {
            this.recompute().await;
        });
    }

    /// Adds an asset and computes only that asset. Returns `false` if it was
    /// already part of the comparison.
    pub async fn add_asset(&self, asset: AssetId) -> bool {
        let (params, generation) = {
            let mut state = self.inner.state();
            if state.assets.contains(&asset) {
                return false;
            }
            state.assets.push(asset.clone());
            (state.params.clone(), state.generation)
        };
        let _guard = InFlightGuard::new(&self.inner);

        let result = compare_assets(
            Arc::clone(&self.inner.provider),
            std::slice::from_ref(&asset),
            &params,
            &|| (),
        )
        .await
        .remove(&asset)
        .flatten();

        let mut state = self.inner.state();
        if state.generation == generation && state.assets.contains(&asset) {
            state.results.insert(asset, result);
        }
        true
    }

    /// Removes an asset and its stored result. Other in-flight work is left
    /// alone.
    pub fn remove_asset(&self, asset: &AssetId) -> bool {
        let mut state = self.inner.state();
        let before = state.assets.len();
        state.assets.retain(|a| a != asset);
        state.results.remove(asset);
        state.assets.len() != before
    }

    pub fn results(&self) -> ComparisonResults {
        self.inner.state().results.clone()
    }

    pub fn result(&self, asset: &AssetId) -> Option<InvestmentResult> {
        self.inner.state().results.get(asset).cloned().flatten()
    }

    pub fn assets(&self) -> Vec<AssetId> {
        self.inner.state().assets.clone()
    }

    pub fn params(&self) -> ScheduleParameters {
        self.inner.state().params.clone()
    }

    /// True while any fetch/simulate pipeline has not settled.
    pub fn is_loading(&self) -> bool {
        self.inner.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Quiet period applied to parameter changes.
    pub fn debounce(&self) -> Duration {
        self.inner.debouncer.delay()
    }

    /// True while a debounced recompute is waiting or running.
    pub fn has_pending_update(&self) -> bool {
        self.inner.debouncer.is_pending()
    }
}
