//! Memoized pairwise costs and the strategies that fill them
//!
//! A [`CostMatrix`] only ever grows: once an (origin, destination) entry is
//! set it is authoritative and later writes for the same pair are ignored.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture, FutureExt};
use log::{debug, trace};

use crate::core::cost::CostCalculator;
use crate::core::error::{Error, Result};
use crate::core::place::Place;

/// Sparse (origin, destination) -> cost map
#[derive(Debug, Clone, Default)]
pub struct CostMatrix {
    entries: HashMap<Place, HashMap<Place, f64>>,
    len: usize,
}

impl CostMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of (origin, destination) entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cost of the exact (origin, destination) pair, if present
    pub fn get(&self, origin: &Place, destination: &Place) -> Option<f64> {
        self.entries.get(origin).and_then(|row| row.get(destination)).copied()
    }

    /// Cost of the pair looked up in either direction, direct entry first
    pub fn get_either(&self, a: &Place, b: &Place) -> Option<f64> {
        self.get(a, b).or_else(|| self.get(b, a))
    }

    pub fn contains(&self, origin: &Place, destination: &Place) -> bool {
        self.get(origin, destination).is_some()
    }

    /// Insert a cost unless the pair is already present
    ///
    /// Returns `true` when the entry was added. An existing entry is never
    /// overwritten.
    pub fn insert(&mut self, origin: Place, destination: Place, cost: f64) -> bool {
        let row = self.entries.entry(origin).or_default();
        if row.contains_key(&destination) {
            return false;
        }
        row.insert(destination, cost);
        self.len += 1;
        true
    }

    /// Copy every entry of `other` missing from this matrix, returning how many were added
    pub fn merge(&mut self, other: &CostMatrix) -> usize {
        other
            .iter()
            .filter(|&(origin, destination, cost)| self.insert(origin, destination, cost))
            .count()
    }

    /// All entries as (origin, destination, cost), in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (Place, Place, f64)> + '_ {
        self.entries
            .iter()
            .flat_map(|(origin, row)| row.iter().map(move |(destination, cost)| (*origin, *destination, *cost)))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.len = 0;
    }
}

/// Strategy for computing missing matrix entries
pub trait CostMatrixProvider: Send + Sync {
    /// Compute and insert every origin x destination pair absent from `matrix`
    ///
    /// Present entries are left untouched, so a second call with the same
    /// inputs adds nothing. Resolves to the number of entries added.
    fn fill_missing<'a>(
        &'a self,
        origins: &'a [Place],
        destinations: &'a [Place],
        matrix: &'a mut CostMatrix,
    ) -> BoxFuture<'a, Result<usize>>;

    /// A fresh matrix covering every origin x destination pair
    fn create_cost_matrix<'a>(
        &'a self,
        origins: &'a [Place],
        destinations: &'a [Place],
    ) -> BoxFuture<'a, Result<CostMatrix>> {
        async move {
            let mut matrix = CostMatrix::new();
            self.fill_missing(origins, destinations, &mut matrix).await?;
            Ok(matrix)
        }
        .boxed()
    }
}

/// Tuning for [`DefaultCostMatrixProvider`]
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Treat (a, b) as present when (b, a) is
    pub symmetric: bool,

    /// Batches at least this large are computed on blocking worker tasks
    pub parallel_threshold: usize,

    /// Number of worker tasks for a parallel batch
    pub workers: usize,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            symmetric: false,
            parallel_threshold: 4096,
            workers: num_cpus::get(),
        }
    }
}

/// Fills a matrix from a [`CostCalculator`]
///
/// All missing pairs of a round are collected first, then computed either
/// inline or split across `spawn_blocking` workers, and joined before
/// anything is inserted. Outside a Tokio runtime every batch is computed
/// inline, whatever its size.
pub struct DefaultCostMatrixProvider {
    calculator: Arc<dyn CostCalculator>,
    options: ProviderOptions,
}

impl DefaultCostMatrixProvider {
    pub fn new(calculator: Arc<dyn CostCalculator>) -> Self {
        Self::with_options(calculator, ProviderOptions::default())
    }

    pub fn with_options(calculator: Arc<dyn CostCalculator>, options: ProviderOptions) -> Self {
        Self { calculator, options }
    }

    pub fn calculator(&self) -> &Arc<dyn CostCalculator> {
        &self.calculator
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.options
    }

    /// Pairs still missing from the matrix, deduplicated, in input order
    ///
    /// With symmetric lookup, pairs whose reverse is known are copied over
    /// directly; the number of such copies is returned alongside.
    fn pending_pairs(&self, origins: &[Place], destinations: &[Place], matrix: &mut CostMatrix) -> (Vec<(Place, Place)>, usize) {
        let mut pending = Vec::new();
        let mut seen = HashSet::new();
        let mut mirrored = 0;

        for origin in origins {
            for destination in destinations {
                if matrix.contains(origin, destination) {
                    continue;
                }
                if self.options.symmetric {
                    if let Some(cost) = matrix.get(destination, origin) {
                        if matrix.insert(*origin, *destination, cost) {
                            mirrored += 1;
                        }
                        continue;
                    }
                }
                if seen.insert((*origin, *destination)) {
                    pending.push((*origin, *destination));
                }
            }
        }
        (pending, mirrored)
    }

    async fn compute(&self, pending: Vec<(Place, Place)>) -> Result<Vec<(Place, Place, f64)>> {
        let workers = self.options.workers.max(1);
        let runtime = if pending.len() < self.options.parallel_threshold || workers == 1 {
            None
        } else {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => Some(handle),
                Err(_) => {
                    debug!("No Tokio runtime, computing {} pairs inline", pending.len());
                    None
                }
            }
        };
        let Some(runtime) = runtime else {
            let calculator = self.calculator.as_ref();
            return Ok(pending
                .into_iter()
                .map(|(origin, destination)| (origin, destination, calculator.cost(&origin, &destination)))
                .collect());
        };

        let chunk_size = pending.len().div_ceil(workers);
        let handles = pending.chunks(chunk_size).map(|chunk| {
            let chunk = chunk.to_vec();
            let calculator = Arc::clone(&self.calculator);
            runtime.spawn_blocking(move || {
                chunk
                    .into_iter()
                    .map(|(origin, destination)| (origin, destination, calculator.cost(&origin, &destination)))
                    .collect::<Vec<_>>()
            })
        });

        let results = try_join_all(handles)
            .await
            .map_err(|e| Error::WorkerFailed(e.to_string()))?;
        Ok(results.into_iter().flatten().collect())
    }
}

impl CostMatrixProvider for DefaultCostMatrixProvider {
    fn fill_missing<'a>(
        &'a self,
        origins: &'a [Place],
        destinations: &'a [Place],
        matrix: &'a mut CostMatrix,
    ) -> BoxFuture<'a, Result<usize>> {
        async move {
            let (pending, mirrored) = self.pending_pairs(origins, destinations, matrix);
            if pending.is_empty() {
                trace!("Cost matrix already covers {}x{} pairs", origins.len(), destinations.len());
                return Ok(mirrored);
            }

            let requested = pending.len();
            let computed = self.compute(pending).await?;
            let added = computed
                .into_iter()
                .filter(|&(origin, destination, cost)| matrix.insert(origin, destination, cost))
                .count();

            debug!(
                "Filled {added} of {requested} missing cost entries ({mirrored} mirrored), matrix now holds {}",
                matrix.len()
            );
            Ok(added + mirrored)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cost::{Euclidean, Taxicab};

    fn place(lat: f64, long: f64) -> Place {
        Place::new(lat, long).unwrap()
    }

    #[test]
    fn test_insert_first_writer_wins() {
        let mut matrix = CostMatrix::new();
        let (a, b) = (place(0.0, 0.0), place(1.0, 1.0));
        assert!(matrix.insert(a, b, 1.0));
        assert!(!matrix.insert(a, b, 99.0));
        assert_eq!(matrix.get(&a, &b), Some(1.0));
        assert_eq!(matrix.get(&b, &a), None);
        assert_eq!(matrix.get_either(&b, &a), Some(1.0));
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn test_signed_zero_keys_collide() {
        let mut matrix = CostMatrix::new();
        matrix.insert(place(0.0, 0.0), place(1.0, 0.0), 1.0);
        assert_eq!(matrix.get(&place(-0.0, 0.0), &place(1.0, -0.0)), Some(1.0));
    }

    #[test]
    fn test_merge() {
        let (a, b, c) = (place(0.0, 0.0), place(1.0, 0.0), place(2.0, 0.0));
        let mut left = CostMatrix::new();
        left.insert(a, b, 1.0);
        let mut right = CostMatrix::new();
        right.insert(a, b, 5.0);
        right.insert(a, c, 2.0);
        assert_eq!(left.merge(&right), 1);
        assert_eq!(left.get(&a, &b), Some(1.0));
        assert_eq!(left.get(&a, &c), Some(2.0));
        assert_eq!(left.iter().count(), 2);
    }

    #[tokio::test]
    async fn test_create_cost_matrix() {
        let provider = DefaultCostMatrixProvider::new(Arc::new(Euclidean));
        let origins = [place(0.0, 0.0), place(3.0, 0.0)];
        let destinations = [place(0.0, 4.0)];
        let matrix = provider.create_cost_matrix(&origins, &destinations).await.unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.get(&origins[1], &destinations[0]), Some(5.0));
    }

    #[tokio::test]
    async fn test_fill_missing_is_idempotent_and_keeps_existing() {
        let provider = DefaultCostMatrixProvider::new(Arc::new(Taxicab::new()));
        let origins = [place(0.0, 0.0), place(1.0, 1.0)];
        let destinations = [place(2.0, 2.0), place(2.0, 2.0), place(-1.0, 0.0)];

        let mut matrix = CostMatrix::new();
        matrix.insert(origins[0], destinations[0], 42.0);

        let added = provider.fill_missing(&origins, &destinations, &mut matrix).await.unwrap();
        assert_eq!(added, 3);
        assert_eq!(matrix.get(&origins[0], &destinations[0]), Some(42.0));

        let again = provider.fill_missing(&origins, &destinations, &mut matrix).await.unwrap();
        assert_eq!(again, 0);
        assert_eq!(matrix.len(), 4);
    }

    #[tokio::test]
    async fn test_symmetric_lookup_mirrors_reverse_entries() {
        let options = ProviderOptions { symmetric: true, ..Default::default() };
        let provider = DefaultCostMatrixProvider::with_options(Arc::new(Euclidean), options);
        let (a, b) = (place(0.0, 0.0), place(0.0, 1.0));

        let mut matrix = CostMatrix::new();
        matrix.insert(b, a, 7.0);
        let added = provider.fill_missing(&[a], &[b], &mut matrix).await.unwrap();
        assert_eq!(added, 1);
        assert_eq!(matrix.get(&a, &b), Some(7.0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_parallel_fill_matches_inline() {
        let origins: Vec<Place> = (0..20).map(|i| place(i as f64 * 0.5, 0.0)).collect();
        let destinations: Vec<Place> = (0..15).map(|j| place(0.0, j as f64 * 0.25)).collect();

        let inline = DefaultCostMatrixProvider::with_options(
            Arc::new(Euclidean),
            ProviderOptions { parallel_threshold: usize::MAX, ..Default::default() },
        );
        let parallel = DefaultCostMatrixProvider::with_options(
            Arc::new(Euclidean),
            ProviderOptions { parallel_threshold: 1, workers: 4, ..Default::default() },
        );

        let a = inline.create_cost_matrix(&origins, &destinations).await.unwrap();
        let b = parallel.create_cost_matrix(&origins, &destinations).await.unwrap();
        assert_eq!(a.len(), 300);
        assert_eq!(b.len(), 300);
        for (origin, destination, cost) in a.iter() {
            assert_eq!(b.get(&origin, &destination), Some(cost));
        }
    }

    #[test]
    fn test_large_batch_without_runtime_runs_inline() {
        let origins: Vec<Place> = (0..8).map(|i| place(i as f64, 0.0)).collect();
        let destinations: Vec<Place> = (0..8).map(|j| place(0.0, j as f64)).collect();
        let provider = DefaultCostMatrixProvider::with_options(
            Arc::new(Taxicab::new()),
            ProviderOptions { parallel_threshold: 1, workers: 4, ..Default::default() },
        );

        let matrix = futures::executor::block_on(provider.create_cost_matrix(&origins, &destinations)).unwrap();
        assert_eq!(matrix.len(), 64);
        assert_eq!(matrix.get(&place(3.0, 0.0), &place(0.0, 5.0)), Some(8.0));
    }
}
