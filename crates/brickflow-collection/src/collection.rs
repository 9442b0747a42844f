//! `Collection<T>`: the parallel data-parallel collection abstraction
//! consumed by the regridding/generation/padding pipeline.
//!
//! Two backends are supported behind one type: [`Backend::Sequential`]
//! runs every operation on the calling thread (used for tests and small
//! jobs); [`Backend::Parallel`] drives the same operations across a
//! `rayon` thread pool. Within a partition, work is sequential; across
//! partitions there is no shared mutable state.

use crate::hashed_key::HashedKey;
use hashbrown::HashMap;
use rayon::prelude::*;

/// Which engine a [`Collection`] executes its operations on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Single-threaded, deterministic order. Used for tests and jobs too
    /// small to benefit from parallelism.
    Sequential,
    /// Partitioned across a `rayon` thread pool.
    Parallel,
}

/// A collection of items distributed (conceptually) across partitions,
/// supporting: `map`, `flat_map`, `filter`, `map_partitions`,
/// `group_by_key`, `values`, `persist`/`unpersist`, `foreach`, and
/// `partition_by_weight`.
///
/// This implementation is eager: every transform below executes
/// immediately and returns a new materialised `Collection`. This is a
/// deliberate simplification of a fully lazy parallel collection
/// abstraction — see `DESIGN.md` for the rationale — but every operation
/// keeps the same suspension points (only accessor calls and
/// `group_by_key` may block) and the same ordering guarantees.
///
/// `partitioning`, when set, records the item count of each partition
/// `map_partitions` should use instead of splitting evenly by thread
/// count. It is consumed (and cleared) by the next `map_partitions`
/// call; every other transform that can change item count or order
/// drops it, since stale boundaries would no longer describe a
/// meaningful split. `map` preserves it, since it changes neither.
pub struct Collection<T> {
    items: Vec<T>,
    backend: Backend,
    partitioning: Option<Vec<usize>>,
}

impl<T: Send> Collection<T> {
    #[must_use]
    pub fn new(items: Vec<T>, backend: Backend) -> Self {
        Self {
            items,
            backend,
            partitioning: None,
        }
    }

    /// Record partition boundaries so the next `map_partitions` call
    /// groups items by cumulative `weight` rather than by thread count:
    /// each partition's weight stays close to `target_partition_weight`,
    /// and the partition count never drops below `min_partitions`
    /// (typically the size of the thread pool the collection runs on).
    #[must_use]
    pub fn partition_by_weight(
        self,
        target_partition_weight: u64,
        min_partitions: usize,
        weight: impl Fn(&T) -> u64,
    ) -> Self {
        let partitioning = balanced_partition_sizes(&self.items, target_partition_weight, min_partitions, weight);
        Collection {
            partitioning: Some(partitioning),
            ..self
        }
    }

    #[must_use]
    pub fn backend(&self) -> Backend {
        self.backend
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Apply `f` to every item.
    #[must_use]
    pub fn map<U: Send>(self, f: impl Fn(T) -> U + Sync + Send) -> Collection<U> {
        let items = match self.backend {
            Backend::Sequential => self.items.into_iter().map(f).collect(),
            Backend::Parallel => self.items.into_par_iter().map(f).collect(),
        };
        Collection {
            items,
            backend: self.backend,
            partitioning: self.partitioning,
        }
    }

    /// Keep only items for which `f` returns true.
    #[must_use]
    pub fn filter(self, f: impl Fn(&T) -> bool + Sync + Send) -> Collection<T> {
        let items = match self.backend {
            Backend::Sequential => self.items.into_iter().filter(f).collect(),
            Backend::Parallel => self.items.into_par_iter().filter(f).collect(),
        };
        Collection {
            items,
            backend: self.backend,
            partitioning: None,
        }
    }

    /// Apply `f` to every item, flattening the resulting iterables.
    #[must_use]
    pub fn flat_map<U: Send, I>(self, f: impl Fn(T) -> I + Sync + Send) -> Collection<U>
    where
        I: IntoIterator<Item = U>,
    {
        let items: Vec<U> = match self.backend {
            Backend::Sequential => self.items.into_iter().flat_map(f).collect(),
            Backend::Parallel => self.items.into_par_iter().flat_map_iter(f).collect(),
        };
        Collection {
            items,
            backend: self.backend,
            partitioning: None,
        }
    }

    /// Apply `f` once per partition, so per-partition setup (e.g.
    /// constructing a label mapper) is amortised across all items in
    /// that partition. Partitions follow the boundaries set by the last
    /// [`Collection::partition_by_weight`] call if any; otherwise items
    /// are split evenly by thread count.
    #[must_use]
    pub fn map_partitions<U: Send>(self, f: impl Fn(Vec<T>) -> Vec<U> + Sync + Send) -> Collection<U> {
        let Collection {
            items,
            backend,
            partitioning,
        } = self;
        let items = match (backend, partitioning) {
            (Backend::Sequential, Some(sizes)) => {
                let mut iter = items.into_iter();
                let mut out = Vec::new();
                for size in sizes {
                    let chunk: Vec<T> = (&mut iter).take(size).collect();
                    out.extend(f(chunk));
                }
                out
            }
            (Backend::Sequential, None) => f(items),
            (Backend::Parallel, Some(sizes)) => {
                let mut iter = items.into_iter();
                let chunks: Vec<Vec<T>> = sizes.into_iter().map(|size| (&mut iter).take(size).collect()).collect();
                chunks.into_par_iter().flat_map_iter(&f).collect()
            }
            (Backend::Parallel, None) => {
                let num_partitions = rayon::current_num_threads().max(1);
                let chunk_size = items.len().div_ceil(num_partitions).max(1);
                items.into_par_iter().chunks(chunk_size).flat_map_iter(&f).collect()
            }
        };
        Collection {
            items,
            backend,
            partitioning: None,
        }
    }

    /// Run `f` on every item for its side effect; does not produce a new
    /// collection.
    pub fn foreach(&self, f: impl Fn(&T) + Sync + Send) {
        match self.backend {
            Backend::Sequential => self.items.iter().for_each(f),
            Backend::Parallel => self.items.par_iter().for_each(f),
        }
    }

    /// Pin this collection so downstream branches can reuse it without
    /// recomputation; see [`Persisted`].
    #[must_use]
    pub fn persist(self) -> Persisted<T>
    where
        T: Clone,
    {
        tracing::debug!(count = self.items.len(), "persisting collection");
        Persisted {
            items: std::sync::Arc::new(self.items),
            backend: self.backend,
        }
    }
}

impl<K, V> Collection<(HashedKey<K>, V)>
where
    K: Send,
    V: Send,
{
    /// Group values by their `HashedKey`'s explicit hash-and-equality,
    /// forming the shuffle barrier. All fragments
    /// sharing a key are guaranteed to land in the same output group
    /// (and, in the `Parallel` backend, are merged from every worker's
    /// partial map before being returned).
    #[must_use]
    pub fn group_by_key(self) -> Collection<(K, Vec<V>)>
    where
        K: Eq + Send,
    {
        let grouped: HashMap<HashedKey<K>, Vec<V>> = match self.backend {
            Backend::Sequential => {
                let mut map: HashMap<HashedKey<K>, Vec<V>> = HashMap::new();
                for (key, value) in self.items {
                    map.entry(key).or_default().push(value);
                }
                map
            }
            Backend::Parallel => self
                .items
                .into_par_iter()
                .fold(HashMap::new, |mut acc: HashMap<HashedKey<K>, Vec<V>>, (key, value)| {
                    acc.entry(key).or_default().push(value);
                    acc
                })
                .reduce(HashMap::new, |mut a, b| {
                    for (key, mut values) in b {
                        a.entry(key).or_default().append(&mut values);
                    }
                    a
                }),
        };
        let items = grouped
            .into_iter()
            .map(|(hk, values)| (hk.key, values))
            .collect();
        Collection {
            items,
            backend: self.backend,
            partitioning: None,
        }
    }
}

impl<K: Send, V: Send> Collection<(K, V)> {
    /// Drop the keys, keeping only values.
    #[must_use]
    pub fn values(self) -> Collection<V> {
        self.map(|(_, v)| v)
    }
}

/// Greedily group `items` into partitions whose cumulative `weight`
/// stays close to `target`, while guaranteeing at least `min_partitions`
/// partitions in total (widening them, not narrowing, when the weight
/// target alone would produce fewer).
fn balanced_partition_sizes<T>(
    items: &[T],
    target: u64,
    min_partitions: usize,
    weight: impl Fn(&T) -> u64,
) -> Vec<usize> {
    if items.is_empty() {
        return Vec::new();
    }
    let total: u64 = items.iter().map(&weight).sum();
    let num_partitions = total
        .div_ceil(target.max(1))
        .max(min_partitions as u64)
        .max(1)
        .min(items.len() as u64);
    let per_partition_weight = total.div_ceil(num_partitions).max(1);

    let mut sizes = Vec::new();
    let mut current_count = 0usize;
    let mut current_weight = 0u64;
    for item in items {
        if current_count > 0
            && current_weight + weight(item) > per_partition_weight
            && (sizes.len() as u64) + 1 < num_partitions
        {
            sizes.push(current_count);
            current_count = 0;
            current_weight = 0;
        }
        current_count += 1;
        current_weight += weight(item);
    }
    if current_count > 0 {
        sizes.push(current_count);
    }
    sizes
}

/// A [`Collection`] pinned between barriers via [`Collection::persist`].
///
/// Backed by an `Arc<Vec<T>>` so multiple downstream consumers can clone
/// the handle cheaply instead of recomputing the upstream pipeline —
/// the practical effect of Spark-style `persist`/`storage_level`
/// pinning in an eager evaluation model.
pub struct Persisted<T> {
    items: std::sync::Arc<Vec<T>>,
    backend: Backend,
}

impl<T: Send + Sync + Clone> Persisted<T> {
    /// Re-enter the lazy `Collection` API, cloning the underlying `Vec`.
    #[must_use]
    pub fn collection(&self) -> Collection<T> {
        Collection::new((*self.items).clone(), self.backend)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Release the pinned data. A no-op beyond dropping the `Arc`
    /// (matching the original's `rt.unpersist`, which is likewise just
    /// bookkeeping), kept as an explicit call so call sites document
    /// intent the same way the original pipeline does.
    pub fn unpersist(self) {
        tracing::debug!(count = self.items.len(), "unpersisting collection");
        drop(self);
    }
}
