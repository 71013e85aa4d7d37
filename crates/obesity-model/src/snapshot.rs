use crate::dataset::Dataset;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared, read-only access to the currently loaded [`Dataset`].
///
/// Readers take a [`snapshot`](Self::snapshot) (a cheap `Arc` clone) and keep using it for the
/// whole computation. A refresh replaces the entire dataset reference at once, so a reader never
/// observes a partially updated table: computations that started before the swap keep their old
/// snapshot, later ones see the new one.
#[derive(Debug)]
pub struct DatasetHandle {
    current: RwLock<Arc<Dataset>>,
}

impl DatasetHandle {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            current: RwLock::new(Arc::new(dataset)),
        }
    }

    pub fn snapshot(&self) -> Arc<Dataset> {
        // The lock only guards an `Arc` swap, so a poisoned lock still holds a consistent value.
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Atomically replace the dataset, returning the previous snapshot.
    pub fn replace(&self, dataset: Dataset) -> Arc<Dataset> {
        let next = Arc::new(dataset);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }
}

impl From<Dataset> for DatasetHandle {
    fn from(dataset: Dataset) -> Self {
        Self::new(dataset)
    }
}
