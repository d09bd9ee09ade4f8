//! In-memory photo store keyed by photo id.
//!
//! The store is append-only by key: a record is inserted the first time its id
//! is seen and never replaced or removed afterwards. Readers get an immutable
//! snapshot that is rebuilt on every insertion, so taking one only clones an
//! `Arc` under the read lock.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::Photo;

/// Point-in-time view of the store, ordered by ascending id.
pub type Snapshot = Arc<[Photo]>;

/// Outcome of merging one fetched batch into the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    pub fetched: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

struct Inner {
    by_id: BTreeMap<u64, Photo>,
    snapshot: Snapshot,
}

impl Inner {
    fn rebuild_snapshot(&mut self) {
        self.snapshot = self.by_id.values().cloned().collect();
    }
}

pub struct PhotoStore {
    inner: RwLock<Inner>,
}

impl Default for PhotoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotoStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                by_id: BTreeMap::new(),
                snapshot: Arc::from(Vec::new()),
            }),
        }
    }

    /// Insert `photo` unless its id is already present. Returns `true` when
    /// the record was inserted.
    pub fn add(&self, photo: Photo) -> bool {
        let mut inner = self.inner.write();
        if inner.by_id.contains_key(&photo.id) {
            return false;
        }
        inner.by_id.insert(photo.id, photo);
        inner.rebuild_snapshot();
        true
    }

    /// Insert every record of `photos` whose id is absent, as one write.
    ///
    /// Readers observe either none or all of the batch's insertions.
    pub fn merge<I>(&self, photos: I) -> MergeReport
    where
        I: IntoIterator<Item = Photo>,
    {
        let mut report = MergeReport::default();
        let mut inner = self.inner.write();

        for photo in photos {
            report.fetched += 1;
            if inner.by_id.contains_key(&photo.id) {
                report.duplicates += 1;
            } else {
                inner.by_id.insert(photo.id, photo);
                report.inserted += 1;
            }
        }

        if report.inserted > 0 {
            inner.rebuild_snapshot();
        }
        report
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.read().snapshot.clone()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.inner.read().by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
