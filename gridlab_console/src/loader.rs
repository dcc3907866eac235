//! Memoized, last-write-wins page loading.
//!
//! Pages are fetched through an [`EngineClient`] and decoded on the blocking
//! pool. Each `(simulation, page)` keeps one memoized decode together with the
//! blob it came from, so a page whose blob has not changed is decoded once and
//! a new blob replaces the old entry. When several requests for the
//! same page overlap, only the most recently issued one may become the
//! current page; an older request that finishes late is reported as
//! [`LoadOutcome::Superseded`].

use crate::error::ConsoleError;
use gridlab_core::{IterationPage, PageNumber};
use gridlab_env::{EngineClient, PageKey, SimulationId};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Identity of a page blob: 64-bit hash plus length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BlobId {
    hash: u64,
    len: usize,
}

impl BlobId {
    fn of(blob: Option<&str>) -> Self {
        let mut hasher = DefaultHasher::new();
        blob.hash(&mut hasher);
        Self {
            hash: hasher.finish(),
            len: blob.map_or(0, str::len),
        }
    }
}

/// Result of one [`PageLoader::load`] call.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// This request is now the current page for its key
    Loaded(Arc<IterationPage>),

    /// A later request for the same page was stored first
    Superseded,
}

impl LoadOutcome {
    pub fn page(&self) -> Option<&Arc<IterationPage>> {
        match self {
            LoadOutcome::Loaded(page) => Some(page),
            LoadOutcome::Superseded => None,
        }
    }
}

/// Last decode of one page key.
struct Memo {
    blob_id: BlobId,
    /// Compared on a hit so a hash collision cannot serve the wrong page
    blob: Option<String>,
    page: Arc<IterationPage>,
}

impl Memo {
    fn matches(&self, blob_id: BlobId, blob: Option<&str>) -> bool {
        self.blob_id == blob_id && self.blob.as_deref() == blob
    }
}

#[derive(Debug, Default)]
struct Slot {
    /// Last ticket handed out
    issued: u64,
    /// Ticket of the request whose page is `page`
    stored: u64,
    page: Option<Arc<IterationPage>>,
}

/// Loads iteration pages for the console.
pub struct PageLoader<E: EngineClient> {
    engine: Arc<E>,
    decoded: Mutex<HashMap<PageKey, Memo>>,
    slots: Mutex<HashMap<PageKey, Slot>>,
}

impl<E: EngineClient> PageLoader<E> {
    pub fn new(engine: Arc<E>) -> Self {
        Self {
            engine,
            decoded: Mutex::new(HashMap::new()),
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Fetches, decodes and stores one page.
    ///
    /// `number` is the 1-based page the user asked for; the engine is asked
    /// for the corresponding 0-based index.
    pub async fn load(&self, id: SimulationId, number: PageNumber) -> Result<LoadOutcome, ConsoleError> {
        let key = PageKey::new(id, number.to_wire());
        let ticket = {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(key).or_default();
            slot.issued += 1;
            slot.issued
        };

        let blob = self.engine.fetch_page(id, key.page).await?;
        let page = self.decode(key, blob).await?;

        let mut slots = self.slots.lock().await;
        let slot = slots.entry(key).or_default();
        if ticket < slot.stored {
            debug!("Page {} request #{} superseded by #{}", key, ticket, slot.stored);
            return Ok(LoadOutcome::Superseded);
        }
        slot.stored = ticket;
        slot.page = Some(Arc::clone(&page));
        Ok(LoadOutcome::Loaded(page))
    }

    /// The page most recently stored for `(id, number)`.
    pub async fn current(&self, id: SimulationId, number: PageNumber) -> Option<Arc<IterationPage>> {
        let key = PageKey::new(id, number.to_wire());
        self.slots.lock().await.get(&key).and_then(|slot| slot.page.clone())
    }

    /// Number of memoized decodes.
    pub async fn decoded_len(&self) -> usize {
        self.decoded.lock().await.len()
    }

    /// Drops every memoized page of a simulation, e.g. after a new run.
    pub async fn forget(&self, id: SimulationId) {
        self.decoded.lock().await.retain(|key, _| key.simulation != id);
        self.slots.lock().await.retain(|key, _| key.simulation != id);
    }

    async fn decode(&self, key: PageKey, blob: Option<String>) -> Result<Arc<IterationPage>, ConsoleError> {
        let blob_id = BlobId::of(blob.as_deref());
        if let Some(memo) = self.decoded.lock().await.get(&key) {
            if memo.matches(blob_id, blob.as_deref()) {
                debug!("Page {} served from memo", key);
                return Ok(Arc::clone(&memo.page));
            }
        }

        let index = key.page;
        let (page, blob) = tokio::task::spawn_blocking(move || {
            IterationPage::decode(index, blob.as_deref()).map(|page| (page, blob))
        })
        .await??;
        let page = Arc::new(page);
        debug!("Page {} decoded: {} snapshots", key, page.len());

        // Replaces any decode of an older blob for the same key
        self.decoded.lock().await.insert(
            key,
            Memo {
                blob_id,
                blob,
                page: Arc::clone(&page),
            },
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gridlab_core::{PageIndex, SimulationConfig, Snapshot};
    use gridlab_env::{EnvError, MemoryEngine, RunEvent};
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Memory engine whose page fetches take scripted delays.
    struct DelayedEngine {
        inner: MemoryEngine,
        delays: std::sync::Mutex<VecDeque<Duration>>,
    }

    #[async_trait]
    impl EngineClient for DelayedEngine {
        async fn fetch_config(&self, id: SimulationId) -> Result<SimulationConfig, EnvError> {
            self.inner.fetch_config(id).await
        }

        async fn fetch_page(&self, id: SimulationId, page: PageIndex) -> Result<Option<String>, EnvError> {
            let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
            tokio::time::sleep(delay).await;
            self.inner.fetch_page(id, page).await
        }

        async fn run(&self, id: SimulationId) -> Result<mpsc::Receiver<RunEvent>, EnvError> {
            self.inner.run(id).await
        }

        async fn fetch_results(&self, id: SimulationId) -> Result<String, EnvError> {
            self.inner.fetch_results(id).await
        }
    }

    fn snapshots(n: usize, value: i64) -> Vec<Snapshot> {
        vec![vec![vec![value, 0], vec![0, value]]; n]
    }

    async fn setup(delays: &[u64]) -> (PageLoader<DelayedEngine>, SimulationId) {
        let inner = MemoryEngine::new();
        let id = inner.insert(SimulationConfig::default()).await;
        inner.store_snapshots(id, &snapshots(1200, 1)).await.unwrap();
        let engine = DelayedEngine {
            inner,
            delays: std::sync::Mutex::new(delays.iter().map(|&ms| Duration::from_millis(ms)).collect()),
        };
        (PageLoader::new(Arc::new(engine)), id)
    }

    fn page(n: u64) -> PageNumber {
        PageNumber::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_page_numbers_map_to_wire_indices() {
        let (loader, id) = setup(&[]).await;

        let first = loader.load(id, page(1)).await.unwrap();
        let first = first.page().unwrap();
        assert_eq!(first.index, PageIndex(0));
        assert_eq!(first.len(), 1000);

        let second = loader.load(id, page(2)).await.unwrap();
        let second = second.page().unwrap();
        assert_eq!(second.len(), 200);
        assert_eq!(second.iteration_number(0), 1000);

        // Past the end: empty page, not an error
        let third = loader.load(id, page(3)).await.unwrap();
        assert!(third.page().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unchanged_blob_is_decoded_once() {
        let (loader, id) = setup(&[]).await;

        let a = loader.load(id, page(1)).await.unwrap();
        let b = loader.load(id, page(1)).await.unwrap();
        assert!(Arc::ptr_eq(a.page().unwrap(), b.page().unwrap()));
        assert_eq!(loader.decoded_len().await, 1);

        // New run output under the same key decodes again
        loader.engine().inner.store_snapshots(id, &snapshots(10, 2)).await.unwrap();
        let c = loader.load(id, page(1)).await.unwrap();
        assert_eq!(c.page().unwrap().len(), 10);
        assert_eq!(loader.decoded_len().await, 1);

        loader.forget(id).await;
        assert_eq!(loader.decoded_len().await, 0);
        assert!(loader.current(id, page(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_new_blob_replaces_memo_entry() {
        let (loader, id) = setup(&[]).await;

        for (n, value) in [(5, 1), (6, 2), (7, 3)] {
            loader.engine().inner.store_snapshots(id, &snapshots(n, value)).await.unwrap();
            let loaded = loader.load(id, page(1)).await.unwrap();
            assert_eq!(loaded.page().unwrap().len(), n);
            assert_eq!(loaded.page().unwrap().snapshots()[0][0][0], value);
        }
        assert_eq!(loader.decoded_len().await, 1);

        // Another page of the same simulation gets its own entry
        loader.engine().inner.store_snapshots(id, &snapshots(1500, 4)).await.unwrap();
        loader.load(id, page(2)).await.unwrap();
        assert_eq!(loader.decoded_len().await, 2);
    }

    #[tokio::test]
    async fn test_memo_hit_requires_identical_blob() {
        let (loader, id) = setup(&[]).await;
        let key = PageKey::new(id, PageIndex(0));
        let blob = loader.engine().inner.fetch_page(id, PageIndex(0)).await.unwrap();

        // Same hash and length as the real blob, different text
        let stale = Arc::new(IterationPage::from_snapshots(PageIndex(0), snapshots(1, 9)).unwrap());
        loader.decoded.lock().await.insert(
            key,
            Memo {
                blob_id: BlobId::of(blob.as_deref()),
                blob: Some("something else".to_string()),
                page: Arc::clone(&stale),
            },
        );

        let loaded = loader.load(id, page(1)).await.unwrap();
        let loaded = loaded.page().unwrap();
        assert!(!Arc::ptr_eq(loaded, &stale));
        assert_eq!(loaded.len(), 1000);
    }

    #[tokio::test]
    async fn test_late_request_is_superseded() {
        // First request is slow, second is fast
        let (loader, id) = setup(&[80, 0]).await;

        let (slow, fast) = tokio::join!(loader.load(id, page(1)), loader.load(id, page(1)));
        assert!(matches!(slow.unwrap(), LoadOutcome::Superseded));
        let fast = fast.unwrap();
        let current = loader.current(id, page(1)).await.unwrap();
        assert!(Arc::ptr_eq(fast.page().unwrap(), &current));
    }

    #[tokio::test]
    async fn test_unrelated_keys_are_independent() {
        let (loader, id) = setup(&[80, 0]).await;

        let (one, two) = tokio::join!(loader.load(id, page(1)), loader.load(id, page(2)));
        assert!(one.unwrap().page().is_some());
        assert!(two.unwrap().page().is_some());
    }

    #[tokio::test]
    async fn test_unknown_simulation_fails() {
        let (loader, _) = setup(&[]).await;
        let result = loader.load(SimulationId::new(), page(1)).await;
        assert!(matches!(result, Err(ConsoleError::Env(EnvError::NotFound(_)))));
    }
}
