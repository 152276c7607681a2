use lodview_storage::{ChunkBuffer, ChunkCoord, ChunkSource, FetchError, SmallKeyHashMap};

use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

/// Serves chunks from memory. Missing chunks are reported as a `FetchError`.
#[derive(Clone, Debug, Default)]
pub struct InMemoryChunkSource {
    chunks: SmallKeyHashMap<(usize, ChunkCoord), ChunkBuffer>,
}

impl InMemoryChunkSource {
    pub fn insert(&mut self, scale: usize, coord: ChunkCoord, buffer: ChunkBuffer) {
        self.chunks.insert((scale, coord), buffer);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn lookup(&self, scale: usize, coords: &[ChunkCoord]) -> Result<Vec<ChunkBuffer>, FetchError> {
        coords
            .iter()
            .map(|coord| {
                self.chunks.get(&(scale, *coord)).cloned().ok_or_else(|| {
                    FetchError::new(scale, coords.len(), format!("no chunk at {:?}", coord.0))
                })
            })
            .collect()
    }
}

impl ChunkSource for InMemoryChunkSource {
    fn fetch_chunks<'a>(
        &'a self,
        scale: usize,
        coords: &'a [ChunkCoord],
    ) -> BoxFuture<'a, Result<Vec<ChunkBuffer>, FetchError>> {
        futures::future::ready(self.lookup(scale, coords)).boxed()
    }
}

/// Observations and switches shared between a `CountingChunkSource` and the test that drives it.
#[derive(Debug, Default)]
pub struct FetchStats {
    batches: AtomicUsize,
    chunks: AtomicUsize,
    fail: AtomicBool,
    pend_once: AtomicBool,
}

impl FetchStats {
    /// Number of `fetch_chunks` calls.
    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Total number of chunks requested over all calls.
    pub fn chunks(&self) -> usize {
        self.chunks.load(Ordering::SeqCst)
    }

    /// While set, every fetch fails.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// While set, every fetch yields to the executor once before completing.
    pub fn set_pend_once(&self, pend: bool) {
        self.pend_once.store(pend, Ordering::SeqCst);
    }
}

/// Wraps another source and records every request in `FetchStats`.
#[derive(Clone, Debug)]
pub struct CountingChunkSource<S> {
    inner: S,
    stats: Arc<FetchStats>,
}

impl<S> CountingChunkSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            stats: Default::default(),
        }
    }

    pub fn stats(&self) -> Arc<FetchStats> {
        self.stats.clone()
    }
}

impl<S> ChunkSource for CountingChunkSource<S>
where
    S: ChunkSource,
{
    fn fetch_chunks<'a>(
        &'a self,
        scale: usize,
        coords: &'a [ChunkCoord],
    ) -> BoxFuture<'a, Result<Vec<ChunkBuffer>, FetchError>> {
        self.stats.batches.fetch_add(1, Ordering::SeqCst);
        self.stats.chunks.fetch_add(coords.len(), Ordering::SeqCst);
        let fail = self.stats.fail.load(Ordering::SeqCst);
        let pend = self.stats.pend_once.load(Ordering::SeqCst);

        async move {
            if pend {
                PendOnce::default().await;
            }
            if fail {
                return Err(FetchError::new(scale, coords.len(), "injected failure"));
            }

            self.inner.fetch_chunks(scale, coords).await
        }
        .boxed()
    }
}

/// Returns `Pending` on the first poll (waking itself immediately) and `Ready` on the second.
#[derive(Debug, Default)]
pub struct PendOnce {
    polled: bool,
}

impl Future for PendOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.polled {
            Poll::Ready(())
        } else {
            self.polled = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
