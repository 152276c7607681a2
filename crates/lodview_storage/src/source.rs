use lodview_core::prelude::*;

use auto_impl::auto_impl;
use futures::future::BoxFuture;
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// The index of a chunk in the chunk grid of a level, in `CXYZT` order.
pub type ChunkCoord = AxisMap<i64>;

/// The raw bytes of one chunk: a dense, native-endian, C-order array over the level's `dims` with the full chunk shape.
/// Chunks on the far boundary of the array are padded to the full shape.
pub type ChunkBuffer = Arc<[u8]>;

/// A failure reported by a `ChunkSource`. The underlying error is kept as-is.
#[derive(Clone, Debug, Error)]
#[error("failed to fetch {num_chunks} chunk(s) at scale {scale}")]
pub struct FetchError {
    pub scale: usize,
    pub num_chunks: usize,
    #[source]
    pub source: Arc<dyn StdError + Send + Sync>,
}

impl FetchError {
    pub fn new(scale: usize, num_chunks: usize, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            scale,
            num_chunks,
            source: Arc::from(source.into()),
        }
    }
}

/// Provides the raw chunk buffers of a pyramid. Storage and transport are entirely up to the implementation.
#[auto_impl(&, Arc, Box)]
pub trait ChunkSource: Send + Sync {
    /// Fetch the chunks at `coords` of level `scale` as one batch. On success there is exactly one buffer per coordinate,
    /// in the same order.
    fn fetch_chunks<'a>(
        &'a self,
        scale: usize,
        coords: &'a [ChunkCoord],
    ) -> BoxFuture<'a, Result<Vec<ChunkBuffer>, FetchError>>;
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝
