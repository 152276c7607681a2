#![allow(clippy::type_complexity)]

//! Chunked, multiresolution image access.
//!
//! A `MultiscaleImage` owns the metadata of every `PyramidLevel` and turns a request for a world-space region at some scale
//! into a dense `AssembledImage`. Each request goes through explicit stages:
//!   - `FetchPlan::new`: world bounds → index extent → chunk coordinates (synchronous)
//!   - `ChunkSource::fetch_chunks`: one batched, asynchronous fetch
//!   - `assemble_chunks`: copy chunk buffers into a dense, typed pixel buffer (optionally on a worker pool)
//!
//! Assembled images are kept in a bounded `LruCache`, and concurrent identical requests share a single fetch.

pub mod accessor;
pub mod assemble;
pub mod assembled;
pub mod caching;
pub mod image_type;
pub mod plan;
pub mod pyramid;
pub mod source;

pub use accessor::*;
pub use assemble::*;
pub use assembled::*;
pub use caching::*;
pub use image_type::*;
pub use plan::*;
pub use pyramid::*;
pub use source::*;

// Hash types to use for small keys like `ImageKey`.
pub type SmallKeyHashMap<K, V> = ahash::AHashMap<K, V>;
pub type SmallKeyBuildHasher = ahash::RandomState;

pub mod prelude {
    pub use super::{
        assemble_chunks, AccessError, AccessorConfig, AssembledImage, AssemblyError, BuildError, ChunkBuffer,
        ChunkCoord, ChunkLayout, ChunkSource, ComponentType, CoordinateSequence, FetchError, FetchPlan, ImageKey,
        ImageMeta, ImageType, LevelError, LevelGeometry, LevelSpec, MultiscaleImage, PixelBuffer, PixelType,
        PyramidLevel, DEFAULT_MAX_VOXELS,
    };
}
