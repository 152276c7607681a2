use crate::{
    assemble_chunks, AssembledImage, AssemblyError, CacheLimits, ChunkBuffer, ChunkCoord, ChunkLayout, ChunkSource,
    FetchError, FetchPlan, ImageMeta, ImageType, PixelBuffer, PyramidLevel, SmallKeyHashMap, SmallKeyLruCache,
};

use lodview_core::prelude::*;

use core::fmt;
use futures::executor::ThreadPool;
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::task::SpawnExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Tuning knobs for a `MultiscaleImage`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct AccessorConfig {
    /// Maximum number of assembled images kept in the cache.
    pub cache_capacity: usize,
    /// Maximum total pixel bytes kept in the cache.
    pub cache_byte_budget: Option<usize>,
    /// Requests for regions with more spatial elements than this fail before any chunk is fetched.
    pub max_voxels: u64,
    /// Size of the assembly worker pool. Zero assembles inline on the requesting task, which blocks whoever polls it.
    pub assembly_threads: usize,
}

/// Two 512³ volumes worth of voxels.
pub const DEFAULT_MAX_VOXELS: u64 = 2 * 512 * 512 * 512;

impl Default for AccessorConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 16,
            cache_byte_budget: None,
            max_voxels: DEFAULT_MAX_VOXELS,
            assembly_threads: 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("a multiscale image needs at least one level")]
    NoLevels,
    #[error("image type has {expected} component(s) but scale 0 stores {actual}")]
    ComponentMismatch { expected: usize, actual: i64 },
    #[error("invalid direction: {0}")]
    Direction(#[from] TransformError),
    #[error("failed to start assembly workers: {0}")]
    ThreadPool(#[from] std::io::Error),
}

/// Why a `get_image` request failed. Failures are never cached, so the same request may be retried.
#[derive(Clone, Debug, Error)]
pub enum AccessError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("region at scale {scale} has {requested} voxels, more than the limit of {limit}")]
    VoxelBudgetExceeded { scale: usize, requested: u64, limit: u64 },
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Identifies an assembled image: a scale and the index extent it covers at that scale.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ImageKey {
    pub scale: usize,
    pub extent: IndexExtent,
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.scale, self.extent)
    }
}

type ImageResult = Result<Arc<AssembledImage>, AccessError>;
type PendingImage = Shared<BoxFuture<'static, ImageResult>>;

/// A multiresolution image backed by a `ChunkSource`.
///
/// Cloning is cheap; clones share the cache, the in-flight requests and the worker pool.
#[derive(Clone)]
pub struct MultiscaleImage {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    image_type: ImageType,
    levels: Vec<PyramidLevel>,
    direction: Direction,
    source: Box<dyn ChunkSource>,
    config: AccessorConfig,
    cache: Mutex<SmallKeyLruCache<ImageKey, Arc<AssembledImage>>>,
    in_flight: Mutex<SmallKeyHashMap<ImageKey, PendingImage>>,
    pool: Option<ThreadPool>,
}

impl fmt::Debug for MultiscaleImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiscaleImage")
            .field("name", &self.inner.name)
            .field("image_type", &self.inner.image_type)
            .field("num_scales", &self.num_scales())
            .field("cache_len", &self.cache_len())
            .finish()
    }
}

impl MultiscaleImage {
    /// `levels` must be ordered from finest (scale 0) to coarsest.
    pub fn new(
        name: impl Into<String>,
        image_type: ImageType,
        levels: Vec<PyramidLevel>,
        source: impl ChunkSource + 'static,
        config: AccessorConfig,
    ) -> Result<Self, BuildError> {
        let finest = levels.first().ok_or(BuildError::NoLevels)?;

        let stored_components = finest.array_shape()[Axis::C];
        if stored_components != image_type.components as i64 {
            return Err(BuildError::ComponentMismatch {
                expected: image_type.components,
                actual: stored_components,
            });
        }

        let direction = match finest.direction_rows() {
            Some(rows) => Direction::from_storage_rows(rows, finest.dims(), image_type.dimension)?,
            None => Direction::IDENTITY,
        };

        let pool = if config.assembly_threads > 0 {
            Some(
                ThreadPool::builder()
                    .pool_size(config.assembly_threads)
                    .name_prefix("lodview-assembly-")
                    .create()?,
            )
        } else {
            None
        };

        let cache = SmallKeyLruCache::new(CacheLimits {
            capacity: config.cache_capacity,
            byte_budget: config.cache_byte_budget,
        });

        Ok(Self {
            inner: Arc::new(Inner {
                name: name.into(),
                image_type,
                levels,
                direction,
                source: Box::new(source),
                config,
                cache: Mutex::new(cache),
                in_flight: Mutex::new(SmallKeyHashMap::default()),
                pool,
            }),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[inline]
    pub fn image_type(&self) -> &ImageType {
        &self.inner.image_type
    }

    #[inline]
    pub fn config(&self) -> &AccessorConfig {
        &self.inner.config
    }

    #[inline]
    pub fn num_scales(&self) -> usize {
        self.inner.levels.len()
    }

    /// The coarsest scale.
    #[inline]
    pub fn lowest_scale(&self) -> usize {
        self.num_scales() - 1
    }

    /// # Panics
    ///
    /// If `scale > self.lowest_scale()`.
    #[inline]
    pub fn level(&self, scale: usize) -> &PyramidLevel {
        assert!(
            scale <= self.lowest_scale(),
            "scale {} is out of range, the coarsest scale is {}",
            scale,
            self.lowest_scale()
        );

        &self.inner.levels[scale]
    }

    /// The `dimension × dimension` direction matrix in x, y, z order, shared by all scales.
    pub fn direction(&self) -> Vec<f64> {
        self.inner.direction.to_vec(self.inner.image_type.dimension)
    }

    /// Spatial element count of the whole level at `scale`.
    pub fn voxel_count(&self, scale: usize) -> u64 {
        self.level(scale).voxel_count()
    }

    pub fn value_ranges(&self, scale: usize) -> Option<&BTreeMap<usize, [f64; 2]>> {
        self.level(scale).value_ranges()
    }

    /// The number of assembled images currently cached.
    pub fn cache_len(&self) -> usize {
        lock(&self.inner.cache).len()
    }

    pub fn clear_cache(&self) {
        lock(&self.inner.cache).clear();
    }

    /// Resolves (once) and returns the placement of the index grid at `scale`.
    pub async fn scale_geometry(&self, scale: usize) -> ImageGeometry {
        let level = self.level(scale);
        let resolved = level.resolve_geometry(self.inner.image_type.dimension).await;

        ImageGeometry {
            origin: resolved.origin,
            spacing: resolved.spacing,
            direction: self.inner.direction,
        }
    }

    pub async fn scale_origin(&self, scale: usize) -> Vec<f64> {
        let geometry = self.scale_geometry(scale).await;

        self.truncate(geometry.origin)
    }

    pub async fn scale_spacing(&self, scale: usize) -> Vec<f64> {
        let geometry = self.scale_geometry(scale).await;

        self.truncate(geometry.spacing)
    }

    /// The world bounds of the whole level at `scale`.
    pub async fn world_bounds(&self, scale: usize) -> WorldBounds {
        self.scale_geometry(scale).await;

        self.full_meta(scale).world_bounds()
    }

    /// Metadata of the whole level at `scale`, or `None` if its geometry has not been resolved yet (see
    /// `scale_geometry`).
    pub fn image_meta(&self, scale: usize) -> Option<ImageMeta> {
        self.level(scale).geometry().map(|_| self.full_meta(scale))
    }

    fn full_meta(&self, scale: usize) -> ImageMeta {
        let level = self.level(scale);
        let geometry = level.geometry().unwrap_or(crate::LevelGeometry {
            origin: Point3f::ZERO,
            spacing: Point3f::ONES,
        });
        let dimension = self.inner.image_type.dimension;

        ImageMeta {
            image_type: self.inner.image_type,
            name: level.name().to_owned(),
            origin: self.truncate(geometry.origin),
            spacing: self.truncate(geometry.spacing),
            direction: self.direction(),
            size: Axis::spatial(dimension)
                .iter()
                .map(|&a| level.array_shape()[a] as usize)
                .collect(),
        }
    }

    fn truncate(&self, p: Point3f) -> Vec<f64> {
        p.0[..self.inner.image_type.dimension.min(3)].to_vec()
    }

    /// Returns the image of the region `bounds` (or the whole level when `None`) at `scale`.
    ///
    /// Results are cached by scale and index extent, so bounds that select the same elements share one image. Concurrent
    /// requests for the same image share one fetch.
    ///
    /// # Panics
    ///
    /// If `scale > self.lowest_scale()`.
    pub async fn get_image(&self, scale: usize, bounds: Option<&WorldBounds>) -> ImageResult {
        let level = self.level(scale);
        let geometry = self.scale_geometry(scale).await;
        let plan = FetchPlan::new(scale, level, &geometry, bounds)?;

        let requested = plan.voxel_count();
        let limit = self.inner.config.max_voxels;
        if requested > limit {
            tracing::warn!("refusing {} voxel region at scale {}, limit is {}", requested, scale, limit);
            return Err(AccessError::VoxelBudgetExceeded {
                scale,
                requested,
                limit,
            });
        }

        let key = ImageKey {
            scale,
            extent: plan.index_extent,
        };

        let pending = {
            let mut in_flight = lock(&self.inner.in_flight);
            if let Some(image) = lock(&self.inner.cache).get_touch(&key) {
                tracing::debug!("cache hit for {}", key);
                return Ok(image.clone());
            }
            match in_flight.get(&key) {
                Some(pending) => {
                    tracing::debug!("joining in-flight request for {}", key);
                    pending.clone()
                }
                None => {
                    tracing::debug!("cache miss for {}, fetching {} chunks", key, plan.chunk_coords.len());
                    let pending = self.clone().build_image(key, plan).boxed().shared();
                    in_flight.insert(key, pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    async fn build_image(self, key: ImageKey, plan: FetchPlan) -> ImageResult {
        let result = self.fetch_and_assemble(&plan).await.map(Arc::new);

        match &result {
            Ok(image) => {
                let mut cache = lock(&self.inner.cache);
                let evicted = cache.insert(key, image.clone());
                for (evicted_key, _) in evicted.iter().filter(|(k, _)| *k != key) {
                    tracing::debug!("evicted {}", evicted_key);
                }
                tracing::trace!("cache holds {} images, {} bytes", cache.len(), cache.total_bytes());
            }
            Err(e) => tracing::warn!("request for {} failed: {}", key, e),
        }
        lock(&self.inner.in_flight).remove(&key);

        result
    }

    async fn fetch_and_assemble(&self, plan: &FetchPlan) -> Result<AssembledImage, AccessError> {
        let level = self.level(plan.scale);
        let image_type = self.inner.image_type;

        let chunks = self.inner.source.fetch_chunks(plan.scale, &plan.chunk_coords).await?;
        tracing::debug!("fetched {} chunks at scale {}", chunks.len(), plan.scale);

        let job = AssemblyJob {
            layout: ChunkLayout::new(level, image_type.component_type),
            region: plan.index_extent,
            coords: plan.chunk_coords.clone(),
            chunks,
        };
        let data = run_assembly(self.inner.pool.as_ref(), move || job.run()).await?;

        let geometry = self.scale_geometry(plan.scale).await;
        let dimension = image_type.dimension;

        Ok(AssembledImage {
            image_type,
            name: level.name().to_owned(),
            origin: self.truncate(plan.origin),
            spacing: self.truncate(geometry.spacing),
            direction: self.direction(),
            size: plan.size(dimension),
            data,
        })
    }
}

#[derive(Clone)]
struct AssemblyJob {
    layout: ChunkLayout,
    region: IndexExtent,
    coords: Vec<ChunkCoord>,
    chunks: Vec<ChunkBuffer>,
}

impl AssemblyJob {
    fn run(&self) -> Result<PixelBuffer, AssemblyError> {
        tracing::trace!("assembling {} elements from {} chunks", self.region.num_points(), self.chunks.len());

        assemble_chunks(&self.layout, &self.region, &self.coords, &self.chunks)
    }
}

/// Runs `work` on `pool`, or inline when there is no pool or it refuses the task.
async fn run_assembly<F, R>(pool: Option<&ThreadPool>, work: F) -> R
where
    F: FnOnce() -> R + Clone + Send + 'static,
    R: Send + 'static,
{
    if let Some(pool) = pool {
        let task = work.clone();
        match pool.spawn_with_handle(async move { task() }) {
            Ok(handle) => return handle.await,
            Err(e) => tracing::warn!("assembling inline, worker pool unavailable: {}", e),
        }
    }

    work()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn image_key_display_lists_scale_and_bounds() {
        let key = ImageKey {
            scale: 2,
            extent: IndexExtent::from_min_and_lub(AxisMap([0, 4, 0, 0, 0]), AxisMap([1, 8, 16, 1, 1])),
        };

        assert_eq!(key.to_string(), "2_0,1,4,8,0,16,0,1,0,1");
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: AccessorConfig = serde_json::from_str(r#"{"cache_capacity": 4}"#).unwrap();

        assert_eq!(
            config,
            AccessorConfig {
                cache_capacity: 4,
                ..Default::default()
            }
        );
        assert_eq!(config.max_voxels, 268_435_456);
        assert_eq!(config.assembly_threads, 1);
    }

    struct ZeroSource;

    impl ChunkSource for ZeroSource {
        fn fetch_chunks<'a>(
            &'a self,
            _scale: usize,
            coords: &'a [ChunkCoord],
        ) -> BoxFuture<'a, Result<Vec<ChunkBuffer>, FetchError>> {
            let chunk: ChunkBuffer = Arc::from(vec![0u8; 16]);
            futures::future::ready(Ok(vec![chunk; coords.len()])).boxed()
        }
    }

    fn small_image(config: AccessorConfig) -> MultiscaleImage {
        let shape: BTreeMap<_, _> = [(Axis::X, 4), (Axis::Y, 4)].into_iter().collect();
        let spec = crate::LevelSpec {
            name: "s0".to_owned(),
            dims: vec![Axis::Y, Axis::X],
            array_shape: shape.clone(),
            chunk_shape: shape,
            ..Default::default()
        };
        let level = PyramidLevel::new(spec, Vec::<(Axis, crate::CoordinateSequence)>::new()).unwrap();

        MultiscaleImage::new("zeros", ImageType::scalar(2, crate::ComponentType::U8), vec![level], ZeroSource, config)
            .unwrap()
    }

    fn assembly_thread_name(image: &MultiscaleImage) -> Option<String> {
        futures::executor::block_on(run_assembly(image.inner.pool.as_ref(), || {
            std::thread::current().name().map(ToOwned::to_owned)
        }))
    }

    #[test]
    fn default_config_assembles_on_worker_thread() {
        let image = small_image(AccessorConfig::default());

        let name = assembly_thread_name(&image).unwrap();
        assert!(name.starts_with("lodview-assembly-"), "assembled on {:?}", name);

        let assembled = futures::executor::block_on(image.get_image(0, None)).unwrap();
        assert_eq!(assembled.data, PixelBuffer::U8(vec![0; 16]));
    }

    #[test]
    fn zero_threads_assembles_inline() {
        let image = small_image(AccessorConfig {
            assembly_threads: 0,
            ..Default::default()
        });

        assert!(image.inner.pool.is_none());
        assert_eq!(assembly_thread_name(&image), std::thread::current().name().map(ToOwned::to_owned));
    }
}
