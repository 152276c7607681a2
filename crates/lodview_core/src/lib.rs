//! The core geometry types for multiresolution images:
//! - `Axis` and `AxisMap`: the `CXYZT` axes a pyramid level may store, and per-axis values
//! - `PointN`: 3-dimensional points, most importantly `Point3f` (world space) and `Point3i` (index space)
//! - `IndexExtent`: a half-open box in the index space of a pyramid level
//! - `WorldBounds`: an axis-aligned box in world space
//! - `AffineTransform`: the index-to-world transform built from origin, spacing and direction

pub mod axis;
pub mod bounds;
pub mod extent;
pub mod point;
pub mod transform;

pub use axis::{Axis, AxisMap, AxisShape, UnknownAxis};
pub use bounds::WorldBounds;
pub use extent::IndexExtent;
pub use point::{Point3, Point3f, Point3i, PointN};
pub use transform::{world_to_index_bounds, AffineTransform, Direction, ImageGeometry, TransformError};

pub use nalgebra;

pub mod prelude {
    pub use super::{
        world_to_index_bounds, AffineTransform, Axis, AxisMap, AxisShape, Direction, ImageGeometry,
        IndexExtent, Point3, Point3f, Point3i, PointN, TransformError, WorldBounds,
    };
}
