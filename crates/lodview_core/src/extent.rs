use crate::{Axis, AxisMap, AxisShape, Point3i, PointN};

use core::fmt;
use core::ops::Range;
use itertools::iproduct;
use num::Integer;
use serde::{Deserialize, Serialize};

/// An extent in the index space of a pyramid level. This is mathematically the Cartesian product of a half-open interval
/// `[a, b)` on each of the `CXYZT` axes.
///
/// The same type describes element ranges and chunk ranges; `covering_chunks` converts the former into the latter.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct IndexExtent {
    /// The least point contained in the extent.
    pub minimum: AxisMap<i64>,
    /// The length of each axis.
    pub shape: AxisShape,
}

impl IndexExtent {
    /// The default representation of an extent as the minimum point and shape.
    #[inline]
    pub fn from_min_and_shape(minimum: AxisMap<i64>, shape: AxisShape) -> Self {
        Self { minimum, shape }
    }

    /// An alternative representation of an extent as the minimum point and least upper bound.
    #[inline]
    pub fn from_min_and_lub(minimum: AxisMap<i64>, least_upper_bound: AxisMap<i64>) -> Self {
        // We want to avoid negative shape components.
        let shape = least_upper_bound.zip_with(&minimum, |lub, min| (lub - min).max(0));

        Self { minimum, shape }
    }

    /// The extent covering every element of an array with `shape`.
    #[inline]
    pub fn full(shape: AxisShape) -> Self {
        Self::from_min_and_shape(AxisMap::fill(0), shape)
    }

    /// The least point `p` for which all points `q` in the extent satisfy `q < p`.
    #[inline]
    pub fn least_upper_bound(&self) -> AxisMap<i64> {
        self.minimum.zip_with(&self.shape, |m, s| m + s)
    }

    /// The half-open index range along `axis`.
    #[inline]
    pub fn range(&self, axis: Axis) -> Range<i64> {
        self.minimum[axis]..self.minimum[axis] + self.shape[axis]
    }

    /// The number of points contained in the extent.
    #[inline]
    pub fn num_points(&self) -> usize {
        self.shape.volume() as usize
    }

    /// The number of points in the spatial (x, y, z) projection of the extent.
    #[inline]
    pub fn spatial_volume(&self) -> u64 {
        self.shape.spatial_volume()
    }

    /// Returns `true` iff the number of points in the extent is 0.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_points() == 0
    }

    /// The spatial part of the minimum.
    #[inline]
    pub fn spatial_minimum(&self) -> Point3i {
        PointN(self.minimum.spatial())
    }

    /// Returns `true` iff the point `p` is contained in this extent.
    #[inline]
    pub fn contains(&self, p: &AxisMap<i64>) -> bool {
        let lub = self.least_upper_bound();

        Axis::CXYZT.iter().all(|&a| self.minimum[a] <= p[a] && p[a] < lub[a])
    }

    /// Returns the extent containing only the points in both `self` and `other`.
    #[inline]
    pub fn intersection(&self, other: &Self) -> Self {
        let minimum = self.minimum.zip_with(&other.minimum, i64::max);
        let lub = self.least_upper_bound().zip_with(&other.least_upper_bound(), i64::min);

        Self::from_min_and_lub(minimum, lub)
    }

    /// Returns `true` iff the intersection of `self` and `other` is equal to `self`.
    #[inline]
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.intersection(other).eq(self)
    }

    /// Converts an element extent into the extent of chunk indices that overlap it, for chunks of `chunk_shape`. The start
    /// is floored and the end is ceiled, so the chunk-aligned region may be strictly larger than `self`.
    ///
    /// ```
    /// # use lodview_core::prelude::*;
    /// let elements = IndexExtent::from_min_and_lub(AxisMap([0, 10, 0, 0, 0]), AxisMap([1, 130, 1, 1, 1]));
    /// let chunks = elements.covering_chunks(&AxisShape::from_pairs(vec![(Axis::X, 64)]));
    /// assert_eq!(chunks.range(Axis::X), 0..3);
    /// ```
    #[inline]
    pub fn covering_chunks(&self, chunk_shape: &AxisShape) -> Self {
        let lub = self.least_upper_bound();
        let chunk_min = self
            .minimum
            .zip_with(chunk_shape, |m, c| Integer::div_floor(&m, &c.max(1)));
        let chunk_lub = lub.zip_with(chunk_shape, |l, c| Integer::div_ceil(&l, &c.max(1)));

        Self::from_min_and_lub(chunk_min, chunk_lub)
    }

    /// Returns the element extent spanned by chunk `chunk_index` for chunks of `chunk_shape`.
    #[inline]
    pub fn chunk_elements(chunk_index: &AxisMap<i64>, chunk_shape: &AxisShape) -> Self {
        Self::from_min_and_shape(chunk_index.zip_with(chunk_shape, |i, c| i * c), *chunk_shape)
    }

    /// Iterate over all points in the extent. The component axis varies fastest, then x, y, z, and time varies slowest.
    pub fn iter_points(&self) -> impl Iterator<Item = AxisMap<i64>> {
        let [c, x, y, z, t] = [
            self.range(Axis::C),
            self.range(Axis::X),
            self.range(Axis::Y),
            self.range(Axis::Z),
            self.range(Axis::T),
        ];

        // iproduct is opposite of fastest-varying order.
        iproduct!(t, z, y, x, c).map(|(t, z, y, x, c)| AxisMap([c, x, y, z, t]))
    }
}

impl fmt::Display for IndexExtent {
    /// Formats as the flat list of `start,end` pairs in `CXYZT` order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lub = self.least_upper_bound();
        for (i, axis) in Axis::CXYZT.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{},{}", self.minimum[*axis], lub[*axis])?;
        }

        Ok(())
    }
}

// ████████╗███████╗███████╗████████╗███████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝
//    ██║   █████╗  ███████╗   ██║   ███████╗
//    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║
//    ██║   ███████╗███████║   ██║   ███████║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝
