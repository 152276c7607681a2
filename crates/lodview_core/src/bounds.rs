use crate::{Point3f, PointN};

use serde::{Deserialize, Serialize};

/// An axis-aligned box in world space, given by its minimum and maximum corners (both inclusive).
///
/// Viewers usually exchange bounds as the flat array `[xmin, xmax, ymin, ymax, zmin, zmax]`; see `from_flat` and `to_flat`.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct WorldBounds {
    pub minimum: Point3f,
    pub maximum: Point3f,
}

impl WorldBounds {
    #[inline]
    pub fn from_min_and_max(minimum: Point3f, maximum: Point3f) -> Self {
        Self { minimum, maximum }
    }

    /// Constructs bounds from `[xmin, xmax, ymin, ymax, zmin, zmax]`.
    #[inline]
    pub fn from_flat(flat: [f64; 6]) -> Self {
        Self::from_min_and_max(
            PointN([flat[0], flat[2], flat[4]]),
            PointN([flat[1], flat[3], flat[5]]),
        )
    }

    #[inline]
    pub fn to_flat(&self) -> [f64; 6] {
        let (min, max) = (self.minimum, self.maximum);

        [min.x(), max.x(), min.y(), max.y(), min.z(), max.z()]
    }

    /// Returns the smallest bounds containing all of the given points, or `None` if there are no points.
    pub fn from_points(points: impl IntoIterator<Item = Point3f>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;

        let (mut minimum, mut maximum) = (first, first);
        for p in points {
            minimum = minimum.meet(&p);
            maximum = maximum.join(&p);
        }

        Some(Self::from_min_and_max(minimum, maximum))
    }

    /// All 8 corners of the box. Corner `i` takes the maximum along axis `a` iff bit `a` of `i` is set.
    pub fn corners(&self) -> [Point3f; 8] {
        let (min, max) = (self.minimum, self.maximum);
        let mut corners = [min; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            for axis in 0..3 {
                if i & (1 << axis) != 0 {
                    corner.0[axis] = max.0[axis];
                }
            }
        }

        corners
    }

    #[inline]
    pub fn shape(&self) -> Point3f {
        self.maximum - self.minimum
    }

    /// Returns `true` iff `minimum <= maximum` along every axis. Zero-thickness boxes are valid.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.minimum.at(i) <= self.maximum.at(i))
    }

    #[inline]
    pub fn contains_point(&self, p: &Point3f) -> bool {
        (0..3).all(|i| self.minimum.at(i) <= p.at(i) && p.at(i) <= self.maximum.at(i))
    }

    /// Shrinks `self` so it does not extend past `limits` on any side. The result may be invalid if the boxes are disjoint.
    #[inline]
    pub fn clamped_to(&self, limits: &Self) -> Self {
        Self::from_min_and_max(self.minimum.join(&limits.minimum), self.maximum.meet(&limits.maximum))
    }

    /// The overlap of two boxes, or `None` if they are disjoint.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let overlap = self.clamped_to(other);

        overlap.is_valid().then(|| overlap)
    }

    /// Returns `true` iff any side of `self` lies outside `other` by more than `epsilon`.
    pub fn extends_beyond(&self, other: &Self, epsilon: f64) -> bool {
        (0..3).any(|i| {
            other.minimum.at(i) - self.minimum.at(i) > epsilon
                || self.maximum.at(i) - other.maximum.at(i) > epsilon
        })
    }

    /// Returns `true` iff `other` lies within `self`, allowing each side to overshoot by `epsilon`.
    #[inline]
    pub fn contains(&self, other: &Self, epsilon: f64) -> bool {
        !other.extends_beyond(self, epsilon)
    }
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

    #[test]
    fn flat_round_trip() {
        let flat = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];

        assert_eq!(WorldBounds::from_flat(flat).to_flat(), flat);
    }

    #[test]
    fn corners_span_the_box() {
        let bounds = WorldBounds::from_flat([0.0, 1.0, 0.0, 2.0, 0.0, 3.0]);
        let corners = bounds.corners();

        assert_eq!(corners[0], PointN([0.0, 0.0, 0.0]));
        assert_eq!(corners[7], PointN([1.0, 2.0, 3.0]));
        assert_eq!(WorldBounds::from_points(corners.iter().copied()), Some(bounds));
    }

    #[test]
    fn from_no_points_is_none() {
        assert_eq!(WorldBounds::from_points(Vec::new()), None);
    }

    #[test]
    fn clamping_and_containment() {
        let full = WorldBounds::from_flat([0.0, 10.0, 0.0, 10.0, 0.0, 10.0]);
        let crop = WorldBounds::from_flat([-5.0, 5.0, 2.0, 8.0, 0.0, 12.0]);

        let clamped = crop.clamped_to(&full);
        assert_eq!(clamped.to_flat(), [0.0, 5.0, 2.0, 8.0, 0.0, 10.0]);
        assert!(full.contains(&clamped, 0.0));
        assert!(crop.extends_beyond(&full, 1e-6));
        assert!(!clamped.extends_beyond(&full, 1e-6));
    }

    #[test]
    fn disjoint_boxes_do_not_intersect() {
        let a = WorldBounds::from_flat([0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
        let b = WorldBounds::from_flat([2.0, 3.0, 0.0, 1.0, 0.0, 1.0]);

        assert_eq!(a.intersection(&b), None);
        assert!(a.intersection(&a).is_some());
    }
}
