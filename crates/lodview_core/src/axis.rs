use core::fmt;
use core::ops::{Index, IndexMut};
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the axes a pyramid level may store: the component (channel) axis, the three spatial axes, and time.
///
/// The discriminants follow the canonical `CXYZT` order used for index bounds and chunk coordinates.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    C = 0,
    X = 1,
    Y = 2,
    Z = 3,
    T = 4,
}

impl Axis {
    /// All axes in canonical order.
    pub const CXYZT: [Axis; 5] = [Axis::C, Axis::X, Axis::Y, Axis::Z, Axis::T];
    /// The spatial axes, in world-space component order.
    pub const SPATIAL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// The index for this axis in an `AxisMap`.
    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The single-character storage label, e.g. `'x'`.
    pub fn label(&self) -> char {
        match self {
            Axis::C => 'c',
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
            Axis::T => 't',
        }
    }

    pub fn from_label(label: char) -> Option<Self> {
        match label {
            'c' => Some(Axis::C),
            'x' => Some(Axis::X),
            'y' => Some(Axis::Y),
            'z' => Some(Axis::Z),
            't' => Some(Axis::T),
            _ => None,
        }
    }

    #[inline]
    pub fn is_spatial(&self) -> bool {
        matches!(self, Axis::X | Axis::Y | Axis::Z)
    }

    /// The component of a world-space point that corresponds to this axis, if it is spatial.
    #[inline]
    pub fn spatial_index(&self) -> Option<usize> {
        match self {
            Axis::X => Some(0),
            Axis::Y => Some(1),
            Axis::Z => Some(2),
            _ => None,
        }
    }

    /// The spatial axes of an image with `dimension` 2 or 3.
    pub fn spatial(dimension: usize) -> &'static [Axis] {
        &Self::SPATIAL[..dimension.min(3)]
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("unknown axis label {0:?}, expected one of c, x, y, z, t")]
pub struct UnknownAxis(pub String);

impl FromStr for Axis {
    type Err = UnknownAxis;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Axis::from_label(c).ok_or_else(|| UnknownAxis(s.to_owned())),
            _ => Err(UnknownAxis(s.to_owned())),
        }
    }
}

/// One value of type `T` for each of the `CXYZT` axes.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct AxisMap<T>(pub [T; 5]);

impl<T> AxisMap<T>
where
    T: Copy,
{
    #[inline]
    pub fn fill(value: T) -> Self {
        Self([value; 5])
    }

    #[inline]
    pub fn from_fn(mut f: impl FnMut(Axis) -> T) -> Self {
        Self([f(Axis::C), f(Axis::X), f(Axis::Y), f(Axis::Z), f(Axis::T)])
    }

    #[inline]
    pub fn map<U>(&self, mut f: impl FnMut(Axis, T) -> U) -> AxisMap<U> {
        let v = &self.0;
        AxisMap([
            f(Axis::C, v[0]),
            f(Axis::X, v[1]),
            f(Axis::Y, v[2]),
            f(Axis::Z, v[3]),
            f(Axis::T, v[4]),
        ])
    }

    /// Combine two maps axis by axis.
    #[inline]
    pub fn zip_with<U: Copy, V>(&self, other: &AxisMap<U>, mut f: impl FnMut(T, U) -> V) -> AxisMap<V> {
        let (a, b) = (&self.0, &other.0);
        AxisMap([
            f(a[0], b[0]),
            f(a[1], b[1]),
            f(a[2], b[2]),
            f(a[3], b[3]),
            f(a[4], b[4]),
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, T)> + '_ {
        Axis::CXYZT.iter().map(move |&a| (a, self[a]))
    }

    /// The `[x, y, z]` values.
    #[inline]
    pub fn spatial(&self) -> [T; 3] {
        [self[Axis::X], self[Axis::Y], self[Axis::Z]]
    }
}

impl<T> Index<Axis> for AxisMap<T> {
    type Output = T;

    #[inline]
    fn index(&self, axis: Axis) -> &T {
        &self.0[axis.index()]
    }
}

impl<T> IndexMut<Axis> for AxisMap<T> {
    #[inline]
    fn index_mut(&mut self, axis: Axis) -> &mut T {
        &mut self.0[axis.index()]
    }
}

/// Per-axis element or chunk counts. Axes that are not stored have extent 1.
pub type AxisShape = AxisMap<i64>;

impl AxisShape {
    pub const ONES: Self = AxisMap([1; 5]);

    /// Builds a shape from `(axis, extent)` pairs, leaving every other axis at 1.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Axis, i64)>) -> Self {
        let mut shape = Self::ONES;
        for (axis, extent) in pairs {
            shape[axis] = extent;
        }

        shape
    }

    /// The product of the x, y and z extents.
    #[inline]
    pub fn spatial_volume(&self) -> u64 {
        self.spatial().iter().map(|&e| e.max(0) as u64).product()
    }

    /// The product of the extents along all axes.
    #[inline]
    pub fn volume(&self) -> u64 {
        self.0.iter().map(|&e| e.max(0) as u64).product()
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
    fn labels_round_trip_through_from_str() {
        for axis in Axis::CXYZT.iter() {
            assert_eq!(axis.to_string().parse::<Axis>(), Ok(*axis));
        }
        assert_eq!("q".parse::<Axis>(), Err(UnknownAxis("q".to_owned())));
        assert!("xy".parse::<Axis>().is_err());
    }

    #[test]
    fn shape_from_pairs_defaults_missing_axes_to_one() {
        let shape = AxisShape::from_pairs(vec![(Axis::X, 64), (Axis::Y, 32)]);

        assert_eq!(shape, AxisMap([1, 64, 32, 1, 1]));
        assert_eq!(shape.spatial_volume(), 64 * 32);
    }

    #[test]
    fn spatial_axes_follow_dimension() {
        assert_eq!(Axis::spatial(2), &[Axis::X, Axis::Y]);
        assert_eq!(Axis::spatial(3), &[Axis::X, Axis::Y, Axis::Z]);
    }
}
