use core::ops::{Add, Mul, Neg, Sub};
use nalgebra as na;
use serde::{Deserialize, Serialize};

/// A point, which is usually just a primitive array of type `N`. Construct points as:
///
/// ```
/// use lodview_core::PointN;
///
/// let world = PointN([0.5, 1.0, 2.0]); // Point3f
/// let index = PointN([1, 2, 3]); // Point3i
/// ```
///
/// Points support component-wise addition, subtraction and multiplication, as well as scalar multiplication.
///
/// ```
/// use lodview_core::PointN;
///
/// let p1 = PointN([1.0, 2.0, 3.0]);
/// let p2 = PointN([3.0, 4.0, 5.0]);
///
/// assert_eq!(p1 + p2, PointN([4.0, 6.0, 8.0]));
/// assert_eq!(p2 - p1, PointN([2.0, 2.0, 2.0]));
/// assert_eq!(p1 * 2.0, PointN([2.0, 4.0, 6.0]));
/// ```
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct PointN<N>(pub N);

/// A 3-dimensional point with scalar type `T`.
pub type Point3<T> = PointN<[T; 3]>;
/// A world-space point.
pub type Point3f = PointN<[f64; 3]>;
/// An index-space lattice point.
pub type Point3i = PointN<[i64; 3]>;

impl<T> Point3<T>
where
    T: Copy,
{
    #[inline]
    pub fn fill(value: T) -> Self {
        PointN([value; 3])
    }

    #[inline]
    pub fn x(&self) -> T {
        self.0[0]
    }

    #[inline]
    pub fn y(&self) -> T {
        self.0[1]
    }

    #[inline]
    pub fn z(&self) -> T {
        self.0[2]
    }

    /// Returns the component specified by index. I.e. X = 0, Y = 1, Z = 2.
    #[inline]
    pub fn at(&self, component_index: usize) -> T {
        self.0[component_index]
    }

    /// Returns the point after applying `f` component-wise.
    #[inline]
    pub fn map_components<U>(&self, f: impl Fn(T) -> U) -> Point3<U> {
        PointN([f(self.x()), f(self.y()), f(self.z())])
    }

    #[inline]
    fn zip_components(&self, other: &Self, f: impl Fn(T, T) -> T) -> Self {
        PointN([f(self.x(), other.x()), f(self.y(), other.y()), f(self.z(), other.z())])
    }
}

impl Point3f {
    pub const ZERO: Self = PointN([0.0; 3]);
    pub const ONES: Self = PointN([1.0; 3]);

    /// Component-wise minimum.
    #[inline]
    pub fn meet(&self, other: &Self) -> Self {
        self.zip_components(other, f64::min)
    }

    /// Component-wise maximum.
    #[inline]
    pub fn join(&self, other: &Self) -> Self {
        self.zip_components(other, f64::max)
    }

    #[inline]
    pub fn floor(&self) -> Self {
        self.map_components(f64::floor)
    }

    #[inline]
    pub fn ceil(&self) -> Self {
        self.map_components(f64::ceil)
    }

    /// Returns `true` iff every component differs from `other` by at most `epsilon`.
    pub fn approx_eq(&self, other: &Self, epsilon: f64) -> bool {
        (0..3).all(|i| (self.at(i) - other.at(i)).abs() <= epsilon)
    }
}

impl Point3i {
    pub const ZERO: Self = PointN([0; 3]);

    #[inline]
    pub fn to_float(&self) -> Point3f {
        self.map_components(|c| c as f64)
    }
}

impl<T> Add for Point3<T>
where
    T: Copy + Add<Output = T>,
{
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self.zip_components(&rhs, |a, b| a + b)
    }
}

impl<T> Sub for Point3<T>
where
    T: Copy + Sub<Output = T>,
{
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self.zip_components(&rhs, |a, b| a - b)
    }
}

impl<T> Mul for Point3<T>
where
    T: Copy + Mul<Output = T>,
{
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        self.zip_components(&rhs, |a, b| a * b)
    }
}

impl<T> Mul<T> for Point3<T>
where
    T: Copy + Mul<Output = T>,
{
    type Output = Self;

    #[inline]
    fn mul(self, rhs: T) -> Self {
        self.map_components(|c| c * rhs)
    }
}

impl<T> Neg for Point3<T>
where
    T: Copy + Neg<Output = T>,
{
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        self.map_components(|c| -c)
    }
}

impl From<Point3f> for na::Point3<f64> {
    #[inline]
    fn from(p: Point3f) -> Self {
        na::Point3::new(p.x(), p.y(), p.z())
    }
}
impl From<Point3f> for na::Vector3<f64> {
    #[inline]
    fn from(p: Point3f) -> Self {
        na::Vector3::new(p.x(), p.y(), p.z())
    }
}
impl From<na::Point3<f64>> for Point3f {
    #[inline]
    fn from(p: na::Point3<f64>) -> Self {
        PointN([p.x, p.y, p.z])
    }
}
impl From<na::Vector3<f64>> for Point3f {
    #[inline]
    fn from(p: na::Vector3<f64>) -> Self {
        PointN([p.x, p.y, p.z])
    }
}
