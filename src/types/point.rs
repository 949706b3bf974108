//! Immutable n-dimensional point in the normalized search domain.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use crate::{ParCacheError, ParCacheResult};

/// An immutable point in n-dimensional space.
///
/// Every transformation returns a new `Point`; the original is never
/// modified. Cloning is cheap since the coordinates are shared.
///
/// `PartialEq`, `Eq` and `Hash` compare the exact coordinate values (with
/// `-0.0` folded into `0.0`), which makes `Point` a sound hash map key.
/// Use [`Point::approx_eq`] for tolerance-based comparison.
#[derive(Clone)]
pub struct Point {
    coords: Arc<[f64]>,
    length: OnceLock<f64>,
    length_squared: OnceLock<f64>,
}

impl Point {
    /// Tolerance used by [`Point::approx_eq`].
    pub const EPSILON: f64 = 1e-10;

    /// Creates a point from explicit coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `coords` is empty. Use [`Point::try_new`] for a fallible
    /// version.
    pub fn new(coords: impl Into<Vec<f64>>) -> Self {
        let coords = coords.into();
        assert!(!coords.is_empty(), "point dimension must be at least 1");
        Self::from_vec(coords)
    }

    /// Creates a point from explicit coordinates, rejecting an empty sequence.
    pub fn try_new(coords: impl Into<Vec<f64>>) -> ParCacheResult<Self> {
        let coords = coords.into();
        if coords.is_empty() {
            return Err(ParCacheError::InvalidPoint(
                "point dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self::from_vec(coords))
    }

    /// Creates a point of dimension `dim` with every coordinate set to `value`.
    ///
    /// # Panics
    ///
    /// Panics if `dim` is zero.
    pub fn filled(dim: usize, value: f64) -> Self {
        Self::new(vec![value; dim])
    }

    /// Creates the origin of dimension `dim`.
    pub fn zeros(dim: usize) -> Self {
        Self::filled(dim, 0.0)
    }

    fn from_vec(coords: Vec<f64>) -> Self {
        Self {
            coords: coords.into(),
            length: OnceLock::new(),
            length_squared: OnceLock::new(),
        }
    }

    /// Returns the dimension of the point.
    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    /// Returns coordinate `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.dim()`.
    pub fn get(&self, i: usize) -> f64 {
        self.coords[i]
    }

    /// Returns a new point with coordinate `i` replaced by `value`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.dim()`.
    #[must_use]
    pub fn set(&self, i: usize, value: f64) -> Self {
        let mut coords = self.to_vec();
        coords[i] = value;
        Self::from_vec(coords)
    }

    /// Returns `self + other`.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn add(&self, other: &Point) -> Self {
        self.zip_with(other, |a, b| a + b)
    }

    /// Returns `self - other`.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn sub(&self, other: &Point) -> Self {
        self.zip_with(other, |a, b| a - b)
    }

    /// Returns `self * factor`.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn mul(&self, factor: f64) -> Self {
        Self::from_vec(self.coords.iter().map(|c| c * factor).collect())
    }

    fn zip_with(&self, other: &Point, op: impl Fn(f64, f64) -> f64) -> Self {
        assert_eq!(
            self.dim(),
            other.dim(),
            "point dimension mismatch: {} vs {}",
            self.dim(),
            other.dim()
        );
        Self::from_vec(
            self.coords
                .iter()
                .zip(other.coords.iter())
                .map(|(&a, &b)| op(a, b))
                .collect(),
        )
    }

    /// Euclidean length, computed once.
    pub fn length(&self) -> f64 {
        *self.length.get_or_init(|| self.length_squared().sqrt())
    }

    /// Squared Euclidean length, computed once.
    pub fn length_squared(&self) -> f64 {
        *self
            .length_squared
            .get_or_init(|| self.coords.iter().map(|c| c * c).sum())
    }

    /// Returns a copy of the coordinates.
    pub fn to_vec(&self) -> Vec<f64> {
        self.coords.to_vec()
    }

    /// Borrows the coordinates.
    pub fn as_slice(&self) -> &[f64] {
        &self.coords
    }

    /// Whether every coordinate lies in `[0, 1]`. `NaN` is never in range.
    pub fn is_in_unit_cube(&self) -> bool {
        self.coords.iter().all(|c| (0.0..=1.0).contains(c))
    }

    /// Tolerance-based equality: same dimension and every coordinate pair
    /// differs by less than [`Point::EPSILON`].
    pub fn approx_eq(&self, other: &Point) -> bool {
        self.dim() == other.dim()
            && self
                .coords
                .iter()
                .zip(other.coords.iter())
                .all(|(a, b)| (a - b).abs() < Self::EPSILON)
    }

    fn canonical_bits(value: f64) -> u64 {
        // -0.0 and 0.0 compare equal, so they must hash equal.
        if value == 0.0 {
            0
        } else {
            value.to_bits()
        }
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.dim() == other.dim()
            && self
                .coords
                .iter()
                .zip(other.coords.iter())
                .all(|(&a, &b)| Self::canonical_bits(a) == Self::canonical_bits(b))
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dim().hash(state);
        for &c in self.coords.iter() {
            Self::canonical_bits(c).hash(state);
        }
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point[")?;
        for (i, c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "]")
    }
}

impl TryFrom<Vec<f64>> for Point {
    type Error = ParCacheError;

    fn try_from(coords: Vec<f64>) -> ParCacheResult<Self> {
        Self::try_new(coords)
    }
}

impl From<&Point> for Vec<f64> {
    fn from(point: &Point) -> Self {
        point.to_vec()
    }
}
