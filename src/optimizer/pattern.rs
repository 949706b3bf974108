//! Search patterns used to build the initial simplex.

use crate::types::config::PatternKind;
use crate::types::point::Point;

/// Factory for search patterns.
///
/// A pattern is a list of direction vectors; the initial simplex is the start
/// point plus each direction scaled by the step.
pub struct SearchPattern;

impl SearchPattern {
    /// Unit vectors along each axis.
    pub fn square(dim: usize) -> Vec<Point> {
        (0..dim).map(|i| Point::zeros(dim).set(i, 1.0)).collect()
    }

    /// `dim` unit vectors with pairwise dot product 0.5, which together with
    /// the origin form a regular simplex of edge length 1.
    pub fn regular_simplex(dim: usize) -> Vec<Point> {
        const DOT: f64 = 0.5;

        let mut vectors: Vec<Vec<f64>> = Vec::with_capacity(dim);
        for i in 0..dim {
            let mut coords = vec![0.0; dim];
            for j in 0..i {
                let partial: f64 = (0..j).map(|k| coords[k] * vectors[j][k]).sum();
                coords[j] = (DOT - partial) / vectors[j][j];
            }
            let norm_sq: f64 = coords[..i].iter().map(|c| c * c).sum();
            coords[i] = (1.0 - norm_sq).sqrt();
            vectors.push(coords);
        }

        vectors.into_iter().map(Point::new).collect()
    }

    /// Builds the pattern selected by `kind`.
    pub fn from_kind(kind: PatternKind, dim: usize) -> Vec<Point> {
        match kind {
            PatternKind::Square => Self::square(dim),
            PatternKind::RegularSimplex => Self::regular_simplex(dim),
        }
    }
}
