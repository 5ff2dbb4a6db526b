//! Sphere geometry in n token dimensions
//!
//! A tick of radius `r` keeps its reserves on the sphere `Σ(r − xᵢ)² = r²`
//! centred at `(r, …, r)`. Reserve vectors are decomposed along the uniform
//! unit vector `v = (1/√n, …, 1/√n)`: the parallel projection `α = x·v` and
//! the orthogonal remainder `w = x − αv`. The equal-price point
//! `r(1 − 1/√n)·1` is where `α` is smallest, and a tick with boundary
//! parameter `k` is the cap `α ≤ k` around it.

use crate::error::AmmResult;
use orbital_types::fixed_point::{div, mul, safe_sub, sqrt};
use orbital_types::{vector, FixedPointError, Wad};
use serde::{Deserialize, Serialize};

/// Per-pool constants derived from the token count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SphereGeometry {
    n: usize,
    sqrt_n: Wad,
    inv_sqrt_n: Wad,
}

impl SphereGeometry {
    pub fn new(token_count: usize) -> AmmResult<Self> {
        if token_count == 0 {
            return Err(FixedPointError::EmptyVector.into());
        }
        let sqrt_n = sqrt(Wad::from_int(token_count as i64))?;
        let inv_sqrt_n = div(Wad::ONE, sqrt_n)?;
        Ok(Self {
            n: token_count,
            sqrt_n,
            inv_sqrt_n,
        })
    }

    #[inline]
    pub fn token_count(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn sqrt_n(&self) -> Wad {
        self.sqrt_n
    }

    /// `α = Σx / √n`
    pub fn parallel_projection(&self, sum: Wad) -> AmmResult<Wad> {
        Ok(div(sum, self.sqrt_n)?)
    }

    /// `Σx = α·√n`
    pub fn sum_for_projection(&self, alpha: Wad) -> AmmResult<Wad> {
        Ok(mul(alpha, self.sqrt_n)?)
    }

    /// `‖w‖` from `Σx` and `Σx²` alone: `√(Σx² − (Σx)²/n)`
    pub fn orthogonal_norm(&self, sum: Wad, sum_squares: Wad) -> AmmResult<Wad> {
        let parallel_energy = sum.squared()?.div_int(self.n)?;
        Ok(sqrt(safe_sub(sum_squares, parallel_energy))?)
    }

    /// `Σx²` of a vector with the given sum and orthogonal magnitude
    pub fn sum_squares_for(&self, sum: Wad, orthogonal_norm: Wad) -> AmmResult<Wad> {
        Ok(orthogonal_norm.squared()? + sum.squared()?.div_int(self.n)?)
    }

    /// Orthogonal radius `s = √(r² − (k − r√n)²)` of a tick resting on its
    /// boundary plane
    pub fn boundary_orthogonal_radius(&self, r: Wad, k: Wad) -> AmmResult<Wad> {
        let gap = k - mul(r, self.sqrt_n)?;
        Ok(sqrt(safe_sub(r.squared()?, gap.squared()?))?)
    }

    /// Interior orthogonal magnitude on a sphere of radius `r` at projection `α`
    pub fn orthogonal_on_sphere(&self, r: Wad, alpha: Wad) -> AmmResult<Wad> {
        self.boundary_orthogonal_radius(r, alpha)
    }

    /// `Σ(r − xᵢ)² − r²`; zero on the sphere
    pub fn sphere_residual(&self, r: Wad, reserves: &[Wad]) -> AmmResult<Wad> {
        let mut total = Wad::ZERO;
        for x in reserves {
            total += (r - *x).squared()?;
        }
        Ok(total - r.squared()?)
    }

    /// Radius whose equal-price point has every reserve equal to `average`:
    /// `average / (1 − 1/√n)`
    pub fn equal_price_radius(&self, average: Wad) -> AmmResult<Wad> {
        Ok(div(average, Wad::ONE - self.inv_sqrt_n)?)
    }

    /// Every reserve at the equal-price point: `r(1 − 1/√n)`
    pub fn equal_price_reserve(&self, r: Wad) -> AmmResult<Wad> {
        Ok(mul(r, Wad::ONE - self.inv_sqrt_n)?)
    }

    /// Unit direction of the orthogonal component and its magnitude
    ///
    /// A vector with no orthogonal component (all coordinates equal) yields
    /// the zero direction.
    pub fn orthogonal_direction(&self, reserves: &[Wad]) -> AmmResult<(Vec<Wad>, Wad)> {
        let average = vector::average(reserves)?;
        let orthogonal: Vec<Wad> = reserves.iter().map(|x| *x - average).collect();
        let magnitude = vector::norm(&orthogonal)?;

        if magnitude.is_zero() {
            return Ok((vec![Wad::ZERO; reserves.len()], Wad::ZERO));
        }

        let direction = orthogonal
            .iter()
            .map(|w| div(*w, magnitude))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((direction, magnitude))
    }

    /// Assemble `α·v + m·u`
    pub fn compose(&self, alpha: Wad, magnitude: Wad, direction: &[Wad]) -> AmmResult<Vec<Wad>> {
        let parallel = mul(alpha, self.inv_sqrt_n)?;
        direction
            .iter()
            .map(|u| Ok(parallel + mul(magnitude, *u)?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Wad, b: Wad, tolerance_raw: i128) -> bool {
        (a - b).abs().raw_value() <= tolerance_raw
    }

    #[test]
    fn test_equal_price_point_lies_on_sphere() {
        let geometry = SphereGeometry::new(3).unwrap();
        let r = geometry.equal_price_radius(Wad::from_int(10_000)).unwrap();
        let reserves = vec![Wad::from_int(10_000); 3];

        let residual = geometry.sphere_residual(r, &reserves).unwrap();
        assert!(residual.abs() < crate::constants::EPSILON, "residual {}", residual);

        // α/r at the equal-price point is √n − 1
        let alpha = geometry.parallel_projection(Wad::from_int(30_000)).unwrap();
        let ratio = div(alpha, r).unwrap();
        assert!(close(ratio, geometry.sqrt_n() - Wad::ONE, 1_000));
    }

    #[test]
    fn test_orthogonal_norm_matches_vector_decomposition() {
        let geometry = SphereGeometry::new(3).unwrap();
        let reserves = vec![Wad::from_int(12), Wad::from_int(9), Wad::from_int(3)];
        let sum = vector::sum(&reserves).unwrap();
        let sum_squares = vector::sum_squares(&reserves).unwrap();

        let algebraic = geometry.orthogonal_norm(sum, sum_squares).unwrap();
        let (direction, magnitude) = geometry.orthogonal_direction(&reserves).unwrap();

        assert!(close(algebraic, magnitude, 10));
        // u is a unit vector orthogonal to v
        assert!(close(vector::norm(&direction).unwrap(), Wad::ONE, 10));
        assert!(close(vector::sum(&direction).unwrap(), Wad::ZERO, 10));
    }

    #[test]
    fn test_compose_inverts_decomposition() {
        let geometry = SphereGeometry::new(3).unwrap();
        let reserves = vec![Wad::from_int(7), Wad::from_int(2), Wad::from_int(5)];
        let alpha = geometry
            .parallel_projection(vector::sum(&reserves).unwrap())
            .unwrap();
        let (direction, magnitude) = geometry.orthogonal_direction(&reserves).unwrap();

        let rebuilt = geometry.compose(alpha, magnitude, &direction).unwrap();
        for (a, b) in rebuilt.iter().zip(&reserves) {
            assert!(close(*a, *b, 100), "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_balanced_vector_has_no_direction() {
        let geometry = SphereGeometry::new(4).unwrap();
        let (direction, magnitude) = geometry
            .orthogonal_direction(&vec![Wad::from_int(5); 4])
            .unwrap();
        assert_eq!(magnitude, Wad::ZERO);
        assert!(direction.iter().all(|u| u.is_zero()));
    }

    #[test]
    fn test_boundary_radius_at_equal_price_plane() {
        let geometry = SphereGeometry::new(3).unwrap();
        let r = Wad::from_int(100);
        // the plane through the equal-price point touches the sphere at one point
        let k = mul(r, geometry.sqrt_n() - Wad::ONE).unwrap();
        let s = geometry.boundary_orthogonal_radius(r, k).unwrap();
        assert!(s < Wad::from_raw(1_000_000_000_000));
    }
}
