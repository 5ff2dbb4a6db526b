//! Reserve-vector helpers over [`Wad`] slices
//!
//! All helpers are pure. Binary operations require equal lengths and report
//! [`FixedPointError::LengthMismatch`] otherwise.

use crate::common::errors::FixedPointError;
use crate::common::fixed_point::{div, mul, sqrt, Wad};

/// Fixed Newton step count for [`geometric_mean`]
pub const NTH_ROOT_ITERATIONS: usize = 10;

fn ensure_same_length(a: &[Wad], b: &[Wad]) -> Result<(), FixedPointError> {
    if a.len() != b.len() {
        return Err(FixedPointError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    Ok(())
}

/// Checked sum of all elements
pub fn sum(values: &[Wad]) -> Result<Wad, FixedPointError> {
    values.iter().try_fold(Wad::ZERO, |acc, v| {
        acc.checked_add(*v)
            .ok_or(FixedPointError::Overflow { operation: "sum" })
    })
}

/// Arithmetic mean
pub fn average(values: &[Wad]) -> Result<Wad, FixedPointError> {
    if values.is_empty() {
        return Err(FixedPointError::EmptyVector);
    }
    sum(values)?.div_int(values.len())
}

pub fn dot_product(a: &[Wad], b: &[Wad]) -> Result<Wad, FixedPointError> {
    ensure_same_length(a, b)?;
    a.iter().zip(b).try_fold(Wad::ZERO, |acc, (x, y)| {
        acc.checked_add(mul(*x, *y)?)
            .ok_or(FixedPointError::Overflow {
                operation: "dot product",
            })
    })
}

pub fn sum_squares(values: &[Wad]) -> Result<Wad, FixedPointError> {
    dot_product(values, values)
}

/// Euclidean norm
pub fn norm(values: &[Wad]) -> Result<Wad, FixedPointError> {
    sqrt(sum_squares(values)?)
}

/// Elementwise `a + b`
pub fn add(a: &[Wad], b: &[Wad]) -> Result<Vec<Wad>, FixedPointError> {
    ensure_same_length(a, b)?;
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            x.checked_add(*y)
                .ok_or(FixedPointError::Overflow { operation: "add" })
        })
        .collect()
}

/// Elementwise `a - b`
pub fn sub(a: &[Wad], b: &[Wad]) -> Result<Vec<Wad>, FixedPointError> {
    ensure_same_length(a, b)?;
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            x.checked_sub(*y)
                .ok_or(FixedPointError::Overflow { operation: "sub" })
        })
        .collect()
}

/// Every element multiplied by `factor`
pub fn scale(values: &[Wad], factor: Wad) -> Result<Vec<Wad>, FixedPointError> {
    values.iter().map(|v| mul(*v, factor)).collect()
}

/// Geometric mean `(Π aᵢ)^(1/n)` by Newton iteration on `yⁿ = Π aᵢ`
///
/// Seeded at the arithmetic mean and run for exactly [`NTH_ROOT_ITERATIONS`]
/// steps. Each step is written as `y · (n - 1 + Π(aᵢ / y)) / n` so no product
/// of n large values is ever formed; starting from the arithmetic mean keeps
/// `Π(aᵢ / y) ≤ 1` throughout. A zero element yields zero.
pub fn geometric_mean(values: &[Wad]) -> Result<Wad, FixedPointError> {
    if values.is_empty() {
        return Err(FixedPointError::EmptyVector);
    }
    if values.iter().any(|v| !v.is_positive()) {
        return Ok(Wad::ZERO);
    }

    let n = values.len();
    let n_minus_one = Wad::from_int(n as i64 - 1);
    let mut y = average(values)?;

    for _ in 0..NTH_ROOT_ITERATIONS {
        let mut ratio_product = Wad::ONE;
        for v in values {
            ratio_product = mul(ratio_product, div(*v, y)?)?;
        }
        y = mul(y, n_minus_one + ratio_product)?.div_int(n)?;
        if y.is_zero() {
            break;
        }
    }

    Ok(y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wads(units: &[i64]) -> Vec<Wad> {
        units.iter().map(|u| Wad::from_int(*u)).collect()
    }

    #[test]
    fn test_dot_product_and_norm() {
        let a = wads(&[1, 2, 3]);
        let b = wads(&[4, 5, 6]);
        assert_eq!(dot_product(&a, &b).unwrap(), Wad::from_int(32));
        assert_eq!(sum_squares(&a).unwrap(), Wad::from_int(14));
        assert_eq!(norm(&wads(&[3, 4])).unwrap(), Wad::from_int(5));
    }

    #[test]
    fn test_length_mismatch() {
        let a = wads(&[1, 2, 3]);
        let b = wads(&[1, 2]);
        assert_eq!(
            dot_product(&a, &b),
            Err(FixedPointError::LengthMismatch { left: 3, right: 2 })
        );
        assert!(add(&a, &b).is_err());
        assert!(sub(&a, &b).is_err());
    }

    #[test]
    fn test_geometric_mean_of_equal_values_is_exact() {
        let values = wads(&[10_000, 10_000, 10_000]);
        assert_eq!(geometric_mean(&values).unwrap(), Wad::from_int(10_000));
    }

    #[test]
    fn test_geometric_mean_skewed() {
        // (1 * 4 * 16)^(1/3) = 4
        let gm = geometric_mean(&wads(&[1, 4, 16])).unwrap();
        let tolerance = Wad::from_raw(1_000_000_000_000); // 1e-6
        assert!((gm - Wad::from_int(4)).abs() < tolerance, "gm = {}", gm);
    }

    #[test]
    fn test_geometric_mean_zero_element() {
        assert_eq!(geometric_mean(&wads(&[5, 0, 5])).unwrap(), Wad::ZERO);
        assert_eq!(geometric_mean(&[]), Err(FixedPointError::EmptyVector));
    }

    #[test]
    fn test_average() {
        assert_eq!(average(&wads(&[1, 2, 3])).unwrap(), Wad::from_int(2));
    }
}
