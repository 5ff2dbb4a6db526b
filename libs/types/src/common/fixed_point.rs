//! 1e18-scaled fixed-point arithmetic for the sphere invariant
//!
//! Every numeric quantity in the AMM (radii, boundary parameters, reserves,
//! shares) is a [`Wad`]: a signed integer scaled by `10^18`. Multiplication and
//! division widen to 256 bits so products of `r²` magnitude never overflow the
//! intermediate, then narrow back with an explicit error.
//!
//! ## Rounding
//!
//! `mul` and `div` truncate toward zero. That rounding mode is what the
//! invariant tolerances elsewhere are budgeted against, so it must not change.

use crate::common::errors::FixedPointError;
use ethnum::I256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Number of decimal places carried by a [`Wad`]
pub const WAD_DECIMALS: u32 = 18;

/// Hard cap on Newton iterations for [`sqrt`]
pub const SQRT_MAX_ITERATIONS: usize = 100;

/// Fixed-point value scaled by `10^18`
///
/// Examples:
/// - 1.0 = Wad(1_000_000_000_000_000_000)
/// - 0.001 = Wad(1_000_000_000_000_000)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Wad(pub i128);

impl Wad {
    /// Scale factor for 18 decimal places
    pub const SCALE: i128 = 1_000_000_000_000_000_000;

    pub const ZERO: Self = Self(0);

    pub const ONE: Self = Self(Self::SCALE);

    /// Create from raw scaled integer
    #[inline]
    pub const fn from_raw(raw: i128) -> Self {
        Self(raw)
    }

    /// Get the raw scaled integer value
    #[inline]
    pub const fn raw_value(self) -> i128 {
        self.0
    }

    /// Create from whole units (compile-time constant)
    #[inline]
    pub const fn from_int(units: i64) -> Self {
        Self(units as i128 * Self::SCALE)
    }

    /// Exact ratio of two integers, truncated to 18 decimals
    pub fn from_ratio(numerator: i64, denominator: i64) -> Result<Self, FixedPointError> {
        div(Self::from_int(numerator), Self::from_int(denominator))
    }

    /// Create from a Decimal, truncating digits beyond the 18th decimal
    pub fn from_decimal(value: Decimal) -> Result<Self, FixedPointError> {
        let mantissa = value.mantissa();
        let scale = value.scale();

        let raw = if scale <= WAD_DECIMALS {
            mantissa
                .checked_mul(10i128.pow(WAD_DECIMALS - scale))
                .ok_or(FixedPointError::Overflow {
                    operation: "decimal conversion",
                })?
        } else {
            mantissa / 10i128.pow(scale - WAD_DECIMALS)
        };

        Ok(Self(raw))
    }

    /// Create from a decimal string with exact parsing
    ///
    /// This is the primary way to build a `Wad` from configuration files or
    /// user input.
    ///
    /// ```
    /// use orbital_types::Wad;
    ///
    /// let amount = Wad::from_decimal_str("12.5").unwrap();
    /// assert_eq!(amount.raw_value(), 12_500_000_000_000_000_000);
    /// ```
    pub fn from_decimal_str(s: &str) -> Result<Self, FixedPointError> {
        let decimal = Decimal::from_str(s).map_err(|_| FixedPointError::InvalidDecimal {
            input: s.to_string(),
        })?;
        Self::from_decimal(decimal)
    }

    /// Convert to Decimal for display or for Decimal-facing interfaces
    pub fn to_decimal(self) -> Result<Decimal, FixedPointError> {
        Decimal::try_from_i128_with_scale(self.0, WAD_DECIMALS)
            .map(|d| d.normalize())
            .map_err(|_| FixedPointError::Overflow {
                operation: "decimal conversion",
            })
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    /// Checked addition - returns None on overflow
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction - returns None on overflow
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// `self²` in fixed point
    pub fn squared(self) -> Result<Self, FixedPointError> {
        mul(self, self)
    }

    /// Exact halving, truncated toward zero
    #[inline]
    pub const fn half(self) -> Self {
        Self(self.0 / 2)
    }

    /// Divide by a plain integer count (not a fixed-point value)
    pub fn div_int(self, count: usize) -> Result<Self, FixedPointError> {
        if count == 0 {
            return Err(FixedPointError::DivisionByZero);
        }
        Ok(Self(self.0 / count as i128))
    }

    /// Multiply by a plain integer count
    pub fn mul_int(self, count: usize) -> Result<Self, FixedPointError> {
        self.0
            .checked_mul(count as i128)
            .map(Self)
            .ok_or(FixedPointError::Overflow {
                operation: "integer multiply",
            })
    }
}

fn narrow(value: I256, operation: &'static str) -> Result<Wad, FixedPointError> {
    if value > I256::from(i128::MAX) || value < I256::from(i128::MIN) {
        return Err(FixedPointError::Overflow { operation });
    }
    Ok(Wad(value.as_i128()))
}

/// `a * b / ONE`, truncating toward zero
pub fn mul(a: Wad, b: Wad) -> Result<Wad, FixedPointError> {
    let product = I256::from(a.0)
        .checked_mul(I256::from(b.0))
        .ok_or(FixedPointError::Overflow { operation: "mul" })?;
    narrow(product / I256::from(Wad::SCALE), "mul")
}

/// `a * ONE / b`, truncating toward zero
pub fn div(a: Wad, b: Wad) -> Result<Wad, FixedPointError> {
    if b.is_zero() {
        return Err(FixedPointError::DivisionByZero);
    }
    let scaled = I256::from(a.0)
        .checked_mul(I256::from(Wad::SCALE))
        .ok_or(FixedPointError::Overflow { operation: "div" })?;
    narrow(scaled / I256::from(b.0), "div")
}

/// `a * b / c` with a single truncation
pub fn mul_div(a: Wad, b: Wad, c: Wad) -> Result<Wad, FixedPointError> {
    if c.is_zero() {
        return Err(FixedPointError::DivisionByZero);
    }
    let product = I256::from(a.0)
        .checked_mul(I256::from(b.0))
        .ok_or(FixedPointError::Overflow {
            operation: "mul_div",
        })?;
    narrow(product / I256::from(c.0), "mul_div")
}

/// Square root by Newton's method seeded at `(x + ONE) / 2`
///
/// Stops as soon as an iterate fails to decrease or after
/// [`SQRT_MAX_ITERATIONS`]. The seed is never below the root (AM-GM), so the
/// sequence descends monotonically onto it.
pub fn sqrt(x: Wad) -> Result<Wad, FixedPointError> {
    if x.is_negative() {
        return Err(FixedPointError::NegativeSqrt { raw: x.0 });
    }
    if x.is_zero() {
        return Ok(Wad::ZERO);
    }

    let seed = x
        .checked_add(Wad::ONE)
        .ok_or(FixedPointError::Overflow { operation: "sqrt" })?;
    let mut y = seed.half();

    for _ in 0..SQRT_MAX_ITERATIONS {
        let next = Wad((y.0 + div(x, y)?.0) / 2);
        if next >= y {
            break;
        }
        y = next;
    }

    Ok(y)
}

/// `max(0, a - b)`
#[inline]
pub fn safe_sub(a: Wad, b: Wad) -> Wad {
    if a > b {
        a - b
    } else {
        Wad::ZERO
    }
}

impl fmt::Display for Wad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.0.unsigned_abs();
        let scale = Self::SCALE as u128;
        let whole = magnitude / scale;
        let frac = magnitude % scale;
        let sign = if self.0 < 0 { "-" } else { "" };

        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }
        let digits = format!("{:018}", frac);
        write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Wad {
    type Err = FixedPointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_decimal_str(s)
    }
}

/// Panicking arithmetic via traits for additive bookkeeping where the
/// magnitudes involved are far below the i128 range
impl Add for Wad {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Wad {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Wad {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Wad {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Wad {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}
