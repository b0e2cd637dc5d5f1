//! Deterministic fixed-point scalar and vector arithmetic.
//!
//! Every quantity that can influence the outcome of a tick is expressed through
//! [`Number`] and [`Point`]. Both wrap plain integers so that identical inputs
//! produce identical bit patterns on every platform.

use std::{
    fmt,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};

/// Number of fractional bits carried by [`Number`].
pub const FRACTION_BITS: u32 = 16;

const SCALE: i64 = 1 << FRACTION_BITS;

/// Signed Q16.16 fixed-point value.
///
/// Multiplication and division widen to 64 bits and truncate toward zero.
/// Addition and subtraction wrap on overflow so debug and release builds agree.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Number(i32);

impl Number {
    /// The additive identity.
    pub const ZERO: Self = Self(0);
    /// The multiplicative identity.
    pub const ONE: Self = Self(1 << FRACTION_BITS);
    /// Largest representable value.
    pub const MAX: Self = Self(i32::MAX);
    /// Smallest representable value.
    pub const MIN: Self = Self(i32::MIN);
    /// Smallest positive representable value.
    pub const RESOLUTION: Self = Self(1);

    /// Wraps an already scaled integer.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// Raw scaled integer backing the value.
    #[must_use]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Converts a whole number into its fixed-point representation.
    #[must_use]
    pub const fn from_int(value: i32) -> Self {
        Self(value.wrapping_mul(1 << FRACTION_BITS))
    }

    /// Exact `numerator / denominator`, truncated toward zero.
    ///
    /// Used to spell tuning constants such as `Number::from_ratio(3, 100)`.
    #[must_use]
    pub const fn from_ratio(numerator: i32, denominator: i32) -> Self {
        Self((((numerator as i64) * SCALE) / denominator as i64) as i32)
    }

    /// Rounds a floating point value to the nearest representable number.
    ///
    /// Intended for adapters and tests only; simulation code never calls it.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Self((value * SCALE as f64).round() as i32)
    }

    /// Converts the value into a floating point approximation for display.
    #[must_use]
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / SCALE as f64
    }

    /// Integer part, truncated toward zero.
    #[must_use]
    pub const fn trunc(self) -> i32 {
        self.0 / (1 << FRACTION_BITS)
    }

    /// Largest integer not greater than the value.
    #[must_use]
    pub const fn floor(self) -> i32 {
        self.0 >> FRACTION_BITS
    }

    /// Absolute value.
    #[must_use]
    pub const fn abs(self) -> Self {
        Self(self.0.wrapping_abs())
    }

    /// Returns `-1`, `0` or `1` matching the sign of the value.
    #[must_use]
    pub const fn signum(self) -> i32 {
        self.0.signum()
    }

    /// Reports whether the value is exactly zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Square root computed with integer arithmetic; negative inputs yield zero.
    #[must_use]
    pub fn sqrt(self) -> Self {
        if self.0 <= 0 {
            return Self::ZERO;
        }
        let widened = (self.0 as u64) << FRACTION_BITS;
        Self(isqrt(widened) as i32)
    }

    /// Little-endian encoding of the raw scaled integer.
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Decodes a value previously produced by [`Number::to_le_bytes`].
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self(i32::from_le_bytes(bytes))
    }
}

fn isqrt(value: u64) -> u64 {
    if value < 2 {
        return value;
    }
    let mut x = value;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + value / x) / 2;
    }
    x
}

impl fmt::Debug for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Number({:.5} / raw {})", self.to_f64(), self.0)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.to_f64())
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Self::from_int(value)
    }
}

impl Neg for Number {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

impl Add for Number {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.wrapping_add(other.0))
    }
}

impl Sub for Number {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.wrapping_sub(other.0))
    }
}

impl Mul for Number {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Self(((i64::from(self.0) * i64::from(other.0)) / SCALE) as i32)
    }
}

impl Div for Number {
    type Output = Self;

    fn div(self, other: Self) -> Self {
        Self(((i64::from(self.0) * SCALE) / i64::from(other.0)) as i32)
    }
}

impl Mul<i32> for Number {
    type Output = Self;

    fn mul(self, other: i32) -> Self {
        Self(self.0.wrapping_mul(other))
    }
}

impl Div<i32> for Number {
    type Output = Self;

    fn div(self, other: i32) -> Self {
        Self(self.0 / other)
    }
}

impl AddAssign for Number {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl SubAssign for Number {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl MulAssign for Number {
    fn mul_assign(&mut self, other: Self) {
        *self = *self * other;
    }
}

impl DivAssign for Number {
    fn div_assign(&mut self, other: Self) {
        *self = *self / other;
    }
}

/// Two-dimensional vector of fixed-point components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal component, growing toward increasing maze columns.
    pub x: Number,
    /// Vertical component, growing toward increasing maze rows.
    pub y: Number,
}

impl Point {
    /// The zero vector.
    pub const ZERO: Self = Self::new(Number::ZERO, Number::ZERO);

    /// Creates a point from its components.
    #[must_use]
    pub const fn new(x: Number, y: Number) -> Self {
        Self { x, y }
    }

    /// Creates a point from whole-number components.
    #[must_use]
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Number::from_int(x), Number::from_int(y))
    }

    /// Vector rotated a quarter turn so that `(x, y)` becomes `(y, -x)`.
    #[must_use]
    pub fn perpendicular(self) -> Self {
        Self::new(self.y, -self.x)
    }

    /// Squared euclidean length.
    #[must_use]
    pub fn length_squared(self) -> Number {
        dot(self, self)
    }
}

impl Neg for Point {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Mul<Number> for Point {
    type Output = Self;

    fn mul(self, scale: Number) -> Self {
        Self::new(self.x * scale, self.y * scale)
    }
}

impl Div<Number> for Point {
    type Output = Self;

    fn div(self, scale: Number) -> Self {
        Self::new(self.x / scale, self.y / scale)
    }
}

impl Mul<i32> for Point {
    type Output = Self;

    fn mul(self, scale: i32) -> Self {
        Self::new(self.x * scale, self.y * scale)
    }
}

impl Div<i32> for Point {
    type Output = Self;

    fn div(self, scale: i32) -> Self {
        Self::new(self.x / scale, self.y / scale)
    }
}

/// Dot product of two vectors.
#[must_use]
pub fn dot(a: Point, b: Point) -> Number {
    a.x * b.x + a.y * b.y
}

/// Z component of the cross product of two vectors.
#[must_use]
pub fn cross(a: Point, b: Point) -> Number {
    a.x * b.y - a.y * b.x
}

/// Rotates `direction` by the angle encoded in `rotation` (complex multiplication).
///
/// `rotation` need not be unit length; callers normalize afterwards when it is not.
#[must_use]
pub fn rotate(direction: Point, rotation: Point) -> Point {
    Point::new(
        direction.x * rotation.x - direction.y * rotation.y,
        direction.x * rotation.y + direction.y * rotation.x,
    )
}

/// Euclidean length of a vector.
#[must_use]
pub fn length(point: Point) -> Number {
    let squared = i64::from(point.x.raw()) * i64::from(point.x.raw())
        + i64::from(point.y.raw()) * i64::from(point.y.raw());
    Number::from_raw(isqrt(squared as u64) as i32)
}

/// Unit vector pointing along `point`; the zero vector is returned unchanged.
#[must_use]
pub fn normalized(point: Point) -> Point {
    let length = length(point);
    if length.is_zero() {
        return point;
    }
    point / length
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_constants_are_exact() {
        assert_eq!(Number::from_ratio(1, 2).raw(), 32_768);
        assert_eq!(Number::from_ratio(3, 100).raw(), 1_966);
        assert_eq!(Number::from_ratio(-1, 4).raw(), -16_384);
    }

    #[test]
    fn multiplication_truncates_toward_zero() {
        let third = Number::from_ratio(1, 3);
        let product = third * Number::from_int(3);
        assert_eq!(product.raw(), 65_535);
        let negative = -third * Number::from_int(3);
        assert_eq!(negative.raw(), -65_535);
    }

    #[test]
    fn division_widens_before_scaling() {
        let large = Number::from_int(10_000);
        let quotient = large / Number::from_int(20_000);
        assert_eq!(quotient, Number::from_ratio(1, 2));
    }

    #[test]
    fn sqrt_of_perfect_squares_is_exact() {
        assert_eq!(Number::from_int(9).sqrt(), Number::from_int(3));
        assert_eq!(Number::from_ratio(1, 4).sqrt(), Number::from_ratio(1, 2));
        assert_eq!(Number::from_int(-4).sqrt(), Number::ZERO);
    }

    #[test]
    fn length_uses_wide_intermediate() {
        let point = Point::from_ints(300, 400);
        assert_eq!(length(point), Number::from_int(500));
    }

    #[test]
    fn normalized_vector_has_unit_length() {
        let unit = normalized(Point::from_ints(3, 4));
        assert_eq!(unit, Point::new(Number::from_ratio(3, 5), Number::from_ratio(4, 5)));
    }

    #[test]
    fn rotation_by_quarter_turn_swaps_axes() {
        let quarter = Point::new(Number::ZERO, Number::ONE);
        let rotated = rotate(Point::from_ints(1, 0), quarter);
        assert_eq!(rotated, Point::from_ints(0, 1));
    }

    #[test]
    fn cross_sign_follows_winding() {
        let x = Point::from_ints(1, 0);
        let y = Point::from_ints(0, 1);
        assert_eq!(cross(x, y), Number::ONE);
        assert_eq!(cross(y, x), -Number::ONE);
        assert_eq!(dot(x, y), Number::ZERO);
    }

    #[test]
    fn floor_and_trunc_differ_for_negatives() {
        let value = Number::from_ratio(-3, 2);
        assert_eq!(value.floor(), -2);
        assert_eq!(value.trunc(), -1);
        assert_eq!(Number::from_ratio(7, 2).floor(), 3);
    }
}
