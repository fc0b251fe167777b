//! Sparse two-variable Laurent polynomials with arbitrary-precision
//! integer coefficients.
//!
//! This is the value type for HOMFLY-PT computations: polynomials in
//! `x` and `y`, where both variables may carry negative exponents.
//! In the `(alpha, z)` convention `x` plays the role of alpha and `y`
//! plays the role of z.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{AddAssign, MulAssign};

use num_bigint::BigInt;

/// A Laurent polynomial in two variables over [`BigInt`].
///
/// Terms are stored sparsely, keyed by exponent pair `(x, y)`.
/// No stored coefficient is ever zero; the zero polynomial has no terms.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Laurent2 {
    coeff: BTreeMap<(i64, i64), BigInt>,
}

impl Laurent2 {
    /// The zero polynomial.
    pub fn zero() -> Self {
        Self::default()
    }

    /// The constant polynomial 1.
    pub fn one() -> Self {
        Self::monomial(0, 0)
    }

    /// The single term `x^xe y^ye` with coefficient 1.
    pub fn monomial(xe: i64, ye: i64) -> Self {
        let mut coeff = BTreeMap::new();
        coeff.insert((xe, ye), BigInt::from(1));
        Self { coeff }
    }

    /// The loop value `(x - x^-1) / y`, i.e. `x y^-1 - x^-1 y^-1`.
    ///
    /// Every extra closed loop in a resolved link diagram contributes
    /// one factor of this polynomial.
    pub fn delta() -> Self {
        let mut d = Self::zero();
        d.set(1, -1, 1);
        d.set(-1, -1, -1);
        d
    }

    /// Sets the coefficient of `x^xe y^ye`, removing the term if the
    /// coefficient is zero.
    pub fn set(&mut self, xe: i64, ye: i64, coeff: impl Into<BigInt>) {
        let coeff = coeff.into();
        if coeff == BigInt::ZERO {
            self.coeff.remove(&(xe, ye));
        } else {
            self.coeff.insert((xe, ye), coeff);
        }
    }

    /// Returns the coefficient of `x^xe y^ye` (zero if absent).
    pub fn coefficient(&self, xe: i64, ye: i64) -> BigInt {
        self.coeff.get(&(xe, ye)).cloned().unwrap_or(BigInt::ZERO)
    }

    /// Returns `true` if this is the zero polynomial.
    pub fn is_zero(&self) -> bool {
        self.coeff.is_empty()
    }

    /// Negates every coefficient in place.
    pub fn negate(&mut self) {
        for c in self.coeff.values_mut() {
            *c = -&*c;
        }
    }

    /// Returns a copy with every exponent pair shifted by `(dx, dy)`,
    /// i.e. this polynomial multiplied by the monomial `x^dx y^dy`.
    pub fn shifted(&self, dx: i64, dy: i64) -> Self {
        let coeff = self
            .coeff
            .iter()
            .map(|(&(xe, ye), c)| ((xe + dx, ye + dy), c.clone()))
            .collect();
        Self { coeff }
    }

    /// Iterates over the non-zero terms as `((x, y), coefficient)`,
    /// in increasing exponent order.
    pub fn terms(&self) -> impl Iterator<Item = ((i64, i64), &BigInt)> {
        self.coeff.iter().map(|(&e, c)| (e, c))
    }
}

impl AddAssign<&Laurent2> for Laurent2 {
    fn add_assign(&mut self, rhs: &Laurent2) {
        for (&e, c) in &rhs.coeff {
            let sum = self.coefficient(e.0, e.1) + c;
            self.set(e.0, e.1, sum);
        }
    }
}

impl MulAssign<&Laurent2> for Laurent2 {
    fn mul_assign(&mut self, rhs: &Laurent2) {
        let mut product: BTreeMap<(i64, i64), BigInt> = BTreeMap::new();
        for (&(xa, ya), ca) in &self.coeff {
            for (&(xb, yb), cb) in &rhs.coeff {
                let e = (xa + xb, ya + yb);
                let term = ca * cb;
                match product.get_mut(&e) {
                    Some(c) => *c += term,
                    None => {
                        product.insert(e, term);
                    }
                }
            }
        }
        product.retain(|_, c| *c != BigInt::ZERO);
        self.coeff = product;
    }
}

impl fmt::Display for Laurent2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coeff.is_empty() {
            return write!(f, "0");
        }
        // Highest exponents first.
        for (i, (&(xe, ye), c)) in self.coeff.iter().rev().enumerate() {
            let neg = c < &BigInt::ZERO;
            if i == 0 {
                if neg {
                    write!(f, "-")?;
                }
            } else if neg {
                write!(f, " - ")?;
            } else {
                write!(f, " + ")?;
            }
            let mag = if neg { -c } else { c.clone() };
            let constant = xe == 0 && ye == 0;
            if mag != BigInt::from(1) || constant {
                write!(f, "{}", mag)?;
                if !constant {
                    write!(f, " ")?;
                }
            }
            match xe {
                0 => {}
                1 => write!(f, "x")?,
                _ => write!(f, "x^{}", xe)?,
            }
            if xe != 0 && ye != 0 {
                write!(f, " ")?;
            }
            match ye {
                0 => {}
                1 => write!(f, "y")?,
                _ => write!(f, "y^{}", ye)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_one() {
        assert!(Laurent2::zero().is_zero());
        assert!(!Laurent2::one().is_zero());
        assert_eq!(Laurent2::one().coefficient(0, 0), BigInt::from(1));
    }

    #[test]
    fn test_set_removes_zero_terms() {
        let mut p = Laurent2::monomial(2, -1);
        p.set(2, -1, 0);
        assert!(p.is_zero());
    }

    #[test]
    fn test_add() {
        let mut p = Laurent2::monomial(1, 0);
        p += &Laurent2::monomial(0, 1);
        p += &Laurent2::monomial(1, 0);
        assert_eq!(p.coefficient(1, 0), BigInt::from(2));
        assert_eq!(p.coefficient(0, 1), BigInt::from(1));

        // Adding the negation cancels exactly.
        let mut q = p.clone();
        q.negate();
        p += &q;
        assert!(p.is_zero());
    }

    #[test]
    fn test_mul_delta_squared() {
        // delta^2 = x^2 y^-2 - 2 y^-2 + x^-2 y^-2
        let mut d2 = Laurent2::delta();
        let d = Laurent2::delta();
        d2 *= &d;
        assert_eq!(d2.coefficient(2, -2), BigInt::from(1));
        assert_eq!(d2.coefficient(0, -2), BigInt::from(-2));
        assert_eq!(d2.coefficient(-2, -2), BigInt::from(1));
        assert_eq!(d2.terms().count(), 3);
    }

    #[test]
    fn test_mul_by_zero() {
        let mut p = Laurent2::delta();
        p *= &Laurent2::zero();
        assert!(p.is_zero());
    }

    #[test]
    fn test_shifted() {
        // Multiplying delta by x y is x^2 - x^0 = shifted(1, 1).
        let s = Laurent2::delta().shifted(1, 1);
        assert_eq!(s.coefficient(2, 0), BigInt::from(1));
        assert_eq!(s.coefficient(0, 0), BigInt::from(-1));
        assert_eq!(s.terms().count(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Laurent2::zero().to_string(), "0");
        assert_eq!(Laurent2::one().to_string(), "1");
        assert_eq!(Laurent2::delta().to_string(), "x y^-1 - x^-1 y^-1");

        let mut p = Laurent2::monomial(-4, 0);
        p.negate();
        p.set(-2, 0, 2);
        p.set(-2, 2, 1);
        assert_eq!(p.to_string(), "x^-2 y^2 + 2 x^-2 - x^-4");
    }
}
