// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::error::{ConstructionError, Error, Result};
use crate::util::DebugAsDisplay;
use crate::util::Sign;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::Float;
use num_traits::One;
use num_traits::Signed;
use num_traits::ToPrimitive;
use num_traits::Zero;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;
use std::ops::Shl;
use std::ops::Shr;

/// precision that disables rounding
pub const PREC_EXACT: u64 = u64::MAX;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Round {
    /// toward zero
    Down,
    /// away from zero
    Up,
    /// toward negative infinity
    Floor,
    /// toward positive infinity
    Ceil,
    /// to nearest, ties to even
    Near,
}

/// divide `mantissa` by `2^shift` with rounding, `shift > 0`
fn shift_round(mantissa: &BigInt, shift: u64, round: Round) -> BigInt {
    let floor = mantissa >> shift;
    let remainder = mantissa - (&floor << shift);
    if remainder.is_zero() {
        return floor;
    }
    let round_up = match round {
        Round::Floor => false,
        Round::Ceil => true,
        Round::Down => mantissa.is_negative(),
        Round::Up => !mantissa.is_negative(),
        Round::Near => match remainder.cmp(&(BigInt::one() << (shift - 1))) {
            Ordering::Less => false,
            Ordering::Greater => true,
            Ordering::Equal => floor.is_odd(),
        },
    };
    if round_up {
        floor + 1
    } else {
        floor
    }
}

/// `value * 2^exponent` without intermediate overflow
fn scale_f64(mut value: f64, mut exponent: i64) -> f64 {
    const STEP: i64 = 512;
    while exponent > STEP {
        value *= 2f64.powi(STEP as i32);
        exponent -= STEP;
        if value.is_infinite() {
            return value;
        }
    }
    while exponent < -STEP {
        value *= 2f64.powi(-STEP as i32);
        exponent += STEP;
        if value == 0.0 {
            return value;
        }
    }
    value * 2f64.powi(exponent as i32)
}

/// an exact dyadic number `mantissa * 2^exponent`.
///
/// the mantissa is kept odd (or zero, with a zero exponent) so that equal values
/// have equal representations.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Arf {
    mantissa: BigInt,
    exponent: i64,
}

impl Arf {
    pub fn new(mantissa: BigInt, exponent: i64) -> Self {
        if mantissa.is_zero() {
            return Self::zero();
        }
        let shift = mantissa.trailing_zeros().unwrap_or(0);
        Self {
            mantissa: mantissa >> shift,
            exponent: exponent + shift as i64,
        }
    }
    pub fn zero() -> Self {
        Self::default()
    }
    pub fn one() -> Self {
        Self::from(1)
    }
    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }
    pub fn sign(&self) -> Sign {
        Sign::new(&self.mantissa)
    }
    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }
    pub fn is_positive(&self) -> bool {
        self.mantissa.is_positive()
    }
    /// the odd mantissa
    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }
    pub fn exponent(&self) -> i64 {
        self.exponent
    }
    /// number of significant bits
    pub fn bits(&self) -> u64 {
        self.mantissa.bits()
    }
    /// `floor(log2(|self|))`, `None` for zero
    pub fn logb(&self) -> Option<i64> {
        if self.is_zero() {
            None
        } else {
            Some(self.bits() as i64 - 1 + self.exponent)
        }
    }
    pub fn abs(&self) -> Self {
        Self {
            mantissa: self.mantissa.abs(),
            exponent: self.exponent,
        }
    }
    pub fn round(&self, prec: u64, round: Round) -> Self {
        let bits = self.bits();
        if prec == PREC_EXACT || bits <= prec.max(1) {
            return self.clone();
        }
        let shift = bits - prec.max(1);
        Self::new(
            shift_round(&self.mantissa, shift, round),
            self.exponent + shift as i64,
        )
    }
    fn aligned(&self, rhs: &Arf) -> (BigInt, BigInt, i64) {
        let exponent = self.exponent.min(rhs.exponent);
        (
            &self.mantissa << (self.exponent - exponent) as u64,
            &rhs.mantissa << (rhs.exponent - exponent) as u64,
            exponent,
        )
    }
    pub fn add(&self, rhs: &Arf, prec: u64, round: Round) -> Self {
        if rhs.is_zero() {
            return self.round(prec, round);
        }
        if self.is_zero() {
            return rhs.round(prec, round);
        }
        let (lhs, rhs, exponent) = self.aligned(rhs);
        Self::new(lhs + rhs, exponent).round(prec, round)
    }
    pub fn sub(&self, rhs: &Arf, prec: u64, round: Round) -> Self {
        self.add(&-rhs, prec, round)
    }
    pub fn mul(&self, rhs: &Arf, prec: u64, round: Round) -> Self {
        Self::new(
            &self.mantissa * &rhs.mantissa,
            self.exponent + rhs.exponent,
        )
        .round(prec, round)
    }
    pub fn div(&self, rhs: &Arf, prec: u64, round: Round) -> Result<Self> {
        if rhs.is_zero() {
            return Err(Error::DivisionByZero);
        }
        let quotient = BigRational::new(self.mantissa.clone(), rhs.mantissa.clone());
        Ok(Self::from_rational(&quotient, prec, round) << (self.exponent - rhs.exponent))
    }
    /// the rational `value` rounded to `prec` bits
    pub fn from_rational(value: &BigRational, prec: u64, round: Round) -> Self {
        if value.is_integer() {
            return Self::from(value.to_integer()).round(prec, round);
        }
        assert!(prec != PREC_EXACT, "non-dyadic rational cannot be exact");
        let numer = value.numer();
        let denom = value.denom();
        let shift = prec.max(1) as i64 + denom.bits() as i64 - numer.bits() as i64 + 1;
        let (numer, denom) = if shift >= 0 {
            (numer << shift as u64, denom.clone())
        } else {
            (numer.clone(), denom << (-shift) as u64)
        };
        let (quotient, remainder) = numer.div_mod_floor(&denom);
        // a trailing sticky bit keeps inexact quotients off the rounding boundaries
        let sticky = if remainder.is_zero() { 0 } else { 1 };
        Self::new((quotient << 1u32) + sticky, -shift - 1).round(prec, round)
    }
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(ConstructionError::NonFinite.into());
        }
        let (mantissa, exponent, sign) = Float::integer_decode(value);
        let mantissa = BigInt::from(mantissa) * BigInt::from(sign);
        Ok(Self::new(mantissa, i64::from(exponent)))
    }
    /// round to nearest double
    pub fn to_f64(&self) -> f64 {
        let rounded = self.round(53, Round::Near);
        let mantissa = rounded.mantissa.to_f64().unwrap_or(0.0);
        scale_f64(mantissa, rounded.exponent)
    }
    pub fn to_rational(&self) -> BigRational {
        if self.exponent >= 0 {
            BigRational::from_integer(&self.mantissa << self.exponent as u64)
        } else {
            BigRational::new(
                self.mantissa.clone(),
                BigInt::one() << (-self.exponent) as u64,
            )
        }
    }
    pub fn floor(&self) -> BigInt {
        if self.exponent >= 0 {
            &self.mantissa << self.exponent as u64
        } else {
            &self.mantissa >> (-self.exponent) as u64
        }
    }
    pub fn ceil(&self) -> BigInt {
        -(-self).floor()
    }
}

impl From<BigInt> for Arf {
    fn from(value: BigInt) -> Self {
        Self::new(value, 0)
    }
}

impl From<i64> for Arf {
    fn from(value: i64) -> Self {
        Self::new(value.into(), 0)
    }
}

impl From<i32> for Arf {
    fn from(value: i32) -> Self {
        Self::new(value.into(), 0)
    }
}

impl Neg for Arf {
    type Output = Arf;
    fn neg(self) -> Arf {
        Arf {
            mantissa: -self.mantissa,
            exponent: self.exponent,
        }
    }
}

impl Neg for &'_ Arf {
    type Output = Arf;
    fn neg(self) -> Arf {
        -self.clone()
    }
}

impl Shl<i64> for Arf {
    type Output = Arf;
    fn shl(mut self, rhs: i64) -> Arf {
        if !self.is_zero() {
            self.exponent += rhs;
        }
        self
    }
}

impl Shl<i64> for &'_ Arf {
    type Output = Arf;
    fn shl(self, rhs: i64) -> Arf {
        self.clone() << rhs
    }
}

impl Shr<i64> for Arf {
    type Output = Arf;
    fn shr(self, rhs: i64) -> Arf {
        self << -rhs
    }
}

impl Shr<i64> for &'_ Arf {
    type Output = Arf;
    fn shr(self, rhs: i64) -> Arf {
        self.clone() << -rhs
    }
}

impl Ord for Arf {
    fn cmp(&self, rhs: &Arf) -> Ordering {
        let sign = self.sign().cmp(&rhs.sign());
        if sign != Ordering::Equal || self.is_zero() {
            return sign;
        }
        let magnitude = match self.logb().cmp(&rhs.logb()) {
            Ordering::Equal => {
                let (lhs, rhs, _) = self.aligned(rhs);
                lhs.abs().cmp(&rhs.abs())
            }
            ordering => ordering,
        };
        if self.is_negative() {
            magnitude.reverse()
        } else {
            magnitude
        }
    }
}

impl PartialOrd for Arf {
    fn partial_cmp(&self, rhs: &Arf) -> Option<Ordering> {
        Some(self.cmp(rhs))
    }
}

impl fmt::Debug for Arf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Arf")
            .field("mantissa", &DebugAsDisplay(&self.mantissa))
            .field("exponent", &self.exponent)
            .finish()
    }
}

impl fmt::Display for Arf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.exponent >= 0 {
            write!(f, "{}", self.floor())
        } else {
            write!(f, "{}p{}", self.mantissa, self.exponent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bi(v: i64) -> BigInt {
        BigInt::from(v)
    }

    fn r(n: i64, d: i64) -> BigRational {
        BigRational::new(bi(n), bi(d))
    }

    fn a(mantissa: i64, exponent: i64) -> Arf {
        Arf::new(bi(mantissa), exponent)
    }

    #[test]
    fn test_normalize() {
        assert_eq!(a(12, 0), a(3, 2));
        assert_eq!(a(12, 0).mantissa(), &bi(3));
        assert_eq!(a(12, 0).exponent(), 2);
        assert_eq!(a(0, 17), Arf::zero());
        assert_eq!(a(0, 17).exponent(), 0);
        assert_eq!(a(-8, -3), Arf::from(-1));
    }

    #[test]
    fn test_round() {
        fn test_case(value: Arf, prec: u64, round: Round, expected: Arf) {
            assert_eq!(
                value.round(prec, round),
                expected,
                "value = {}, prec = {}, round = {:?}",
                value,
                prec,
                round
            );
        }
        // 11 = 0b1011
        test_case(a(11, 0), 2, Round::Down, a(8, 0));
        test_case(a(11, 0), 2, Round::Floor, a(8, 0));
        test_case(a(11, 0), 2, Round::Up, a(12, 0));
        test_case(a(11, 0), 2, Round::Ceil, a(12, 0));
        test_case(a(11, 0), 2, Round::Near, a(12, 0));
        test_case(a(-11, 0), 2, Round::Down, a(-8, 0));
        test_case(a(-11, 0), 2, Round::Floor, a(-12, 0));
        test_case(a(-11, 0), 2, Round::Up, a(-12, 0));
        test_case(a(-11, 0), 2, Round::Ceil, a(-8, 0));
        test_case(a(-11, 0), 2, Round::Near, a(-12, 0));
        // ties go to even
        test_case(a(9, 0), 3, Round::Near, a(8, 0));
        test_case(a(11, 0), 3, Round::Near, a(12, 0));
        test_case(a(13, 0), 3, Round::Near, a(12, 0));
        test_case(a(-9, 0), 3, Round::Near, a(-8, 0));
        test_case(a(11, 0), 4, Round::Near, a(11, 0));
        test_case(a(11, 0), PREC_EXACT, Round::Floor, a(11, 0));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(a(3, -1).add(&a(1, -2), 10, Round::Near), a(7, -2));
        assert_eq!(a(3, -1).sub(&a(3, -1), 10, Round::Near), Arf::zero());
        assert_eq!(a(3, 4).mul(&a(-5, -2), PREC_EXACT, Round::Near), a(-15, 2));
        assert_eq!(
            a(1, 0).div(&a(3, 0), 4, Round::Floor).unwrap(),
            a(5, -4)
        );
        assert_eq!(a(1, 0).div(&a(3, 0), 4, Round::Ceil).unwrap(), a(11, -5));
        assert_eq!(a(6, 0).div(&a(3, 0), 4, Round::Ceil).unwrap(), a(2, 0));
        assert_eq!(
            a(1, 0).div(&Arf::zero(), 4, Round::Near),
            Err(Error::DivisionByZero)
        );
    }

    #[test]
    fn test_from_rational() {
        fn test_case(value: BigRational, prec: u64, round: Round, expected: Arf) {
            assert_eq!(
                Arf::from_rational(&value, prec, round),
                expected,
                "value = {}, prec = {}, round = {:?}",
                value,
                prec,
                round
            );
        }
        // 1/3 = 0.010101...
        test_case(r(1, 3), 4, Round::Floor, a(5, -4));
        test_case(r(1, 3), 4, Round::Ceil, a(11, -5));
        test_case(r(1, 3), 4, Round::Near, a(11, -5));
        test_case(r(-1, 3), 4, Round::Floor, a(-11, -5));
        test_case(r(-1, 3), 4, Round::Down, a(-5, -4));
        test_case(r(1, 2), 1, Round::Near, a(1, -1));
        test_case(r(10, 1), 2, Round::Floor, a(8, 0));
        test_case(r(2, 3), 53, Round::Near, Arf::from_f64(2.0 / 3.0).unwrap());
    }

    #[test]
    fn test_floor_ceil() {
        assert_eq!(a(7, -1).floor(), bi(3));
        assert_eq!(a(7, -1).ceil(), bi(4));
        assert_eq!(a(-7, -1).floor(), bi(-4));
        assert_eq!(a(-7, -1).ceil(), bi(-3));
        assert_eq!(a(5, 2).floor(), bi(20));
        assert_eq!(a(5, 2).ceil(), bi(20));
        assert_eq!(Arf::zero().floor(), bi(0));
    }

    #[test]
    fn test_cmp() {
        assert!(a(1, 0) > a(1, -1));
        assert!(a(-1, 0) < a(-1, -1));
        assert!(a(-1, 0) < Arf::zero());
        assert!(a(3, 0) > a(5, -1));
        assert!(a(3, 0) < a(7, -1));
        assert!(a(-3, 0) > a(-7, -1));
        assert_eq!(a(3, 1).cmp(&a(6, 0)), Ordering::Equal);
        assert_eq!(a(1, 0).max(a(3, -1)), a(3, -1));
        assert_eq!(a(1, 0).min(a(3, -1)), a(1, 0));
    }

    #[test]
    fn test_f64() {
        for &value in &[0.0, 1.0, -1.5, 0.1, 1e300, -1e-300, 6.02e23] {
            assert_eq!(Arf::from_f64(value).unwrap().to_f64(), value);
        }
        assert!(Arf::from_f64(f64::NAN).is_err());
        assert!(Arf::from_f64(f64::INFINITY).is_err());
        assert_eq!(a(1, 2000).to_f64(), f64::INFINITY);
        assert_eq!(a(1, -2000).to_f64(), 0.0);
    }

    #[test]
    fn test_logb_shift() {
        assert_eq!(a(1, 0).logb(), Some(0));
        assert_eq!(a(3, 0).logb(), Some(1));
        assert_eq!(a(3, -4).logb(), Some(-3));
        assert_eq!(Arf::zero().logb(), None);
        assert_eq!(a(3, 0) << 3, a(24, 0));
        assert_eq!(a(3, 0) >> 1, a(3, -1));
        assert_eq!(Arf::zero() << 3, Arf::zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(a(3, 2).to_string(), "12");
        assert_eq!(a(-3, -2).to_string(), "-3p-2");
        assert_eq!(
            format!("{:?}", a(3, -2)),
            "Arf { mantissa: 3, exponent: -2 }"
        );
    }

    proptest! {
        #[test]
        fn proptest_directed_rounding_brackets(
            numer in -1_000_000i64..1_000_000,
            denom in 1i64..1000,
            prec in 1u64..40,
        ) {
            let value = r(numer, denom);
            let floor = Arf::from_rational(&value, prec, Round::Floor);
            let ceil = Arf::from_rational(&value, prec, Round::Ceil);
            let near = Arf::from_rational(&value, prec, Round::Near);
            prop_assert!(floor.to_rational() <= value);
            prop_assert!(ceil.to_rational() >= value);
            prop_assert!(floor <= near && near <= ceil);
            prop_assert!(floor.bits() <= prec && ceil.bits() <= prec);
        }

        #[test]
        fn proptest_add_matches_rationals(
            x in -1_000_000i64..1_000_000,
            xe in -20i64..20,
            y in -1_000_000i64..1_000_000,
            ye in -20i64..20,
        ) {
            let sum = a(x, xe).add(&a(y, ye), PREC_EXACT, Round::Near);
            prop_assert_eq!(
                sum.to_rational(),
                a(x, xe).to_rational() + a(y, ye).to_rational()
            );
        }
    }
}
