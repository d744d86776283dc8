// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::arb::Arb;
use crate::arf::PREC_EXACT;
use crate::config::PrecisionPolicy;
use crate::error::{Error, Result};
use crate::util::Sign;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use std::fmt;
use std::hash::Hash;

/// the arithmetic a [`Module`](crate::module::Module) needs from its coefficients.
///
/// A ring value describes the concrete ring; for ℤ and ℚ it carries no data,
/// for number fields it is the field itself.
pub trait CoefficientRing:
    Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    type Element: Clone + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static;
    const IS_FIELD: bool;
    /// shown in front of `-Module(…)`
    fn symbol(&self) -> &str;
    /// the ring `value` lives in
    fn of(value: &Self::Element) -> Self;
    /// the smallest ring containing both rings
    fn compositum(&self, other: &Self) -> Result<Self>;
    /// `value` as an element of this ring
    fn coerce(&self, value: &Self::Element) -> Result<Self::Element>;
    fn zero(&self) -> Self::Element;
    fn one(&self) -> Self::Element;
    fn from_integer(&self, value: &BigInt) -> Self::Element;
    /// fails with [`Error::NotRepresentable`] when `value` is not in the ring
    fn from_rational(&self, value: &BigRational) -> Result<Self::Element>;
    fn add(&self, lhs: &Self::Element, rhs: &Self::Element) -> Self::Element;
    fn sub(&self, lhs: &Self::Element, rhs: &Self::Element) -> Self::Element;
    fn mul(&self, lhs: &Self::Element, rhs: &Self::Element) -> Self::Element;
    fn neg(&self, value: &Self::Element) -> Self::Element;
    /// the exact quotient, [`Error::NotRepresentable`] if it is not in the ring
    fn checked_div(&self, lhs: &Self::Element, rhs: &Self::Element) -> Result<Self::Element>;
    fn is_zero(&self, value: &Self::Element) -> bool;
    fn sign(&self, value: &Self::Element) -> Sign;
    /// `Some` if `value` is rational
    fn rational(&self, value: &Self::Element) -> Option<BigRational>;
    /// coordinates over ℚ
    fn rational_coefficients(&self, value: &Self::Element) -> Vec<BigRational>;
    fn is_unit(&self, value: &Self::Element) -> bool;
    /// a ball around `value` with relative accuracy at least `prec` bits
    fn arb(&self, value: &Self::Element, prec: u64) -> Arb;
    fn compare(&self, lhs: &Self::Element, rhs: &Self::Element) -> Sign {
        self.sign(&self.sub(lhs, rhs))
    }
    fn floor(&self, value: &Self::Element, policy: &PrecisionPolicy) -> Result<BigInt> {
        if let Some(rational) = self.rational(value) {
            return Ok(rational.floor().to_integer());
        }
        for prec in policy.escalation() {
            let (lower, upper) = self.arb(value, prec).bounds();
            let floor = lower.floor();
            if floor == upper.floor() {
                return Ok(floor);
            }
        }
        Err(Error::PrecisionInsufficient {
            precision: policy.ceiling,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct IntegerRing;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RationalField;

impl CoefficientRing for IntegerRing {
    type Element = BigInt;
    const IS_FIELD: bool = false;
    fn symbol(&self) -> &str {
        "ℤ"
    }
    fn of(_value: &BigInt) -> Self {
        IntegerRing
    }
    fn compositum(&self, _other: &Self) -> Result<Self> {
        Ok(IntegerRing)
    }
    fn coerce(&self, value: &BigInt) -> Result<BigInt> {
        Ok(value.clone())
    }
    fn zero(&self) -> BigInt {
        BigInt::zero()
    }
    fn one(&self) -> BigInt {
        BigInt::one()
    }
    fn from_integer(&self, value: &BigInt) -> BigInt {
        value.clone()
    }
    fn from_rational(&self, value: &BigRational) -> Result<BigInt> {
        if value.is_integer() {
            Ok(value.to_integer())
        } else {
            Err(Error::NotRepresentable)
        }
    }
    fn add(&self, lhs: &BigInt, rhs: &BigInt) -> BigInt {
        lhs + rhs
    }
    fn sub(&self, lhs: &BigInt, rhs: &BigInt) -> BigInt {
        lhs - rhs
    }
    fn mul(&self, lhs: &BigInt, rhs: &BigInt) -> BigInt {
        lhs * rhs
    }
    fn neg(&self, value: &BigInt) -> BigInt {
        -value
    }
    fn checked_div(&self, lhs: &BigInt, rhs: &BigInt) -> Result<BigInt> {
        if rhs.is_zero() {
            return Err(Error::DivisionByZero);
        }
        let (quotient, remainder) = lhs.div_rem(rhs);
        if remainder.is_zero() {
            Ok(quotient)
        } else {
            Err(Error::NotRepresentable)
        }
    }
    fn is_zero(&self, value: &BigInt) -> bool {
        value.is_zero()
    }
    fn sign(&self, value: &BigInt) -> Sign {
        Sign::new(value)
    }
    fn rational(&self, value: &BigInt) -> Option<BigRational> {
        Some(BigRational::from_integer(value.clone()))
    }
    fn rational_coefficients(&self, value: &BigInt) -> Vec<BigRational> {
        vec![BigRational::from_integer(value.clone())]
    }
    fn is_unit(&self, value: &BigInt) -> bool {
        value.abs().is_one()
    }
    fn arb(&self, value: &BigInt, _prec: u64) -> Arb {
        Arb::from_integer(value)
    }
}

impl fmt::Display for IntegerRing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ℤ")
    }
}

impl CoefficientRing for RationalField {
    type Element = BigRational;
    const IS_FIELD: bool = true;
    fn symbol(&self) -> &str {
        "ℚ"
    }
    fn of(_value: &BigRational) -> Self {
        RationalField
    }
    fn compositum(&self, _other: &Self) -> Result<Self> {
        Ok(RationalField)
    }
    fn coerce(&self, value: &BigRational) -> Result<BigRational> {
        Ok(value.clone())
    }
    fn zero(&self) -> BigRational {
        BigRational::zero()
    }
    fn one(&self) -> BigRational {
        BigRational::one()
    }
    fn from_integer(&self, value: &BigInt) -> BigRational {
        BigRational::from_integer(value.clone())
    }
    fn from_rational(&self, value: &BigRational) -> Result<BigRational> {
        Ok(value.clone())
    }
    fn add(&self, lhs: &BigRational, rhs: &BigRational) -> BigRational {
        lhs + rhs
    }
    fn sub(&self, lhs: &BigRational, rhs: &BigRational) -> BigRational {
        lhs - rhs
    }
    fn mul(&self, lhs: &BigRational, rhs: &BigRational) -> BigRational {
        lhs * rhs
    }
    fn neg(&self, value: &BigRational) -> BigRational {
        -value
    }
    fn checked_div(&self, lhs: &BigRational, rhs: &BigRational) -> Result<BigRational> {
        if rhs.is_zero() {
            Err(Error::DivisionByZero)
        } else {
            Ok(lhs / rhs)
        }
    }
    fn is_zero(&self, value: &BigRational) -> bool {
        value.is_zero()
    }
    fn sign(&self, value: &BigRational) -> Sign {
        Sign::new(value)
    }
    fn rational(&self, value: &BigRational) -> Option<BigRational> {
        Some(value.clone())
    }
    fn rational_coefficients(&self, value: &BigRational) -> Vec<BigRational> {
        vec![value.clone()]
    }
    fn is_unit(&self, value: &BigRational) -> bool {
        !value.is_zero()
    }
    fn arb(&self, value: &BigRational, prec: u64) -> Arb {
        Arb::from_rational(value, prec.saturating_add(2).min(PREC_EXACT - 1))
    }
}

impl fmt::Display for RationalField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ℚ")
    }
}
