// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::arf::{Arf, Round, PREC_EXACT};
use crate::error::{Error, Result};
use crate::util::format_double;
use crate::util::Sign;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Neg;

/// bits kept in the radius
const RADIUS_PRECISION: u64 = 30;

#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Arb {
    mid: Arf,
    rad: Arf,
}

impl Arb {
    pub fn new(mid: Arf, rad: Arf) -> Self {
        Self {
            mid,
            rad: rad.abs(),
        }
    }
    pub fn zero() -> Self {
        Self::default()
    }
    pub fn exact(value: Arf) -> Self {
        Self {
            mid: value,
            rad: Arf::zero(),
        }
    }
    pub fn from_integer(value: &BigInt) -> Self {
        Self::exact(Arf::from(value.clone()))
    }
    /// the smallest ball containing `[lower, upper]`, computed exactly
    pub fn from_interval(lower: Arf, upper: Arf) -> Self {
        assert!(lower <= upper, "interval bounds out of order");
        let mid = lower.add(&upper, PREC_EXACT, Round::Near) >> 1;
        let rad = upper.sub(&lower, PREC_EXACT, Round::Near) >> 1;
        Self { mid, rad }
    }
    /// encloses `value` by its neighbours on the `prec`-bit grid; the enclosures of
    /// one value are nested as `prec` grows
    pub fn from_rational(value: &BigRational, prec: u64) -> Self {
        let lower = Arf::from_rational(value, prec, Round::Floor);
        let upper = Arf::from_rational(value, prec, Round::Ceil);
        Self::from_interval(lower, upper)
    }
    fn from_bounds(lower: Arf, upper: Arf, prec: u64) -> Self {
        Self::from_interval(lower.round(prec, Round::Floor), upper.round(prec, Round::Ceil))
            .compact(prec)
    }
    /// rounds the midpoint to `prec` bits and the radius to a few bits, enlarging the ball
    fn compact(self, prec: u64) -> Self {
        let Arb { mid, rad } = self;
        let rounded = mid.round(prec, Round::Near);
        let error = mid.sub(&rounded, PREC_EXACT, Round::Near).abs();
        let rad = rad
            .add(&error, PREC_EXACT, Round::Near)
            .round(RADIUS_PRECISION, Round::Ceil);
        Self { mid: rounded, rad }
    }
    pub fn mid(&self) -> &Arf {
        &self.mid
    }
    pub fn rad(&self) -> &Arf {
        &self.rad
    }
    pub fn lower(&self) -> Arf {
        self.mid.sub(&self.rad, PREC_EXACT, Round::Floor)
    }
    pub fn upper(&self) -> Arf {
        self.mid.add(&self.rad, PREC_EXACT, Round::Ceil)
    }
    pub fn bounds(&self) -> (Arf, Arf) {
        (self.lower(), self.upper())
    }
    pub fn is_exact(&self) -> bool {
        self.rad.is_zero()
    }
    pub fn contains_zero(&self) -> bool {
        !self.lower().is_positive() && !self.upper().is_negative()
    }
    pub fn contains(&self, other: &Arb) -> bool {
        self.lower() <= other.lower() && other.upper() <= self.upper()
    }
    pub fn contains_arf(&self, value: &Arf) -> bool {
        self.lower() <= *value && *value <= self.upper()
    }
    pub fn contains_rational(&self, value: &BigRational) -> bool {
        self.lower().to_rational() <= *value && *value <= self.upper().to_rational()
    }
    /// the sign of every point of the ball, `None` when the ball straddles zero
    pub fn sign(&self) -> Option<Sign> {
        if self.mid.is_zero() && self.is_exact() {
            Some(Sign::Zero)
        } else if self.lower().is_positive() {
            Some(Sign::Positive)
        } else if self.upper().is_negative() {
            Some(Sign::Negative)
        } else {
            None
        }
    }
    /// `log2(|mid| / rad)`, roughly the number of correct leading bits
    pub fn rel_accuracy_bits(&self) -> i64 {
        let rad = match self.rad.logb() {
            None => return i64::MAX,
            Some(logb) if self.rad.bits() == 1 => logb,
            Some(logb) => logb + 1,
        };
        match self.mid.logb() {
            None => i64::MIN,
            Some(mid) => mid - rad,
        }
    }
    pub fn add(&self, rhs: &Arb, prec: u64) -> Self {
        let (l1, u1) = self.bounds();
        let (l2, u2) = rhs.bounds();
        Self::from_bounds(
            l1.add(&l2, PREC_EXACT, Round::Floor),
            u1.add(&u2, PREC_EXACT, Round::Ceil),
            prec,
        )
    }
    pub fn sub(&self, rhs: &Arb, prec: u64) -> Self {
        let (l1, u1) = self.bounds();
        let (l2, u2) = rhs.bounds();
        Self::from_bounds(
            l1.sub(&u2, PREC_EXACT, Round::Floor),
            u1.sub(&l2, PREC_EXACT, Round::Ceil),
            prec,
        )
    }
    pub fn mul(&self, rhs: &Arb, prec: u64) -> Self {
        let (l1, u1) = self.bounds();
        let (l2, u2) = rhs.bounds();
        let products = [
            l1.mul(&l2, PREC_EXACT, Round::Near),
            l1.mul(&u2, PREC_EXACT, Round::Near),
            u1.mul(&l2, PREC_EXACT, Round::Near),
            u1.mul(&u2, PREC_EXACT, Round::Near),
        ];
        let lower = products.iter().cloned().fold(products[0].clone(), Arf::min);
        let upper = products.iter().cloned().fold(products[0].clone(), Arf::max);
        Self::from_bounds(lower, upper, prec)
    }
    /// fails with [`Error::PrecisionInsufficient`] when `rhs` contains zero
    pub fn div(&self, rhs: &Arb, prec: u64) -> Result<Self> {
        if rhs.contains_zero() {
            return Err(Error::PrecisionInsufficient { precision: prec });
        }
        let (l1, u1) = self.bounds();
        let (l2, u2) = rhs.bounds();
        let mut lower: Option<Arf> = None;
        let mut upper: Option<Arf> = None;
        for numerator in &[&l1, &u1] {
            for denominator in &[&l2, &u2] {
                let floor = numerator.div(denominator, prec, Round::Floor)?;
                let ceil = numerator.div(denominator, prec, Round::Ceil)?;
                lower = Some(match lower {
                    Some(lower) => lower.min(floor),
                    None => floor,
                });
                upper = Some(match upper {
                    Some(upper) => upper.max(ceil),
                    None => ceil,
                });
            }
        }
        let lower = lower.unwrap_or_default();
        let upper = upper.unwrap_or_default();
        Ok(Self::from_interval(lower, upper).compact(prec))
    }
    /// the exact intersection of both balls, `None` if they are disjoint
    pub fn intersection(&self, rhs: &Arb) -> Option<Arb> {
        let lower = self.lower().max(rhs.lower());
        let upper = self.upper().min(rhs.upper());
        if lower > upper {
            None
        } else {
            Some(Self::from_interval(lower, upper))
        }
    }
    pub fn mul_2exp(&self, exponent: i64) -> Self {
        Self {
            mid: &self.mid << exponent,
            rad: &self.rad << exponent,
        }
    }
    fn insufficient(&self, rhs: &Arb) -> Error {
        let precision = self
            .rel_accuracy_bits()
            .min(rhs.rel_accuracy_bits())
            .max(0) as u64;
        Error::PrecisionInsufficient { precision }
    }
    fn decide(&self, rhs: &Arb, outcome: Option<bool>) -> Result<bool> {
        outcome.ok_or_else(|| self.insufficient(rhs))
    }
    pub fn checked_lt(&self, rhs: &Arb) -> Result<bool> {
        let outcome = if self.upper() < rhs.lower() {
            Some(true)
        } else if self.lower() >= rhs.upper() {
            Some(false)
        } else {
            None
        };
        self.decide(rhs, outcome)
    }
    pub fn checked_le(&self, rhs: &Arb) -> Result<bool> {
        let outcome = if self.upper() <= rhs.lower() {
            Some(true)
        } else if self.lower() > rhs.upper() {
            Some(false)
        } else {
            None
        };
        self.decide(rhs, outcome)
    }
    pub fn checked_gt(&self, rhs: &Arb) -> Result<bool> {
        rhs.checked_lt(self)
    }
    pub fn checked_ge(&self, rhs: &Arb) -> Result<bool> {
        rhs.checked_le(self)
    }
    /// true only for two identical exact balls
    pub fn checked_eq(&self, rhs: &Arb) -> Result<bool> {
        let outcome = if self.is_exact() && rhs.is_exact() {
            Some(self.mid == rhs.mid)
        } else if self.upper() < rhs.lower() || rhs.upper() < self.lower() {
            Some(false)
        } else {
            None
        };
        self.decide(rhs, outcome)
    }
    pub fn checked_ne(&self, rhs: &Arb) -> Result<bool> {
        self.checked_eq(rhs).map(|eq| !eq)
    }
    /// `Equal` only for two identical exact balls, like [`Arb::checked_eq`]
    pub fn checked_cmp(&self, rhs: &Arb) -> Result<Ordering> {
        let outcome = if self.upper() < rhs.lower() {
            Some(Ordering::Less)
        } else if self.lower() > rhs.upper() {
            Some(Ordering::Greater)
        } else if self.is_exact() && rhs.is_exact() && self.mid == rhs.mid {
            Some(Ordering::Equal)
        } else {
            None
        };
        outcome.ok_or_else(|| self.insufficient(rhs))
    }
    pub fn to_f64(&self) -> f64 {
        self.mid.to_f64()
    }
}

impl Neg for Arb {
    type Output = Arb;
    fn neg(self) -> Arb {
        Arb {
            mid: -self.mid,
            rad: self.rad,
        }
    }
}

impl Neg for &'_ Arb {
    type Output = Arb;
    fn neg(self) -> Arb {
        -self.clone()
    }
}

impl From<Arf> for Arb {
    fn from(value: Arf) -> Self {
        Self::exact(value)
    }
}

impl fmt::Debug for Arb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Arb")
            .field("mid", &self.mid)
            .field("rad", &self.rad)
            .finish()
    }
}

impl fmt::Display for Arb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_exact() {
            write!(f, "[{}]", format_double(self.mid.to_f64()))
        } else {
            write!(
                f,
                "[{} +/- {}]",
                format_double(self.mid.to_f64()),
                format_double(self.rad.to_f64())
            )
        }
    }
}
