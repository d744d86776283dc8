// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::arb::Arb;
use crate::arf::{Arf, Round};
use crate::error::{ConstructionError, Error, Result};
use crate::expr::ArbExpr;
use crate::module::Module;
use crate::real_number::RealNumber;
use crate::registry::Registry;
use crate::ring::CoefficientRing;
use crate::util::{ceil_log2, Sign};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Clone, Debug)]
pub struct Element<R: CoefficientRing> {
    module: Module<R>,
    coefficients: Vec<R::Element>,
}

impl<R: CoefficientRing> Element<R> {
    pub fn new(module: &Module<R>, coefficients: Vec<R::Element>) -> Result<Self> {
        if coefficients.len() != module.rank() {
            return Err(ConstructionError::CoefficientCountMismatch {
                expected: module.rank(),
                actual: coefficients.len(),
            }
            .into());
        }
        let ring = module.ring();
        let coefficients = coefficients
            .iter()
            .map(|coefficient| ring.coerce(coefficient))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_parts(module.clone(), coefficients))
    }
    pub(crate) fn from_parts(module: Module<R>, coefficients: Vec<R::Element>) -> Self {
        debug_assert_eq!(module.rank(), coefficients.len());
        Element {
            module,
            coefficients,
        }
    }
    pub fn from_scalar(registry: &Registry, value: R::Element) -> Result<Self> {
        let one = RealNumber::integer(registry, 1);
        let module = Module::make(vec![one], R::of(&value), registry)?;
        Ok(Self::from_parts(module, vec![value]))
    }
    /// `other` with its coefficients moved into `ring`; fails with
    /// [`Error::NotRepresentable`] if a coefficient is not a rational in `ring`
    pub fn coerce_from<S: CoefficientRing>(other: &Element<S>, ring: R) -> Result<Self> {
        let coefficients = other
            .coefficients()
            .iter()
            .map(|coefficient| {
                let value = other
                    .ring()
                    .rational(coefficient)
                    .ok_or(Error::NotRepresentable)?;
                ring.from_rational(&value)
            })
            .collect::<Result<Vec<_>>>()?;
        let module = Module::make(other.module().basis().to_vec(), ring, other.registry())?;
        Ok(Self::from_parts(module, coefficients))
    }
    pub fn module(&self) -> &Module<R> {
        &self.module
    }
    pub fn ring(&self) -> &R {
        self.module.ring()
    }
    pub fn registry(&self) -> &Registry {
        self.module.registry()
    }
    pub fn coefficients(&self) -> &[R::Element] {
        &self.coefficients
    }
    pub fn rational_coefficients(&self) -> Vec<Vec<BigRational>> {
        let ring = self.ring();
        self.coefficients
            .iter()
            .map(|coefficient| ring.rational_coefficients(coefficient))
            .collect()
    }
    fn terms(&self) -> impl Iterator<Item = (&RealNumber, &R::Element)> {
        self.module.basis().iter().zip(self.coefficients.iter())
    }
    fn nonzero_terms(&self) -> impl Iterator<Item = (&RealNumber, &R::Element)> {
        let ring = self.ring();
        self.terms()
            .filter(move |(_, coefficient)| !ring.is_zero(coefficient))
    }
    /// the nonzero term with the largest generator in deglex order
    fn leading(&self) -> Option<(&R::Element, &RealNumber)> {
        self.nonzero_terms()
            .last()
            .map(|(gen, coefficient)| (coefficient, gen))
    }
    pub fn is_zero(&self) -> bool {
        self.nonzero_terms().next().is_none()
    }
    fn is_one(&self) -> bool {
        self.to_rational().map_or(false, |value| value.is_one())
    }
    fn check_registry(&self, other: &Self) -> Result<()> {
        if self.registry().ptr_eq(other.registry()) {
            Ok(())
        } else {
            Err(ConstructionError::ForeignRegistry.into())
        }
    }
    pub fn promote(&self, module: &Module<R>) -> Result<Self> {
        if self.module.ptr_eq(module) {
            return Ok(self.clone());
        }
        if !self.registry().ptr_eq(module.registry()) {
            return Err(ConstructionError::ForeignRegistry.into());
        }
        if self
            .nonzero_terms()
            .any(|(gen, _)| module.index_of(gen).is_none())
        {
            return Err(Error::NotRepresentable);
        }
        let ring = module.ring();
        let coefficients = module
            .basis()
            .iter()
            .map(|gen| match self.module.index_of(gen) {
                Some(index) => ring.coerce(&self.coefficients[index]),
                None => Ok(ring.zero()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_parts(module.clone(), coefficients))
    }
    /// the same value in the module spanned by the generators with nonzero coefficient
    pub fn simplify(&self) -> Result<Self> {
        let basis = self.nonzero_terms().map(|(gen, _)| gen.clone()).collect();
        let module = Module::make(basis, self.ring().clone(), self.registry())?;
        self.promote(&module)
    }
    pub fn checked_add(&self, rhs: &Self) -> Result<Self> {
        let module = Module::span(&self.module, &rhs.module)?;
        let lhs = self.promote(&module)?;
        let rhs = rhs.promote(&module)?;
        let ring = module.ring();
        let coefficients = lhs
            .coefficients
            .iter()
            .zip(&rhs.coefficients)
            .map(|(lhs, rhs)| ring.add(lhs, rhs))
            .collect();
        Ok(Self::from_parts(module, coefficients))
    }
    pub fn checked_sub(&self, rhs: &Self) -> Result<Self> {
        self.checked_add(&-rhs)
    }
    /// the product; generators are multiplied pairwise, the result lives in
    /// the module of all products
    pub fn checked_mul(&self, rhs: &Self) -> Result<Self> {
        self.check_registry(rhs)?;
        if self.is_zero() {
            return Ok(self.clone());
        }
        if rhs.is_zero() {
            return Ok(rhs.clone());
        }
        let ring = self.ring().compositum(rhs.ring())?;
        let lhs = self.promote(&self.module.with_ring(ring.clone())?)?;
        let rhs = rhs.promote(&rhs.module.with_ring(ring.clone())?)?;
        let mut products: Vec<(RealNumber, R::Element)> = Vec::new();
        for (g, a) in lhs.terms() {
            for (h, b) in rhs.terms() {
                let gen = g.checked_mul(h)?;
                let value = ring.mul(a, b);
                match products.iter_mut().find(|(product, _)| product.ptr_eq(&gen)) {
                    Some((_, sum)) => *sum = ring.add(sum, &value),
                    None => products.push((gen, value)),
                }
            }
        }
        products.sort_by(|(lhs, _), (rhs, _)| lhs.deglex(rhs));
        let (basis, coefficients): (Vec<_>, Vec<_>) = products.into_iter().unzip();
        let module = Module::make(basis, ring, self.registry())?;
        Ok(Self::from_parts(module, coefficients))
    }
    pub fn mul_real(&self, real: &RealNumber) -> Result<Self> {
        let module = Module::make(vec![real.clone()], self.ring().clone(), self.registry())?;
        self.checked_mul(&module.gen(0))
    }
    pub fn scale(&self, factor: &R::Element) -> Self {
        let ring = self.ring();
        let coefficients = self
            .coefficients
            .iter()
            .map(|coefficient| ring.mul(coefficient, factor))
            .collect();
        Self::from_parts(self.module.clone(), coefficients)
    }
    pub fn checked_div_scalar(&self, divisor: &R::Element) -> Result<Self> {
        let ring = self.ring();
        let coefficients = self
            .coefficients
            .iter()
            .map(|coefficient| ring.checked_div(coefficient, divisor))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_parts(self.module.clone(), coefficients))
    }
    /// the exact quotient, dividing by leading terms in deglex order
    pub fn checked_div(&self, rhs: &Self) -> Result<Self> {
        if rhs.is_zero() {
            return Err(Error::DivisionByZero);
        }
        if rhs.is_one() {
            return Ok(self.clone());
        }
        let module = Module::span(&self.module, &rhs.module)?;
        let divisor = rhs.promote(&module)?;
        let (b, h) = divisor.leading().ok_or(Error::DivisionByZero)?;
        let ring = module.ring().clone();
        let mut quotient = module.zero();
        let mut remainder = self.promote(&module)?;
        while let Some((a, g)) = remainder.leading() {
            let gen = g.checked_div(h)?.ok_or(Error::NotRepresentable)?;
            let coefficient = ring.checked_div(a, b)?;
            let partial = Module::make(vec![gen], ring.clone(), self.registry())?
                .gen(0)
                .scale(&coefficient);
            quotient = quotient.checked_add(&partial)?;
            remainder = remainder.checked_sub(&partial.checked_mul(&divisor)?)?;
        }
        Ok(quotient)
    }
    pub fn floordiv(&self, rhs: &Self) -> Result<BigInt> {
        if rhs.is_zero() {
            return Err(Error::DivisionByZero);
        }
        if self.is_zero() {
            return Ok(BigInt::zero());
        }
        let module = Module::span(&self.module, &rhs.module)?;
        let dividend = self.promote(&module)?;
        let divisor = rhs.promote(&module)?;
        if let Some(quotient) = dividend.integer_multiple_of(&divisor) {
            return Ok(quotient);
        }
        let policy = self.registry().policy();
        for prec in policy.escalation() {
            let denominator = divisor.ball(prec)?;
            if denominator.contains_zero() {
                continue;
            }
            let (lower, upper) = dividend.ball(prec)?.div(&denominator, prec)?.bounds();
            let floor = lower.floor();
            if floor == upper.floor() {
                return Ok(floor);
            }
        }
        Err(self.insufficient(policy.ceiling))
    }
    /// `Some(k)` if `self == k * divisor` coefficient by coefficient
    fn integer_multiple_of(&self, divisor: &Self) -> Option<BigInt> {
        let ring = self.ring();
        let mut multiple: Option<BigInt> = None;
        for (lhs, rhs) in self.coefficients.iter().zip(&divisor.coefficients) {
            match (ring.is_zero(lhs), ring.is_zero(rhs)) {
                (true, true) => continue,
                (false, false) => {}
                _ => return None,
            }
            let quotient = ring.rational(&ring.checked_div(lhs, rhs).ok()?)?;
            if !quotient.is_integer() {
                return None;
            }
            let quotient = quotient.to_integer();
            match &multiple {
                Some(previous) if *previous != quotient => return None,
                _ => multiple = Some(quotient),
            }
        }
        multiple
    }
    /// whether the inverse is an element too: all nonzero terms sit on the
    /// rational generator and have a unit coefficient
    pub fn is_unit(&self) -> bool {
        if self.is_zero() {
            return false;
        }
        let ring = self.ring();
        self.nonzero_terms()
            .all(|(gen, coefficient)| gen.is_rational() && ring.is_unit(coefficient))
    }
    /// the value if it is rational, i.e. only the rational generator carries a
    /// (rational) coefficient
    pub fn to_rational(&self) -> Option<BigRational> {
        let ring = self.ring();
        let mut sum = BigRational::zero();
        for (gen, coefficient) in self.nonzero_terms() {
            let value = gen.rational_value()?;
            sum += value * ring.rational(coefficient)?;
        }
        Some(sum)
    }
    pub fn to_integer(&self) -> Option<BigInt> {
        self.to_rational()
            .filter(BigRational::is_integer)
            .map(|value| value.to_integer())
    }
    /// a ball around the value computed at working precision `prec`
    fn ball(&self, prec: u64) -> Result<Arb> {
        let ring = self.ring();
        let mut sum = ArbExpr::leaf(Arb::zero());
        for (gen, coefficient) in self.nonzero_terms() {
            sum = sum + ArbExpr::leaf(gen.arb(prec)) * &ring.arb(coefficient, prec);
        }
        sum.eval(prec)
    }
    /// a ball around the value with a relative accuracy of at least `accuracy` bits
    pub fn arb(&self, accuracy: u64) -> Result<Arb> {
        if self.is_zero() {
            return Ok(Arb::zero());
        }
        let ceiling = self.registry().policy().ceiling;
        if accuracy > ceiling {
            return Err(self.insufficient(ceiling));
        }
        let target = i64::try_from(accuracy).unwrap_or(i64::MAX);
        let limit = ceiling.saturating_mul(2);
        let mut prec = accuracy
            .saturating_add(ceil_log2(self.module.rank() as u64))
            .max(2)
            .min(limit);
        loop {
            let ball = self.ball(prec)?;
            if ball.rel_accuracy_bits() >= target {
                return Ok(ball);
            }
            if prec >= limit {
                return Err(self.insufficient(prec));
            }
            prec = prec.saturating_mul(2).min(limit);
        }
    }
    fn insufficient(&self, precision: u64) -> Error {
        tracing::debug!(element = %self, precision, "element reached the precision ceiling");
        Error::PrecisionInsufficient { precision }
    }
    pub fn sign(&self) -> Result<Sign> {
        if let Some(value) = self.to_rational() {
            return Ok(Sign::new(&value));
        }
        let policy = self.registry().policy();
        for prec in policy.escalation() {
            if let Some(sign) = self.ball(prec)?.sign() {
                return Ok(sign);
            }
        }
        Err(self.insufficient(policy.ceiling))
    }
    /// compares the values; equal elements compare `Equal` without any
    /// approximation since their difference is structurally zero
    pub fn checked_cmp(&self, rhs: &Self) -> Result<Ordering> {
        if let (Some(lhs), Some(rhs)) = (self.to_rational(), rhs.to_rational()) {
            return Ok(lhs.cmp(&rhs));
        }
        let difference = self.checked_sub(rhs)?;
        if difference.is_zero() {
            return Ok(Ordering::Equal);
        }
        Ok(difference.sign()?.into())
    }
    pub fn checked_cmp_rational(&self, rhs: &BigRational) -> Result<Ordering> {
        if let Some(value) = self.to_rational() {
            return Ok(value.cmp(rhs));
        }
        let policy = self.registry().policy();
        for prec in policy.escalation() {
            if let Ok(ordering) = self.ball(prec)?.checked_cmp(&Arb::from_rational(rhs, prec)) {
                return Ok(ordering);
            }
        }
        Err(self.insufficient(policy.ceiling))
    }
    pub fn floor(&self) -> Result<BigInt> {
        if let Some(value) = self.to_rational() {
            return Ok(value.floor().to_integer());
        }
        self.round_by(Arf::floor)
    }
    pub fn ceil(&self) -> Result<BigInt> {
        if let Some(value) = self.to_rational() {
            return Ok(value.ceil().to_integer());
        }
        self.round_by(Arf::ceil)
    }
    fn round_by(&self, round: fn(&Arf) -> BigInt) -> Result<BigInt> {
        let policy = self.registry().policy();
        for prec in policy.escalation() {
            let (lower, upper) = self.ball(prec)?.bounds();
            let rounded = round(&lower);
            if rounded == round(&upper) {
                return Ok(rounded);
            }
        }
        Err(self.insufficient(policy.ceiling))
    }
    pub fn to_f64(&self) -> Result<f64> {
        if let Some(value) = self.to_rational() {
            return Ok(Arf::from_rational(&value, 53, Round::Near).to_f64());
        }
        let policy = self.registry().policy();
        for prec in policy.escalation_from(55) {
            let (lower, upper) = self.ball(prec)?.bounds();
            let value = lower.to_f64();
            if value == upper.to_f64() {
                return Ok(value);
            }
        }
        Err(self.insufficient(policy.ceiling))
    }
    pub fn divides(&self, rhs: &Self) -> Result<bool> {
        if self.is_zero() {
            return Ok(rhs.is_zero());
        }
        match rhs.checked_div(self) {
            Ok(_) => Ok(true),
            Err(Error::NotRepresentable) => Ok(false),
            Err(error) => Err(error),
        }
    }
    /// `self` or `rhs` when one divides the other
    pub fn gcd(&self, rhs: &Self) -> Result<Self> {
        if self.divides(rhs)? {
            return Ok(self.clone());
        }
        if rhs.divides(self)? {
            return Ok(rhs.clone());
        }
        Err(Error::not_implemented(
            "gcd() not implemented for non-trivial elements yet",
        ))
    }
}

impl<R: CoefficientRing + Default> Element<R> {
    pub fn rational(registry: &Registry, value: &BigRational) -> Result<Self> {
        Self::from_scalar(registry, R::default().from_rational(value)?)
    }
    pub fn integer<T: Into<BigInt>>(registry: &Registry, value: T) -> Result<Self> {
        Self::from_scalar(registry, R::default().from_integer(&value.into()))
    }
}

impl<R: CoefficientRing> Neg for &'_ Element<R> {
    type Output = Element<R>;
    fn neg(self) -> Element<R> {
        let ring = self.ring();
        let coefficients = self
            .coefficients
            .iter()
            .map(|coefficient| ring.neg(coefficient))
            .collect();
        Element::from_parts(self.module.clone(), coefficients)
    }
}

impl<R: CoefficientRing> Neg for Element<R> {
    type Output = Element<R>;
    fn neg(self) -> Element<R> {
        -&self
    }
}

macro_rules! impl_element_op {
    ($op_trait:ident, $op:ident, $checked:ident) => {
        impl<'a, 'b, R: CoefficientRing> $op_trait<&'a Element<R>> for &'b Element<R> {
            type Output = Element<R>;
            fn $op(self, rhs: &Element<R>) -> Element<R> {
                self.$checked(rhs)
                    .unwrap_or_else(|error| panic!("{} failed: {}", stringify!($op), error))
            }
        }

        impl<R: CoefficientRing> $op_trait<Element<R>> for &'_ Element<R> {
            type Output = Element<R>;
            fn $op(self, rhs: Element<R>) -> Element<R> {
                self.$op(&rhs)
            }
        }

        impl<R: CoefficientRing> $op_trait<&'_ Element<R>> for Element<R> {
            type Output = Element<R>;
            fn $op(self, rhs: &Element<R>) -> Element<R> {
                (&self).$op(rhs)
            }
        }

        impl<R: CoefficientRing> $op_trait<Element<R>> for Element<R> {
            type Output = Element<R>;
            fn $op(self, rhs: Element<R>) -> Element<R> {
                (&self).$op(&rhs)
            }
        }
    };
}

impl_element_op!(Add, add, checked_add);
impl_element_op!(Sub, sub, checked_sub);
impl_element_op!(Mul, mul, checked_mul);
impl_element_op!(Div, div, checked_div);

impl<R: CoefficientRing> Mul<&'_ RealNumber> for &'_ Element<R> {
    type Output = Element<R>;
    fn mul(self, rhs: &RealNumber) -> Element<R> {
        self.mul_real(rhs)
            .unwrap_or_else(|error| panic!("mul failed: {}", error))
    }
}

impl<R: CoefficientRing> PartialEq for Element<R> {
    fn eq(&self, rhs: &Self) -> bool {
        if let (Some(lhs), Some(rhs)) = (self.to_rational(), rhs.to_rational()) {
            return lhs == rhs;
        }
        self.checked_sub(rhs)
            .map_or(false, |difference| difference.is_zero())
    }
}

impl<R: CoefficientRing> PartialEq<BigRational> for Element<R> {
    fn eq(&self, rhs: &BigRational) -> bool {
        self.to_rational().as_ref() == Some(rhs)
    }
}

impl<R: CoefficientRing> PartialEq<i64> for Element<R> {
    fn eq(&self, rhs: &i64) -> bool {
        *self == BigRational::from_integer(BigInt::from(*rhs))
    }
}

impl<R: CoefficientRing> PartialOrd for Element<R> {
    fn partial_cmp(&self, rhs: &Self) -> Option<Ordering> {
        self.checked_cmp(rhs).ok()
    }
}

impl<R: CoefficientRing> PartialOrd<BigRational> for Element<R> {
    fn partial_cmp(&self, rhs: &BigRational) -> Option<Ordering> {
        self.checked_cmp_rational(rhs).ok()
    }
}

impl<R: CoefficientRing> PartialOrd<i64> for Element<R> {
    fn partial_cmp(&self, rhs: &i64) -> Option<Ordering> {
        self.checked_cmp_rational(&BigRational::from_integer(BigInt::from(*rhs)))
            .ok()
    }
}

impl<R: CoefficientRing> Hash for Element<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_f64().map_or(0, f64::to_bits).hash(state);
    }
}

/// whether the summand is negative, and its absolute value as text; a
/// rational generator is folded into the coefficient
fn summand<R: CoefficientRing>(
    ring: &R,
    gen: &RealNumber,
    coefficient: &R::Element,
) -> (bool, String) {
    if let Some(value) = gen.rational_value() {
        if let Some(rational) = ring.rational(coefficient) {
            let product = rational * value;
            return (product.is_negative(), product.abs().to_string());
        }
        if let Ok(value) = ring.from_rational(value) {
            let product = ring.mul(coefficient, &value);
            let negative = ring.sign(&product).is_negative();
            let magnitude = if negative { ring.neg(&product) } else { product };
            return (negative, magnitude.to_string());
        }
    }
    let negative = ring.sign(coefficient).is_negative();
    let magnitude = if negative {
        ring.neg(coefficient)
    } else {
        coefficient.clone()
    };
    if ring.is_zero(&ring.sub(&magnitude, &ring.one())) {
        (negative, gen.to_string())
    } else {
        (negative, format!("{}*{}", magnitude, gen))
    }
}

impl<R: CoefficientRing> fmt::Display for Element<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ring = self.ring();
        let mut terms: Vec<(bool, &RealNumber, String)> = self
            .nonzero_terms()
            .map(|(gen, coefficient)| {
                let (negative, text) = summand(ring, gen, coefficient);
                (negative, gen, text)
            })
            .collect();
        terms.sort_by(|(lhs_negative, lhs, _), (rhs_negative, rhs, _)| {
            lhs_negative.cmp(rhs_negative).then_with(|| {
                lhs.checked_cmp(rhs)
                    .unwrap_or_else(|_| lhs.deglex(rhs))
            })
        });
        if terms.is_empty() {
            return write!(f, "0");
        }
        for (index, (negative, _, text)) in terms.into_iter().enumerate() {
            match (index, negative) {
                (0, false) => {}
                (0, true) => write!(f, "-")?,
                (_, false) => write!(f, " + ")?,
                (_, true) => write!(f, " - ")?,
            }
            write!(f, "{}", text)?;
        }
        Ok(())
    }
}
