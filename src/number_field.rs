// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::arb::Arb;
use crate::arf::{Arf, Round};
use crate::error::{ConstructionError, Error, Result};
use crate::polynomial::Polynomial;
use crate::ring::CoefficientRing;
use crate::util::{format_double, Sign};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct NumberFieldData {
    name: String,
    /// monic and squarefree
    minpoly: Polynomial<BigRational>,
    /// an isolating interval of the embedded root, shrinks over time
    embedding: Mutex<(BigRational, BigRational)>,
}

#[derive(Clone)]
pub struct NumberField(Arc<NumberFieldData>);

#[derive(Clone)]
pub struct NumberFieldElement {
    field: NumberField,
    value: Polynomial<BigRational>,
}

fn half(value: BigRational) -> BigRational {
    value / BigRational::from_integer(BigInt::from(2))
}

/// `polynomial` written in the variable `name`, highest power first
fn format_polynomial(polynomial: &Polynomial<BigRational>, name: &str) -> String {
    let mut retval = String::new();
    for (power, coefficient) in polynomial.iter().enumerate().rev() {
        if coefficient.is_zero() {
            continue;
        }
        if retval.is_empty() {
            if coefficient.is_negative() {
                retval.push('-');
            }
        } else if coefficient.is_negative() {
            retval.push_str(" - ");
        } else {
            retval.push_str(" + ");
        }
        let magnitude = coefficient.abs();
        if power == 0 {
            retval.push_str(&magnitude.to_string());
            continue;
        }
        if !magnitude.is_one() {
            retval.push_str(&format!("{}*", magnitude));
        }
        retval.push_str(name);
        if power > 1 {
            retval.push_str(&format!("^{}", power));
        }
    }
    if retval.is_empty() {
        retval.push('0');
    }
    retval
}

impl NumberField {
    /// the field generated by the unique root of `minpoly` in `[lower, upper]`
    pub fn new(
        minpoly: Polynomial<BigRational>,
        name: &str,
        lower: BigRational,
        upper: BigRational,
    ) -> Result<Self, ConstructionError> {
        if minpoly.is_constant() {
            return Err(ConstructionError::InvalidNumberField(
                "defining polynomial must not be constant".into(),
            ));
        }
        if !minpoly.is_square_free() {
            return Err(ConstructionError::InvalidNumberField(format!(
                "defining polynomial {} is not squarefree",
                minpoly
            )));
        }
        if lower > upper || minpoly.count_roots_in(&lower, &upper) != 1 {
            return Err(ConstructionError::InvalidNumberField(format!(
                "[{}, {}] does not isolate a root of {}",
                lower, upper, minpoly
            )));
        }
        let embedding = if minpoly.eval(&lower).is_zero() {
            (lower.clone(), lower)
        } else if minpoly.eval(&upper).is_zero() {
            (upper.clone(), upper)
        } else {
            (lower, upper)
        };
        Ok(NumberField(Arc::new(NumberFieldData {
            name: name.into(),
            minpoly: minpoly.to_monic(),
            embedding: Mutex::new(embedding),
        })))
    }
    /// ℚ seen as a number field of degree one
    pub fn rationals() -> Self {
        let one = BigRational::one();
        NumberField(Arc::new(NumberFieldData {
            name: "a".into(),
            minpoly: Polynomial::from_integers(&[-1, 1]),
            embedding: Mutex::new((one.clone(), one)),
        }))
    }
    pub fn name(&self) -> &str {
        &self.0.name
    }
    pub fn minpoly(&self) -> &Polynomial<BigRational> {
        &self.0.minpoly
    }
    pub fn degree(&self) -> usize {
        self.0.minpoly.degree().unwrap_or(0)
    }
    pub fn ptr_eq(&self, other: &NumberField) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    fn lock_embedding(&self) -> MutexGuard<(BigRational, BigRational)> {
        self.0
            .embedding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
    /// the current isolating interval
    pub fn embedding(&self) -> (BigRational, BigRational) {
        self.lock_embedding().clone()
    }
    /// halves the isolating interval
    fn bisect(&self) {
        let minpoly = &self.0.minpoly;
        let mut embedding = self.lock_embedding();
        let (lower, upper) = embedding.clone();
        if lower == upper {
            return;
        }
        let middle = half(&lower + &upper);
        let middle_sign = minpoly.sign_at(&middle);
        *embedding = if middle_sign.is_zero() {
            (middle.clone(), middle)
        } else if middle_sign == minpoly.sign_at(&lower) {
            (middle, upper)
        } else {
            (lower, middle)
        };
    }
    /// the generator `α`
    pub fn gen(&self) -> NumberFieldElement {
        self.element(Polynomial::x())
    }
    /// `value(α)`
    pub fn element(&self, value: Polynomial<BigRational>) -> NumberFieldElement {
        NumberFieldElement {
            field: self.clone(),
            value: value.rem(&self.0.minpoly),
        }
    }
    pub fn from_rational_value(&self, value: BigRational) -> NumberFieldElement {
        self.element(Polynomial::from_constant(value))
    }
    /// whether `value(α) == 0`
    fn vanishes(&self, value: &Polynomial<BigRational>) -> bool {
        if value.is_zero() {
            return true;
        }
        if value.is_constant() {
            return false;
        }
        let common = value.gcd(&self.0.minpoly);
        if common.is_constant() {
            return false;
        }
        let (lower, upper) = self.embedding();
        common.count_roots_in(&lower, &upper) > 0
    }
    /// a rational enclosure of `value(α)` refined until it excludes zero
    fn sign_of(&self, value: &Polynomial<BigRational>) -> Sign {
        if value.is_constant() {
            return Sign::new(&value.coefficient(0));
        }
        if self.vanishes(value) {
            return Sign::Zero;
        }
        loop {
            let (lower, upper) = self.embedding();
            let (low, high) = value.interval_eval(&lower, &upper);
            if low.is_positive() {
                return Sign::Positive;
            }
            if high.is_negative() {
                return Sign::Negative;
            }
            self.bisect();
        }
    }
    /// a ball around `value(α)` with relative accuracy at least `prec` bits
    fn enclose(&self, value: &Polynomial<BigRational>, prec: u64) -> Arb {
        if value.is_constant() {
            return Arb::from_rational(&value.coefficient(0), prec.saturating_add(2));
        }
        if self.vanishes(value) {
            return Arb::zero();
        }
        let working = prec.saturating_add(2);
        loop {
            let (lower, upper) = self.embedding();
            let (low, high) = value.interval_eval(&lower, &upper);
            let ball = Arb::from_interval(
                Arf::from_rational(&low, working, Round::Floor),
                Arf::from_rational(&high, working, Round::Ceil),
            );
            if ball.rel_accuracy_bits() >= prec as i64 {
                return ball;
            }
            self.bisect();
        }
    }
    /// the factor of the defining polynomial that vanishes at `α` and is coprime to `value`
    fn inverse_of(&self, value: &Polynomial<BigRational>) -> Result<Polynomial<BigRational>> {
        if self.vanishes(value) {
            return Err(Error::DivisionByZero);
        }
        let mut modulus = self.0.minpoly.clone();
        loop {
            let common = value.gcd(&modulus);
            if common.is_constant() {
                break;
            }
            modulus = modulus.div_rem(&common).0;
        }
        match value.inverse_mod(&modulus) {
            Some(inverse) => Ok(inverse.rem(&self.0.minpoly)),
            None => Err(Error::DivisionByZero),
        }
    }
}

impl Default for NumberField {
    fn default() -> Self {
        Self::rationals()
    }
}

impl PartialEq for NumberField {
    /// equal defining data and the same embedded root
    fn eq(&self, other: &NumberField) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.0.name != other.0.name || self.0.minpoly != other.0.minpoly {
            return false;
        }
        let (lhs_lower, lhs_upper) = self.embedding();
        let (rhs_lower, rhs_upper) = other.embedding();
        let lower = lhs_lower.max(rhs_lower);
        let upper = lhs_upper.min(rhs_upper);
        lower <= upper && self.0.minpoly.count_roots_in(&lower, &upper) == 1
    }
}

impl Eq for NumberField {}

impl Hash for NumberField {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
        self.0.minpoly.hash(state);
    }
}

impl fmt::Debug for NumberField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NumberField")
            .field("name", &self.0.name)
            .field("minpoly", &self.0.minpoly)
            .field("embedding", &self.embedding())
            .finish()
    }
}

impl fmt::Display for NumberField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let (lower, upper) = self.embedding();
        write!(
            f,
            "NumberField({}, [{} {}])",
            format_polynomial(&self.0.minpoly, &self.0.name),
            format_double(lower.to_f64().unwrap_or(f64::NAN)),
            format_double(upper.to_f64().unwrap_or(f64::NAN))
        )
    }
}

impl NumberFieldElement {
    pub fn field(&self) -> &NumberField {
        &self.field
    }
    /// coordinates in the power basis `1, α, α², …`
    pub fn value(&self) -> &Polynomial<BigRational> {
        &self.value
    }
    pub fn is_rational(&self) -> bool {
        self.value.is_constant()
    }
}

impl PartialEq for NumberFieldElement {
    fn eq(&self, other: &NumberFieldElement) -> bool {
        if self.field != other.field {
            return false;
        }
        self.value == other.value || self.field.vanishes(&(&self.value - &other.value))
    }
}

impl fmt::Debug for NumberFieldElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("NumberFieldElement")
            .field("field", &self.field.name())
            .field("value", &self.value)
            .finish()
    }
}

impl fmt::Display for NumberFieldElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_rational() {
            return write!(f, "{}", self.value.coefficient(0));
        }
        write!(
            f,
            "({} ~ {})",
            format_polynomial(&self.value, self.field.name()),
            format_double(self.field.enclose(&self.value, 54).to_f64())
        )
    }
}

impl CoefficientRing for NumberField {
    type Element = NumberFieldElement;
    const IS_FIELD: bool = true;
    fn symbol(&self) -> &str {
        "K"
    }
    fn of(value: &NumberFieldElement) -> Self {
        value.field.clone()
    }
    fn compositum(&self, other: &Self) -> Result<Self> {
        if self == other || other.degree() == 1 {
            Ok(self.clone())
        } else if self.degree() == 1 {
            Ok(other.clone())
        } else {
            Err(Error::not_implemented("compositum of number fields"))
        }
    }
    fn coerce(&self, value: &NumberFieldElement) -> Result<NumberFieldElement> {
        if value.field == *self {
            return Ok(NumberFieldElement {
                field: self.clone(),
                value: value.value.clone(),
            });
        }
        if value.is_rational() {
            return Ok(self.from_rational_value(value.value.coefficient(0)));
        }
        Err(Error::not_implemented("coercion to this number field"))
    }
    fn zero(&self) -> NumberFieldElement {
        self.element(Polynomial::zero())
    }
    fn one(&self) -> NumberFieldElement {
        self.element(Polynomial::one())
    }
    fn from_integer(&self, value: &BigInt) -> NumberFieldElement {
        self.from_rational_value(BigRational::from_integer(value.clone()))
    }
    fn from_rational(&self, value: &BigRational) -> Result<NumberFieldElement> {
        Ok(self.from_rational_value(value.clone()))
    }
    fn add(&self, lhs: &NumberFieldElement, rhs: &NumberFieldElement) -> NumberFieldElement {
        self.element(&lhs.value + &rhs.value)
    }
    fn sub(&self, lhs: &NumberFieldElement, rhs: &NumberFieldElement) -> NumberFieldElement {
        self.element(&lhs.value - &rhs.value)
    }
    fn mul(&self, lhs: &NumberFieldElement, rhs: &NumberFieldElement) -> NumberFieldElement {
        self.element(&lhs.value * &rhs.value)
    }
    fn neg(&self, value: &NumberFieldElement) -> NumberFieldElement {
        self.element(-&value.value)
    }
    fn checked_div(
        &self,
        lhs: &NumberFieldElement,
        rhs: &NumberFieldElement,
    ) -> Result<NumberFieldElement> {
        let inverse = self.inverse_of(&rhs.value)?;
        Ok(self.element(&lhs.value * &inverse))
    }
    fn is_zero(&self, value: &NumberFieldElement) -> bool {
        self.vanishes(&value.value)
    }
    fn sign(&self, value: &NumberFieldElement) -> Sign {
        self.sign_of(&value.value)
    }
    fn rational(&self, value: &NumberFieldElement) -> Option<BigRational> {
        if value.is_rational() {
            Some(value.value.coefficient(0))
        } else if self.vanishes(&value.value) {
            Some(BigRational::zero())
        } else {
            None
        }
    }
    fn rational_coefficients(&self, value: &NumberFieldElement) -> Vec<BigRational> {
        (0..self.degree())
            .map(|power| value.value.coefficient(power))
            .collect()
    }
    fn is_unit(&self, value: &NumberFieldElement) -> bool {
        !self.vanishes(&value.value)
    }
    fn arb(&self, value: &NumberFieldElement, prec: u64) -> Arb {
        self.enclose(&value.value, prec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrecisionPolicy;

    fn r(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    fn sqrt2() -> NumberField {
        NumberField::new(Polynomial::from_integers(&[-2, 0, 1]), "a", r(1, 1), r(2, 1)).unwrap()
    }

    #[test]
    fn test_construction() {
        let field = sqrt2();
        assert_eq!(field.degree(), 2);
        assert_eq!(field.to_string(), "NumberField(a^2 - 2, [1 2])");
        assert!(NumberField::new(Polynomial::from_integers(&[-2, 0, 1]), "a", r(-2, 1), r(2, 1)).is_err());
        assert!(NumberField::new(Polynomial::from_integers(&[1, 2, 1]), "a", r(-2, 1), r(0, 1)).is_err());
        assert!(NumberField::new(Polynomial::from_integers(&[3]), "a", r(-2, 1), r(0, 1)).is_err());
        let rational_root =
            NumberField::new(Polynomial::from_integers(&[-3, 1]), "b", r(3, 1), r(4, 1)).unwrap();
        assert_eq!(rational_root.embedding(), (r(3, 1), r(3, 1)));
        assert_eq!(rational_root.gen().to_string(), "3");
    }

    #[test]
    fn test_equality() {
        assert_eq!(sqrt2(), sqrt2());
        let negative =
            NumberField::new(Polynomial::from_integers(&[-2, 0, 1]), "a", r(-2, 1), r(-1, 1)).unwrap();
        assert_ne!(sqrt2(), negative);
        let renamed =
            NumberField::new(Polynomial::from_integers(&[-2, 0, 1]), "b", r(1, 1), r(2, 1)).unwrap();
        assert_ne!(sqrt2(), renamed);
        assert_eq!(NumberField::rationals(), NumberField::default());
    }

    #[test]
    fn test_arithmetic() {
        let field = sqrt2();
        let a = field.gen();
        let one = field.one();
        assert_eq!(field.mul(&a, &a), field.from_integer(&BigInt::from(2)));
        let a_plus_one = field.add(&a, &one);
        let inverse = field.checked_div(&one, &a_plus_one).unwrap();
        // 1 / (a + 1) = a - 1
        assert_eq!(inverse, field.sub(&a, &one));
        assert_eq!(
            field.checked_div(&one, &field.zero()).unwrap_err(),
            Error::DivisionByZero
        );
        assert_eq!(field.rational_coefficients(&a_plus_one), vec![r(1, 1), r(1, 1)]);
        assert_eq!(field.rational(&field.mul(&a, &a)), Some(r(2, 1)));
        assert_eq!(field.rational(&a), None);
        assert!(field.is_unit(&a));
    }

    #[test]
    fn test_sign_and_floor() {
        let field = sqrt2();
        let a = field.gen();
        let three_halves = field.from_rational_value(r(3, 2));
        assert_eq!(field.sign(&a), Sign::Positive);
        assert_eq!(field.compare(&a, &three_halves), Sign::Negative);
        assert_eq!(field.sign(&field.neg(&a)), Sign::Negative);
        let policy = PrecisionPolicy::default();
        let ten_a = field.mul(&a, &field.from_integer(&BigInt::from(10)));
        assert_eq!(field.floor(&ten_a, &policy), Ok(BigInt::from(14)));
        assert_eq!(field.floor(&field.neg(&ten_a), &policy), Ok(BigInt::from(-15)));
        let ball = field.arb(&a, 100);
        assert!(ball.rel_accuracy_bits() >= 100);
        let below = Arb::from_rational(&r(141421356, 100000000), 64);
        let above = Arb::from_rational(&r(141421357, 100000000), 64);
        assert_eq!(ball.checked_gt(&below), Ok(true));
        assert_eq!(ball.checked_lt(&above), Ok(true));
    }

    #[test]
    fn test_reducible_defining_polynomial() {
        // (x^2 - 2) * (x - 3) with the root 3
        let field =
            NumberField::new(Polynomial::from_integers(&[6, -2, -3, 1]), "c", r(5, 2), r(4, 1)).unwrap();
        let c = field.gen();
        let vanishing = field.element(Polynomial::from_integers(&[-3, 1]));
        assert!(field.is_zero(&vanishing));
        assert_eq!(c, field.from_integer(&BigInt::from(3)));
        assert_eq!(field.compare(&c, &field.from_integer(&BigInt::from(3))), Sign::Zero);
        let seven = field.element(Polynomial::from_integers(&[-2, 0, 1]));
        assert_eq!(
            field.checked_div(&field.one(), &seven).unwrap(),
            field.from_rational_value(r(1, 7))
        );
        assert_eq!(
            field.checked_div(&c, &vanishing).unwrap_err(),
            Error::DivisionByZero
        );
        let c_squared = field.mul(&c, &c);
        let inverse = field.checked_div(&field.one(), &c_squared).unwrap();
        assert_eq!(field.mul(&inverse, &c_squared), field.one());
    }

    #[test]
    fn test_compositum() {
        let field = sqrt2();
        assert_eq!(field.compositum(&NumberField::rationals()), Ok(field.clone()));
        assert_eq!(NumberField::rationals().compositum(&field), Ok(field.clone()));
        let other =
            NumberField::new(Polynomial::from_integers(&[-3, 0, 1]), "b", r(1, 1), r(2, 1)).unwrap();
        assert!(matches!(field.compositum(&other), Err(Error::NotImplemented(_))));
        let coerced = field.coerce(&NumberField::rationals().from_rational_value(r(1, 2))).unwrap();
        assert_eq!(coerced, field.from_rational_value(r(1, 2)));
        assert!(field.coerce(&other.gen()).is_err());
    }

    #[test]
    fn test_display() {
        let field = sqrt2();
        let value = field.element(Polynomial::from_integers(&[-1, 2]));
        assert_eq!(value.to_string(), "(2*a - 1 ~ 1.82843)");
        assert_eq!(field.from_rational_value(r(-1, 2)).to_string(), "-1/2");
        assert_eq!(
            format_polynomial(&Polynomial::from_integers(&[0, -1, 0, 3]), "x"),
            "3*x^3 - x"
        );
    }
}
