// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information
use crate::util::Sign;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::One;
use num_traits::{zero, Zero};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::slice;
use std::vec;

/// A single-variable polynomial.
///
/// the term at index `n` is `self.coefficients()[n] * pow(x, n)`
///
/// # Invariants
///
/// `self.coefficients().last()` is either `None` or `Some(v)` where `!v.is_zero()`
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct Polynomial<T> {
    coefficients: Vec<T>,
}

pub trait PolynomialCoefficient:
    Clone + Zero + One + PartialEq + Neg<Output = Self> + Sub<Output = Self> + Mul<Output = Self>
{
}

impl<T> PolynomialCoefficient for T where
    T: Clone + Zero + One + PartialEq + Neg<Output = T> + Sub<Output = T> + Mul<Output = T>
{
}

impl<T> Default for Polynomial<T> {
    fn default() -> Self {
        Self {
            coefficients: Vec::default(),
        }
    }
}

impl<T: Zero> From<Vec<T>> for Polynomial<T> {
    fn from(coefficients: Vec<T>) -> Self {
        let mut retval = Self { coefficients };
        retval.remove_extra_zeros();
        retval
    }
}

impl<T> Polynomial<T> {
    pub fn coefficients(&self) -> &[T] {
        &self.coefficients
    }
    pub fn into_coefficients(self) -> Vec<T> {
        self.coefficients
    }
    pub fn iter(&self) -> slice::Iter<T> {
        self.coefficients.iter()
    }
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }
    /// `None` for the zero polynomial
    pub fn degree(&self) -> Option<usize> {
        self.len().checked_sub(1)
    }
    pub fn leading_coefficient(&self) -> Option<&T> {
        self.coefficients.last()
    }
    fn remove_extra_zeros(&mut self)
    where
        T: Zero,
    {
        while let Some(tail) = self.coefficients.last() {
            if tail.is_zero() {
                self.coefficients.pop();
            } else {
                break;
            }
        }
    }
}

impl<T: PolynomialCoefficient> Polynomial<T> {
    pub fn from_constant(value: T) -> Self {
        vec![value].into()
    }
    /// the polynomial `x`
    pub fn x() -> Self {
        vec![T::zero(), T::one()].into()
    }
    /// the coefficient of `x^index`, zero past the end
    pub fn coefficient(&self, index: usize) -> T {
        self.coefficients.get(index).cloned().unwrap_or_else(zero)
    }
    pub fn eval(&self, x: &T) -> T {
        let mut iter = self.iter().rev();
        if let Some(last) = iter.next() {
            let mut retval = last.clone();
            for coefficient in iter {
                retval = retval * x.clone() + coefficient.clone();
            }
            retval
        } else {
            zero()
        }
    }
    /// multiply by `x^shift`
    fn shifted(&self, shift: usize) -> Self {
        if self.is_empty() {
            return Self::default();
        }
        let mut coefficients = vec![T::zero(); shift];
        coefficients.extend(self.iter().cloned());
        Self { coefficients }
    }
    fn scaled(&self, factor: &T) -> Self {
        self.iter()
            .map(|coefficient| coefficient.clone() * factor.clone())
            .collect::<Vec<T>>()
            .into()
    }
}

impl<T: fmt::Display> fmt::Display for Polynomial<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.coefficients.is_empty() {
            write!(f, "0")
        } else {
            for (power, coefficient) in self.coefficients.iter().enumerate() {
                match power {
                    0 => write!(f, "{}", coefficient)?,
                    1 => write!(f, " + {}*x", coefficient)?,
                    _ => write!(f, " + {}*x^{}", coefficient, power)?,
                }
            }
            Ok(())
        }
    }
}

impl<T> IntoIterator for Polynomial<T> {
    type Item = T;
    type IntoIter = vec::IntoIter<T>;
    fn into_iter(self) -> Self::IntoIter {
        self.coefficients.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Polynomial<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PolynomialCoefficient> AddAssign<&'_ Polynomial<T>> for Polynomial<T> {
    fn add_assign(&mut self, rhs: &Polynomial<T>) {
        while self.len() < rhs.len() {
            self.coefficients.push(T::zero());
        }
        for (lhs, rhs) in self.coefficients.iter_mut().zip(rhs.iter()) {
            *lhs = lhs.clone() + rhs.clone();
        }
        self.remove_extra_zeros();
    }
}

impl<T: PolynomialCoefficient> SubAssign<&'_ Polynomial<T>> for Polynomial<T> {
    fn sub_assign(&mut self, rhs: &Polynomial<T>) {
        while self.len() < rhs.len() {
            self.coefficients.push(T::zero());
        }
        for (lhs, rhs) in self.coefficients.iter_mut().zip(rhs.iter()) {
            *lhs = lhs.clone() - rhs.clone();
        }
        self.remove_extra_zeros();
    }
}

impl<T: PolynomialCoefficient> MulAssign<&'_ Polynomial<T>> for Polynomial<T> {
    fn mul_assign(&mut self, rhs: &Polynomial<T>) {
        if self.is_empty() || rhs.is_empty() {
            *self = Self::default();
            return;
        }
        let mut coefficients = vec![T::zero(); self.len() + rhs.len() - 1];
        for (lhs_index, lhs) in self.iter().enumerate() {
            for (rhs_index, rhs) in rhs.iter().enumerate() {
                let product = lhs.clone() * rhs.clone();
                let sum = &mut coefficients[lhs_index + rhs_index];
                *sum = sum.clone() + product;
            }
        }
        *self = coefficients.into();
    }
}

macro_rules! forward_op_to_op_assign {
    ($op_assign_trait:ident, $op_assign:ident, $op_trait:ident, $op:ident) => {
        impl<T: PolynomialCoefficient> $op_assign_trait<Polynomial<T>> for Polynomial<T> {
            fn $op_assign(&mut self, rhs: Polynomial<T>) {
                self.$op_assign(&rhs);
            }
        }

        impl<T: PolynomialCoefficient> $op_trait<Polynomial<T>> for Polynomial<T> {
            type Output = Polynomial<T>;
            fn $op(mut self, rhs: Polynomial<T>) -> Polynomial<T> {
                self.$op_assign(&rhs);
                self
            }
        }

        impl<T: PolynomialCoefficient> $op_trait<&'_ Polynomial<T>> for Polynomial<T> {
            type Output = Polynomial<T>;
            fn $op(mut self, rhs: &Polynomial<T>) -> Polynomial<T> {
                self.$op_assign(rhs);
                self
            }
        }

        impl<T: PolynomialCoefficient> $op_trait<Polynomial<T>> for &'_ Polynomial<T> {
            type Output = Polynomial<T>;
            fn $op(self, rhs: Polynomial<T>) -> Polynomial<T> {
                self.clone().$op(&rhs)
            }
        }

        impl<'a, 'b, T: PolynomialCoefficient> $op_trait<&'a Polynomial<T>> for &'b Polynomial<T> {
            type Output = Polynomial<T>;
            fn $op(self, rhs: &Polynomial<T>) -> Polynomial<T> {
                self.clone().$op(rhs)
            }
        }
    };
}

forward_op_to_op_assign!(AddAssign, add_assign, Add, add);
forward_op_to_op_assign!(SubAssign, sub_assign, Sub, sub);
forward_op_to_op_assign!(MulAssign, mul_assign, Mul, mul);

impl<T: PolynomialCoefficient> Neg for Polynomial<T> {
    type Output = Polynomial<T>;
    fn neg(self) -> Polynomial<T> {
        Polynomial {
            coefficients: self.into_iter().map(Neg::neg).collect(),
        }
    }
}

impl<T: PolynomialCoefficient> Neg for &'_ Polynomial<T> {
    type Output = Polynomial<T>;
    fn neg(self) -> Polynomial<T> {
        -self.clone()
    }
}

impl<T: PolynomialCoefficient> Zero for Polynomial<T> {
    fn zero() -> Self {
        Self::default()
    }
    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: PolynomialCoefficient> One for Polynomial<T> {
    fn one() -> Self {
        Self::from_constant(T::one())
    }
}

/// polynomials over the rationals, where division with remainder is available
impl Polynomial<BigRational> {
    pub fn from_integers(coefficients: &[i64]) -> Self {
        coefficients
            .iter()
            .map(|&coefficient| BigRational::from_integer(BigInt::from(coefficient)))
            .collect::<Vec<_>>()
            .into()
    }
    pub fn derivative(&self) -> Self {
        self.iter()
            .enumerate()
            .skip(1)
            .map(|(power, coefficient)| coefficient * BigRational::from_integer(power.into()))
            .collect::<Vec<_>>()
            .into()
    }
    pub fn is_constant(&self) -> bool {
        self.len() <= 1
    }
    /// divides by the leading coefficient
    pub fn to_monic(&self) -> Self {
        match self.leading_coefficient() {
            None => Self::default(),
            Some(leading) => {
                let factor = leading.recip();
                self.scaled(&factor)
            }
        }
    }
    pub fn checked_div_rem(&self, divisor: &Self) -> Option<(Self, Self)> {
        let divisor_degree = divisor.degree()?;
        let divisor_leading = divisor.leading_coefficient()?;
        let mut quotient = vec![BigRational::zero(); self.len().saturating_sub(divisor_degree)];
        let mut remainder = self.clone();
        while let Some(remainder_degree) = remainder.degree() {
            if remainder_degree < divisor_degree {
                break;
            }
            let shift = remainder_degree - divisor_degree;
            let factor = remainder.coefficients[remainder_degree].clone() / divisor_leading;
            remainder -= &divisor.scaled(&factor).shifted(shift);
            quotient[shift] = factor;
        }
        Some((quotient.into(), remainder))
    }
    /// # Panics
    ///
    /// Panics if `divisor` is zero.
    pub fn div_rem(&self, divisor: &Self) -> (Self, Self) {
        self.checked_div_rem(divisor)
            .expect("polynomial division by zero")
    }
    pub fn rem(&self, divisor: &Self) -> Self {
        self.div_rem(divisor).1
    }
    /// the monic greatest common divisor
    pub fn gcd(&self, rhs: &Self) -> Self {
        let mut lhs = self.clone();
        let mut rhs = rhs.clone();
        while !rhs.is_zero() {
            let remainder = lhs.rem(&rhs);
            lhs = rhs;
            rhs = remainder;
        }
        lhs.to_monic()
    }
    /// returns `(g, s, t)` with `s * self + t * rhs == g` and `g` the monic gcd
    pub fn extended_gcd(&self, rhs: &Self) -> (Self, Self, Self) {
        let mut r0 = self.clone();
        let mut r1 = rhs.clone();
        let mut s0 = Self::one();
        let mut s1 = Self::zero();
        let mut t0 = Self::zero();
        let mut t1 = Self::one();
        while !r1.is_zero() {
            let (quotient, remainder) = r0.div_rem(&r1);
            r0 = std::mem::replace(&mut r1, remainder);
            let s2 = &s0 - &quotient * &s1;
            s0 = std::mem::replace(&mut s1, s2);
            let t2 = &t0 - &quotient * &t1;
            t0 = std::mem::replace(&mut t1, t2);
        }
        match r0.leading_coefficient() {
            None => (r0, s0, t0),
            Some(leading) => {
                let factor = leading.recip();
                (r0.scaled(&factor), s0.scaled(&factor), t0.scaled(&factor))
            }
        }
    }
    /// the inverse of `self` modulo `modulus`, `None` if they share a factor
    pub fn inverse_mod(&self, modulus: &Self) -> Option<Self> {
        let (gcd, inverse, _) = self.rem(modulus).extended_gcd(modulus);
        if gcd.is_one() {
            Some(inverse.rem(modulus))
        } else {
            None
        }
    }
    pub fn is_square_free(&self) -> bool {
        self.gcd(&self.derivative()).is_constant()
    }
    pub fn to_sturm_sequence(&self) -> Vec<Self> {
        let self_len = self.len();
        match self_len {
            0 => return vec![],
            1 => return vec![self.clone()],
            _ => {}
        }
        let mut sturm_sequence = Vec::with_capacity(self_len);
        sturm_sequence.push(self.clone());
        sturm_sequence.push(self.derivative());
        loop {
            let next = match sturm_sequence.rchunks_exact(2).next() {
                Some([next_to_last, last]) => -next_to_last.rem(last),
                _ => unreachable!(),
            };
            if next.is_zero() {
                break;
            }
            sturm_sequence.push(next);
        }
        sturm_sequence
    }
    /// the sign of `self` at `x`
    pub fn sign_at(&self, x: &BigRational) -> Sign {
        Sign::new(&self.eval(x))
    }
    /// number of distinct real roots in the closed interval `[lower, upper]`
    pub fn count_roots_in(&self, lower: &BigRational, upper: &BigRational) -> usize {
        if self.is_zero() || lower > upper {
            return 0;
        }
        let sturm_sequence = self.to_sturm_sequence();
        let lower_changes = sign_changes(&sturm_sequence, lower);
        let upper_changes = sign_changes(&sturm_sequence, upper);
        let at_lower = if self.eval(lower).is_zero() { 1 } else { 0 };
        lower_changes.saturating_sub(upper_changes) + at_lower
    }
    /// an enclosure of `{ self(x) : lower <= x <= upper }`
    pub fn interval_eval(
        &self,
        lower: &BigRational,
        upper: &BigRational,
    ) -> (BigRational, BigRational) {
        let mut iter = self.iter().rev();
        let last = match iter.next() {
            Some(last) => last,
            None => return (zero(), zero()),
        };
        let mut retval = (last.clone(), last.clone());
        for coefficient in iter {
            let products = [
                &retval.0 * lower,
                &retval.0 * upper,
                &retval.1 * lower,
                &retval.1 * upper,
            ];
            let mut minimum = products[0].clone();
            let mut maximum = products[0].clone();
            for product in &products[1..] {
                if *product < minimum {
                    minimum = product.clone();
                }
                if *product > maximum {
                    maximum = product.clone();
                }
            }
            retval = (minimum + coefficient, maximum + coefficient);
        }
        retval
    }
}

fn sign_changes(sturm_sequence: &[Polynomial<BigRational>], x: &BigRational) -> usize {
    let mut changes = 0;
    let mut previous: Option<Sign> = None;
    for polynomial in sturm_sequence {
        let sign = polynomial.sign_at(x);
        if sign.is_zero() {
            continue;
        }
        if let Some(previous) = previous {
            if previous != sign {
                changes += 1;
            }
        }
        previous = Some(sign);
    }
    changes
}
