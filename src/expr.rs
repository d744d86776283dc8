// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::arb::Arb;
use crate::arf::{Arf, Round};
use crate::error::Result;
use crate::util::ceil_log2;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// a value that can sit at the leaves of an [`Expr`]
pub trait Terminal: Clone {
    /// precision and rounding supplied at evaluation time
    type Params: Copy;
    fn add(&self, rhs: &Self, params: Self::Params) -> Result<Self>;
    fn sub(&self, rhs: &Self, params: Self::Params) -> Result<Self>;
    fn mul(&self, rhs: &Self, params: Self::Params) -> Result<Self>;
    fn div(&self, rhs: &Self, params: Self::Params) -> Result<Self>;
    fn neg(&self) -> Self;
    fn with_guard_bits(params: Self::Params, guard_bits: u64) -> Self::Params;
    fn finish(self, params: Self::Params) -> Self;
}

impl Terminal for Arb {
    type Params = u64;
    fn add(&self, rhs: &Self, prec: u64) -> Result<Self> {
        Ok(Arb::add(self, rhs, prec))
    }
    fn sub(&self, rhs: &Self, prec: u64) -> Result<Self> {
        Ok(Arb::sub(self, rhs, prec))
    }
    fn mul(&self, rhs: &Self, prec: u64) -> Result<Self> {
        Ok(Arb::mul(self, rhs, prec))
    }
    fn div(&self, rhs: &Self, prec: u64) -> Result<Self> {
        Arb::div(self, rhs, prec)
    }
    fn neg(&self) -> Self {
        -self
    }
    fn with_guard_bits(prec: u64, guard_bits: u64) -> u64 {
        prec.saturating_add(guard_bits)
    }
    fn finish(self, _prec: u64) -> Self {
        self
    }
}

impl Terminal for Arf {
    type Params = (u64, Round);
    fn add(&self, rhs: &Self, (prec, round): (u64, Round)) -> Result<Self> {
        Ok(Arf::add(self, rhs, prec, round))
    }
    fn sub(&self, rhs: &Self, (prec, round): (u64, Round)) -> Result<Self> {
        Ok(Arf::sub(self, rhs, prec, round))
    }
    fn mul(&self, rhs: &Self, (prec, round): (u64, Round)) -> Result<Self> {
        Ok(Arf::mul(self, rhs, prec, round))
    }
    fn div(&self, rhs: &Self, (prec, round): (u64, Round)) -> Result<Self> {
        Arf::div(self, rhs, prec, round)
    }
    fn neg(&self) -> Self {
        -self
    }
    fn with_guard_bits((prec, round): (u64, Round), guard_bits: u64) -> (u64, Round) {
        (prec.saturating_add(guard_bits), round)
    }
    fn finish(self, (prec, round): (u64, Round)) -> Self {
        self.round(prec, round)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr<T> {
    Leaf(T),
    Neg(Box<Expr<T>>),
    Add(Box<Expr<T>>, Box<Expr<T>>),
    Sub(Box<Expr<T>>, Box<Expr<T>>),
    Mul(Box<Expr<T>>, Box<Expr<T>>),
    Div(Box<Expr<T>>, Box<Expr<T>>),
}

pub type ArbExpr = Expr<Arb>;
pub type ArfExpr = Expr<Arf>;

impl<T: Terminal> Expr<T> {
    pub fn leaf(value: T) -> Self {
        Expr::Leaf(value)
    }
    /// number of operation nodes
    pub fn operations(&self) -> usize {
        match self {
            Expr::Leaf(_) => 0,
            Expr::Neg(operand) => 1 + operand.operations(),
            Expr::Add(lhs, rhs) | Expr::Sub(lhs, rhs) | Expr::Mul(lhs, rhs) | Expr::Div(lhs, rhs) => {
                1 + lhs.operations() + rhs.operations()
            }
        }
    }
    /// evaluates the tree at `params`, the only place an `Expr` is ever computed
    pub fn eval(&self, params: T::Params) -> Result<T> {
        let guard_bits = ceil_log2(self.operations() as u64 + 1);
        let working = T::with_guard_bits(params, guard_bits);
        Ok(self.eval_at(working)?.finish(params))
    }
    fn eval_at(&self, params: T::Params) -> Result<T> {
        Ok(match self {
            Expr::Leaf(value) => value.clone(),
            Expr::Neg(operand) => operand.eval_at(params)?.neg(),
            Expr::Add(lhs, rhs) => lhs.eval_at(params)?.add(&rhs.eval_at(params)?, params)?,
            Expr::Sub(lhs, rhs) => lhs.eval_at(params)?.sub(&rhs.eval_at(params)?, params)?,
            Expr::Mul(lhs, rhs) => lhs.eval_at(params)?.mul(&rhs.eval_at(params)?, params)?,
            Expr::Div(lhs, rhs) => lhs.eval_at(params)?.div(&rhs.eval_at(params)?, params)?,
        })
    }
}

impl<T> From<T> for Expr<T> {
    fn from(value: T) -> Self {
        Expr::Leaf(value)
    }
}

macro_rules! impl_expr_op {
    ($op_trait:ident, $op:ident, $variant:ident) => {
        impl<T> $op_trait<Expr<T>> for Expr<T> {
            type Output = Expr<T>;
            fn $op(self, rhs: Expr<T>) -> Expr<T> {
                Expr::$variant(Box::new(self), Box::new(rhs))
            }
        }

        impl<T: Clone> $op_trait<&'_ T> for Expr<T> {
            type Output = Expr<T>;
            fn $op(self, rhs: &T) -> Expr<T> {
                Expr::$variant(Box::new(self), Box::new(Expr::Leaf(rhs.clone())))
            }
        }
    };
}

impl_expr_op!(Add, add, Add);
impl_expr_op!(Sub, sub, Sub);
impl_expr_op!(Mul, mul, Mul);
impl_expr_op!(Div, div, Div);

impl<T> Neg for Expr<T> {
    type Output = Expr<T>;
    fn neg(self) -> Expr<T> {
        Expr::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use num_rational::BigRational;

    fn r(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn test_operations() {
        let x = ArbExpr::leaf(Arb::exact(Arf::from(1)));
        assert_eq!(x.operations(), 0);
        let tree = -(x.clone() + x.clone()) * x.clone() / x;
        assert_eq!(tree.operations(), 4);
    }

    #[test]
    fn test_eval_arb() {
        let third = Arb::from_rational(&r(1, 3), 64);
        let seven = Arb::exact(Arf::from(7));
        let tree = ArbExpr::leaf(third.clone()) * &seven + ArbExpr::leaf(seven.clone()) / &seven;
        let value = tree.eval(64).unwrap();
        assert!(value.contains_rational(&r(10, 3)));
        assert!(value.rel_accuracy_bits() >= 56);
    }

    #[test]
    fn test_eval_arb_divide_by_ball_containing_zero() {
        let zero = Arb::from_interval(Arf::from(-1), Arf::from(1));
        let tree = ArbExpr::leaf(Arb::exact(Arf::from(1))) / &zero;
        assert!(tree.eval(64).unwrap_err().is_precision_insufficient());
    }

    #[test]
    fn test_eval_arf_rounds_once() {
        // 1/3 + 1/3 + 1/3 at 4 bits, rounding every step would drift
        let third = Arf::from(1).div(&Arf::from(3), 64, Round::Near).unwrap();
        let tree = ArfExpr::leaf(third.clone()) + &third + &third;
        assert_eq!(tree.eval((4, Round::Near)).unwrap(), Arf::from(1));
        let tree = ArfExpr::leaf(Arf::from(1)) / &Arf::from(3);
        assert_eq!(
            tree.eval((4, Round::Floor)).unwrap(),
            Arf::new(BigInt::from(5), -4)
        );
    }
}
