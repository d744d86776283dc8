// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::arb::Arb;
use crate::arf::{Arf, Round, PREC_EXACT};
use crate::error::{ConstructionError, Error, Result};
use crate::registry::Registry;
use crate::util::{ceil_log2, format_double, next_down, next_up, DebugAsDisplay};
use num_bigint::{BigInt, BigUint, RandBigInt};
use num_rational::BigRational;
use num_traits::{One, Zero};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// number of cached approximations beyond the two common precisions
const CACHE_LIMIT: usize = 128;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum RealKey {
    Rational(BigRational),
    Random(u64),
    Constrained(Arf, i64, u64),
    Product(Vec<(u64, u32)>),
}

#[derive(Clone, Debug)]
pub enum RealNumberKind {
    Rational(BigRational),
    /// binary digits drawn from a generator seeded with `seed`, a value in `(0, 1)`
    Random { seed: u64 },
    /// `initial + inner * 2^(e - 1)`
    Constrained {
        initial: Arf,
        e: i64,
        inner: RealNumber,
    },
    /// factors sorted by id, no rationals, exponents at least one
    Product { factors: Vec<(RealNumber, u32)> },
}

#[derive(Default)]
struct Approximations {
    arf54: Option<Arf>,
    arf64: Option<Arf>,
    arfs: HashMap<u64, Arf>,
    tightest: Option<Arb>,
}

struct RealNumberData {
    id: u64,
    kind: RealNumberKind,
    registry: Registry,
    approximations: Mutex<Approximations>,
}

#[derive(Clone)]
pub struct RealNumber(Arc<RealNumberData>);

/// the first `digits` significant binary digits of the random number with `seed`
fn random_digits(seed: u64, digits: u64) -> Arf {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let mut bits: Vec<u8> = Vec::with_capacity(digits.min(1 << 16) as usize);
    let mut exponent: i64 = 0;
    while (bits.len() as u64) < digits {
        let word = rng.next_u64();
        for shift in (0..64).rev() {
            if bits.len() as u64 == digits {
                break;
            }
            let bit = ((word >> shift) & 1) as u8;
            exponent -= 1;
            if bits.is_empty() && bit == 0 {
                continue;
            }
            bits.push(bit);
        }
    }
    let mantissa = BigUint::from_radix_be(&bits, 2).unwrap_or_default();
    Arf::new(BigInt::from(mantissa), exponent)
}

impl RealNumber {
    fn get<F>(registry: &Registry, key: RealKey, kind: F) -> RealNumber
    where
        F: FnOnce() -> RealNumberKind,
    {
        RealNumber(registry.intern(key, || {
            let id = registry.next_id();
            tracing::trace!(id, "created real number");
            Arc::new(RealNumberData {
                id,
                kind: kind(),
                registry: registry.clone(),
                approximations: Mutex::default(),
            })
        }))
    }
    pub fn rational(registry: &Registry, value: BigRational) -> RealNumber {
        Self::get(registry, RealKey::Rational(value.clone()), || {
            RealNumberKind::Rational(value)
        })
    }
    pub fn integer<T: Into<BigInt>>(registry: &Registry, value: T) -> RealNumber {
        Self::rational(registry, BigRational::from_integer(value.into()))
    }
    /// a fresh random number in `(0, 1)`
    pub fn random(registry: &Registry) -> RealNumber {
        Self::random_with_seed(registry, registry.next_seed())
    }
    pub fn random_with_seed(registry: &Registry, seed: u64) -> RealNumber {
        Self::get(registry, RealKey::Random(seed), || RealNumberKind::Random {
            seed,
        })
    }
    /// a fresh random number in `[lower, upper)`
    pub fn random_between(registry: &Registry, lower: &Arf, upper: &Arf) -> Result<RealNumber> {
        if lower.is_zero() && *upper == Arf::one() {
            return Ok(Self::random(registry));
        }
        if lower >= upper {
            return Err(ConstructionError::EmptyInterval.into());
        }
        let e = lower.exponent().min(upper.exponent());
        let lower_mantissa = lower.mantissa() << (lower.exponent() - e) as u64;
        let upper_mantissa = upper.mantissa() << (upper.exponent() - e) as u64;
        let length = upper_mantissa - &lower_mantissa;
        let mut rng = Pcg64Mcg::seed_from_u64(registry.next_seed());
        let offset = rng.gen_bigint_range(&BigInt::zero(), &length);
        let initial = Arf::new(lower_mantissa + offset, e);
        let inner = Self::random(registry);
        Self::constrained(registry, initial, e, inner)
    }
    /// a fresh random number that is closer to `value` than to any other double
    pub fn random_near(registry: &Registry, value: f64) -> Result<RealNumber> {
        if !value.is_finite() {
            return Err(ConstructionError::NonFinite.into());
        }
        let three = Arf::from(3);
        let twice = Arf::from_f64(value)? << 1;
        let lower = Arf::from_f64(next_down(value))?
            .add(&twice, 64, Round::Near)
            .div(&three, 64, Round::Near)?;
        let upper = Arf::from_f64(next_up(value))?
            .add(&twice, 64, Round::Near)
            .div(&three, 64, Round::Near)?;
        Self::random_between(registry, &lower, &upper)
    }
    pub(crate) fn constrained(
        registry: &Registry,
        initial: Arf,
        e: i64,
        inner: RealNumber,
    ) -> Result<RealNumber> {
        if !inner.registry().ptr_eq(registry) {
            return Err(ConstructionError::ForeignRegistry.into());
        }
        let key = RealKey::Constrained(initial.clone(), e, inner.id());
        Ok(Self::get(registry, key, || RealNumberKind::Constrained {
            initial,
            e,
            inner,
        }))
    }
    /// the monomial with the given factors; the empty product is one
    pub(crate) fn product(registry: &Registry, factors: Vec<(RealNumber, u32)>) -> RealNumber {
        let mut merged: Vec<(RealNumber, u32)> = Vec::with_capacity(factors.len());
        let mut factors = factors;
        factors.sort_by_key(|(factor, _)| factor.id());
        for (factor, exponent) in factors {
            if exponent == 0 {
                continue;
            }
            if let Some((last, last_exponent)) = merged.last_mut() {
                if last.ptr_eq(&factor) {
                    *last_exponent += exponent;
                    continue;
                }
            }
            merged.push((factor, exponent));
        }
        match merged.len() {
            0 => return Self::integer(registry, 1),
            1 if merged[0].1 == 1 => return merged.swap_remove(0).0,
            _ => {}
        }
        let key = RealKey::Product(
            merged
                .iter()
                .map(|(factor, exponent)| (factor.id(), *exponent))
                .collect(),
        );
        Self::get(registry, key, || RealNumberKind::Product { factors: merged })
    }
    pub fn id(&self) -> u64 {
        self.0.id
    }
    pub fn kind(&self) -> &RealNumberKind {
        &self.0.kind
    }
    pub fn registry(&self) -> &Registry {
        &self.0.registry
    }
    pub fn ptr_eq(&self, other: &RealNumber) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    pub fn rational_value(&self) -> Option<&BigRational> {
        match &self.0.kind {
            RealNumberKind::Rational(value) => Some(value),
            _ => None,
        }
    }
    pub fn is_rational(&self) -> bool {
        self.rational_value().is_some()
    }
    pub fn is_one(&self) -> bool {
        self.rational_value().map_or(false, One::is_one)
    }
    pub fn total_degree(&self) -> u32 {
        match &self.0.kind {
            RealNumberKind::Rational(_) => 0,
            RealNumberKind::Product { factors } => factors.iter().map(|(_, exponent)| exponent).sum(),
            _ => 1,
        }
    }
    /// indeterminates with their exponents, sorted by id
    pub fn factors(&self) -> Vec<(RealNumber, u32)> {
        match &self.0.kind {
            RealNumberKind::Rational(_) => vec![],
            RealNumberKind::Product { factors } => factors.clone(),
            _ => vec![(self.clone(), 1)],
        }
    }
    pub fn monomials(&self) -> Vec<(u64, u32)> {
        self.factors()
            .iter()
            .map(|(factor, exponent)| (factor.id(), *exponent))
            .collect()
    }
    fn approximations(&self) -> MutexGuard<Approximations> {
        self.0
            .approximations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
    fn cached_arf(&self, prec: u64) -> Option<Arf> {
        let approximations = self.approximations();
        match prec {
            54 => approximations.arf54.clone(),
            64 => approximations.arf64.clone(),
            _ => approximations.arfs.get(&prec).cloned(),
        }
    }
    fn store_arf(&self, prec: u64, value: Arf) {
        let mut approximations = self.approximations();
        match prec {
            54 => approximations.arf54 = Some(value),
            64 => approximations.arf64 = Some(value),
            _ => {
                if approximations.arfs.len() >= CACHE_LIMIT {
                    tracing::debug!(id = self.id(), "flushing approximation cache");
                    approximations.arfs.clear();
                }
                approximations.arfs.insert(prec, value);
            }
        }
    }
    /// an approximation with `prec + 1` significant bits and relative error below `2^-prec`
    pub fn arf(&self, prec: u64) -> Arf {
        if let Some(cached) = self.cached_arf(prec) {
            return cached;
        }
        let value = match &self.0.kind {
            RealNumberKind::Rational(value) => Arf::from_rational(value, prec.max(1), Round::Near),
            RealNumberKind::Random { seed } => random_digits(*seed, prec.saturating_add(1)),
            _ => self
                .arb(prec.saturating_add(2))
                .mid()
                .round(prec.saturating_add(1), Round::Near),
        };
        self.store_arf(prec, value.clone());
        value
    }
    /// contained in every ball returned before for a lower precision
    pub fn arb(&self, prec: u64) -> Arb {
        match &self.0.kind {
            RealNumberKind::Rational(value) => Arb::from_rational(value, prec.saturating_add(2)),
            RealNumberKind::Random { .. } => {
                // the digits after the first prec + 2 add less than one unit in the last place
                let truncated = self.arf(prec.saturating_add(1));
                let logb = match truncated.logb() {
                    Some(logb) => logb,
                    None => return Arb::exact(truncated),
                };
                let ulp = Arf::new(BigInt::one(), logb - prec as i64 - 1);
                let upper = truncated.add(&ulp, PREC_EXACT, Round::Near);
                Arb::from_interval(truncated, upper)
            }
            _ => self.composite_arb(prec),
        }
    }
    fn guard_bits(&self) -> u64 {
        match &self.0.kind {
            RealNumberKind::Product { .. } => ceil_log2(3 * u64::from(self.total_degree())) + 2,
            _ => 2,
        }
    }
    fn composite_arb(&self, prec: u64) -> Arb {
        let mut working = prec.saturating_add(self.guard_bits());
        loop {
            let ball = self.tighten(self.arb_at(working));
            if ball.rel_accuracy_bits() >= prec as i64 {
                return ball;
            }
            working = working.saturating_mul(2);
        }
    }
    fn arb_at(&self, working: u64) -> Arb {
        match &self.0.kind {
            RealNumberKind::Constrained { initial, e, inner } => {
                let tail = inner.arb(working).mul_2exp(e - 1);
                Arb::exact(initial.clone()).add(&tail, working)
            }
            RealNumberKind::Product { factors } => {
                let mut product = Arb::exact(Arf::one());
                for (factor, exponent) in factors {
                    let ball = factor.arb(working);
                    for _ in 0..*exponent {
                        product = product.mul(&ball, working);
                    }
                }
                product
            }
            _ => self.arb(working),
        }
    }
    fn tighten(&self, ball: Arb) -> Arb {
        let mut approximations = self.approximations();
        let ball = match approximations
            .tightest
            .as_ref()
            .and_then(|tightest| tightest.intersection(&ball))
        {
            Some(intersection) => intersection,
            None => ball,
        };
        approximations.tightest = Some(ball.clone());
        ball
    }
    /// replaces `arb`, a ball containing this number, by a ball of relative
    /// accuracy at least `prec` unless it is already that accurate
    pub fn refine(&self, arb: &mut Arb, prec: u64) {
        if arb.rel_accuracy_bits() < prec as i64 {
            *arb = self.arb(prec);
        }
    }
    pub fn cmp_arb(&self, arb: &Arb) -> Result<Ordering> {
        let policy = self.registry().policy();
        for prec in policy.escalation() {
            if let Ok(ordering) = self.arb(prec).checked_cmp(arb) {
                return Ok(ordering);
            }
        }
        tracing::debug!(id = self.id(), "comparison against ball reached the precision ceiling");
        Err(Error::PrecisionInsufficient {
            precision: policy.ceiling,
        })
    }
    pub fn checked_cmp(&self, other: &RealNumber) -> Result<Ordering> {
        if self.ptr_eq(other) {
            return Ok(Ordering::Equal);
        }
        if let (Some(lhs), Some(rhs)) = (self.rational_value(), other.rational_value()) {
            return Ok(lhs.cmp(rhs));
        }
        let policy = self.registry().policy();
        for prec in policy.escalation() {
            if let Ok(ordering) = self.arb(prec).checked_cmp(&other.arb(prec)) {
                return Ok(ordering);
            }
        }
        tracing::debug!(
            lhs = self.id(),
            rhs = other.id(),
            "comparison reached the precision ceiling"
        );
        Err(Error::PrecisionInsufficient {
            precision: policy.ceiling,
        })
    }
    pub fn to_f64(&self) -> f64 {
        self.arf(54).to_f64()
    }
    /// the graded order on monomials used to sort module bases: rationals
    /// first, then by total degree, then by the factors in order of id where a
    /// smaller id or a higher power of the same id comes first
    pub fn deglex(&self, other: &RealNumber) -> Ordering {
        if self.ptr_eq(other) {
            return Ordering::Equal;
        }
        if let (Some(lhs), Some(rhs)) = (self.rational_value(), other.rational_value()) {
            return lhs.cmp(rhs);
        }
        let degree = self.total_degree().cmp(&other.total_degree());
        if degree != Ordering::Equal {
            return degree;
        }
        for ((lhs_id, lhs_exponent), (rhs_id, rhs_exponent)) in
            self.monomials().into_iter().zip(other.monomials())
        {
            if lhs_id != rhs_id {
                return lhs_id.cmp(&rhs_id);
            }
            if lhs_exponent != rhs_exponent {
                return rhs_exponent.cmp(&lhs_exponent);
            }
        }
        self.id().cmp(&other.id())
    }
    fn check_registry(&self, other: &RealNumber) -> Result<()> {
        if self.registry().ptr_eq(other.registry()) {
            Ok(())
        } else {
            Err(ConstructionError::ForeignRegistry.into())
        }
    }
    /// the product as a generator, only defined where it is a monomial
    pub fn checked_mul(&self, other: &RealNumber) -> Result<RealNumber> {
        self.check_registry(other)?;
        if self.is_one() {
            return Ok(other.clone());
        }
        if other.is_one() {
            return Ok(self.clone());
        }
        match (self.rational_value(), other.rational_value()) {
            (Some(lhs), Some(rhs)) => Ok(Self::rational(self.registry(), lhs * rhs)),
            (None, None) => {
                let mut factors = self.factors();
                factors.extend(other.factors());
                Ok(Self::product(self.registry(), factors))
            }
            _ => Err(Error::not_implemented(
                "multiplication of rational real number != 1 with non-rational real number",
            )),
        }
    }
    /// the quotient as a generator, `None` if it is not a monomial
    pub fn checked_div(&self, other: &RealNumber) -> Result<Option<RealNumber>> {
        self.check_registry(other)?;
        if self.ptr_eq(other) {
            return Ok(Some(Self::integer(self.registry(), 1)));
        }
        if let Some(divisor) = other.rational_value() {
            if divisor.is_one() {
                return Ok(Some(self.clone()));
            }
            return match self.rational_value() {
                Some(_) if divisor.is_zero() => Err(Error::DivisionByZero),
                Some(dividend) => Ok(Some(Self::rational(self.registry(), dividend / divisor))),
                None => Err(Error::not_implemented(
                    "division of non-rational real number by rational real number != 1",
                )),
            };
        }
        if self.is_rational() {
            return Ok(None);
        }
        let mut quotient = self.factors();
        for (factor, exponent) in other.factors() {
            match quotient.iter_mut().find(|(candidate, _)| candidate.ptr_eq(&factor)) {
                Some((_, remaining)) if *remaining >= exponent => *remaining -= exponent,
                _ => return Ok(None),
            }
        }
        Ok(Some(Self::product(self.registry(), quotient)))
    }
}

impl PartialEq for RealNumber {
    fn eq(&self, other: &RealNumber) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for RealNumber {}

impl PartialOrd for RealNumber {
    fn partial_cmp(&self, other: &RealNumber) -> Option<Ordering> {
        if !self.registry().ptr_eq(other.registry()) {
            return None;
        }
        self.checked_cmp(other).ok()
    }
}

impl Hash for RealNumber {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for RealNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0.kind {
            RealNumberKind::Rational(value) => write!(f, "{}", value),
            RealNumberKind::Random { .. } => write!(f, "ℝ({}…)", format_double(self.to_f64())),
            RealNumberKind::Constrained { initial, e, inner } => {
                write!(f, "ℝ({} + {}p{})", initial, inner, e)?;
                let approximate = format_double(self.to_f64());
                if format_double(initial.to_f64()) != approximate {
                    write!(f, "[∼{}]", approximate)?;
                }
                Ok(())
            }
            RealNumberKind::Product { factors } => {
                for (index, (factor, exponent)) in factors.iter().enumerate() {
                    if index != 0 {
                        write!(f, "*")?;
                    }
                    write!(f, "{}", factor)?;
                    if *exponent != 1 {
                        write!(f, "^{}", exponent)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for RealNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("RealNumber")
            .field(&self.id())
            .field(&DebugAsDisplay(self))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrecisionPolicy;
    use crate::registry::FIRST_ID;
    use proptest::prelude::*;

    fn r(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    fn registry() -> Registry {
        Registry::with_policy(PrecisionPolicy::default())
    }

    #[test]
    fn test_uniqueness() {
        let registry = registry();
        let half = RealNumber::rational(&registry, r(1, 2));
        assert_eq!(half.id(), FIRST_ID);
        assert!(half.ptr_eq(&RealNumber::rational(&registry, r(2, 4))));
        let x = RealNumber::random_with_seed(&registry, 1337);
        assert!(x.ptr_eq(&RealNumber::random_with_seed(&registry, 1337)));
        assert_eq!(x.id(), FIRST_ID + 1);
        let y = RealNumber::random(&registry);
        assert!(x != y);
        let other = Registry::with_policy(PrecisionPolicy::default());
        assert!(!x.ptr_eq(&RealNumber::random_with_seed(&other, 1337)));
    }

    #[test]
    fn test_display() {
        let registry = registry();
        assert_eq!(RealNumber::rational(&registry, r(1, 2)).to_string(), "1/2");
        assert_eq!(RealNumber::integer(&registry, -3).to_string(), "-3");
        let x = RealNumber::random(&registry);
        assert_eq!(x.to_string(), format!("ℝ({}…)", format_double(x.to_f64())));
        let y = RealNumber::random(&registry);
        let xy = x.checked_mul(&y).unwrap();
        assert_eq!(xy.to_string(), format!("{}*{}", x, y));
        let x2y = xy.checked_mul(&x).unwrap();
        assert_eq!(x2y.to_string(), format!("{}^2*{}", x, y));
        let z = RealNumber::random_between(&registry, &Arf::from(1), &Arf::from(2)).unwrap();
        assert!(z.to_string().starts_with("ℝ(1 + ℝ("));
        assert!(z.to_string().contains("p0)"));
    }

    #[test]
    fn test_random_digits() {
        let registry = registry();
        let x = RealNumber::random(&registry);
        let coarse = x.arf(10);
        let fine = x.arf(100);
        assert!(coarse.bits() <= 11);
        assert!(coarse.is_positive());
        assert!(coarse <= fine);
        let logb = coarse.logb().unwrap();
        assert!(logb < 0);
        let bound = coarse.add(&Arf::new(BigInt::one(), logb - 10), 1000, Round::Near);
        assert!(fine < bound);
        assert_eq!(x.arf(100), fine);
        assert!(x.to_f64() > 0.0 && x.to_f64() < 1.0);
    }

    #[test]
    fn test_arb_accuracy_and_nesting() {
        let registry = registry();
        let x = RealNumber::random(&registry);
        let y = RealNumber::random(&registry);
        let numbers = vec![
            RealNumber::rational(&registry, r(1, 3)),
            x.clone(),
            RealNumber::random_between(&registry, &Arf::from(-5), &Arf::from(7)).unwrap(),
            x.checked_mul(&y).unwrap(),
            x.checked_mul(&x).unwrap().checked_mul(&y).unwrap(),
        ];
        for number in &numbers {
            let mut previous: Option<Arb> = None;
            for &prec in &[2u64, 10, 32, 64, 65, 200, 1000] {
                let ball = number.arb(prec);
                assert!(
                    ball.rel_accuracy_bits() >= prec as i64,
                    "{} at {} bits: {:?}",
                    number,
                    prec,
                    ball
                );
                if let Some(previous) = &previous {
                    assert!(previous.contains(&ball), "{} at {} bits", number, prec);
                }
                previous = Some(ball);
            }
        }
    }

    #[test]
    fn test_random_between() {
        let registry = registry();
        let lower = Arf::new(BigInt::from(-3), -2);
        let upper = Arf::from(5);
        let z = RealNumber::random_between(&registry, &lower, &upper).unwrap();
        let (low, high) = z.arb(64).bounds();
        assert!(lower <= low && high <= upper);
        assert!(matches!(z.kind(), RealNumberKind::Constrained { .. }));
        let plain = RealNumber::random_between(&registry, &Arf::zero(), &Arf::one()).unwrap();
        assert!(matches!(plain.kind(), RealNumberKind::Random { .. }));
        assert_eq!(
            RealNumber::random_between(&registry, &upper, &lower).unwrap_err(),
            Error::InvalidConstruction(ConstructionError::EmptyInterval)
        );
        assert!(RealNumber::random_between(&registry, &upper, &upper).is_err());
    }

    #[test]
    fn test_random_near() {
        let registry = registry();
        for &value in &[1.5, -0.1, 12345.678, 3e10] {
            let z = RealNumber::random_near(&registry, value).unwrap();
            assert_eq!(z.to_f64(), value);
        }
        assert_eq!(
            RealNumber::random_near(&registry, f64::NAN).unwrap_err(),
            Error::InvalidConstruction(ConstructionError::NonFinite)
        );
    }

    #[test]
    fn test_mul() {
        let registry = registry();
        let one = RealNumber::integer(&registry, 1);
        let half = RealNumber::rational(&registry, r(1, 2));
        let x = RealNumber::random(&registry);
        let y = RealNumber::random(&registry);
        assert!(one.checked_mul(&x).unwrap().ptr_eq(&x));
        assert!(x.checked_mul(&one).unwrap().ptr_eq(&x));
        assert_eq!(
            half.checked_mul(&half).unwrap().rational_value(),
            Some(&r(1, 4))
        );
        assert!(matches!(
            half.checked_mul(&x),
            Err(Error::NotImplemented(_))
        ));
        let xx = x.checked_mul(&x).unwrap();
        assert_eq!(xx.monomials(), vec![(x.id(), 2)]);
        assert_eq!(xx.total_degree(), 2);
        assert!(x.checked_mul(&y).unwrap().ptr_eq(&y.checked_mul(&x).unwrap()));
        let other = Registry::with_policy(PrecisionPolicy::default());
        assert_eq!(
            x.checked_mul(&RealNumber::random(&other)).unwrap_err(),
            Error::InvalidConstruction(ConstructionError::ForeignRegistry)
        );
    }

    #[test]
    fn test_div() {
        let registry = registry();
        let one = RealNumber::integer(&registry, 1);
        let x = RealNumber::random(&registry);
        let y = RealNumber::random(&registry);
        let xy = x.checked_mul(&y).unwrap();
        let xx = x.checked_mul(&x).unwrap();
        assert!(x.checked_div(&x).unwrap().unwrap().ptr_eq(&one));
        assert!(x.checked_div(&one).unwrap().unwrap().ptr_eq(&x));
        assert!(xx.checked_div(&x).unwrap().unwrap().ptr_eq(&x));
        assert!(xy.checked_div(&y).unwrap().unwrap().ptr_eq(&x));
        assert!(x.checked_div(&y).unwrap().is_none());
        assert!(x.checked_div(&xx).unwrap().is_none());
        assert!(one.checked_div(&x).unwrap().is_none());
        let half = RealNumber::rational(&registry, r(1, 2));
        let third = RealNumber::rational(&registry, r(1, 3));
        assert_eq!(
            half.checked_div(&third).unwrap().unwrap().rational_value(),
            Some(&r(3, 2))
        );
        assert!(matches!(
            x.checked_div(&half),
            Err(Error::NotImplemented(_))
        ));
        let zero = RealNumber::integer(&registry, 0);
        assert_eq!(half.checked_div(&zero), Err(Error::DivisionByZero));
    }

    #[test]
    fn test_deglex() {
        let registry = registry();
        let one = RealNumber::integer(&registry, 1);
        let x = RealNumber::random(&registry);
        let y = RealNumber::random(&registry);
        let xx = x.checked_mul(&x).unwrap();
        let xy = x.checked_mul(&y).unwrap();
        let yy = y.checked_mul(&y).unwrap();
        let xxy = xx.checked_mul(&y).unwrap();
        let sorted = vec![one, x, y, xx, xy, yy, xxy];
        for (i, lhs) in sorted.iter().enumerate() {
            for (j, rhs) in sorted.iter().enumerate() {
                assert_eq!(lhs.deglex(rhs), i.cmp(&j), "{} vs {}", lhs, rhs);
            }
        }
    }

    #[test]
    fn test_cmp() {
        let registry = registry();
        let x = RealNumber::random(&registry);
        let y = RealNumber::random(&registry);
        let two = RealNumber::integer(&registry, 2);
        let zero = RealNumber::integer(&registry, 0);
        assert_eq!(x.checked_cmp(&x), Ok(Ordering::Equal));
        assert_eq!(x.checked_cmp(&two), Ok(Ordering::Less));
        assert_eq!(two.checked_cmp(&x), Ok(Ordering::Greater));
        assert_eq!(zero.checked_cmp(&x), Ok(Ordering::Less));
        let ordering = x.checked_cmp(&y).unwrap();
        assert_ne!(ordering, Ordering::Equal);
        assert_eq!(y.checked_cmp(&x).unwrap(), ordering.reverse());
        assert_eq!(x.partial_cmp(&y), Some(ordering));
        assert!(x < two);
        assert_eq!(x.cmp_arb(&Arb::exact(Arf::from(1))), Ok(Ordering::Less));
        assert!(x.cmp_arb(&x.arb(64)).is_err());
    }

    #[test]
    fn test_refine() {
        let registry = registry();
        let x = RealNumber::random(&registry);
        let mut ball = x.arb(8);
        x.refine(&mut ball, 4);
        assert_eq!(ball, x.arb(8));
        x.refine(&mut ball, 100);
        assert!(ball.rel_accuracy_bits() >= 100);
    }

    proptest! {
        #[test]
        fn proptest_random_balls_nest(seed in any::<u64>(), p1 in 1u64..200, extra in 0u64..200) {
            let registry = registry();
            let x = RealNumber::random_with_seed(&registry, seed);
            let coarse = x.arb(p1);
            let fine = x.arb(p1 + extra);
            prop_assert!(coarse.contains(&fine));
            prop_assert!(fine.rel_accuracy_bits() >= (p1 + extra) as i64);
        }
    }
}
