// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

use crate::element::Element;
use crate::error::{ConstructionError, Error, Result};
use crate::number_field::NumberField;
use crate::real_number::RealNumber;
use crate::registry::Registry;
use crate::ring::{CoefficientRing, IntegerRing, RationalField};
use crate::util::DebugAsDisplay;
use num_traits::Zero;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

struct ModuleData<R: CoefficientRing> {
    ring: R,
    basis: Vec<RealNumber>,
    registry: Registry,
}

pub struct Module<R: CoefficientRing>(Arc<ModuleData<R>>);

pub type ZZModule = Module<IntegerRing>;
pub type QQModule = Module<RationalField>;
pub type NumberFieldModule = Module<NumberField>;

impl<R: CoefficientRing> Clone for Module<R> {
    fn clone(&self) -> Self {
        Module(self.0.clone())
    }
}

impl<R: CoefficientRing> Module<R> {
    /// sorts `basis` in deglex order and interns the module
    pub fn make(mut basis: Vec<RealNumber>, ring: R, registry: &Registry) -> Result<Self> {
        if basis.iter().any(|gen| !gen.registry().ptr_eq(registry)) {
            return Err(Error::from(ConstructionError::ForeignRegistry));
        }
        if basis.iter().filter(|gen| gen.is_rational()).count() > 1 {
            return Err(Error::from(ConstructionError::TwoRationalGenerators));
        }
        basis.sort_by(|lhs, rhs| lhs.deglex(rhs));
        if basis.windows(2).any(|pair| pair[0].ptr_eq(&pair[1])) {
            return Err(Error::from(ConstructionError::DuplicateGenerator));
        }
        let key = (
            ring.clone(),
            basis.iter().map(RealNumber::id).collect::<Vec<u64>>(),
        );
        Ok(Module(registry.intern(key, || {
            tracing::trace!(ring = %ring, rank = basis.len(), "created module");
            Arc::new(ModuleData {
                ring,
                basis,
                registry: registry.clone(),
            })
        })))
    }
    pub fn ring(&self) -> &R {
        &self.0.ring
    }
    pub fn basis(&self) -> &[RealNumber] {
        &self.0.basis
    }
    pub fn rank(&self) -> usize {
        self.0.basis.len()
    }
    pub fn registry(&self) -> &Registry {
        &self.0.registry
    }
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    pub fn index_of(&self, gen: &RealNumber) -> Option<usize> {
        self.basis().iter().position(|candidate| candidate.ptr_eq(gen))
    }
    /// panics if `index >= self.rank()`
    pub fn gen(&self, index: usize) -> Element<R> {
        assert!(index < self.rank(), "generator index out of range");
        let ring = self.ring();
        let coefficients = (0..self.rank())
            .map(|i| if i == index { ring.one() } else { ring.zero() })
            .collect();
        Element::from_parts(self.clone(), coefficients)
    }
    pub fn zero(&self) -> Element<R> {
        let coefficients = vec![self.ring().zero(); self.rank()];
        Element::from_parts(self.clone(), coefficients)
    }
    /// the element 1, only available if some multiple of the rational
    /// generator by a ring element is 1
    pub fn one(&self) -> Result<Element<R>> {
        for (index, gen) in self.basis().iter().enumerate() {
            match gen.rational_value() {
                Some(value) if !value.is_zero() => {
                    let coefficient = self.ring().from_rational(&value.recip())?;
                    let mut coefficients = vec![self.ring().zero(); self.rank()];
                    coefficients[index] = coefficient;
                    return Ok(Element::from_parts(self.clone(), coefficients));
                }
                _ => {}
            }
        }
        Err(Error::NotRepresentable)
    }
    pub fn with_ring(&self, ring: R) -> Result<Self> {
        if *self.ring() == ring {
            return Ok(self.clone());
        }
        Self::make(self.basis().to_vec(), ring, self.registry())
    }
    pub fn is_submodule_of(&self, other: &Self) -> bool {
        self.basis()
            .iter()
            .all(|gen| other.index_of(gen).is_some())
    }
    /// the smallest module containing both modules, over the compositum of
    /// their rings
    pub fn span(lhs: &Self, rhs: &Self) -> Result<Self> {
        if !lhs.registry().ptr_eq(rhs.registry()) {
            return Err(Error::from(ConstructionError::ForeignRegistry));
        }
        if lhs.rank() == 0 {
            return Ok(rhs.clone());
        }
        if rhs.rank() == 0 {
            return Ok(lhs.clone());
        }
        if lhs.ring() != rhs.ring() {
            let ring = lhs.ring().compositum(rhs.ring())?;
            let lhs = lhs.with_ring(ring.clone())?;
            let rhs = rhs.with_ring(ring)?;
            return Self::span(&lhs, &rhs);
        }
        if rhs.is_submodule_of(lhs) {
            return Ok(lhs.clone());
        }
        if lhs.is_submodule_of(rhs) {
            return Ok(rhs.clone());
        }
        let mut basis = lhs.basis().to_vec();
        basis.extend(
            rhs.basis()
                .iter()
                .filter(|gen| lhs.index_of(gen).is_none())
                .cloned(),
        );
        Self::make(basis, lhs.ring().clone(), lhs.registry())
    }
}

impl<R: CoefficientRing + Default> Module<R> {
    pub fn new(basis: Vec<RealNumber>, registry: &Registry) -> Result<Self> {
        Self::make(basis, R::default(), registry)
    }
}

pub fn zz_module(registry: &Registry, gens: Vec<RealNumber>) -> Result<ZZModule> {
    Module::make(gens, IntegerRing, registry)
}

pub fn qq_module(registry: &Registry, gens: Vec<RealNumber>) -> Result<QQModule> {
    Module::make(gens, RationalField, registry)
}

pub fn number_field_module(
    field: &NumberField,
    registry: &Registry,
    gens: Vec<RealNumber>,
) -> Result<NumberFieldModule> {
    Module::make(gens, field.clone(), registry)
}

impl<R: CoefficientRing> PartialEq for Module<R> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<R: CoefficientRing> Eq for Module<R> {}

impl<R: CoefficientRing> Hash for Module<R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ring().hash(state);
        for gen in self.basis() {
            gen.id().hash(state);
        }
    }
}

impl<R: CoefficientRing> fmt::Display for Module<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-Module(", self.ring().symbol())?;
        for (index, gen) in self.basis().iter().enumerate() {
            if index != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", gen)?;
        }
        write!(f, ")")
    }
}

impl<R: CoefficientRing> fmt::Debug for Module<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Module")
            .field(&DebugAsDisplay(self))
            .finish()
    }
}
