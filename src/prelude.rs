// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information
pub use crate::{
    arb::Arb,
    arf::{Arf, Round},
    config::PrecisionPolicy,
    element::Element,
    error::{ConstructionError, Error},
    module::{number_field_module, qq_module, zz_module, Module, NumberFieldModule, QQModule, ZZModule},
    number_field::{NumberField, NumberFieldElement},
    real_number::RealNumber,
    registry::Registry,
    ring::{CoefficientRing, IntegerRing, RationalField},
    serialization::ArchiveRing,
    util::Sign,
};
pub use num_traits::{One as _, Signed as _, Zero as _};
