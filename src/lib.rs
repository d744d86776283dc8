// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information

pub mod arb;
pub mod arf;
pub mod config;
pub mod element;
pub mod error;
pub mod expr;
pub mod module;
pub mod number_field;
pub mod polynomial;
pub mod prelude;
pub mod real_number;
pub mod registry;
pub mod ring;
pub mod serialization;
pub mod util;
