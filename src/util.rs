// SPDX-License-Identifier: LGPL-2.1-or-later
// See Notices.txt for copyright information
use num_traits::Zero;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Mul, Neg};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

impl Sign {
    pub fn new<T: PartialOrd + Zero>(v: &T) -> Sign {
        match v.partial_cmp(&Zero::zero()) {
            Some(Ordering::Less) => Sign::Negative,
            Some(Ordering::Greater) => Sign::Positive,
            _ => Sign::Zero,
        }
    }
    pub fn is_negative(self) -> bool {
        self == Sign::Negative
    }
    pub fn is_zero(self) -> bool {
        self == Sign::Zero
    }
    pub fn is_positive(self) -> bool {
        self == Sign::Positive
    }
}

impl Default for Sign {
    fn default() -> Sign {
        Sign::Zero
    }
}

impl From<Ordering> for Sign {
    fn from(ordering: Ordering) -> Sign {
        match ordering {
            Ordering::Less => Sign::Negative,
            Ordering::Equal => Sign::Zero,
            Ordering::Greater => Sign::Positive,
        }
    }
}

impl From<Sign> for Ordering {
    fn from(sign: Sign) -> Ordering {
        match sign {
            Sign::Negative => Ordering::Less,
            Sign::Zero => Ordering::Equal,
            Sign::Positive => Ordering::Greater,
        }
    }
}

impl Neg for Sign {
    type Output = Sign;
    fn neg(self) -> Sign {
        match self {
            Sign::Negative => Sign::Positive,
            Sign::Zero => Sign::Zero,
            Sign::Positive => Sign::Negative,
        }
    }
}

impl Mul for Sign {
    type Output = Sign;
    fn mul(self, rhs: Sign) -> Sign {
        match (self, rhs) {
            (Sign::Zero, _) | (_, Sign::Zero) => Sign::Zero,
            (l, r) if l == r => Sign::Positive,
            _ => Sign::Negative,
        }
    }
}

impl PartialOrd for Sign {
    fn partial_cmp(&self, rhs: &Sign) -> Option<Ordering> {
        Some(self.cmp(rhs))
    }
}

impl Ord for Sign {
    fn cmp(&self, rhs: &Sign) -> Ordering {
        Ordering::from(*self).cmp(&Ordering::from(*rhs))
    }
}

fn strip_fraction_zeros(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}

/// formats `value` like C's `%g`: six significant digits, trailing zeros removed,
/// scientific notation for very small or very large magnitudes.
pub fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.into();
    }
    if value == 0.0 {
        return "0".into();
    }
    let scientific = format!("{:.5e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };
    if exponent < -4 || exponent >= 6 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_fraction_zeros(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let fixed = format!("{:.*}", (5 - exponent) as usize, value);
        strip_fraction_zeros(&fixed).into()
    }
}

/// the smallest double greater than the finite `value`.
pub(crate) fn next_up(value: f64) -> f64 {
    if value == 0.0 {
        f64::from_bits(1)
    } else if value > 0.0 {
        f64::from_bits(value.to_bits() + 1)
    } else {
        f64::from_bits(value.to_bits() - 1)
    }
}

/// the largest double less than the finite `value`.
pub(crate) fn next_down(value: f64) -> f64 {
    -next_up(-value)
}

/// ceil(log2(value)) for value >= 1
pub(crate) fn ceil_log2(value: u64) -> u64 {
    if value <= 1 {
        0
    } else {
        64 - u64::from((value - 1).leading_zeros())
    }
}

pub(crate) struct DebugAsDisplay<T>(pub T);

impl<T: fmt::Display> fmt::Debug for DebugAsDisplay<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}
