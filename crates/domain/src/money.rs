//! USD amounts held as integer micro-dollars.
//!
//! Ledger sums must be exact (`0.01 + 0.02 + 0.06` is `0.09`, not
//! `0.09000000000000001`), so amounts never accumulate as floats. On the
//! wire an amount is a plain JSON number in dollars.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const MICROS_PER_DOLLAR: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Usd(i64);

impl Usd {
    pub const ZERO: Usd = Usd(0);

    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Round a dollar amount to the nearest micro-dollar.
    pub fn from_dollars(dollars: f64) -> Self {
        Self((dollars * MICROS_PER_DOLLAR as f64).round() as i64)
    }

    pub const fn micros(self) -> i64 {
        self.0
    }

    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / MICROS_PER_DOLLAR as f64
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Format with a fixed number of decimals and a leading `$`.
    pub fn display_with(self, decimals: usize) -> String {
        format!("${:.*}", decimals, self.as_dollars())
    }

    /// How many whole `unit`s fit into `self`. Zero when `unit` is not positive.
    pub fn whole_units_of(self, unit: Usd) -> u64 {
        if unit.0 <= 0 || self.0 <= 0 {
            return 0;
        }
        (self.0 / unit.0) as u64
    }
}

/// Two decimals, e.g. `$0.09`.
impl fmt::Display for Usd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.as_dollars())
    }
}

impl Add for Usd {
    type Output = Usd;
    fn add(self, rhs: Usd) -> Usd {
        Usd(self.0 + rhs.0)
    }
}

impl AddAssign for Usd {
    fn add_assign(&mut self, rhs: Usd) {
        self.0 += rhs.0;
    }
}

impl Sub for Usd {
    type Output = Usd;
    fn sub(self, rhs: Usd) -> Usd {
        Usd(self.0 - rhs.0)
    }
}

impl Mul<u32> for Usd {
    type Output = Usd;
    fn mul(self, rhs: u32) -> Usd {
        Usd(self.0 * rhs as i64)
    }
}

impl Sum for Usd {
    fn sum<I: Iterator<Item = Usd>>(iter: I) -> Usd {
        iter.fold(Usd::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Usd> for Usd {
    fn sum<I: Iterator<Item = &'a Usd>>(iter: I) -> Usd {
        iter.copied().sum()
    }
}

impl Serialize for Usd {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_dollars())
    }
}

impl<'de> Deserialize<'de> for Usd {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dollars = f64::deserialize(deserializer)?;
        Ok(Usd::from_dollars(dollars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_are_exact() {
        let total: Usd = [0.01, 0.02, 0.06].iter().map(|d| Usd::from_dollars(*d)).sum();
        assert_eq!(total, Usd::from_micros(90_000));
        assert_eq!(total.to_string(), "$0.09");
        assert_eq!(total.as_dollars(), 0.09);
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&Usd::from_dollars(0.03)).unwrap();
        assert_eq!(json, "0.03");
        let back: Usd = serde_json::from_str("0.06").unwrap();
        assert_eq!(back, Usd::from_micros(60_000));
    }

    #[test]
    fn whole_units() {
        let sub = Usd::from_dollars(199.0);
        assert_eq!(sub.whole_units_of(Usd::from_dollars(0.09)), 2211);
        assert_eq!(sub.whole_units_of(Usd::ZERO), 0);
    }

    #[test]
    fn display_with_decimals() {
        assert_eq!(Usd::from_dollars(198.91).display_with(4), "$198.9100");
        assert_eq!(Usd::from_dollars(199.0).display_with(0), "$199");
    }
}
