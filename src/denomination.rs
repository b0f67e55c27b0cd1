use std::collections::HashMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoinError;

/// Exact monetary amount, stored in hundredths of the currency unit.
///
/// Summing many coins never drifts: values are integers until they are
/// rendered with [`fmt::Display`], which always prints two decimal places.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "AmountRepr", into = "String")]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_hundredths(hundredths: u64) -> Self {
        Self(hundredths)
    }

    pub const fn from_units(units: u64) -> Self {
        Self(units * 100)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for Amount {
    type Err = CoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || CoinError::Config(format!("invalid amount '{}'", s));

        let (whole, frac) = match text.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (text, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let units: u64 = whole.parse().map_err(|_| invalid())?;
        let cents = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| invalid())? * 10,
            _ => frac.parse::<u64>().map_err(|_| invalid())?,
        };

        units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .map(Amount)
            .ok_or_else(invalid)
    }
}

/// Config files may write amounts either as `5` / `0.5` or as `"5.00"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<AmountRepr> for Amount {
    type Error = CoinError;

    fn try_from(repr: AmountRepr) -> Result<Self, Self::Error> {
        match repr {
            AmountRepr::Text(text) => text.parse(),
            AmountRepr::Number(value) => {
                if !value.is_finite() || value < 0.0 {
                    return Err(CoinError::Config(format!("invalid amount {}", value)));
                }
                let scaled = value * 100.0;
                let rounded = scaled.round();
                if (scaled - rounded).abs() > 1e-6 || rounded > u64::MAX as f64 {
                    return Err(CoinError::Config(format!(
                        "amount {} has more than two decimal places",
                        value
                    )));
                }
                Ok(Amount(rounded as u64))
            }
        }
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.to_string()
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

/// The only labels that can carry a value.
pub const COIN_LABELS: [&str; 5] = ["one", "two", "five", "ten", "twenty"];

/// Largest value a single coin may be configured with. Keeps running totals
/// far from `u64` overflow for any realistic number of coins.
pub const MAX_COIN_VALUE: Amount = Amount::from_units(1_000_000_000);

/// Monetary value of every coin label the detector can emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DenominationTable {
    values: HashMap<String, Amount>,
}

impl DenominationTable {
    pub fn new(values: HashMap<String, Amount>) -> Self {
        Self { values }
    }

    /// Value of `label`, or `None` when it is not a coin.
    pub fn value_of(&self, label: &str) -> Option<Amount> {
        self.values.get(label).copied()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.values.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Amount)> {
        self.values.iter().map(|(label, value)| (label.as_str(), *value))
    }
}

impl Default for DenominationTable {
    /// Indian rupee coins.
    fn default() -> Self {
        let values = COIN_LABELS
            .into_iter()
            .zip([1, 2, 5, 10, 20].map(Amount::from_units))
            .map(|(label, value)| (label.to_string(), value))
            .collect();

        Self { values }
    }
}

impl<S: Into<String>> FromIterator<(S, Amount)> for DenominationTable {
    fn from_iter<I: IntoIterator<Item = (S, Amount)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
