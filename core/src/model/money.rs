// harvesthub/core/src/model/money.rs

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::iter::Sum;
use std::ops::Add;

/// An amount in minor units (paise). Serialized as decimal rupees so API
/// payloads read `42.5` rather than `4250`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
  pub const ZERO: Money = Money(0);

  pub const fn from_minor(minor: i64) -> Self {
    Money(minor)
  }

  pub fn from_major(major: f64) -> Self {
    Money((major * 100.0).round() as i64)
  }

  pub const fn minor(self) -> i64 {
    self.0
  }

  pub fn major(self) -> f64 {
    self.0 as f64 / 100.0
  }

  pub const fn is_negative(self) -> bool {
    self.0 < 0
  }

  /// Basis-point share of this amount, rounded half away from zero.
  /// `None` when the share does not fit.
  pub fn basis_points(self, bps: u32) -> Option<Money> {
    let scaled = self.0 as i128 * bps as i128;
    i64::try_from((scaled + scaled.signum() * 5_000) / 10_000).ok().map(Money)
  }

  pub fn checked_add(self, rhs: Money) -> Option<Money> {
    self.0.checked_add(rhs.0).map(Money)
  }

  pub fn checked_mul(self, quantity: u32) -> Option<Money> {
    self.0.checked_mul(quantity as i64).map(Money)
  }
}

/// Saturates at the bounds; use the `checked_*` methods where an overflow
/// must be reported.
impl Add for Money {
  type Output = Money;

  fn add(self, rhs: Money) -> Money {
    Money(self.0.saturating_add(rhs.0))
  }
}

impl Sum for Money {
  fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
    iter.fold(Money::ZERO, Add::add)
  }
}

impl std::fmt::Display for Money {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let sign = if self.0 < 0 { "-" } else { "" };
    let abs = self.0.unsigned_abs();
    write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
  }
}

impl Serialize for Money {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(self.major())
  }
}

impl<'de> Deserialize<'de> for Money {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let major = f64::deserialize(deserializer)?;
    if !major.is_finite() {
      return Err(serde::de::Error::custom("amount must be a finite number"));
    }
    Ok(Money::from_major(major))
  }
}
