//! Severity classification: impact × likelihood → priority band.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::trigger::{ImpactLevel, LikelihoodLevel};

/// Priority band, `P0` most urgent.
///
/// The derived ordering follows declaration order, so `P0 < P4`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
pub enum SeverityPriority {
  P0,
  P1,
  P2,
  P3,
  P4,
}

impl SeverityPriority {
  /// `true` if `self` demands attention sooner than `other`.
  pub fn is_more_urgent_than(self, other: SeverityPriority) -> bool { self < other }

  /// P0 and P1 reports block handoffs while active.
  pub fn is_blocking(self) -> bool { self <= SeverityPriority::P1 }
}

/// Look up the priority band for an impact/likelihood pair.
///
/// Total: any pair outside the table (an unrecognised level) maps to `P4`.
pub fn classify(impact: ImpactLevel, likelihood: LikelihoodLevel) -> SeverityPriority {
  use ImpactLevel as I;
  use LikelihoodLevel as L;
  use SeverityPriority::*;

  match (impact, likelihood) {
    (I::Critical, L::Frequent | L::Occasional) => P0,
    (I::Critical, L::Rare) => P1,
    (I::Critical, L::Unlikely) => P2,

    (I::High, L::Frequent) => P0,
    (I::High, L::Occasional) => P1,
    (I::High, L::Rare) => P2,
    (I::High, L::Unlikely) => P3,

    (I::Medium, L::Frequent) => P1,
    (I::Medium, L::Occasional) => P2,
    (I::Medium, L::Rare) => P3,
    (I::Medium, L::Unlikely) => P4,

    (I::Low, L::Frequent) => P2,
    (I::Low, L::Occasional) => P3,
    (I::Low, L::Rare | L::Unlikely) => P4,

    (I::Unknown, _) | (_, L::Unknown) => P4,
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn matrix_matches_table() {
    use ImpactLevel as I;
    use LikelihoodLevel as L;
    use SeverityPriority::*;

    let expected = [
      (I::Critical, [P0, P0, P1, P2]),
      (I::High, [P0, P1, P2, P3]),
      (I::Medium, [P1, P2, P3, P4]),
      (I::Low, [P2, P3, P4, P4]),
    ];
    let columns = [L::Frequent, L::Occasional, L::Rare, L::Unlikely];

    for (impact, row) in expected {
      for (likelihood, want) in columns.into_iter().zip(row) {
        assert_eq!(classify(impact, likelihood), want, "{impact} × {likelihood}");
      }
    }
  }

  #[test]
  fn total_over_every_pair() {
    for impact in ImpactLevel::iter() {
      for likelihood in LikelihoodLevel::iter() {
        let p = classify(impact, likelihood);
        assert!(SeverityPriority::iter().any(|q| q == p));
      }
    }
  }

  #[test]
  fn unrecognised_levels_default_to_p4() {
    assert_eq!(
      classify(ImpactLevel::Unknown, LikelihoodLevel::Frequent),
      SeverityPriority::P4
    );
    assert_eq!(
      classify(ImpactLevel::Critical, LikelihoodLevel::Unknown),
      SeverityPriority::P4
    );
  }

  #[test]
  fn critical_rare_outranks_high_rare() {
    let critical = classify(ImpactLevel::Critical, LikelihoodLevel::Rare);
    let high = classify(ImpactLevel::High, LikelihoodLevel::Rare);
    assert!(critical.is_more_urgent_than(high));
  }

  #[test]
  fn blocking_bands() {
    assert!(SeverityPriority::P0.is_blocking());
    assert!(SeverityPriority::P1.is_blocking());
    assert!(!SeverityPriority::P2.is_blocking());
  }
}
