use std::fmt;
use std::str::FromStr;

use crate::error::InvalidTarget;

/// What a harvest run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestMode {
  /// Every COMPLETE task the listing returns.
  All,
  /// One task, by id.
  Single(String),
}

impl HarvestMode {
  /// Literal that selects [`HarvestMode::All`].
  pub const ALL: &'static str = "all";
}

impl FromStr for HarvestMode {
  type Err = InvalidTarget;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if s.is_empty() {
      Err(InvalidTarget)
    } else if s == Self::ALL {
      Ok(HarvestMode::All)
    } else {
      Ok(HarvestMode::Single(s.to_string()))
    }
  }
}

impl fmt::Display for HarvestMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      HarvestMode::All => f.write_str(Self::ALL),
      HarvestMode::Single(id) => f.write_str(id),
    }
  }
}
