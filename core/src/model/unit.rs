// harvesthub/core/src/model/unit.rs

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How a product is sold. Stock for `kg` and `g` products is held in
/// kilograms; stock for `pieces` products is a piece count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockUnit {
  #[serde(rename = "kg")]
  Kg,
  #[serde(rename = "g")]
  G,
  #[serde(rename = "pieces")]
  Pieces,
}

impl StockUnit {
  /// Stock consumed by `quantity` packs of `pack_size`, in the unit the
  /// product's stock is held in.
  pub fn to_stock_units(self, quantity: u32, pack_size: f64) -> f64 {
    let sold = quantity as f64 * pack_size;
    let converted = match self {
      StockUnit::Kg => sold,
      StockUnit::G => sold / 1000.0,
      StockUnit::Pieces => sold,
    };
    settle(converted)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      StockUnit::Kg => "kg",
      StockUnit::G => "g",
      StockUnit::Pieces => "pieces",
    }
  }

  /// Unit the stock figure is expressed in.
  pub fn stock_label(self) -> &'static str {
    match self {
      StockUnit::Kg | StockUnit::G => "kg",
      StockUnit::Pieces => "pieces",
    }
  }
}

impl Default for StockUnit {
  fn default() -> Self {
    StockUnit::Kg
  }
}

impl std::fmt::Display for StockUnit {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for StockUnit {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "kg" => Ok(StockUnit::Kg),
      "g" => Ok(StockUnit::G),
      "pieces" => Ok(StockUnit::Pieces),
      other => Err(format!("Unknown unit '{}'", other)),
    }
  }
}

/// Rounds a stock quantity to micro-units so repeated take/return cycles
/// land back on the starting figure.
pub fn settle(amount: f64) -> f64 {
  (amount * 1_000_000.0).round() / 1_000_000.0
}
