// harvesthub/core/src/model/product.rs

use super::money::Money;
use super::unit::StockUnit;
use crate::error::{CommerceError, CommerceResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

pub const MAX_IMAGES: usize = 4;

/// Highest unit price the catalog accepts: 10 lakh rupees.
pub const MAX_PRICE: Money = Money::from_minor(100_000_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
  Leafy,
  Root,
  Fruit,
  Squash,
  Fungi,
  Vegetable,
  Other,
}

impl Category {
  pub const ALL: [Category; 7] = [
    Category::Leafy,
    Category::Root,
    Category::Fruit,
    Category::Squash,
    Category::Fungi,
    Category::Vegetable,
    Category::Other,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Category::Leafy => "Leafy",
      Category::Root => "Root",
      Category::Fruit => "Fruit",
      Category::Squash => "Squash",
      Category::Fungi => "Fungi",
      Category::Vegetable => "Vegetable",
      Category::Other => "Other",
    }
  }
}

impl std::fmt::Display for Category {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Category {
  type Err = CommerceError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Category::ALL
      .into_iter()
      .find(|c| c.as_str() == s)
      .ok_or_else(|| CommerceError::Validation(format!("Unknown category '{}'", s)))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub description: String,
  pub short_description: Option<String>,
  pub price: Money,
  pub category: Category,
  pub images: Vec<String>,
  /// Held in the unit reported by [`StockUnit::stock_label`].
  pub stock: f64,
  pub pack_size: f64,
  pub unit: StockUnit,
  pub rating: f64,
  pub num_reviews: i32,
  pub is_organic: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Product {
  pub fn primary_image(&self) -> &str {
    self.images.first().map(String::as_str).unwrap_or_default()
  }

  pub fn validate(&self) -> CommerceResult<()> {
    if self.name.trim().is_empty() {
      return Err(CommerceError::Validation("Product name is required".to_string()));
    }
    if self.price.is_negative() {
      return Err(CommerceError::Validation("Price cannot be negative".to_string()));
    }
    if self.price > MAX_PRICE {
      return Err(CommerceError::Validation(format!("Price cannot exceed {}", MAX_PRICE)));
    }
    if !self.stock.is_finite() || self.stock < 0.0 {
      return Err(CommerceError::Validation("Stock cannot be negative".to_string()));
    }
    if !self.pack_size.is_finite() || self.pack_size <= 0.0 {
      return Err(CommerceError::Validation("Pack size must be greater than zero".to_string()));
    }
    if !(0.0..=5.0).contains(&self.rating) {
      return Err(CommerceError::Validation("Rating must be between 0 and 5".to_string()));
    }
    if self.images.is_empty() || self.images.len() > MAX_IMAGES {
      return Err(CommerceError::Validation(format!(
        "A product needs between 1 and {} images",
        MAX_IMAGES
      )));
    }
    Ok(())
  }
}

fn clean_images(images: Vec<String>) -> Vec<String> {
  images
    .into_iter()
    .map(|url| url.trim().to_string())
    .filter(|url| !url.is_empty())
    .collect()
}

fn default_pack_size() -> f64 {
  1.0
}

fn default_rating() -> f64 {
  5.0
}

/// Payload for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub short_description: Option<String>,
  pub price: Money,
  pub category: Category,
  #[serde(default)]
  pub images: Vec<String>,
  #[serde(default)]
  pub stock: f64,
  #[serde(default = "default_pack_size")]
  pub pack_size: f64,
  #[serde(default)]
  pub unit: StockUnit,
  #[serde(default = "default_rating")]
  pub rating: f64,
  #[serde(default)]
  pub num_reviews: i32,
  #[serde(default)]
  pub is_organic: bool,
}

impl ProductDraft {
  pub fn into_product(self, now: DateTime<Utc>) -> CommerceResult<Product> {
    let product = Product {
      id: Uuid::new_v4(),
      name: self.name.trim().to_string(),
      description: self.description,
      short_description: self.short_description,
      price: self.price,
      category: self.category,
      images: clean_images(self.images),
      stock: self.stock,
      pack_size: self.pack_size,
      unit: self.unit,
      rating: self.rating,
      num_reviews: self.num_reviews,
      is_organic: self.is_organic,
      created_at: now,
      updated_at: now,
    };
    product.validate()?;
    Ok(product)
  }
}

/// Partial update. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
  pub name: Option<String>,
  pub description: Option<String>,
  pub short_description: Option<String>,
  pub price: Option<Money>,
  pub category: Option<Category>,
  pub images: Option<Vec<String>>,
  pub stock: Option<f64>,
  pub pack_size: Option<f64>,
  pub unit: Option<StockUnit>,
  pub rating: Option<f64>,
  pub num_reviews: Option<i32>,
  pub is_organic: Option<bool>,
}

impl ProductPatch {
  /// Applies the patch onto a copy of `current` and validates the result.
  pub fn apply(self, current: &Product, now: DateTime<Utc>) -> CommerceResult<Product> {
    let mut next = current.clone();
    if let Some(name) = self.name {
      next.name = name.trim().to_string();
    }
    if let Some(description) = self.description {
      next.description = description;
    }
    if let Some(short_description) = self.short_description {
      next.short_description = Some(short_description);
    }
    if let Some(price) = self.price {
      next.price = price;
    }
    if let Some(category) = self.category {
      next.category = category;
    }
    if let Some(images) = self.images {
      next.images = clean_images(images);
    }
    if let Some(stock) = self.stock {
      next.stock = stock;
    }
    if let Some(pack_size) = self.pack_size {
      next.pack_size = pack_size;
    }
    if let Some(unit) = self.unit {
      next.unit = unit;
    }
    if let Some(rating) = self.rating {
      next.rating = rating;
    }
    if let Some(num_reviews) = self.num_reviews {
      next.num_reviews = num_reviews;
    }
    if let Some(is_organic) = self.is_organic {
      next.is_organic = is_organic;
    }
    next.updated_at = now;
    next.validate()?;
    Ok(next)
  }
}
