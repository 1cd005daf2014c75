// harvesthub/core/src/catalog.rs

//! Catalog browsing and admin product management.

use crate::error::{CommerceError, CommerceResult};
use crate::model::{Category, Money, Product, ProductDraft, ProductPatch, StockUnit};
use crate::store::CatalogStore;
use chrono::Utc;
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
  Newest,
  #[default]
  Oldest,
  PriceAsc,
  PriceDesc,
  /// Highest rated first.
  Rating,
}

impl FromStr for SortOrder {
  type Err = CommerceError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "newest" => Ok(SortOrder::Newest),
      "oldest" => Ok(SortOrder::Oldest),
      "price_asc" => Ok(SortOrder::PriceAsc),
      "price_desc" => Ok(SortOrder::PriceDesc),
      "rating" => Ok(SortOrder::Rating),
      other => Err(CommerceError::Validation(format!("Unknown sort order '{}'", other))),
    }
  }
}

/// Filter and ordering for a catalog listing. All filters are optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
  /// Case-insensitive substring of the product name.
  pub keyword: Option<String>,
  pub category: Option<Category>,
  pub price_min: Option<Money>,
  pub price_max: Option<Money>,
  pub sort: SortOrder,
}

impl ProductQuery {
  /// Builds a query from raw request parameters. Blank values and the
  /// category `All` mean "no filter". An unrecognised sort falls back to
  /// oldest first.
  pub fn from_params(
    keyword: Option<&str>,
    category: Option<&str>,
    price_min: Option<f64>,
    price_max: Option<f64>,
    sort: Option<&str>,
  ) -> CommerceResult<Self> {
    fn non_blank(v: Option<&str>) -> Option<&str> {
      v.map(str::trim).filter(|v| !v.is_empty())
    }
    let category = match non_blank(category) {
      None | Some("All") => None,
      Some(raw) => Some(raw.parse::<Category>()?),
    };
    let sort = non_blank(sort)
      .and_then(|raw| raw.parse::<SortOrder>().ok())
      .unwrap_or_default();
    Ok(Self {
      keyword: non_blank(keyword).map(str::to_lowercase),
      category,
      price_min: price_min.map(Money::from_major),
      price_max: price_max.map(Money::from_major),
      sort,
    })
  }

  pub fn matches(&self, product: &Product) -> bool {
    if let Some(keyword) = &self.keyword {
      if !product.name.to_lowercase().contains(&keyword.to_lowercase()) {
        return false;
      }
    }
    if let Some(category) = self.category {
      if product.category != category {
        return false;
      }
    }
    if matches!(self.price_min, Some(min) if product.price < min) {
      return false;
    }
    if matches!(self.price_max, Some(max) if product.price > max) {
      return false;
    }
    true
  }

  pub fn compare(&self, a: &Product, b: &Product) -> Ordering {
    match self.sort {
      SortOrder::Newest => b.created_at.cmp(&a.created_at),
      SortOrder::Oldest => a.created_at.cmp(&b.created_at),
      SortOrder::PriceAsc => a.price.cmp(&b.price),
      SortOrder::PriceDesc => b.price.cmp(&a.price),
      SortOrder::Rating => b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal),
    }
  }

  /// Filters and sorts an unordered product set.
  pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
    let mut hits: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
    hits.sort_by(|a, b| self.compare(a, b).then_with(|| a.id.cmp(&b.id)));
    hits
  }
}

pub struct CatalogService {
  store: Arc<dyn CatalogStore>,
}

impl CatalogService {
  pub fn new(store: Arc<dyn CatalogStore>) -> Self {
    Self { store }
  }

  #[instrument(name = "catalog::list", skip(self))]
  pub async fn list(&self, query: &ProductQuery) -> CommerceResult<Vec<Product>> {
    Ok(self.store.search_products(query).await?)
  }

  #[instrument(name = "catalog::get", skip(self))]
  pub async fn get(&self, id: Uuid) -> CommerceResult<Product> {
    self
      .store
      .find_product(id)
      .await?
      .ok_or_else(|| CommerceError::not_found("Product", id))
  }

  #[instrument(name = "catalog::create", skip(self, draft), fields(name = %draft.name))]
  pub async fn create(&self, draft: ProductDraft) -> CommerceResult<Product> {
    let product = draft.into_product(Utc::now())?;
    self.store.insert_product(&product).await?;
    info!(product_id = %product.id, "Product created.");
    Ok(product)
  }

  #[instrument(name = "catalog::update", skip(self, patch))]
  pub async fn update(&self, id: Uuid, patch: ProductPatch) -> CommerceResult<Product> {
    let current = self.get(id).await?;
    let overwrite_stock = patch.stock.is_some();
    let next = patch.apply(&current, Utc::now())?;
    if !self.store.replace_product(&next, overwrite_stock).await? {
      return Err(CommerceError::not_found("Product", id));
    }
    // Re-read so a concurrent reservation shows up in the returned stock.
    self.get(id).await
  }

  #[instrument(name = "catalog::delete", skip(self))]
  pub async fn delete(&self, id: Uuid) -> CommerceResult<()> {
    if !self.store.delete_product(id).await? {
      return Err(CommerceError::not_found("Product", id));
    }
    info!(product_id = %id, "Product removed.");
    Ok(())
  }

  /// Inserts the sample catalog. Returns the products that were added.
  #[instrument(name = "catalog::seed", skip(self))]
  pub async fn seed_samples(&self) -> CommerceResult<Vec<Product>> {
    let mut added = Vec::new();
    for draft in sample_catalog() {
      match self.create(draft).await {
        Ok(product) => added.push(product),
        Err(e) => warn!(error = %e, "Skipping sample product."),
      }
    }
    info!(count = added.len(), "Sample catalog seeded.");
    Ok(added)
  }
}

#[allow(clippy::too_many_arguments)]
fn sample(
  name: &str,
  description: &str,
  price: f64,
  category: Category,
  image: &str,
  stock: f64,
  pack_size: f64,
  unit: StockUnit,
  is_organic: bool,
) -> ProductDraft {
  ProductDraft {
    name: name.to_string(),
    description: description.to_string(),
    short_description: None,
    price: Money::from_major(price),
    category,
    images: vec![image.to_string()],
    stock,
    pack_size,
    unit,
    rating: 4.5,
    num_reviews: 0,
    is_organic,
  }
}

pub fn sample_catalog() -> Vec<ProductDraft> {
  vec![
    sample(
      "Spinach",
      "Tender green spinach leaves, harvested the same morning.",
      30.0,
      Category::Leafy,
      "https://images.unsplash.com/photo-1576045057995-568f588f82fb",
      20.0,
      250.0,
      StockUnit::G,
      true,
    ),
    sample(
      "Tomato",
      "Vine-ripened red tomatoes for salads and curries.",
      40.0,
      Category::Fruit,
      "https://images.unsplash.com/photo-1546470427-e26264be0b0d",
      50.0,
      1.0,
      StockUnit::Kg,
      false,
    ),
    sample(
      "Carrot",
      "Crunchy orange carrots with a sweet finish.",
      50.0,
      Category::Root,
      "https://images.unsplash.com/photo-1598170845058-32b9d6a5da37",
      40.0,
      0.5,
      StockUnit::Kg,
      true,
    ),
    sample(
      "Broccoli",
      "Firm green broccoli heads.",
      60.0,
      Category::Vegetable,
      "https://images.unsplash.com/photo-1459411621453-7b03977f4bfc",
      30.0,
      1.0,
      StockUnit::Pieces,
      false,
    ),
    sample(
      "Potato",
      "All-purpose potatoes for roasting, mashing and frying.",
      25.0,
      Category::Root,
      "https://images.unsplash.com/photo-1518977676601-b53f82aba655",
      100.0,
      1.0,
      StockUnit::Kg,
      false,
    ),
  ]
}
