// harvesthub/server/src/db/catalog.rs

use super::rows::{classify, ProductRow, PRODUCT_COLUMNS};
use super::PgStore;
use async_trait::async_trait;
use harvesthub_core::model::Product;
use harvesthub_core::{CatalogStore, ProductQuery, SortOrder, StockTake, StoreResult};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, instrument};
use uuid::Uuid;

fn order_clause(sort: SortOrder) -> &'static str {
  match sort {
    SortOrder::Newest => " ORDER BY created_at DESC, id",
    SortOrder::Oldest => " ORDER BY created_at ASC, id",
    SortOrder::PriceAsc => " ORDER BY price_minor ASC, id",
    SortOrder::PriceDesc => " ORDER BY price_minor DESC, id",
    SortOrder::Rating => " ORDER BY rating DESC, id",
  }
}

/// Escapes `LIKE` wildcards so the keyword is matched literally.
fn like_pattern(keyword: &str) -> String {
  let escaped = keyword.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
  format!("%{}%", escaped)
}

#[async_trait]
impl CatalogStore for PgStore {
  #[instrument(name = "pg::search_products", skip(self))]
  async fn search_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {} FROM products WHERE TRUE", PRODUCT_COLUMNS));
    if let Some(keyword) = &query.keyword {
      builder.push(" AND name ILIKE ").push_bind(like_pattern(keyword));
    }
    if let Some(category) = query.category {
      builder.push(" AND category = ").push_bind(category.as_str());
    }
    if let Some(min) = query.price_min {
      builder.push(" AND price_minor >= ").push_bind(min.minor());
    }
    if let Some(max) = query.price_max {
      builder.push(" AND price_minor <= ").push_bind(max.minor());
    }
    builder.push(order_clause(query.sort));

    let rows: Vec<ProductRow> = builder
      .build_query_as()
      .fetch_all(&self.pool)
      .await
      .map_err(classify)?;
    debug!(count = rows.len(), "Products fetched.");
    rows.into_iter().map(Product::try_from).collect()
  }

  async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
    let row: Option<ProductRow> = sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(classify)?;
    row.map(Product::try_from).transpose()
  }

  async fn insert_product(&self, product: &Product) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO products (id, name, description, short_description, price_minor, category, images, stock, \
       pack_size, unit, rating, num_reviews, is_organic, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.short_description)
    .bind(product.price.minor())
    .bind(product.category.as_str())
    .bind(Json(&product.images))
    .bind(product.stock)
    .bind(product.pack_size)
    .bind(product.unit.as_str())
    .bind(product.rating)
    .bind(product.num_reviews)
    .bind(product.is_organic)
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&self.pool)
    .await
    .map_err(classify)?;
    Ok(())
  }

  async fn replace_product(&self, product: &Product, overwrite_stock: bool) -> StoreResult<bool> {
    let result = sqlx::query(
      "UPDATE products SET name = $2, description = $3, short_description = $4, price_minor = $5, category = $6, \
       images = $7, stock = CASE WHEN $8 THEN $9 ELSE stock END, pack_size = $10, unit = $11, rating = $12, \
       num_reviews = $13, is_organic = $14, updated_at = $15 WHERE id = $1",
    )
    .bind(product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(&product.short_description)
    .bind(product.price.minor())
    .bind(product.category.as_str())
    .bind(Json(&product.images))
    .bind(overwrite_stock)
    .bind(product.stock)
    .bind(product.pack_size)
    .bind(product.unit.as_str())
    .bind(product.rating)
    .bind(product.num_reviews)
    .bind(product.is_organic)
    .bind(product.updated_at)
    .execute(&self.pool)
    .await
    .map_err(classify)?;
    Ok(result.rows_affected() > 0)
  }

  async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await
      .map_err(classify)?;
    Ok(result.rows_affected() > 0)
  }

  #[instrument(name = "pg::take_stock", skip(self))]
  async fn take_stock(&self, id: Uuid, amount: f64) -> StoreResult<StockTake> {
    // Check and decrement in one statement; concurrent takers serialise on the row lock.
    let remaining: Option<f64> = sqlx::query_scalar(
      "UPDATE products SET stock = ROUND((stock - $2)::numeric, 6)::float8, updated_at = NOW() \
       WHERE id = $1 AND stock >= $2 RETURNING stock",
    )
    .bind(id)
    .bind(amount)
    .fetch_optional(&self.pool)
    .await
    .map_err(classify)?;
    if let Some(remaining) = remaining {
      return Ok(StockTake::Taken { remaining });
    }

    let available: Option<f64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(classify)?;
    Ok(match available {
      Some(available) => StockTake::Insufficient { available },
      None => StockTake::Missing,
    })
  }

  #[instrument(name = "pg::return_stock", skip(self))]
  async fn return_stock(&self, id: Uuid, amount: f64) -> StoreResult<Option<f64>> {
    sqlx::query_scalar(
      "UPDATE products SET stock = ROUND((stock + $2)::numeric, 6)::float8, updated_at = NOW() \
       WHERE id = $1 RETURNING stock",
    )
    .bind(id)
    .bind(amount)
    .fetch_optional(&self.pool)
    .await
    .map_err(classify)
  }

  async fn count_products(&self) -> StoreResult<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM products")
      .fetch_one(&self.pool)
      .await
      .map_err(classify)
  }
}
