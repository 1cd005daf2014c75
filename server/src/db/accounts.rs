// harvesthub/server/src/db/accounts.rs

use super::rows::{classify, AccountRow, ACCOUNT_COLUMNS};
use super::PgStore;
use async_trait::async_trait;
use harvesthub_core::model::{Account, SavedAddress};
use harvesthub_core::{AccountStore, StoreResult};
use sqlx::types::Json;
use uuid::Uuid;

impl PgStore {
  async fn account_where(&self, clause: &str, value: &str) -> StoreResult<Option<Account>> {
    let row: Option<AccountRow> = sqlx::query_as(&format!("SELECT {} FROM accounts WHERE {} = $1", ACCOUNT_COLUMNS, clause))
      .bind(value)
      .fetch_optional(&self.pool)
      .await
      .map_err(classify)?;
    row.map(Account::try_from).transpose()
  }
}

#[async_trait]
impl AccountStore for PgStore {
  async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
    let row: Option<AccountRow> = sqlx::query_as(&format!("SELECT {} FROM accounts WHERE id = $1", ACCOUNT_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await
      .map_err(classify)?;
    row.map(Account::try_from).transpose()
  }

  async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
    self.account_where("email", email).await
  }

  async fn find_account_by_external_id(&self, external_id: &str) -> StoreResult<Option<Account>> {
    self.account_where("google_id", external_id).await
  }

  async fn insert_account(&self, account: &Account) -> StoreResult<()> {
    sqlx::query(
      "INSERT INTO accounts (id, name, email, password_hash, google_id, profile_pic, role, phone, address, \
       refresh_token, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(account.id)
    .bind(&account.name)
    .bind(&account.email)
    .bind(&account.password_hash)
    .bind(&account.external_id)
    .bind(&account.profile_pic)
    .bind(account.role.as_str())
    .bind(&account.phone)
    .bind(account.address.as_ref().map(Json))
    .bind(&account.refresh_token)
    .bind(account.created_at)
    .bind(account.updated_at)
    .execute(&self.pool)
    .await
    .map_err(classify)?;
    Ok(())
  }

  async fn link_external_identity(&self, id: Uuid, external_id: &str, profile_pic: Option<&str>) -> StoreResult<bool> {
    let result = sqlx::query(
      "UPDATE accounts SET google_id = $2, profile_pic = COALESCE($3, profile_pic), updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(external_id)
    .bind(profile_pic)
    .execute(&self.pool)
    .await
    .map_err(classify)?;
    Ok(result.rows_affected() > 0)
  }

  async fn set_refresh_token(&self, id: Uuid, token: Option<&str>) -> StoreResult<bool> {
    let result = sqlx::query("UPDATE accounts SET refresh_token = $2, updated_at = NOW() WHERE id = $1")
      .bind(id)
      .bind(token)
      .execute(&self.pool)
      .await
      .map_err(classify)?;
    Ok(result.rows_affected() > 0)
  }

  async fn save_contact_details(&self, id: Uuid, address: &SavedAddress, phone: Option<&str>) -> StoreResult<bool> {
    let result = sqlx::query(
      "UPDATE accounts SET address = $2, phone = COALESCE($3, phone), updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(Json(address))
    .bind(phone)
    .execute(&self.pool)
    .await
    .map_err(classify)?;
    Ok(result.rows_affected() > 0)
  }

  async fn count_customers(&self) -> StoreResult<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE role = 'user'")
      .fetch_one(&self.pool)
      .await
      .map_err(classify)
  }
}
