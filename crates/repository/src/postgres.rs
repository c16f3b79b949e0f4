use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CategoryId, Money, ProductId, PromoId, SubcategoryId, UserId};
use futures_util::stream;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Category, CatalogRepository, NewUser, OrderLedger, OrderRecord, Product, Promo,
    PromoRepository, RefundRecord, Registration, Result, Subcategory, UserBatchStream,
    UserRepository,
};

/// PostgreSQL-backed catalog, user and promo repository.
///
/// Reads the tables maintained by the admin panel.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            unit_price: Money::new(row.try_get::<Decimal, _>("price")?),
            image: row.try_get("image")?,
        })
    }

    fn row_to_promo(row: PgRow) -> Result<Promo> {
        Ok(Promo {
            id: PromoId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            text: row.try_get("text")?,
            cover: row.try_get("cover")?,
            link: row.try_get("link")?,
            link_label: row.try_get("text_link")?,
            start_time: row.try_get("start_time")?,
            active: row.try_get("active")?,
            last_succeeded_at: row.try_get("last_succeeded_at")?,
        })
    }
}

#[async_trait]
impl CatalogRepository for PostgresRepository {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Category {
                    id: CategoryId::new(row.try_get("id")?),
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn list_subcategories(&self, category_id: CategoryId) -> Result<Vec<Subcategory>> {
        let rows = sqlx::query(
            "SELECT id, name, category_id FROM subcategories WHERE category_id = $1 ORDER BY name, id",
        )
        .bind(category_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(Subcategory {
                    id: SubcategoryId::new(row.try_get("id")?),
                    category_id: CategoryId::new(row.try_get("category_id")?),
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn list_products(&self, subcategory_id: SubcategoryId) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price, image
            FROM products
            WHERE subcategory_id = $1
            ORDER BY name, id
            "#,
        )
        .bind(subcategory_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, name, description, price, image FROM products WHERE id = $1",
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }
}

#[async_trait]
impl UserRepository for PostgresRepository {
    #[tracing::instrument(skip(self, user), fields(user_id = %user.id))]
    async fn register_user(&self, user: NewUser) -> Result<Registration> {
        let result = sqlx::query(
            r#"
            INSERT INTO bot_users (id, first_name, username, is_admin, is_staff)
            VALUES ($1, $2, $3, FALSE, FALSE)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(user.id.as_i64())
        .bind(&user.first_name)
        .bind(&user.username)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 0 {
            Registration::AlreadyExisted
        } else {
            Registration::Created
        })
    }

    async fn stream_users(&self, batch_size: usize) -> Result<UserBatchStream> {
        let limit = i64::try_from(batch_size.max(1)).unwrap_or(i64::MAX);
        let pool = self.pool.clone();

        // Keyset pagination: each batch starts after the last id seen.
        let batches = stream::try_unfold(Some(i64::MIN), move |after| {
            let pool = pool.clone();
            async move {
                let Some(after) = after else {
                    return Ok(None);
                };
                let ids: Vec<i64> = sqlx::query_scalar(
                    "SELECT id FROM bot_users WHERE id > $1 ORDER BY id LIMIT $2",
                )
                .bind(after)
                .bind(limit)
                .fetch_all(&pool)
                .await?;

                let Some(&last) = ids.last() else {
                    return Ok(None);
                };
                let next = if (ids.len() as i64) < limit {
                    None
                } else {
                    Some(last)
                };
                let batch = ids.into_iter().map(UserId::new).collect();
                Ok(Some((batch, next)))
            }
        });

        Ok(Box::pin(batches))
    }
}

#[async_trait]
impl PromoRepository for PostgresRepository {
    async fn find_eligible_promo(&self, now: DateTime<Utc>) -> Result<Option<Promo>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, text, cover, text_link, link, start_time, active, last_succeeded_at
            FROM promos
            WHERE active AND start_time <= $1
            ORDER BY start_time, id
            LIMIT 1
            "#,
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_promo).transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn mark_promo_consumed(&self, promo_id: PromoId, now: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE promos SET active = FALSE, last_succeeded_at = $2 WHERE id = $1")
            .bind(promo_id.as_i64())
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// PostgreSQL-backed order ledger.
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderLedger for PostgresLedger {
    #[tracing::instrument(skip(self, record), fields(payment_reference = %record.payment_reference))]
    async fn persist_order(&self, record: OrderRecord) -> Result<()> {
        let lines = serde_json::to_value(&record.lines)?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                client_id, client_username, lines, payment_reference, paid_amount,
                currency, fio, phone, address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.client.user_id.as_i64())
        .bind(&record.client.username)
        .bind(lines)
        .bind(&record.payment_reference)
        .bind(record.paid_amount.amount())
        .bind(&record.currency)
        .bind(&record.fio)
        .bind(&record.phone)
        .bind(&record.address)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, refund), fields(payment_reference = %refund.payment_reference))]
    async fn update_order_on_refund(&self, refund: RefundRecord) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'refunded', refunded_amount = $2, updated_at = NOW()
            WHERE payment_reference = $1
            "#,
        )
        .bind(&refund.payment_reference)
        .bind(refund.refunded_amount.amount())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
