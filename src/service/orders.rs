//! Order lifecycle: `pending -> approved | rejected`. Only pending orders change.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::AppError;
use crate::model::order::{compute_total, generate_order_number, MAX_QUANTITY};
use crate::model::{Order, OrderStatus, Role};
use crate::pagination::Pagination;
use crate::patch::Patch;

/// Attempts at drawing an unused order number.
const ORDER_NUMBER_ATTEMPTS: usize = 3;

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Order>, AppError> {
    Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

/// Price of the product's first variation by creation order.
async fn unit_price(conn: &mut PgConnection, product_id: Uuid) -> Result<Option<Decimal>, AppError> {
    let price: Option<Option<Decimal>> = sqlx::query_scalar(
        "SELECT price FROM product_variations WHERE product_id = $1 ORDER BY created_at, id LIMIT 1",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(price.flatten())
}

fn ensure_quantity(quantity: i32) -> Result<(), AppError> {
    if quantity < 1 {
        return Err(AppError::Validation("quantity must be a positive integer".into()));
    }
    if quantity > MAX_QUANTITY {
        return Err(AppError::Validation(format!("quantity must not exceed {}", MAX_QUANTITY)));
    }
    Ok(())
}

fn total_for(unit_price: Option<Decimal>, quantity: i32) -> Result<Decimal, AppError> {
    compute_total(unit_price, quantity)
        .ok_or_else(|| AppError::Validation("order total exceeds the maximum amount".into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Defaults to the caller.
    pub user_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Places a pending order for `user_id`, who must be an existing store owner.
pub async fn create(pool: &PgPool, user_id: Uuid, input: NewOrder) -> Result<Order, AppError> {
    ensure_quantity(input.quantity)?;
    let mut conn = pool.acquire().await?;

    let product: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1")
        .bind(input.product_id)
        .fetch_optional(&mut *conn)
        .await?;
    if product.is_none() {
        return Err(AppError::NotFound("product".into()));
    }
    let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1 AND status = 'active'")
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;
    match role {
        None => return Err(AppError::NotFound("user".into())),
        Some(r) if r != Role::StoreOwner.as_str() => {
            return Err(AppError::Validation("orders can only be placed for store owners".into()));
        }
        Some(_) => {}
    }

    let total = total_for(unit_price(&mut conn, input.product_id).await?, input.quantity)?;
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (order_number, product_id, user_id, quantity, total_amount, status, notes)
            VALUES ($1, $2, $3, $4, $5, 'pending', $6)
            RETURNING *
            "#,
        )
        .bind(generate_order_number())
        .bind(input.product_id)
        .bind(user_id)
        .bind(input.quantity)
        .bind(total)
        .bind(&input.notes)
        .fetch_one(&mut *conn)
        .await;
        match result {
            Ok(order) => {
                tracing::info!(order_id = %order.id, order_number = %order.order_number, "order created");
                return Ok(order);
            }
            Err(sqlx::Error::Database(db))
                if db.is_unique_violation()
                    && db.constraint() == Some("orders_order_number_key")
                    && attempt < ORDER_NUMBER_ATTEMPTS =>
            {
                tracing::debug!(attempt, "order number taken, drawing another");
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Why a guarded transition matched nothing: the order is missing or no longer pending.
async fn transition_failure(pool: &PgPool, id: Uuid) -> AppError {
    match find(pool, id).await {
        Ok(Some(order)) => AppError::InvalidState(format!("order is already {}", order.status.as_str())),
        Ok(None) => AppError::NotFound("order".into()),
        Err(e) => e,
    }
}

pub async fn approve(pool: &PgPool, id: Uuid, admin_id: Uuid) -> Result<Order, AppError> {
    let updated = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET status = 'approved', approved_by = $2, approved_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(admin_id)
    .fetch_optional(pool)
    .await?;
    match updated {
        Some(order) => {
            tracing::info!(order_id = %id, admin_id = %admin_id, "order approved");
            Ok(order)
        }
        None => Err(transition_failure(pool, id).await),
    }
}

pub async fn reject(pool: &PgPool, id: Uuid, admin_id: Uuid, admin_notes: Option<String>) -> Result<Order, AppError> {
    let updated = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET status = 'rejected', admin_notes = COALESCE($3, admin_notes),
            approved_by = $2, approved_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(admin_id)
    .bind(admin_notes)
    .fetch_optional(pool)
    .await?;
    match updated {
        Some(order) => {
            tracing::info!(order_id = %id, admin_id = %admin_id, "order rejected");
            Ok(order)
        }
        None => Err(transition_failure(pool, id).await),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    #[serde(default)]
    pub quantity: Patch<i32>,
    #[serde(default)]
    pub notes: Patch<String>,
}

async fn lock_pending(conn: &mut PgConnection, id: Uuid) -> Result<Option<Order>, AppError> {
    let Some(order) = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };
    if order.status != OrderStatus::Pending {
        return Err(AppError::InvalidState(format!("order is already {}", order.status.as_str())));
    }
    Ok(Some(order))
}

/// Changes quantity or notes of a pending order; the total follows the quantity.
pub async fn update(pool: &PgPool, id: Uuid, patch: OrderPatch) -> Result<Option<Order>, AppError> {
    let mut tx = pool.begin().await?;
    let Some(current) = lock_pending(&mut tx, id).await? else {
        return Ok(None);
    };
    let quantity = patch.quantity.apply_required(current.quantity, "quantity")?;
    ensure_quantity(quantity)?;
    let total = if quantity == current.quantity {
        current.total_amount
    } else {
        let price = match current.product_id {
            Some(product_id) => unit_price(&mut tx, product_id).await?,
            None => Some(current.total_amount / Decimal::from(current.quantity)),
        };
        total_for(price, quantity)?
    };

    let order = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders SET quantity = $2, total_amount = $3, notes = $4, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(quantity)
    .bind(total)
    .bind(patch.notes.apply(current.notes))
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Some(order))
}

/// Deletes a pending order.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<Option<Order>, AppError> {
    let mut tx = pool.begin().await?;
    if lock_pending(&mut tx, id).await?.is_none() {
        return Ok(None);
    }
    let order = sqlx::query_as::<_, Order>("DELETE FROM orders WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(Some(order))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<String>,
    pub user_id: Option<Uuid>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &OrderFilter) {
    qb.push(" WHERE TRUE");
    if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND status = ").push_bind(status.to_string());
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
}

pub async fn list(pool: &PgPool, filter: &OrderFilter, page: &Pagination) -> Result<(Vec<Order>, i64), AppError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders");
    push_filters(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM orders");
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC, id LIMIT ")
        .push_bind(page.limit_i64())
        .push(" OFFSET ")
        .push_bind(page.offset());
    let rows = qb.build_query_as::<Order>().fetch_all(pool).await?;
    Ok((rows, total))
}
