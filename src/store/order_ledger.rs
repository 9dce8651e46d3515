//! Orders and their line items.
//!
//! The ledger owns the total rule: `orders.total` equals Σ price × quantity of
//! its items. Creation computes the total inside the insert transaction; every
//! later item mutation is followed by `recalculate_total`.

use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::errors::{AppError, AppResult};
use crate::models::order::{
    AddOrderItemPayload, CreateOrderItem, Order, OrderItem, OrderScope, OrderStatus,
    OrderWithItems, UpdateOrderItemPayload,
};
use crate::validation::{line_total, normalize_quantity, round_cents, validate_amount};

const ORDER_COLUMNS: &str = "id, user_id, status, total, created_at";
const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, price";

#[derive(Clone)]
pub struct OrderLedger {
    db: SqlitePool,
}

impl OrderLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a pending order with one item per input line, priced from the
    /// catalog. Nothing is written unless every product resolves.
    pub async fn create_order(&self, user_id: i64, items: &[CreateOrderItem]) -> AppResult<OrderWithItems> {
        if items.is_empty() {
            return Err(AppError::validation("Items cannot be empty"));
        }

        let mut tx = self.db.begin().await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let price: Option<f64> = sqlx::query_scalar("SELECT price FROM products WHERE id = ?")
                .bind(item.product_id)
                .fetch_optional(&mut *tx)
                .await?;
            let price = price.ok_or_else(|| {
                AppError::validation(format!("Product {} not found", item.product_id))
            })?;
            lines.push((item.product_id, normalize_quantity(item.quantity.as_ref())?, price));
        }

        let total = line_total(lines.iter().map(|&(_, quantity, price)| (price, quantity)))?;

        let order_id = sqlx::query("INSERT INTO orders (user_id, status, total) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(OrderStatus::Pending.as_str())
            .bind(total)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        for (product_id, quantity, price) in &lines {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, price) VALUES (?, ?, ?, ?)",
            )
            .bind(order_id)
            .bind(product_id)
            .bind(quantity)
            .bind(price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            target: "ORDER",
            order_id,
            user_id,
            items = lines.len(),
            total,
            "Order created"
        );

        self.get_order(order_id)
            .await?
            .ok_or_else(|| AppError::Internal("created order vanished".into()))
    }

    /// Recompute `orders.total` from the items in one statement.
    pub async fn recalculate_total(&self, order_id: i64) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE orders SET total = (
                 SELECT ROUND(COALESCE(SUM(price * quantity), 0.0), 2)
                 FROM order_items WHERE order_id = ?
             )
             WHERE id = ?",
        )
        .bind(order_id)
        .bind(order_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Order {} not found", order_id)));
        }
        Ok(())
    }

    /// Best-effort recalculation after an item mutation. Failures are logged
    /// and not returned. The work runs on its own task so it still completes
    /// when the request that triggered it goes away.
    async fn refresh_total(&self, order_id: i64) {
        let ledger = self.clone();
        let task = tokio::spawn(async move { ledger.recalculate_total(order_id).await });

        let failure = match task.await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };
        tracing::warn!(target: "ORDER", order_id, error = %failure, "Failed to recalculate order total");
    }

    pub async fn find_order(&self, order_id: i64) -> AppResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(order)
    }

    pub async fn get_order(&self, order_id: i64) -> AppResult<Option<OrderWithItems>> {
        let Some(order) = self.find_order(order_id).await? else {
            return Ok(None);
        };
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY id ASC"
        ))
        .bind(order_id)
        .fetch_all(&self.db)
        .await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    /// An item together with the user owning its order.
    pub async fn find_item(&self, item_id: i64) -> AppResult<Option<(OrderItem, i64)>> {
        let Some(item) = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE id = ?"
        ))
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        else {
            return Ok(None);
        };

        let owner: Option<i64> = sqlx::query_scalar("SELECT user_id FROM orders WHERE id = ?")
            .bind(item.order_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(owner.map(|owner| (item, owner)))
    }

    /// Newest first, each with its items.
    pub async fn list_orders(&self, scope: OrderScope) -> AppResult<Vec<OrderWithItems>> {
        let (orders, items) = match scope {
            OrderScope::All => {
                let orders = sqlx::query_as::<_, Order>(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
                ))
                .fetch_all(&self.db)
                .await?;
                let items = sqlx::query_as::<_, OrderItem>(&format!(
                    "SELECT {ITEM_COLUMNS} FROM order_items ORDER BY id ASC"
                ))
                .fetch_all(&self.db)
                .await?;
                (orders, items)
            }
            OrderScope::Owner(user_id) => {
                let orders = sqlx::query_as::<_, Order>(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ?
                     ORDER BY created_at DESC, id DESC"
                ))
                .bind(user_id)
                .fetch_all(&self.db)
                .await?;
                let items = sqlx::query_as::<_, OrderItem>(
                    "SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.price
                     FROM order_items oi
                     JOIN orders o ON o.id = oi.order_id
                     WHERE o.user_id = ?
                     ORDER BY oi.id ASC",
                )
                .bind(user_id)
                .fetch_all(&self.db)
                .await?;
                (orders, items)
            }
        };

        Ok(group_items(orders, items))
    }

    /// The `limit` newest orders with items (dashboard).
    pub async fn recent_orders(&self, limit: i64) -> AppResult<Vec<OrderWithItems>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        let mut recent = Vec::with_capacity(orders.len());
        for order in orders {
            let items = sqlx::query_as::<_, OrderItem>(&format!(
                "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY id ASC"
            ))
            .bind(order.id)
            .fetch_all(&self.db)
            .await?;
            recent.push(OrderWithItems { order, items });
        }
        Ok(recent)
    }

    pub async fn update_status(&self, order_id: i64, status: OrderStatus) -> AppResult<Order> {
        let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(order_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Order not found"));
        }

        tracing::info!(target: "ORDER", order_id, status = status.as_str(), "Order status updated");

        self.find_order(order_id)
            .await?
            .ok_or_else(|| AppError::not_found("Order not found"))
    }

    /// Delete an order and its items in one transaction.
    pub async fn delete_order(&self, order_id: i64) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM order_items WHERE order_id = ?")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(order_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Order not found"));
        }

        tx.commit().await?;

        tracing::info!(target: "ORDER", order_id, "Order deleted");
        Ok(())
    }

    /// Add an item; the price defaults to the product's current price.
    pub async fn add_item(&self, order_id: i64, payload: &AddOrderItemPayload) -> AppResult<OrderItem> {
        if self.find_order(order_id).await?.is_none() {
            return Err(AppError::not_found("Order not found"));
        }

        let product_price: Option<f64> =
            sqlx::query_scalar("SELECT price FROM products WHERE id = ?")
                .bind(payload.product_id)
                .fetch_optional(&self.db)
                .await?;
        let product_price = product_price.ok_or_else(|| {
            AppError::validation(format!("Product {} not found", payload.product_id))
        })?;

        let price = match payload.price {
            Some(price) => {
                validate_amount(price, "Price")?;
                round_cents(price)
            }
            None => product_price,
        };
        let quantity = normalize_quantity(payload.quantity.as_ref())?;

        let item_id = sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, price) VALUES (?, ?, ?, ?)",
        )
        .bind(order_id)
        .bind(payload.product_id)
        .bind(quantity)
        .bind(price)
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        self.refresh_total(order_id).await;

        tracing::debug!(target: "ORDER", order_id, item_id, "Order item added");
        self.load_item(item_id).await
    }

    /// Change quantity and/or price of an item. Omitted fields keep their value.
    pub async fn update_item(&self, item_id: i64, payload: &UpdateOrderItemPayload) -> AppResult<OrderItem> {
        let current = self.load_item(item_id).await?;

        let quantity = match payload.quantity.as_ref() {
            Some(raw) => normalize_quantity(Some(raw))?,
            None => current.quantity,
        };
        let price = match payload.price {
            Some(price) => {
                validate_amount(price, "Price")?;
                round_cents(price)
            }
            None => current.price,
        };

        sqlx::query("UPDATE order_items SET quantity = ?, price = ? WHERE id = ?")
            .bind(quantity)
            .bind(price)
            .bind(item_id)
            .execute(&self.db)
            .await?;

        self.refresh_total(current.order_id).await;

        self.load_item(item_id).await
    }

    pub async fn delete_item(&self, item_id: i64) -> AppResult<()> {
        let item = self.load_item(item_id).await?;

        sqlx::query("DELETE FROM order_items WHERE id = ?")
            .bind(item_id)
            .execute(&self.db)
            .await?;

        self.refresh_total(item.order_id).await;

        tracing::debug!(target: "ORDER", order_id = item.order_id, item_id, "Order item deleted");
        Ok(())
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }

    /// Σ order totals, rounded to cents.
    pub async fn revenue(&self) -> AppResult<f64> {
        let revenue: f64 =
            sqlx::query_scalar("SELECT ROUND(COALESCE(SUM(total), 0.0), 2) FROM orders")
                .fetch_one(&self.db)
                .await?;
        Ok(revenue)
    }

    async fn load_item(&self, item_id: i64) -> AppResult<OrderItem> {
        sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE id = ?"
        ))
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Order item not found"))
    }
}

fn group_items(orders: Vec<Order>, items: Vec<OrderItem>) -> Vec<OrderWithItems> {
    let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    orders
        .into_iter()
        .map(|order| {
            let items = by_order.remove(&order.id).unwrap_or_default();
            OrderWithItems { order, items }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: i64) -> Order {
        Order {
            id,
            user_id: 1,
            status: "pending".into(),
            total: 0.0,
            created_at: None,
        }
    }

    fn item(id: i64, order_id: i64) -> OrderItem {
        OrderItem { id, order_id, product_id: 1, quantity: 1, price: 1.0 }
    }

    #[test]
    fn grouping_keeps_order_sequence_and_empty_orders() {
        let grouped = group_items(
            vec![order(3), order(2), order(1)],
            vec![item(10, 1), item(11, 3), item(12, 1)],
        );

        let ids: Vec<i64> = grouped.iter().map(|o| o.order.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(grouped[0].items.len(), 1);
        assert!(grouped[1].items.is_empty());
        assert_eq!(grouped[2].items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![10, 12]);
    }
}
