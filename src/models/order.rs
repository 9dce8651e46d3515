use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("Unknown order status: {}", other)),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: String,
    pub total: f64,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    /// Snapshot price at the time the item was created
    pub price: f64,
}

/// Order plus its items (list and detail responses).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Order creation input. Totals and prices are never taken from the client.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderPayload {
    #[serde(default)]
    pub items: Vec<CreateOrderItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItem {
    pub product_id: i64,
    /// Raw value; normalized with `validation::normalize_quantity`
    #[serde(default)]
    pub quantity: Option<Value>,
}

/// Adding an item to an existing order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOrderItemPayload {
    pub product_id: i64,
    #[serde(default)]
    pub quantity: Option<Value>,
    /// Explicit price; defaults to the product's current price
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrderItemPayload {
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatusPayload {
    pub status: String,
}

/// Which orders a caller may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All,
    Owner(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_with_items_flattens() {
        let view = OrderWithItems {
            order: Order {
                id: 1,
                user_id: 2,
                status: "pending".into(),
                total: 39.98,
                created_at: None,
            },
            items: vec![OrderItem { id: 3, order_id: 1, product_id: 5, quantity: 2, price: 19.99 }],
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["userId"], 2);
        assert_eq!(json["total"], 39.98);
        assert_eq!(json["items"][0]["productId"], 5);
    }

    #[test]
    fn status_parse() {
        assert_eq!(" Shipped ".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn create_payload_accepts_missing_quantity() {
        let payload: CreateOrderPayload =
            serde_json::from_str(r#"{"items":[{"productId":5},{"productId":6,"quantity":"3"}]}"#)
                .unwrap();
        assert_eq!(payload.items.len(), 2);
        assert!(payload.items[0].quantity.is_none());
    }
}
