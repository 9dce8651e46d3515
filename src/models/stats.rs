use serde::{Deserialize, Serialize};

use super::order::OrderWithItems;
use super::product::{CategoryWithCount, Product};

/// Admin dashboard aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_users: i64,
    pub total_orders: i64,
    /// Σ order totals
    pub revenue: f64,
    pub products: Vec<Product>,
    pub categories: Vec<CategoryWithCount>,
    pub recent_orders: Vec<OrderWithItems>,
}
