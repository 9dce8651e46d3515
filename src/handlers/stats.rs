use axum::{extract::State, Json};

use crate::auth::guard::Caller;
use crate::auth::policy::{authorize, Operation};
use crate::errors::AppResult;
use crate::models::stats::Stats;
use crate::AppState;

const RECENT_ORDERS: i64 = 5;

/// `GET /api/stats`
pub async fn stats(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Stats>> {
    authorize(&caller, Operation::ViewStats, None)?;

    let (total_users, total_orders, revenue) = tokio::try_join!(
        state.credentials.count(),
        state.ledger.count(),
        state.ledger.revenue(),
    )?;
    let (products, categories, recent_orders) = tokio::try_join!(
        state.catalog.list_products(),
        state.catalog.list_categories(),
        state.ledger.recent_orders(RECENT_ORDERS),
    )?;

    Ok(Json(Stats {
        total_users,
        total_orders,
        revenue,
        products,
        categories,
        recent_orders,
    }))
}
