use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::audit::{log_action, AuditAction};
use crate::auth::guard::Caller;
use crate::auth::policy::{authorize, order_scope, require_identity, Operation};
use crate::errors::{AppError, AppResult};
use crate::models::order::{
    AddOrderItemPayload, CreateOrderPayload, Order, OrderItem, OrderStatus, OrderWithItems,
    UpdateOrderItemPayload, UpdateOrderStatusPayload,
};
use crate::AppState;

/// `GET /api/orders`: admins see every order, users their own.
pub async fn list_orders(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<Vec<OrderWithItems>>> {
    authorize(&caller, Operation::ListOrders, None)?;
    let identity = require_identity(&caller)?;

    let orders = state.ledger.list_orders(order_scope(identity)).await?;
    Ok(Json(orders))
}

/// `POST /api/orders`
pub async fn create_order(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<CreateOrderPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<OrderWithItems>)> {
    authorize(&caller, Operation::CreateOrder, None)?;
    let identity = require_identity(&caller)?;
    let Json(payload) = payload?;

    let order = state.ledger.create_order(identity.id, &payload.items).await?;

    log_action(
        &state.db,
        Some(identity.id),
        AuditAction::CreateOrder,
        &format!("Created order #{}", order.order.id),
        Some(json!({ "orderId": order.order.id, "total": order.order.total, "items": order.items.len() })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(order)))
}

/// `DELETE /api/orders/:id`
pub async fn delete_order(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let identity = require_identity(&caller)?;
    let order = state
        .ledger
        .find_order(id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    authorize(&caller, Operation::DeleteOrder, Some(order.user_id))?;

    state.ledger.delete_order(id).await?;

    log_action(
        &state.db,
        Some(identity.id),
        AuditAction::DeleteOrder,
        &format!("Deleted order #{}", id),
        Some(json!({ "orderId": id, "ownerId": order.user_id, "total": order.total })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/orders/:id/status`
pub async fn update_order_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateOrderStatusPayload>, JsonRejection>,
) -> AppResult<Json<Order>> {
    let actor = authorize(&caller, Operation::UpdateOrderStatus, None)?.map(|i| i.id);
    let Json(payload) = payload?;
    let status: OrderStatus = payload.status.parse().map_err(AppError::Validation)?;

    let order = state.ledger.update_status(id, status).await?;

    log_action(
        &state.db,
        actor,
        AuditAction::UpdateOrderStatus,
        &format!("Order #{} is now {}", id, status),
        None,
    )
    .await;

    Ok(Json(order))
}

/// `POST /api/orders/:id/items`
pub async fn add_order_item(
    State(state): State<AppState>,
    caller: Caller,
    Path(order_id): Path<i64>,
    payload: Result<Json<AddOrderItemPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<OrderItem>)> {
    require_identity(&caller)?;
    let order = state
        .ledger
        .find_order(order_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))?;
    authorize(&caller, Operation::AddOrderItem, Some(order.user_id))?;
    let Json(payload) = payload?;

    let item = state.ledger.add_item(order_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// `PUT /api/order-items/:id`
pub async fn update_order_item(
    State(state): State<AppState>,
    caller: Caller,
    Path(item_id): Path<i64>,
    payload: Result<Json<UpdateOrderItemPayload>, JsonRejection>,
) -> AppResult<Json<OrderItem>> {
    require_identity(&caller)?;
    let (_, owner) = state
        .ledger
        .find_item(item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order item not found"))?;
    authorize(&caller, Operation::UpdateOrderItem, Some(owner))?;
    let Json(payload) = payload?;

    let item = state.ledger.update_item(item_id, &payload).await?;
    Ok(Json(item))
}

/// `DELETE /api/order-items/:id`
pub async fn delete_order_item(
    State(state): State<AppState>,
    caller: Caller,
    Path(item_id): Path<i64>,
) -> AppResult<StatusCode> {
    require_identity(&caller)?;
    let (_, owner) = state
        .ledger
        .find_item(item_id)
        .await?
        .ok_or_else(|| AppError::not_found("Order item not found"))?;
    authorize(&caller, Operation::DeleteOrderItem, Some(owner))?;

    state.ledger.delete_item(item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
