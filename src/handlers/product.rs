use axum::{
    extract::{rejection::JsonRejection, FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::audit::{log_action, AuditAction};
use crate::auth::guard::Caller;
use crate::auth::policy::{authorize, Operation};
use crate::errors::{AppError, AppResult};
use crate::models::product::{
    Category, CategoryWithCount, CreateCategoryPayload, CreateProductPayload, ImageUpload, Product,
};
use crate::AppState;

/// `GET /api/products`
pub async fn list_products(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Vec<Product>>> {
    authorize(&caller, Operation::ListProducts, None)?;
    Ok(Json(state.catalog.list_products().await?))
}

/// `GET /api/products/:id/image`
pub async fn product_image(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    authorize(&caller, Operation::ReadProductImage, None)?;

    let image = state.catalog.get_image(id).await?;
    let content_type = image
        .mime_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok(([(header::CONTENT_TYPE, content_type)], image.image).into_response())
}

/// `POST /api/products`, JSON body or multipart form with an optional `image` file.
pub async fn create_product(
    State(state): State<AppState>,
    caller: Caller,
    request: Request,
) -> AppResult<(StatusCode, Json<Product>)> {
    let actor = authorize(&caller, Operation::CreateProduct, None)?.map(|i| i.id);

    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let (payload, image) = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        read_product_form(multipart).await?
    } else {
        let payload: Result<Json<CreateProductPayload>, JsonRejection> =
            Json::from_request(request, &state).await;
        let Json(payload) = payload?;
        (payload, None)
    };

    let product = state.catalog.create_product(payload, image).await?;

    log_action(
        &state.db,
        actor,
        AuditAction::CreateProduct,
        &format!("Created product {}", product.name),
        Some(json!({ "productId": product.id, "hasImage": product.has_image })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(product)))
}

/// Collect text fields and the optional `image` part of a product form.
async fn read_product_form(mut multipart: Multipart) -> AppResult<(CreateProductPayload, Option<ImageUpload>)> {
    let mut payload = CreateProductPayload::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let filename = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(e.body_text()))?;
            // browsers send an empty part when no file was picked
            if !bytes.is_empty() {
                image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    mime_type,
                    filename,
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match name.as_str() {
            "name" => payload.name = Some(value.to_string()),
            "description" => payload.description = Some(value.to_string()),
            "price" => payload.price = Some(parse_field(value, "Price")?),
            "stock" => payload.stock = Some(parse_field(value, "Stock")?),
            "categoryId" | "category_id" => payload.category_id = Some(parse_field(value, "Category")?),
            _ => {}
        }
    }

    Ok((payload, image))
}

fn parse_field<T: std::str::FromStr>(value: &str, field: &str) -> AppResult<T> {
    value
        .parse()
        .map_err(|_| AppError::validation(format!("{} must be a number", field)))
}

/// `DELETE /api/products/:id`
pub async fn delete_product(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let actor = authorize(&caller, Operation::DeleteProduct, None)?.map(|i| i.id);

    state.catalog.delete_product(id).await?;

    log_action(
        &state.db,
        actor,
        AuditAction::DeleteProduct,
        &format!("Deleted product {}", id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/categories`
pub async fn list_categories(
    State(state): State<AppState>,
    caller: Caller,
) -> AppResult<Json<Vec<CategoryWithCount>>> {
    authorize(&caller, Operation::ListCategories, None)?;
    Ok(Json(state.catalog.list_categories().await?))
}

/// `POST /api/categories`
pub async fn create_category(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<CreateCategoryPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let actor = authorize(&caller, Operation::CreateCategory, None)?.map(|i| i.id);
    let Json(payload) = payload?;

    let category = state.catalog.create_category(&payload.name).await?;

    log_action(
        &state.db,
        actor,
        AuditAction::CreateCategory,
        &format!("Created category {}", category.name),
        None,
    )
    .await;

    Ok((StatusCode::CREATED, Json(category)))
}

/// `DELETE /api/categories/:id`
pub async fn delete_category(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let actor = authorize(&caller, Operation::DeleteCategory, None)?.map(|i| i.id);

    state.catalog.delete_category(id).await?;

    log_action(
        &state.db,
        actor,
        AuditAction::DeleteCategory,
        &format!("Deleted category {}", id),
        None,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
