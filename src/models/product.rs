use serde::{Deserialize, Serialize};

/// Product without its image bytes (what list endpoints return).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub category_id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub stock: i64,
    #[sqlx(rename = "image_filename")]
    pub filename: Option<String>,
    #[sqlx(rename = "image_mime_type")]
    pub mime_type: Option<String>,
    #[sqlx(rename = "image_size")]
    pub size: Option<i64>,
    pub has_image: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Binary image payload, served by its own endpoint.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductImage {
    pub image: Vec<u8>,
    pub mime_type: Option<String>,
}

/// Uploaded image before it is stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: Option<String>,
}

/// Category with its product count.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCount {
    pub id: i64,
    pub name: String,
    pub product_count: i64,
}

/// Product creation input (from JSON or multipart fields).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryPayload {
    #[serde(default)]
    pub name: String,
}
