use sqlx::SqlitePool;

use crate::errors::{AppError, AppResult};
use crate::models::product::{
    Category, CategoryWithCount, CreateProductPayload, ImageUpload, Product, ProductImage,
};
use crate::validation::{
    round_cents, sanitize_string, validate_amount, validate_category_name, validate_image,
    validate_product_name, validate_stock,
};

/// Product columns without the image bytes.
const PRODUCT_COLUMNS: &str = "id, category_id, name, description, price, stock, \
     image_filename, image_mime_type, image_size, (image IS NOT NULL) AS has_image, \
     created_at, updated_at";

/// Categories and products.
#[derive(Clone)]
pub struct CatalogStore {
    db: SqlitePool,
    max_image_bytes: usize,
}

impl CatalogStore {
    pub fn new(db: SqlitePool, max_image_bytes: usize) -> Self {
        Self { db, max_image_bytes }
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(products)
    }

    pub async fn get_product(&self, id: i64) -> AppResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(product)
    }

    /// Image bytes for a product; `NotFound` when the product or its image is missing.
    pub async fn get_image(&self, id: i64) -> AppResult<ProductImage> {
        let row = sqlx::query_as::<_, ProductImage>(
            "SELECT image, image_mime_type AS mime_type FROM products
             WHERE id = ? AND image IS NOT NULL",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.ok_or_else(|| AppError::not_found("Image not found"))
    }

    pub async fn create_product(
        &self,
        payload: CreateProductPayload,
        image: Option<ImageUpload>,
    ) -> AppResult<Product> {
        let name = sanitize_string(payload.name.as_deref().unwrap_or_default());
        validate_product_name(&name)?;

        let price = payload
            .price
            .ok_or_else(|| AppError::validation("Price is required"))?;
        validate_amount(price, "Price")?;

        let stock = payload.stock.unwrap_or(0);
        validate_stock(stock)?;

        if let Some(category_id) = payload.category_id {
            if !self.category_exists(category_id).await? {
                return Err(AppError::validation(format!(
                    "Category {} does not exist",
                    category_id
                )));
            }
        }

        if let Some(img) = &image {
            validate_image(&img.mime_type, img.bytes.len(), self.max_image_bytes)?;
        }

        let description = payload
            .description
            .as_deref()
            .map(sanitize_string)
            .filter(|d| !d.is_empty());

        let (bytes, filename, mime_type, size) = match image {
            Some(img) => {
                let size = img.bytes.len() as i64;
                (Some(img.bytes), img.filename, Some(img.mime_type), Some(size))
            }
            None => (None, None, None, None),
        };

        let id = sqlx::query(
            "INSERT INTO products
                (category_id, name, description, price, stock,
                 image, image_filename, image_mime_type, image_size)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(payload.category_id)
        .bind(&name)
        .bind(description)
        .bind(round_cents(price))
        .bind(stock)
        .bind(bytes)
        .bind(filename)
        .bind(mime_type)
        .bind(size)
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        tracing::info!(target: "CATALOG", product_id = id, name = %name, "Product created");

        self.get_product(id)
            .await?
            .ok_or_else(|| AppError::Internal("created product vanished".into()))
    }

    /// Products referenced by order items cannot be removed.
    pub async fn delete_product(&self, id: i64) -> AppResult<()> {
        if self.get_product(id).await?.is_none() {
            return Err(AppError::not_found("Product not found"));
        }

        let referenced: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM order_items WHERE product_id = ?")
                .bind(id)
                .fetch_one(&self.db)
                .await?;
        if referenced > 0 {
            return Err(AppError::conflict(
                "Product is referenced by existing orders and cannot be deleted",
            ));
        }

        sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        tracing::info!(target: "CATALOG", product_id = id, "Product deleted");
        Ok(())
    }

    pub async fn list_categories(&self) -> AppResult<Vec<CategoryWithCount>> {
        let categories = sqlx::query_as::<_, CategoryWithCount>(
            "SELECT c.id, c.name, COUNT(p.id) AS product_count
             FROM categories c
             LEFT JOIN products p ON c.id = p.category_id
             GROUP BY c.id
             ORDER BY c.name ASC",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(categories)
    }

    pub async fn create_category(&self, name: &str) -> AppResult<Category> {
        let name = sanitize_string(name);
        validate_category_name(&name)?;

        let id = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(&name)
            .execute(&self.db)
            .await
            .map_err(|e| AppError::unique_or(e, "Category already exists"))?
            .last_insert_rowid();

        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, created_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(target: "CATALOG", category_id = id, name = %name, "Category created");
        Ok(category)
    }

    /// Categories still holding products cannot be removed.
    pub async fn delete_category(&self, id: i64) -> AppResult<()> {
        if !self.category_exists(id).await? {
            return Err(AppError::not_found("Category not found"));
        }

        let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE category_id = ?")
            .bind(id)
            .fetch_one(&self.db)
            .await?;
        if in_use > 0 {
            return Err(AppError::conflict(format!(
                "Category still has {} product(s)",
                in_use
            )));
        }

        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        tracing::info!(target: "CATALOG", category_id = id, "Category deleted");
        Ok(())
    }

    async fn category_exists(&self, id: i64) -> AppResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(found.is_some())
    }
}
