use sqlx::SqlitePool;

use crate::config::SeedConfig;
use crate::errors::AppResult;
use crate::models::user::Role;
use crate::store::CredentialStore;

/// Idempotent start-up seed. Existing rows are never overwritten.
pub async fn run_seed(pool: &SqlitePool, credentials: &CredentialStore, config: &SeedConfig) -> AppResult<()> {
    let admin_id = seed_admin(credentials, config).await?;

    if config.sample_data {
        seed_sample_data(pool, admin_id).await?;
    }

    Ok(())
}

async fn seed_admin(credentials: &CredentialStore, config: &SeedConfig) -> AppResult<Option<i64>> {
    if let Some(existing) = credentials.find_by_email(&config.admin_email).await? {
        tracing::debug!(target: "SEED", email = %existing.email, "Admin exists");
        return Ok(Some(existing.id));
    }

    let Some(password) = config.admin_password.as_deref() else {
        tracing::warn!(
            target: "SEED",
            "No SEED_ADMIN_PASSWORD configured, skipping admin seed"
        );
        return Ok(None);
    };

    let admin = credentials
        .create_user("Admin", &config.admin_email, password, Role::Admin)
        .await?;
    tracing::info!(target: "SEED", email = %admin.email, "Admin created");
    Ok(Some(admin.id))
}

/// Default category, two products and one order (only while no orders exist).
async fn seed_sample_data(pool: &SqlitePool, admin_id: Option<i64>) -> AppResult<()> {
    sqlx::query("INSERT OR IGNORE INTO categories (name) VALUES ('Default')")
        .execute(pool)
        .await?;
    let category_id: i64 = sqlx::query_scalar("SELECT id FROM categories WHERE name = 'Default'")
        .fetch_one(pool)
        .await?;

    let samples = [
        ("T-shirt", "Comfortable cotton t-shirt", 19.99),
        ("Sneakers", "Lightweight sneakers", 59.99),
    ];
    for (name, description, price) in samples {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;
        if exists.is_some() {
            continue;
        }
        sqlx::query(
            "INSERT INTO products (category_id, name, description, price, stock) VALUES (?, ?, ?, ?, 10)",
        )
        .bind(category_id)
        .bind(name)
        .bind(description)
        .bind(price)
        .execute(pool)
        .await?;
        tracing::info!(target: "SEED", product = name, "Sample product created");
    }

    let orders: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await?;
    let Some(owner) = admin_id else {
        return Ok(());
    };
    if orders > 0 {
        return Ok(());
    }

    let tshirt: Option<(i64, f64)> =
        sqlx::query_as("SELECT id, price FROM products WHERE name = 'T-shirt'")
            .fetch_optional(pool)
            .await?;
    if let Some((product_id, price)) = tshirt {
        let mut tx = pool.begin().await?;
        let order_id = sqlx::query("INSERT INTO orders (user_id, status, total) VALUES (?, 'pending', ?)")
            .bind(owner)
            .bind(price)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        sqlx::query("INSERT INTO order_items (order_id, product_id, quantity, price) VALUES (?, ?, 1, ?)")
            .bind(order_id)
            .bind(product_id)
            .bind(price)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(target: "SEED", order_id, "Sample order created");
    }

    Ok(())
}
