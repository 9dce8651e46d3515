use sqlx::SqlitePool;

/// Run every migration (CREATE TABLE IF NOT EXISTS, so it is safe on each start-up).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // ═══════════════════════════════════════
    // TABLE: users
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id              INTEGER  PRIMARY KEY AUTOINCREMENT,
            name            TEXT     NOT NULL,
            email           TEXT     NOT NULL UNIQUE,
            password_hash   TEXT     NOT NULL,
            role            TEXT     NOT NULL DEFAULT 'user' CHECK(role IN ('admin', 'user')),
            created_at      DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at      DATETIME DEFAULT CURRENT_TIMESTAMP,
            last_login_at   DATETIME
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: categories
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS categories (
            id         INTEGER  PRIMARY KEY AUTOINCREMENT,
            name       TEXT     NOT NULL UNIQUE,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    // ═══════════════════════════════════════
    // TABLE: products
    // ═══════════════════════════════════════
    // Categories in use cannot be deleted (RESTRICT).
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS products (
            id              INTEGER  PRIMARY KEY AUTOINCREMENT,
            category_id     INTEGER  REFERENCES categories(id) ON DELETE RESTRICT,
            name            TEXT     NOT NULL,
            description     TEXT,
            price           REAL     NOT NULL CHECK(price >= 0),
            stock           INTEGER  NOT NULL DEFAULT 0 CHECK(stock >= 0),
            image           BLOB,
            image_filename  TEXT,
            image_mime_type TEXT,
            image_size      INTEGER,
            created_at      DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at      DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: orders
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders (
            id         INTEGER  PRIMARY KEY AUTOINCREMENT,
            user_id    INTEGER  NOT NULL REFERENCES users(id),
            status     TEXT     NOT NULL DEFAULT 'pending'
                       CHECK(status IN ('pending', 'paid', 'shipped', 'delivered', 'cancelled')),
            total      REAL     NOT NULL DEFAULT 0 CHECK(total >= 0),
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_created ON orders(created_at)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: order_items
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS order_items (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id   INTEGER NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
            product_id INTEGER NOT NULL REFERENCES products(id),
            quantity   INTEGER NOT NULL CHECK(quantity > 0),
            price      REAL    NOT NULL CHECK(price >= 0)
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_order_items_product ON order_items(product_id)")
        .execute(pool)
        .await?;

    // ═══════════════════════════════════════
    // TABLE: activity_logs (Audit Trail)
    // ═══════════════════════════════════════
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS activity_logs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER REFERENCES users(id) ON DELETE SET NULL,
            action      TEXT    NOT NULL, -- 'LOGIN', 'CREATE_ORDER', 'DELETE_ORDER', etc.
            description TEXT    NOT NULL,
            metadata    TEXT,             -- JSON string for extra data
            created_at  DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
