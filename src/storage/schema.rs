//! Database schema definitions

/// SQL to create the users table
pub const CREATE_USERS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    username TEXT UNIQUE PRIMARY KEY,
    password TEXT
)
"#;

/// SQL to create the products table
pub const CREATE_PRODUCTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    name TEXT UNIQUE PRIMARY KEY,
    cost_price REAL,
    sell_price REAL,
    in_stock INTEGER
)
"#;
