//! Product store - owns the `products` table

use std::path::{Path, PathBuf};
use rusqlite::{OptionalExtension, ToSql, params};
use crate::{Error, Result};
use crate::product::{InventoryStats, Product, ProductUpdate, normalize_name};
use super::{is_unique_violation, schema};
use super::scope::{ensure_database_file, with_scope};

const PRODUCT_COLUMNS: &str = "name, cost_price, sell_price, in_stock";

/// Columns that `update` may touch, one statement each
#[derive(Debug, Clone, Copy)]
enum Field {
    CostPrice,
    SellPrice,
    InStock,
}

impl Field {
    fn as_str(&self) -> &'static str {
        match self {
            Field::CostPrice => "cost_price",
            Field::SellPrice => "sell_price",
            Field::InStock => "in_stock",
        }
    }

    fn update_sql(&self) -> &'static str {
        match self {
            Field::CostPrice => "UPDATE products SET cost_price = ?1 WHERE name = ?2",
            Field::SellPrice => "UPDATE products SET sell_price = ?1 WHERE name = ?2",
            Field::InStock => "UPDATE products SET in_stock = ?1 WHERE name = ?2",
        }
    }
}

/// SQLite-backed product catalog
#[derive(Debug, Clone)]
pub struct ProductStore {
    path: PathBuf,
}

impl ProductStore {
    /// Open the products database, creating the file and table if missing.
    ///
    /// A store that fails here must not be used.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        tracing::debug!("Initializing product store at {}", path.display());

        if let Err(e) = Self::initialize_schema(&path) {
            tracing::error!("Unable to initialize the products database: {}", e);
            return Err(Error::StorageInit { path, source: Box::new(e) });
        }

        Ok(Self { path })
    }

    fn initialize_schema(path: &Path) -> Result<()> {
        ensure_database_file(path)?;
        with_scope(path, |conn| {
            conn.execute(schema::CREATE_PRODUCTS_TABLE, [])?;
            Ok(())
        })
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if a product with this name (any case) is stored
    pub fn exists(&self, name: &str) -> Result<bool> {
        let name = normalize_name(name)?;
        with_scope(&self.path, |conn| {
            let found: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM products WHERE name = ?1)",
                [&name],
                |row| row.get(0),
            )?;
            Ok(found)
        })
    }

    /// Get a single product by name
    pub fn get(&self, name: &str) -> Result<Option<Product>> {
        let name = normalize_name(name)?;
        with_scope(&self.path, |conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {} FROM products WHERE name = ?1", PRODUCT_COLUMNS),
                    [&name],
                    row_to_product,
                )
                .optional()?)
        })
    }

    /// Add a new product. Negative numbers are stored by magnitude.
    ///
    /// Fails with [`Error::ProductExists`] on a name clash and
    /// [`Error::UnableToAdd`] on any other storage failure.
    pub fn add(&self, name: &str, cost_price: f64, sell_price: f64, in_stock: i64) -> Result<bool> {
        let product = Product::new(name, cost_price, sell_price, in_stock)?;

        let inserted = with_scope(&self.path, |conn| {
            conn.execute(
                &format!("INSERT INTO products ({}) VALUES (?1, ?2, ?3, ?4)", PRODUCT_COLUMNS),
                params![product.name, product.cost_price, product.sell_price, product.in_stock],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    tracing::warn!("Duplicated product names are not allowed: '{}'", product.name);
                    Error::ProductExists(product.name.clone())
                } else {
                    Error::Storage(e)
                }
            })?;
            Ok(())
        });

        match inserted {
            Ok(()) => {
                tracing::debug!("Product '{}' added", product.name);
                Ok(true)
            }
            Err(Error::Storage(source)) => {
                tracing::error!("Unable to add product '{}': {}", product.name, source);
                Err(Error::UnableToAdd { name: product.name, source })
            }
            Err(e) => Err(e),
        }
    }

    /// Change the requested fields of an existing product.
    ///
    /// Returns `false` if the product is missing or nothing was requested.
    /// Each field is written in its own scope; the first failure stops the
    /// remaining writes and is returned.
    pub fn update(&self, name: &str, update: ProductUpdate) -> Result<bool> {
        let name = normalize_name(name)?;
        let update = update.normalized()?;

        if update.is_empty() {
            tracing::debug!("No fields requested for '{}', nothing to update", name);
            return Ok(false);
        }

        if !self.exists(&name)? {
            tracing::warn!("Product '{}' not found, nothing to update", name);
            return Ok(false);
        }

        let mut written = false;
        if let Some(cost_price) = update.cost_price {
            written |= self.update_field(&name, Field::CostPrice, cost_price)?;
        }
        if let Some(sell_price) = update.sell_price {
            written |= self.update_field(&name, Field::SellPrice, sell_price)?;
        }
        if let Some(in_stock) = update.in_stock {
            written |= self.update_field(&name, Field::InStock, in_stock)?;
        }

        if written {
            tracing::debug!("Product '{}' updated", name);
        }
        Ok(written)
    }

    fn update_field<V: ToSql>(&self, name: &str, field: Field, value: V) -> Result<bool> {
        let changed = with_scope(&self.path, |conn| {
            Ok(conn.execute(field.update_sql(), params![value, name])?)
        })
        .inspect_err(|e| {
            tracing::error!("Unable to update the '{}' field of '{}': {}", field.as_str(), name, e);
        })?;

        if changed == 0 {
            // Removed between the existence check and this write
            tracing::warn!("Product '{}' vanished before '{}' was written", name, field.as_str());
        }
        Ok(changed > 0)
    }

    /// Delete a product. Fails with [`Error::ProductNotFound`] if nothing matched.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let name = normalize_name(name)?;

        with_scope(&self.path, |conn| {
            let deleted = conn.execute("DELETE FROM products WHERE name = ?1", [&name])?;
            if deleted == 0 {
                tracing::warn!("Product '{}' not found, nothing removed", name);
                return Err(Error::ProductNotFound(name.clone()));
            }
            Ok(())
        })?;

        tracing::debug!("Product '{}' removed", name);
        Ok(true)
    }

    /// All product names, ascending
    pub fn list_names(&self) -> Result<Vec<String>> {
        with_scope(&self.path, |conn| {
            let mut stmt = conn.prepare("SELECT name FROM products ORDER BY name ASC")?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
    }

    /// All products, ascending by name
    pub fn list_all(&self) -> Result<Vec<Product>> {
        with_scope(&self.path, |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM products ORDER BY name ASC",
                PRODUCT_COLUMNS
            ))?;
            let products = stmt
                .query_map([], row_to_product)?
                .collect::<rusqlite::Result<Vec<Product>>>()?;
            Ok(products)
        })
    }

    /// Aggregate counts and values over the whole catalog.
    ///
    /// Unit counts saturate at `i64::MAX` rather than overflowing.
    pub fn stats(&self) -> Result<InventoryStats> {
        with_scope(&self.path, |conn| {
            let (products, stock_value, potential_revenue) = conn.query_row(
                r#"
                SELECT COUNT(*),
                       TOTAL(cost_price * in_stock),
                       TOTAL(sell_price * in_stock)
                FROM products
                "#,
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?, row.get::<_, f64>(2)?)),
            )?;

            let mut stmt = conn.prepare("SELECT in_stock FROM products")?;
            let units_in_stock = stmt
                .query_map([], |row| row.get::<_, i64>(0))?
                .try_fold(0i64, |total, units| units.map(|units| total.saturating_add(units)))?;

            Ok(InventoryStats {
                products: products as usize,
                units_in_stock,
                stock_value,
                potential_revenue,
            })
        })
    }
}

fn row_to_product(row: &rusqlite::Row) -> rusqlite::Result<Product> {
    Ok(Product {
        name: row.get(0)?,
        cost_price: row.get(1)?,
        sell_price: row.get(2)?,
        in_stock: row.get(3)?,
    })
}
