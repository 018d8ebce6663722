//! Postgres-backed inventory store.
//!
//! Every mutating operation runs in one SQL transaction. `commit` locks the
//! touched item rows with `SELECT ... FOR UPDATE` in SKU order (so concurrent
//! movements cannot deadlock), compares versions, then updates quantities and
//! appends log rows before committing. A dropped transaction rolls back, so an
//! early return never leaves partial writes.
//!
//! ## Error Mapping
//!
//! | Condition | StoreError |
//! |-----------|------------|
//! | Unique violation on `items_name_key` / `items_pkey` | `Rejected(DuplicateKey)` |
//! | Check constraint violation (`23514`) | `Rejected(Validation)` |
//! | Version mismatch under row lock | `Conflict` |
//! | Row that does not decode into domain types | `Corrupt` |
//! | Anything else (pool closed, network, other codes) | `Unavailable` |
//!
//! ## Sync bridge
//!
//! `InventoryStore` is synchronous. The trait implementation runs the async
//! methods with `block_in_place` on the current tokio handle, so it must be called
//! from a multi-threaded runtime.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgConnection, PgPool, Row};
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{Span, instrument};

use stockledger_core::{
    Actor, DomainError, ProductId, Quantity, RefCode, Sku, TransactionId,
};
use stockledger_inventory::{
    Item, ItemPatch, NewItem, Recipe, RecipeLine, StockMovement, TransactionFilter,
    TransactionRecord, UnitOfMeasure,
};

use super::r#trait::{InventoryStore, StoreError};
use crate::config::SkuFormat;

const SCHEMA: &str = include_str!("../../migrations/0001_inventory.sql");

const ITEM_COLUMNS: &str = "sku, name, quantity, opening_quantity, unit, min_stock, price, \
     supplier, version, created_at, last_updated";

const TRANSACTION_COLUMNS: &str =
    "sequence, id, ref_code, sku, kind, quantity_change, actor, reason, occurred_at";

/// Postgres-backed inventory store.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
    skus: SkuFormat,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool, skus: SkuFormat) -> Self {
        Self {
            pool: Arc::new(pool),
            skus,
        }
    }

    /// Create the schema if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    #[instrument(
        skip(self, new, default_min_stock),
        fields(name = %new.name, sku = tracing::field::Empty),
        err
    )]
    pub async fn create_item(
        &self,
        new: NewItem,
        default_min_stock: Quantity,
        at: DateTime<Utc>,
    ) -> Result<Item, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let sku = match new.sku.clone() {
            Some(sku) => {
                if sku_taken(&mut tx, &sku).await? {
                    return Err(DomainError::duplicate("sku", sku.as_str()).into());
                }
                sku
            }
            None => allocate_sku(&mut tx, &self.skus).await?,
        };
        Span::current().record("sku", sku.as_str());

        let item = new.into_item(sku, default_min_stock, at)?;

        let sql = format!(
            "INSERT INTO items ({ITEM_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&sql)
            .bind(item.sku.as_str())
            .bind(&item.name)
            .bind(item.quantity.as_decimal())
            .bind(item.opening_quantity.as_decimal())
            .bind(item.unit.as_str())
            .bind(item.min_stock.as_decimal())
            .bind(item.price)
            .bind(item.supplier.as_deref())
            .bind(to_i64(item.version)?)
            .bind(item.created_at)
            .bind(item.last_updated)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_item_write_error("insert_item", &item, e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(item)
    }

    #[instrument(skip(self, sku, patch), fields(sku = %sku), err)]
    pub async fn update_item(
        &self,
        sku: &Sku,
        patch: &ItemPatch,
        at: DateTime<Utc>,
    ) -> Result<Item, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let current = lock_item(&mut tx, sku)
            .await?
            .ok_or_else(|| DomainError::UnknownSku(sku.clone()))?;
        let next = current.patched(patch, at)?;

        let sql = format!(
            "UPDATE items \
             SET name = $2, unit = $3, min_stock = $4, price = $5, supplier = $6, \
                 version = version + 1, last_updated = $7 \
             WHERE sku = $1 \
             RETURNING {ITEM_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(sku.as_str())
            .bind(&next.name)
            .bind(next.unit.as_str())
            .bind(next.min_stock.as_decimal())
            .bind(next.price)
            .bind(next.supplier.as_deref())
            .bind(next.last_updated)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_item_write_error("update_item", &next, e))?;
        let updated = decode_item(&row)?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(updated)
    }

    #[instrument(skip(self, sku), fields(sku = %sku), err)]
    pub async fn delete_item(&self, sku: &Sku) -> Result<Item, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let item = lock_item(&mut tx, sku)
            .await?
            .ok_or_else(|| DomainError::UnknownSku(sku.clone()))?;

        let products = products_using(&mut tx, sku).await?;
        if !products.is_empty() {
            return Err(DomainError::ItemInUse {
                sku: sku.clone(),
                products,
            }
            .into());
        }

        sqlx::query("DELETE FROM items WHERE sku = $1")
            .bind(sku.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(item)
    }

    pub async fn get_item(&self, sku: &Sku) -> Result<Option<Item>, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE sku = $1");
        let row = sqlx::query(&sql)
            .bind(sku.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;
        row.as_ref().map(decode_item).transpose()
    }

    pub async fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY sku COLLATE \"C\"");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_items", e))?;
        rows.iter().map(decode_item).collect()
    }

    pub async fn find_items(&self, needle: &str) -> Result<Vec<Item>, StoreError> {
        let needle = needle.trim();
        if needle.is_empty() {
            return self.list_items().await;
        }
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM items \
             WHERE strpos(lower(name), lower($1)) > 0 OR strpos(lower(sku), lower($1)) > 0 \
             ORDER BY sku COLLATE \"C\""
        );
        let rows = sqlx::query(&sql)
            .bind(needle)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_items", e))?;
        rows.iter().map(decode_item).collect()
    }

    pub async fn load_items(&self, skus: &[Sku]) -> Result<BTreeMap<Sku, Item>, StoreError> {
        let keys: Vec<String> = skus.iter().map(|s| s.as_str().to_string()).collect();
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE sku = ANY($1)");
        let rows = sqlx::query(&sql)
            .bind(keys)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("load_items", e))?;

        let mut items = BTreeMap::new();
        for row in &rows {
            let item = decode_item(row)?;
            items.insert(item.sku.clone(), item);
        }
        Ok(items)
    }

    #[instrument(
        skip(self, movement),
        fields(
            ref_code = %movement.ref_code,
            kind = %movement.kind,
            items = movement.changes.len(),
            records = movement.records.len()
        ),
        err
    )]
    pub async fn commit(
        &self,
        movement: StockMovement,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut changes = movement.changes;
        changes.sort_by(|a, b| a.sku.cmp(&b.sku));

        for change in &changes {
            let row = sqlx::query("SELECT version FROM items WHERE sku = $1 FOR UPDATE")
                .bind(change.sku.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("lock_item", e))?
                .ok_or_else(|| DomainError::UnknownSku(change.sku.clone()))?;
            let version: i64 = row
                .try_get("version")
                .map_err(|e| StoreError::Corrupt(format!("failed to read version: {e}")))?;
            change
                .expected
                .check(to_u64(version)?)
                .map_err(|source| StoreError::Conflict {
                    sku: change.sku.clone(),
                    source,
                })?;
        }

        for change in &changes {
            sqlx::query(
                "UPDATE items \
                 SET quantity = $2, version = version + 1, last_updated = $3 \
                 WHERE sku = $1",
            )
            .bind(change.sku.as_str())
            .bind(change.new_quantity.as_decimal())
            .bind(movement.occurred_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_quantity", e))?;
        }

        let mut appended = Vec::with_capacity(movement.records.len());
        for pending in movement.records {
            let row = sqlx::query(
                "INSERT INTO stock_transactions \
                     (id, ref_code, sku, kind, quantity_change, actor, reason, occurred_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 RETURNING sequence",
            )
            .bind(*pending.id.as_uuid())
            .bind(pending.ref_code.as_str())
            .bind(pending.sku.as_str())
            .bind(pending.kind.as_str())
            .bind(pending.quantity_change.as_decimal())
            .bind(pending.user.as_str())
            .bind(&pending.reason)
            .bind(pending.occurred_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("append_transaction", e))?;
            let sequence: i64 = row
                .try_get("sequence")
                .map_err(|e| StoreError::Corrupt(format!("failed to read sequence: {e}")))?;
            appended.push(pending.into_record(to_u64(sequence)?));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(appended)
    }

    pub async fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let limit = filter.limit.map(to_i64_usize).transpose()?;
        let sql = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM stock_transactions \
             WHERE ($1::text IS NULL OR sku = $1) \
               AND ($2::text IS NULL OR ref_code = $2) \
               AND ($3::text IS NULL OR kind = $3) \
               AND ($4::timestamptz IS NULL OR occurred_at >= $4) \
               AND ($5::timestamptz IS NULL OR occurred_at < $5) \
             ORDER BY sequence DESC \
             LIMIT $6"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.sku.as_ref().map(Sku::as_str))
            .bind(filter.ref_code.as_ref().map(RefCode::as_str))
            .bind(filter.kind.map(|k| k.as_str()))
            .bind(filter.from)
            .bind(filter.to)
            .bind(limit)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("query_transactions", e))?;
        rows.iter().map(decode_transaction).collect()
    }

    #[instrument(
        skip(self, recipe),
        fields(product = %recipe.product(), components = recipe.lines().len()),
        err
    )]
    pub async fn replace_recipe(&self, recipe: Recipe) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Share-lock the components so a concurrent delete waits for us. Same SKU
        // order as `commit`, so the two cannot deadlock.
        for component in components_in_lock_order(&recipe) {
            let exists = sqlx::query("SELECT 1 FROM items WHERE sku = $1 FOR SHARE")
                .bind(component.as_str())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("lock_component", e))?;
            if exists.is_none() {
                return Err(DomainError::UnknownSku(component.clone()).into());
            }
        }

        sqlx::query("DELETE FROM recipe_lines WHERE product_id = $1")
            .bind(recipe.product().as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_recipe", e))?;

        for (position, line) in recipe.lines().iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| DomainError::validation("recipe has too many components"))?;
            sqlx::query(
                "INSERT INTO recipe_lines (product_id, component, qty_per_unit, position) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(recipe.product().as_str())
            .bind(line.component.as_str())
            .bind(line.qty_per_unit.as_decimal())
            .bind(position)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_recipe_line", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    pub async fn get_recipe(&self, product: &ProductId) -> Result<Option<Recipe>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_id, component, qty_per_unit FROM recipe_lines \
             WHERE product_id = $1 ORDER BY position",
        )
        .bind(product.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_recipe", e))?;

        Ok(group_recipes(&rows)?.into_iter().next())
    }

    pub async fn remove_recipe(&self, product: &ProductId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM recipe_lines WHERE product_id = $1")
            .bind(product.as_str())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("remove_recipe", e))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_id, component, qty_per_unit FROM recipe_lines \
             ORDER BY product_id COLLATE \"C\", position",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_recipes", e))?;
        group_recipes(&rows)
    }

    pub async fn recipes_using(&self, sku: &Sku) -> Result<Vec<ProductId>, StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire_connection", e))?;
        products_using(&mut conn, sku).await
    }
}

impl InventoryStore for PostgresInventoryStore {
    fn create_item(
        &self,
        new: NewItem,
        default_min_stock: Quantity,
        at: DateTime<Utc>,
    ) -> Result<Item, StoreError> {
        block_on(self.create_item(new, default_min_stock, at))
    }

    fn update_item(
        &self,
        sku: &Sku,
        patch: &ItemPatch,
        at: DateTime<Utc>,
    ) -> Result<Item, StoreError> {
        block_on(self.update_item(sku, patch, at))
    }

    fn delete_item(&self, sku: &Sku) -> Result<Item, StoreError> {
        block_on(self.delete_item(sku))
    }

    fn get_item(&self, sku: &Sku) -> Result<Option<Item>, StoreError> {
        block_on(self.get_item(sku))
    }

    fn list_items(&self) -> Result<Vec<Item>, StoreError> {
        block_on(self.list_items())
    }

    fn find_items(&self, needle: &str) -> Result<Vec<Item>, StoreError> {
        block_on(self.find_items(needle))
    }

    fn load_items(&self, skus: &[Sku]) -> Result<BTreeMap<Sku, Item>, StoreError> {
        block_on(self.load_items(skus))
    }

    fn commit(&self, movement: StockMovement) -> Result<Vec<TransactionRecord>, StoreError> {
        block_on(self.commit(movement))
    }

    fn query_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        block_on(self.query_transactions(filter))
    }

    fn replace_recipe(&self, recipe: Recipe) -> Result<(), StoreError> {
        block_on(self.replace_recipe(recipe))
    }

    fn get_recipe(&self, product: &ProductId) -> Result<Option<Recipe>, StoreError> {
        block_on(self.get_recipe(product))
    }

    fn remove_recipe(&self, product: &ProductId) -> Result<bool, StoreError> {
        block_on(self.remove_recipe(product))
    }

    fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        block_on(self.list_recipes())
    }

    fn recipes_using(&self, sku: &Sku) -> Result<Vec<ProductId>, StoreError> {
        block_on(self.recipes_using(sku))
    }
}

fn block_on<T>(fut: impl Future<Output = Result<T, StoreError>>) -> Result<T, StoreError> {
    let unsupported = || {
        StoreError::Unavailable(
            "PostgresInventoryStore requires a multi-threaded tokio runtime".to_string(),
        )
    };
    let handle = Handle::try_current().map_err(|_| unsupported())?;
    // block_in_place panics on a current-thread runtime.
    if handle.runtime_flavor() == RuntimeFlavor::CurrentThread {
        return Err(unsupported());
    }
    tokio::task::block_in_place(|| handle.block_on(fut))
}

fn components_in_lock_order(recipe: &Recipe) -> Vec<&Sku> {
    let mut components: Vec<&Sku> = recipe.lines().iter().map(|l| &l.component).collect();
    components.sort();
    components
}

async fn lock_item(conn: &mut PgConnection, sku: &Sku) -> Result<Option<Item>, StoreError> {
    let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE sku = $1 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(sku.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("lock_item", e))?;
    row.as_ref().map(decode_item).transpose()
}

async fn sku_taken(conn: &mut PgConnection, sku: &Sku) -> Result<bool, StoreError> {
    let row = sqlx::query(
        "SELECT EXISTS (SELECT 1 FROM items WHERE sku = $1) \
             OR EXISTS (SELECT 1 FROM stock_transactions WHERE sku = $1) AS taken",
    )
    .bind(sku.as_str())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("sku_taken", e))?;
    row.try_get("taken")
        .map_err(|e| StoreError::Corrupt(format!("failed to read sku check: {e}")))
}

/// Draw from the sequence until a SKU nobody has used comes up.
async fn allocate_sku(conn: &mut PgConnection, format: &SkuFormat) -> Result<Sku, StoreError> {
    loop {
        let row = sqlx::query("SELECT nextval('item_sku_seq') AS n")
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("allocate_sku", e))?;
        let n: i64 = row
            .try_get("n")
            .map_err(|e| StoreError::Corrupt(format!("failed to read sequence value: {e}")))?;
        let candidate = format.sku_for(to_u64(n - 1)?)?;
        if !sku_taken(&mut *conn, &candidate).await? {
            return Ok(candidate);
        }
    }
}

async fn products_using(conn: &mut PgConnection, sku: &Sku) -> Result<Vec<ProductId>, StoreError> {
    let rows = sqlx::query(
        "SELECT product_id FROM recipe_lines WHERE component = $1 \
         ORDER BY product_id COLLATE \"C\"",
    )
    .bind(sku.as_str())
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("recipes_using", e))?;

    rows.iter()
        .map(|row| {
            let product: String = row
                .try_get("product_id")
                .map_err(|e| StoreError::Corrupt(format!("failed to read product_id: {e}")))?;
            ProductId::parse(product).map_err(corrupt("product_id"))
        })
        .collect()
}

/// Fold `(product_id, component, qty_per_unit)` rows, ordered by product, into recipes.
fn group_recipes(rows: &[PgRow]) -> Result<Vec<Recipe>, StoreError> {
    let mut grouped: Vec<(ProductId, Vec<RecipeLine>)> = Vec::new();
    for row in rows {
        let product: String = row
            .try_get("product_id")
            .map_err(|e| StoreError::Corrupt(format!("failed to read recipe row: {e}")))?;
        let component: String = row
            .try_get("component")
            .map_err(|e| StoreError::Corrupt(format!("failed to read recipe row: {e}")))?;
        let qty: Decimal = row
            .try_get("qty_per_unit")
            .map_err(|e| StoreError::Corrupt(format!("failed to read recipe row: {e}")))?;

        let product = ProductId::parse(product).map_err(corrupt("product_id"))?;
        let line = RecipeLine::new(Sku::parse(component).map_err(corrupt("component"))?, qty);
        match grouped.last_mut() {
            Some((current, lines)) if *current == product => lines.push(line),
            _ => grouped.push((product, vec![line])),
        }
    }

    grouped
        .into_iter()
        .map(|(product, lines)| Recipe::define(product, lines).map_err(corrupt("recipe_lines")))
        .collect()
}

// SQLx row types

#[derive(Debug)]
struct ItemRow {
    sku: String,
    name: String,
    quantity: Decimal,
    opening_quantity: Decimal,
    unit: String,
    min_stock: Decimal,
    price: Decimal,
    supplier: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRow {
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            opening_quantity: row.try_get("opening_quantity")?,
            unit: row.try_get("unit")?,
            min_stock: row.try_get("min_stock")?,
            price: row.try_get("price")?,
            supplier: row.try_get("supplier")?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            last_updated: row.try_get("last_updated")?,
        })
    }
}

impl TryFrom<ItemRow> for Item {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Item {
            sku: Sku::parse(row.sku).map_err(corrupt("items.sku"))?,
            name: row.name,
            quantity: Quantity::new(row.quantity),
            opening_quantity: Quantity::new(row.opening_quantity),
            unit: row
                .unit
                .parse::<UnitOfMeasure>()
                .map_err(corrupt("items.unit"))?,
            min_stock: Quantity::new(row.min_stock),
            price: row.price,
            supplier: row.supplier,
            version: to_u64(row.version)?,
            created_at: row.created_at,
            last_updated: row.last_updated,
        })
    }
}

#[derive(Debug)]
struct TransactionRow {
    sequence: i64,
    id: uuid::Uuid,
    ref_code: String,
    sku: String,
    kind: String,
    quantity_change: Decimal,
    actor: String,
    reason: String,
    occurred_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for TransactionRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(TransactionRow {
            sequence: row.try_get("sequence")?,
            id: row.try_get("id")?,
            ref_code: row.try_get("ref_code")?,
            sku: row.try_get("sku")?,
            kind: row.try_get("kind")?,
            quantity_change: row.try_get("quantity_change")?,
            actor: row.try_get("actor")?,
            reason: row.try_get("reason")?,
            occurred_at: row.try_get("occurred_at")?,
        })
    }
}

impl TryFrom<TransactionRow> for TransactionRecord {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(TransactionRecord {
            sequence: to_u64(row.sequence)?,
            id: TransactionId::from_uuid(row.id),
            ref_code: RefCode::parse(row.ref_code).map_err(corrupt("ref_code"))?,
            sku: Sku::parse(row.sku).map_err(corrupt("stock_transactions.sku"))?,
            kind: row.kind.parse().map_err(corrupt("kind"))?,
            quantity_change: Quantity::new(row.quantity_change),
            user: Actor::parse(row.actor).map_err(corrupt("actor"))?,
            reason: row.reason,
            occurred_at: row.occurred_at,
        })
    }
}

fn decode_item(row: &PgRow) -> Result<Item, StoreError> {
    ItemRow::from_row(row)
        .map_err(|e| StoreError::Corrupt(format!("failed to deserialize item row: {e}")))?
        .try_into()
}

fn decode_transaction(row: &PgRow) -> Result<TransactionRecord, StoreError> {
    TransactionRow::from_row(row)
        .map_err(|e| StoreError::Corrupt(format!("failed to deserialize transaction row: {e}")))?
        .try_into()
}

fn corrupt(column: &'static str) -> impl Fn(DomainError) -> StoreError {
    move |e| StoreError::Corrupt(format!("{column}: {e}"))
}

fn to_u64(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative counter {value}")))
}

fn to_i64(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("counter {value} out of range")))
}

fn to_i64_usize(value: usize) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("limit {value} out of range")))
}

/// Map unique violations on item writes to the domain error naming the key.
fn map_item_write_error(operation: &str, item: &Item, err: sqlx::Error) -> StoreError {
    let constraint = match &err {
        sqlx::Error::Database(db_err) => db_err.constraint().map(str::to_owned),
        _ => None,
    };
    match constraint.as_deref() {
        Some("items_name_key") => DomainError::duplicate("name", item.name.as_str()).into(),
        Some("items_pkey") => DomainError::duplicate("sku", item.sku.as_str()).into(),
        _ => map_sqlx_error(operation, err),
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Check constraint violation
                Some("23514") => DomainError::validation(msg).into(),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::RowNotFound => {
            StoreError::Corrupt(format!("unexpected row not found in {}", operation))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_components_lock_in_sku_order() {
        let recipe = Recipe::define(
            ProductId::parse("Chair").unwrap(),
            vec![
                RecipeLine::new(Sku::parse("P-01003").unwrap(), 1),
                RecipeLine::new(Sku::parse("P-01001").unwrap(), 4),
                RecipeLine::new(Sku::parse("P-01002").unwrap(), 2),
            ],
        )
        .unwrap();
        let order: Vec<&str> = components_in_lock_order(&recipe)
            .into_iter()
            .map(Sku::as_str)
            .collect();
        assert_eq!(order, ["P-01001", "P-01002", "P-01003"]);
    }

    #[test]
    fn sync_bridge_outside_a_runtime_is_unavailable() {
        let err = block_on(async { Ok::<_, StoreError>(1) }).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sync_bridge_on_current_thread_runtime_is_unavailable() {
        let err = block_on(async { Ok::<_, StoreError>(1) }).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(msg) if msg.contains("multi-threaded")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sync_bridge_on_multi_thread_runtime_runs_the_future() {
        assert_eq!(block_on(async { Ok::<_, StoreError>(7) }).unwrap(), 7);
    }
}
