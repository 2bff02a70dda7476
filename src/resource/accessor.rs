use libsql::Connection;

use crate::db::Database;
use crate::error::{ResourceError, is_foreign_key_violation};
use crate::model::{Record, ResourceDescriptor, row_to_record};

use super::{guard, validation};

/// Generic CRUD over any table in the catalog. Every operation is one store
/// statement plus, for writes, a re-read through the descriptor's view so
/// server-computed and joined columns come back to the caller.
///
/// All writes hold `Database::write_lock` for their whole duration. The
/// connection is shared, so an unlocked write could otherwise land inside
/// another request's open transaction.
pub struct ResourceAccessor<'a> {
    db: &'a Database,
}

impl<'a> ResourceAccessor<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    fn conn(&self) -> &Connection {
        self.db.connection()
    }

    pub async fn list(&self, descriptor: &ResourceDescriptor) -> Result<Vec<Record>, ResourceError> {
        let query = format!("{} ORDER BY {}", descriptor.select_sql(), descriptor.order_by);

        let mut rows = self.conn().query(&query, ()).await?;
        let mut records = Vec::new();

        while let Some(row) = rows.next().await? {
            records.push(row_to_record(&row)?);
        }

        Ok(records)
    }

    pub async fn get_by_id(&self, descriptor: &ResourceDescriptor, id: i64) -> Result<Record, ResourceError> {
        self.find(descriptor, id)
            .await?
            .ok_or_else(|| ResourceError::NotFound(descriptor.not_found()))
    }

    async fn find(&self, descriptor: &ResourceDescriptor, id: i64) -> Result<Option<Record>, ResourceError> {
        let query = format!("{} WHERE {} = ?", descriptor.select_sql(), descriptor.id_column());

        let mut rows = self.conn().query(&query, libsql::params![id]).await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(row_to_record(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn create(&self, descriptor: &ResourceDescriptor, payload: &Record) -> Result<Record, ResourceError> {
        let params = validation::validate(descriptor, payload)?;

        let columns: Vec<&str> = descriptor.columns.iter().map(|c| c.name).collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let query = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
            descriptor.table,
            columns.join(", "),
            placeholders
        );

        let _lock = self.db.write_lock().await;

        let mut rows = self
            .conn()
            .query(&query, params)
            .await
            .map_err(|e| write_error(descriptor, e))?;

        let id: i64 = match rows.next().await.map_err(|e| write_error(descriptor, e))? {
            Some(row) => row.get(0)?,
            None => {
                return Err(anyhow::anyhow!("insert into {} returned no id", descriptor.table).into());
            }
        };

        tracing::info!(resource = descriptor.name, id, "created record");
        self.refetch(descriptor, id).await
    }

    /// Full-row overwrite. Columns absent from `payload` are reset to their
    /// defaults.
    pub async fn update(
        &self,
        descriptor: &ResourceDescriptor,
        id: i64,
        payload: &Record,
    ) -> Result<Record, ResourceError> {
        let mut params = validation::validate(descriptor, payload)?;

        let mut updates: Vec<String> = descriptor.columns.iter().map(|c| format!("{} = ?", c.name)).collect();
        if descriptor.touch_updated_at {
            updates.push("updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')".to_string());
        }
        params.push(libsql::Value::Integer(id));

        let query = format!("UPDATE {} SET {} WHERE id = ?", descriptor.table, updates.join(", "));

        let _lock = self.db.write_lock().await;

        let changed = self
            .conn()
            .execute(&query, params)
            .await
            .map_err(|e| write_error(descriptor, e))?;

        if changed == 0 {
            return Err(ResourceError::NotFound(descriptor.not_found()));
        }

        tracing::info!(resource = descriptor.name, id, "updated record");
        self.refetch(descriptor, id).await
    }

    pub async fn delete(&self, descriptor: &ResourceDescriptor, id: i64) -> Result<(), ResourceError> {
        let _lock = self.db.write_lock().await;

        let changed = if descriptor.dependents.is_empty() {
            self.delete_row(descriptor, id).await?
        } else {
            self.delete_guarded(descriptor, id).await?
        };

        if changed == 0 {
            return Err(ResourceError::NotFound(descriptor.not_found()));
        }

        tracing::info!(resource = descriptor.name, id, "deleted record");
        Ok(())
    }

    /// Dependent check and delete share one transaction, so a dependent row
    /// inserted concurrently cannot slip in between them. Caller holds the
    /// write lock.
    async fn delete_guarded(&self, descriptor: &ResourceDescriptor, id: i64) -> Result<u64, ResourceError> {
        self.conn().execute("BEGIN IMMEDIATE", ()).await?;

        let result = async {
            guard::ensure_deletable(self.conn(), descriptor, id).await?;
            self.delete_row(descriptor, id).await
        }
        .await;

        match result {
            Ok(changed) => {
                self.conn().execute("COMMIT", ()).await?;
                Ok(changed)
            }
            Err(e) => {
                if let Err(rollback) = self.conn().execute("ROLLBACK", ()).await {
                    tracing::warn!(
                        resource = descriptor.name,
                        id,
                        error = %rollback,
                        "rollback failed, connection may still be inside a transaction"
                    );
                }
                Err(e)
            }
        }
    }

    async fn delete_row(&self, descriptor: &ResourceDescriptor, id: i64) -> Result<u64, ResourceError> {
        let query = format!("DELETE FROM {} WHERE id = ?", descriptor.table);
        self.conn()
            .execute(&query, libsql::params![id])
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    guard::conflict(descriptor)
                } else {
                    e.into()
                }
            })
    }

    async fn refetch(&self, descriptor: &ResourceDescriptor, id: i64) -> Result<Record, ResourceError> {
        self.find(descriptor, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("{} {} vanished after write", descriptor.name, id).into())
    }
}

fn write_error(descriptor: &ResourceDescriptor, error: libsql::Error) -> ResourceError {
    if is_foreign_key_violation(&error) {
        ResourceError::InvalidArgument(format!(
            "{} references a record that does not exist",
            descriptor.name.to_lowercase()
        ))
    } else {
        error.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, FINANCE_CATEGORIES, FINANCE_TRANSACTIONS, NOTES, PC_ORDERS};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;

    async fn setup() -> (tempfile::TempDir, Database) {
        let dir = tempfile::TempDir::new().unwrap();
        let db = Database::open(&dir.path().join("test.db")).await.unwrap();
        (dir, db)
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_returns_server_columns() {
        let (_dir, db) = setup().await;
        let lib = ResourceAccessor::new(&db);

        let note = lib.create(&NOTES, &record(json!({"title": "Groceries"}))).await.unwrap();

        assert_eq!(note["id"], 1);
        assert_eq!(note["title"], "Groceries");
        assert_eq!(note["content"], "");
        assert!(note["created_at"].is_string());
        assert!(note["updated_at"].is_string());
    }

    #[tokio::test]
    async fn test_get_and_list() {
        let (_dir, db) = setup().await;
        let lib = ResourceAccessor::new(&db);

        let first = lib.create(&NOTES, &record(json!({"title": "a"}))).await.unwrap();
        let second = lib.create(&NOTES, &record(json!({"title": "b"}))).await.unwrap();

        let fetched = lib.get_by_id(&NOTES, first["id"].as_i64().unwrap()).await.unwrap();
        assert_eq!(fetched, first);

        let listed = lib.list(&NOTES).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["id"], second["id"]);
    }

    #[tokio::test]
    async fn test_update_overwrites_full_row() {
        let (_dir, db) = setup().await;
        let lib = ResourceAccessor::new(&db);

        let order = lib
            .create(
                &PC_ORDERS,
                &record(json!({
                    "item": "PSU", "date": "2024-05-01", "store": "Shop", "price": 120,
                    "status": "shipped", "courier": "DHL", "tracking_number": "X1", "note": "n"
                })),
            )
            .await
            .unwrap();
        let id = order["id"].as_i64().unwrap();

        let updated = lib
            .update(&PC_ORDERS, id, &record(json!({"item": "PSU", "date": "2024-05-02", "store": "Shop"})))
            .await
            .unwrap();

        assert_eq!(updated["date"], "2024-05-02");
        assert_eq!(updated["price"], 0);
        assert_eq!(updated["status"], "ordered");
        assert_eq!(updated["courier"], "");
        assert_eq!(updated["created_at"], order["created_at"]);
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let (_dir, db) = setup().await;
        let lib = ResourceAccessor::new(&db);

        for descriptor in catalog::ALL {
            assert!(matches!(
                lib.get_by_id(descriptor, 404).await,
                Err(ResourceError::NotFound(_))
            ));
            assert!(matches!(lib.delete(descriptor, 404).await, Err(ResourceError::NotFound(_))));
        }

        match lib.update(&NOTES, 404, &record(json!({"title": "x"}))).await {
            Err(ResourceError::NotFound(msg)) => assert_eq!(msg, "Note not found"),
            other => panic!("expected not found, got {:?}", other),
        }
        assert!(lib.list(&NOTES).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transaction_view_and_guard() {
        let (_dir, db) = setup().await;
        let lib = ResourceAccessor::new(&db);

        let category = lib
            .create(&FINANCE_CATEGORIES, &record(json!({"name": "Salary", "kind": "income"})))
            .await
            .unwrap();
        let category_id = category["id"].as_i64().unwrap();

        let tx = lib
            .create(
                &FINANCE_TRANSACTIONS,
                &record(json!({"category_id": category_id, "amount": 1500, "date": "2024-01-01", "note": ""})),
            )
            .await
            .unwrap();
        assert_eq!(tx["category_name"], "Salary");
        assert_eq!(tx["category_kind"], "income");
        assert_eq!(tx["amount"], 1500);

        assert!(matches!(
            lib.delete(&FINANCE_CATEGORIES, category_id).await,
            Err(ResourceError::Conflict(_))
        ));
        assert_eq!(lib.list(&FINANCE_CATEGORIES).await.unwrap().len(), 1);

        lib.delete(&FINANCE_TRANSACTIONS, tx["id"].as_i64().unwrap()).await.unwrap();
        lib.delete(&FINANCE_CATEGORIES, category_id).await.unwrap();
        assert!(lib.list(&FINANCE_CATEGORIES).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dangling_category_reference_is_invalid() {
        let (_dir, db) = setup().await;
        let lib = ResourceAccessor::new(&db);

        let result = lib
            .create(
                &FINANCE_TRANSACTIONS,
                &record(json!({"category_id": 9, "amount": 10, "date": "2024-01-01"})),
            )
            .await;
        assert!(matches!(result, Err(ResourceError::InvalidArgument(_))));
        assert!(lib.list(&FINANCE_TRANSACTIONS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_runs_before_write() {
        let (_dir, db) = setup().await;
        let lib = ResourceAccessor::new(&db);

        let note = lib.create(&NOTES, &record(json!({"title": "keep"}))).await.unwrap();
        let id = note["id"].as_i64().unwrap();

        let result = lib.update(&NOTES, id, &record(json!({"title": ""}))).await;
        assert!(matches!(result, Err(ResourceError::InvalidArgument(_))));
        assert_eq!(lib.get_by_id(&NOTES, id).await.unwrap()["title"], "keep");
    }

    #[tokio::test]
    async fn test_update_touches_note_updated_at() {
        let (_dir, db) = setup().await;
        let lib = ResourceAccessor::new(&db);

        let note = lib.create(&NOTES, &record(json!({"title": "old"}))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let updated = lib
            .update(&NOTES, note["id"].as_i64().unwrap(), &record(json!({"title": "new"})))
            .await
            .unwrap();

        assert_eq!(updated["created_at"], note["created_at"]);
        assert!(updated["updated_at"].as_str().unwrap() > note["updated_at"].as_str().unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_blocked_delete_keeps_concurrent_writes() {
        let (_dir, db) = setup().await;
        let db = Arc::new(db);
        let lib = ResourceAccessor::new(&db);

        let category = lib
            .create(&FINANCE_CATEGORIES, &record(json!({"name": "Salary", "kind": "income"})))
            .await
            .unwrap();
        let category_id = category["id"].as_i64().unwrap();
        lib.create(
            &FINANCE_TRANSACTIONS,
            &record(json!({"category_id": category_id, "amount": 1500, "date": "2024-01-01"})),
        )
        .await
        .unwrap();

        let deleter = {
            let db = db.clone();
            tokio::spawn(async move {
                let lib = ResourceAccessor::new(&db);
                let mut unexpected = 0;
                for _ in 0..500 {
                    if !matches!(
                        lib.delete(&FINANCE_CATEGORIES, category_id).await,
                        Err(ResourceError::Conflict(_))
                    ) {
                        unexpected += 1;
                    }
                }
                unexpected
            })
        };

        let writers: Vec<_> = (0..3)
            .map(|w| {
                let db = db.clone();
                tokio::spawn(async move {
                    let lib = ResourceAccessor::new(&db);
                    for i in 0..200 {
                        lib.create(&NOTES, &record(json!({"title": format!("{w}-{i}")})))
                            .await
                            .unwrap();
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.await.unwrap();
        }
        assert_eq!(deleter.await.unwrap(), 0);

        assert_eq!(lib.list(&NOTES).await.unwrap().len(), 600);
        assert_eq!(lib.list(&FINANCE_CATEGORIES).await.unwrap().len(), 1);
        assert_eq!(lib.list(&FINANCE_TRANSACTIONS).await.unwrap().len(), 1);
    }
}
